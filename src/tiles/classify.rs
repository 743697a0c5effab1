/// Tile file classification

use std::fs;
use std::io;
use std::path::Path;

/// Filename suffixes recognised as tile images.
///
/// Matching is an exact, case-sensitive suffix test: `.Tif` and `.TIFF`
/// are not tiles.
pub const TILE_SUFFIXES: [&str; 3] = [".tif", ".tiff", ".TIF"];

/// Check whether a single filename looks like a tile image
pub fn is_tile_name(name: &str) -> bool {
    TILE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Filter a directory listing down to tile images, keeping the input order
pub fn classify_tiles<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter(|name| is_tile_name(name.as_ref()))
        .map(|name| name.as_ref().to_string())
        .collect()
}

/// List the tile images directly inside `dir` (no recursion).
///
/// Only regular files are considered. Names are sorted so that repeated
/// runs over the same folder see the same order.
pub fn list_tiles(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        // Non-UTF-8 names cannot match the coordinate pattern anyway
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }

    names.sort();
    Ok(classify_tiles(names))
}
