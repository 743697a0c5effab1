/// Move loose tiles into a `raw` subfolder
///
/// Creates `raw` and `bkg_subtracted` next to the tiles and moves every
/// tile into `raw` under its own name. There is no rollback: if a move
/// fails part-way the folder is left mixed and the error names the tile.

use super::error::WorkflowError;
use super::state::StageLayout;
use log::info;
use std::fs;
use std::path::Path;

/// Reorganize `dir`, or do nothing if it holds fewer than `min_batch` tiles.
///
/// Returns the new layout when folders were created.
pub fn reorganize<S: AsRef<str>>(
    dir: &Path,
    tiles: &[S],
    min_batch: usize,
) -> Result<Option<StageLayout>, WorkflowError> {
    if tiles.len() < min_batch {
        return Ok(None);
    }

    let layout = StageLayout::under(dir);

    // Never reorganize twice
    for stage_dir in [&layout.raw, &layout.bkg_subtracted] {
        if stage_dir.exists() {
            return Err(WorkflowError::DirectoryExists {
                path: stage_dir.clone(),
            });
        }
    }

    for stage_dir in [&layout.raw, &layout.bkg_subtracted] {
        fs::create_dir(stage_dir).map_err(|e| WorkflowError::io("create", stage_dir, e))?;
    }

    for tile in tiles {
        let from = dir.join(tile.as_ref());
        let to = layout.raw.join(tile.as_ref());

        info!("📦 Moving {} to raw folder", from.display());
        fs::rename(&from, &to).map_err(|e| WorkflowError::io("move", &from, e))?;
    }

    Ok(Some(layout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::{BKG_DIR, RAW_DIR};
    use tempfile::tempdir;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), name.as_bytes()).unwrap();
        }
    }

    fn sorted_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_single_tile_is_left_alone() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["Image_R00C00_CH4.tif"]);

        let layout = reorganize(dir.path(), &["Image_R00C00_CH4.tif"], 2).unwrap();

        assert!(layout.is_none());
        assert!(!dir.path().join(RAW_DIR).exists());
        assert!(!dir.path().join(BKG_DIR).exists());
    }

    #[test]
    fn test_moves_exactly_the_tiles() {
        let dir = tempdir().unwrap();
        let tiles = ["Image_R00C00_CH4.tif", "Image_R00C01_CH4.tif", "Image_R01C00_CH4.tif"];
        touch(dir.path(), &tiles);
        touch(dir.path(), &["notes.txt"]);

        let layout = reorganize(dir.path(), &tiles, 2).unwrap().unwrap();

        assert_eq!(sorted_names(&layout.raw), tiles.to_vec());
        assert!(sorted_names(&layout.bkg_subtracted).is_empty());
        assert_eq!(sorted_names(dir.path()), vec!["bkg_subtracted", "notes.txt", "raw"]);

        // Content travels with the file
        let moved = fs::read(layout.raw.join("Image_R00C01_CH4.tif")).unwrap();
        assert_eq!(moved, b"Image_R00C01_CH4.tif");
    }

    #[test]
    fn test_refuses_existing_raw() {
        let dir = tempdir().unwrap();
        let tiles = ["a_1_1.tif", "a_1_2.tif"];
        touch(dir.path(), &tiles);
        fs::create_dir(dir.path().join(RAW_DIR)).unwrap();

        let err = reorganize(dir.path(), &tiles, 2).unwrap_err();

        assert!(matches!(err, WorkflowError::DirectoryExists { ref path } if path.ends_with(RAW_DIR)));
        // Nothing moved, nothing else created
        assert!(dir.path().join("a_1_1.tif").exists());
        assert!(!dir.path().join(BKG_DIR).exists());
    }

    #[test]
    fn test_refuses_existing_bkg_subtracted() {
        let dir = tempdir().unwrap();
        let tiles = ["a_1_1.tif", "a_1_2.tif"];
        touch(dir.path(), &tiles);
        fs::create_dir(dir.path().join(BKG_DIR)).unwrap();

        assert!(reorganize(dir.path(), &tiles, 2).is_err());
        assert!(!dir.path().join(RAW_DIR).exists());
    }

    #[test]
    fn test_missing_tile_names_the_file() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["a_0_0.tif"]);

        let err = reorganize(dir.path(), &["a_0_0.tif", "a_0_1.tif"], 2).unwrap_err();

        assert!(err.to_string().contains("a_0_1.tif"));
        // No rollback: the first tile already moved
        assert!(dir.path().join(RAW_DIR).join("a_0_0.tif").exists());
    }
}
