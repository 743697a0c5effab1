/// Pre-flight decoding of tile images
///
/// The engine only reports problems once a whole macro has run, so a
/// truncated or mislabelled tile is caught here first, with its path.
/// Every tile is decoded in full: a readable header says nothing about
/// the pixel data behind it.

use image::ImageReader;
use log::warn;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A tile that could not be decoded
#[derive(Debug, Error)]
#[error("cannot read tile {path}: {source}")]
pub struct UnreadableTile {
    pub path: PathBuf,
    #[source]
    pub source: image::ImageError,
}

/// Pixel size of the tiles in one folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileGeometry {
    pub width: u32,
    pub height: u32,
}

/// Decode one tile and return its dimensions
pub fn tile_dimensions(path: &Path) -> Result<(u32, u32), UnreadableTile> {
    let unreadable = |source: image::ImageError| UnreadableTile {
        path: path.to_path_buf(),
        source,
    };

    // Sniff the format from the bytes, `.TIF` and friends included
    ImageReader::open(path)
        .map_err(|e| unreadable(image::ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| unreadable(image::ImageError::IoError(e)))?
        .decode()
        .map(|img| (img.width(), img.height()))
        .map_err(unreadable)
}

/// Check that every tile in `dir` decodes.
///
/// Returns the size of the first tile. Tiles of a different size are
/// logged but not rejected; the stitcher can cope with them.
pub fn inspect_tiles<S: AsRef<str>>(
    dir: &Path,
    tiles: &[S],
) -> Result<Option<TileGeometry>, UnreadableTile> {
    let mut geometry: Option<TileGeometry> = None;

    for tile in tiles {
        let path = dir.join(tile.as_ref());
        let (width, height) = tile_dimensions(&path)?;

        match geometry {
            None => {
                geometry = Some(TileGeometry { width, height });
            }
            Some(first) if first.width != width || first.height != height => {
                warn!(
                    "⚠️  {} is {}x{}, other tiles in {} are {}x{}",
                    tile.as_ref(),
                    width,
                    height,
                    dir.display(),
                    first.width,
                    first.height
                );
            }
            Some(_) => {}
        }
    }

    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::fs;
    use tempfile::tempdir;

    fn write_tile(dir: &Path, name: &str, width: u32, height: u32) {
        let img = GrayImage::from_pixel(width, height, Luma([128u8]));
        img.save_with_format(dir.join(name), image::ImageFormat::Tiff)
            .unwrap();
    }

    #[test]
    fn test_uniform_tiles() {
        let dir = tempdir().unwrap();
        write_tile(dir.path(), "Image_R00C00_CH4.tif", 8, 6);
        write_tile(dir.path(), "Image_R00C01_CH4.tif", 8, 6);

        let geometry = inspect_tiles(
            dir.path(),
            &["Image_R00C00_CH4.tif", "Image_R00C01_CH4.tif"],
        )
        .unwrap();

        assert_eq!(geometry, Some(TileGeometry { width: 8, height: 6 }));
    }

    #[test]
    fn test_uppercase_extension_is_sniffed() {
        let dir = tempdir().unwrap();
        write_tile(dir.path(), "tile.tif", 4, 4);
        fs::rename(dir.path().join("tile.tif"), dir.path().join("TILE.TIF")).unwrap();

        assert_eq!(tile_dimensions(&dir.path().join("TILE.TIF")).unwrap(), (4, 4));
    }

    #[test]
    fn test_mismatched_sizes_are_tolerated() {
        let dir = tempdir().unwrap();
        write_tile(dir.path(), "a.tif", 8, 8);
        write_tile(dir.path(), "b.tif", 4, 4);

        let geometry = inspect_tiles(dir.path(), &["a.tif", "b.tif"]).unwrap();

        assert_eq!(geometry, Some(TileGeometry { width: 8, height: 8 }));
    }

    #[test]
    fn test_corrupt_tile_names_the_file() {
        let dir = tempdir().unwrap();
        write_tile(dir.path(), "good.tif", 4, 4);
        fs::write(dir.path().join("broken.tif"), b"not an image").unwrap();

        let err = inspect_tiles(dir.path(), &["good.tif", "broken.tif"]).unwrap_err();

        assert_eq!(err.path, dir.path().join("broken.tif"));
        assert!(err.to_string().contains("broken.tif"));
    }

    /// Little-endian TIFF whose directory describes a 64x64 8-bit strip
    /// that is not actually in the file
    fn header_without_pixels() -> Vec<u8> {
        const ENTRIES: u16 = 9;
        let data_offset = 8 + 2 + 12 * ENTRIES as u32 + 4;

        let mut bytes = b"II*\0".to_vec();
        bytes.extend_from_slice(&8u32.to_le_bytes());
        bytes.extend_from_slice(&ENTRIES.to_le_bytes());

        let mut entry = |tag: u16, kind: u16, value: u32| {
            bytes.extend_from_slice(&tag.to_le_bytes());
            bytes.extend_from_slice(&kind.to_le_bytes());
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.extend_from_slice(&value.to_le_bytes());
        };
        const SHORT: u16 = 3;
        const LONG: u16 = 4;
        entry(256, SHORT, 64); // ImageWidth
        entry(257, SHORT, 64); // ImageLength
        entry(258, SHORT, 8); // BitsPerSample
        entry(259, SHORT, 1); // Compression: none
        entry(262, SHORT, 1); // PhotometricInterpretation: BlackIsZero
        entry(273, LONG, data_offset); // StripOffsets
        entry(277, SHORT, 1); // SamplesPerPixel
        entry(278, SHORT, 64); // RowsPerStrip
        entry(279, LONG, 64 * 64); // StripByteCounts

        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes
    }

    #[test]
    fn test_tile_without_pixel_data_is_rejected() {
        let dir = tempdir().unwrap();
        write_tile(dir.path(), "Image_R00C00_CH4.tif", 64, 64);
        fs::write(dir.path().join("Image_R00C01_CH4.tif"), header_without_pixels()).unwrap();

        let err = inspect_tiles(
            dir.path(),
            &["Image_R00C00_CH4.tif", "Image_R00C01_CH4.tif"],
        )
        .unwrap_err();

        assert_eq!(err.path, dir.path().join("Image_R00C01_CH4.tif"));
    }

    #[test]
    fn test_truncated_tile_is_rejected() {
        let dir = tempdir().unwrap();
        write_tile(dir.path(), "full.tif", 64, 64);
        let bytes = fs::read(dir.path().join("full.tif")).unwrap();
        fs::write(dir.path().join("cut.tif"), &bytes[..bytes.len() / 2]).unwrap();

        assert!(tile_dimensions(&dir.path().join("cut.tif")).is_err());
    }

    #[test]
    fn test_missing_tile() {
        let dir = tempdir().unwrap();
        assert!(inspect_tiles(dir.path(), &["absent.tif"]).is_err());
    }
}
