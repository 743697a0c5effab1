/// Recording fake engine for workflow tests
///
/// Subtraction copies the tile unchanged and stitching writes a small RGB
/// TIFF sized after the grid, so the filesystem ends up looking like a
/// real run without Fiji installed.

use super::{EngineError, ImageEngine, StitchRequest};
use crate::config::BackgroundParams;
use crate::tiles::TileGrid;
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Pixels per tile in the fake mosaic
pub(crate) const FAKE_TILE_PX: u32 = 4;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Subtracted { source: PathBuf, dest: PathBuf },
    Stitched { directory: PathBuf, grid: TileGrid, output: PathBuf },
}

#[derive(Debug)]
pub(crate) struct FakeImage {
    source: Option<PathBuf>,
    grid: Option<TileGrid>,
    background_done: bool,
    rgb: bool,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingEngine {
    calls: Mutex<Vec<Call>>,
    /// Opening any file whose name contains this fails
    fail_on: Option<String>,
}

impl RecordingEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_on(name: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: Some(name.to_string()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn subtraction_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Subtracted { .. }))
            .count()
    }

    pub(crate) fn stitches(&self) -> Vec<(PathBuf, TileGrid, PathBuf)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Stitched { directory, grid, output } => Some((directory, grid, output)),
                _ => None,
            })
            .collect()
    }
}

impl ImageEngine for RecordingEngine {
    type Image = FakeImage;

    fn open(&self, path: &Path) -> Result<FakeImage, EngineError> {
        if let Some(pattern) = &self.fail_on {
            if path.to_string_lossy().contains(pattern.as_str()) {
                return Err(EngineError::Other(format!("cannot open {}", path.display())));
            }
        }

        Ok(FakeImage {
            source: Some(path.to_path_buf()),
            grid: None,
            background_done: false,
            rgb: false,
        })
    }

    fn subtract_background(
        &self,
        image: &mut FakeImage,
        _params: &BackgroundParams,
    ) -> Result<(), EngineError> {
        image.background_done = true;
        Ok(())
    }

    fn stitch(&self, request: &StitchRequest<'_>) -> Result<FakeImage, EngineError> {
        Ok(FakeImage {
            source: Some(request.directory.to_path_buf()),
            grid: Some(request.grid),
            background_done: false,
            rgb: false,
        })
    }

    fn to_rgb(&self, image: &mut FakeImage) -> Result<(), EngineError> {
        image.rgb = true;
        Ok(())
    }

    fn save(&self, image: FakeImage, path: &Path) -> Result<(), EngineError> {
        let source = image
            .source
            .ok_or_else(|| EngineError::Other("image has no source".into()))?;

        let call = match image.grid {
            Some(grid) => {
                if !image.rgb {
                    return Err(EngineError::Other("mosaic saved before RGB conversion".into()));
                }
                let mosaic = RgbImage::from_pixel(
                    grid.width * FAKE_TILE_PX,
                    grid.height * FAKE_TILE_PX,
                    Rgb([200, 200, 200]),
                );
                mosaic
                    .save_with_format(path, image::ImageFormat::Tiff)
                    .map_err(|e| EngineError::Other(e.to_string()))?;
                Call::Stitched {
                    directory: source,
                    grid,
                    output: path.to_path_buf(),
                }
            }
            None => {
                if !image.background_done {
                    return Err(EngineError::Other("tile saved without subtraction".into()));
                }
                fs::copy(&source, path).map_err(EngineError::Script)?;
                Call::Subtracted {
                    source,
                    dest: path.to_path_buf(),
                }
            }
        };

        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}
