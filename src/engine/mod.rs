/// Image-processing engine adapter
///
/// The workflow never talks to an image library directly. It goes
/// through [`ImageEngine`], which exposes the handful of operations the
/// pipeline needs:
/// - open / save an image by path
/// - rolling-ball background subtraction
/// - grid/collection stitching of a tile folder
/// - conversion of the fused mosaic to RGB
///
/// Architecture:
/// - `fiji.rs` - headless Fiji backend driven by generated ImageJ macros
/// - `testing.rs` - recording fake used by the workflow tests

pub mod fiji;
#[cfg(test)]
pub mod testing;

pub use fiji::FijiEngine;

use crate::config::{BackgroundParams, StitchParams};
use crate::tiles::TileGrid;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reported by an engine backend
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine exited with {status}: {output}")]
    Failed { status: String, output: String },

    #[error("failed to prepare engine script: {0}")]
    Script(#[source] std::io::Error),

    #[error("engine finished but {0} was not written")]
    MissingOutput(PathBuf),

    #[error("cannot replace existing output {path}: {source}")]
    StaleOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} cannot be passed to the engine: {reason}")]
    UnsupportedPath { path: PathBuf, reason: &'static str },

    #[error("Fiji launcher not found at {0}; pass --fiji or set FIJI_EXECUTABLE")]
    NotFound(PathBuf),

    #[error("{0}")]
    Other(String),
}

/// Everything a backend needs to stitch one tile folder
#[derive(Debug, Clone)]
pub struct StitchRequest<'a> {
    /// Folder holding the (background-subtracted) tiles
    pub directory: &'a Path,
    pub grid: TileGrid,
    pub params: &'a StitchParams,
}

/// Capability set of an image-processing backend.
///
/// `Image` is whatever handle the backend uses for an open image. The
/// workflow only passes it back into the same engine.
pub trait ImageEngine {
    type Image;

    /// Open an image file
    fn open(&self, path: &Path) -> Result<Self::Image, EngineError>;

    /// Subtract the background in place
    fn subtract_background(
        &self,
        image: &mut Self::Image,
        params: &BackgroundParams,
    ) -> Result<(), EngineError>;

    /// Stitch a tile folder into one fused image
    fn stitch(&self, request: &StitchRequest<'_>) -> Result<Self::Image, EngineError>;

    /// Convert to 3-channel RGB in place
    fn to_rgb(&self, image: &mut Self::Image) -> Result<(), EngineError>;

    /// Write the image as TIFF
    fn save(&self, image: Self::Image, path: &Path) -> Result<(), EngineError>;
}
