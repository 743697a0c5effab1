//! Batch processing for tiled microscopy scans.
//!
//! Walks a folder tree, moves each tile set into `raw`, subtracts the
//! background of every tile into `bkg_subtracted` and stitches the result
//! into one `stitched.tif` per set. The image work itself is done by an
//! [`engine::ImageEngine`] backend, Fiji by default.

pub mod config;
pub mod engine;
pub mod tiles;
pub mod workflow;

pub use config::PipelineConfig;
pub use engine::{FijiEngine, ImageEngine};
pub use workflow::{run, RunSummary};
