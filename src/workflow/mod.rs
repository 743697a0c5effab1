/// Stitching workflow
///
/// This module drives a tile folder through its three stages:
/// - moving the tiles into `raw` (reorganize.rs)
/// - background subtraction into `bkg_subtracted` (background.rs)
/// - stitching the subtracted tiles into one mosaic (stitch.rs)
///
/// `walker.rs` finds the folders, works out which stage each one is in
/// (state.rs) and collects a per-folder report (report.rs).

pub mod background;
pub mod error;
pub mod reorganize;
pub mod report;
pub mod state;
pub mod stitch;
pub mod walker;

pub use error::{Stage, StageFailure, WorkflowError};
pub use report::{DirectoryReport, Outcome, RunSummary};
pub use state::{DirectoryState, StageLayout};
pub use walker::run;
