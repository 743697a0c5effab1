/// Mosaic assembly from a `bkg_subtracted` folder
///
/// The stitcher finds tile positions from the filename template, so all
/// we hand it is the folder, the grid size and the tuning parameters. The
/// fused result is converted to RGB and written next to the folder.

use super::error::WorkflowError;
use crate::config::StitchParams;
use crate::engine::{ImageEngine, StitchRequest};
use crate::tiles::TileGrid;
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A mosaic that was written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StitchOutcome {
    pub output: PathBuf,
    pub grid: TileGrid,
}

/// Stitch the tiles in `tile_dir` into `output`
pub fn stitch_directory<E, S>(
    tile_dir: &Path,
    tiles: &[S],
    grid: TileGrid,
    output: &Path,
    params: &StitchParams,
    engine: &E,
) -> Result<StitchOutcome, WorkflowError>
where
    E: ImageEngine,
    S: AsRef<str>,
{
    for tile in tiles {
        info!("🧩 Stitching {}", tile.as_ref());
    }
    info!(
        "🧵 Fusing {} tiles from {} on a {} grid",
        tiles.len(),
        tile_dir.display(),
        grid
    );

    let request = StitchRequest {
        directory: tile_dir,
        grid,
        params,
    };
    let failed = |source| WorkflowError::Engine {
        path: tile_dir.to_path_buf(),
        source,
    };

    let mut mosaic = engine.stitch(&request).map_err(failed)?;
    engine.to_rgb(&mut mosaic).map_err(failed)?;
    engine.save(mosaic, output).map_err(failed)?;

    info!("✅ Saved mosaic to {}", output.display());

    Ok(StitchOutcome {
        output: output.to_path_buf(),
        grid,
    })
}
