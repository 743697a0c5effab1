/// Per-tile background subtraction
///
/// Each tile is opened from the `raw` folder, run through the engine's
/// rolling-ball filter and written under the same name into
/// `bkg_subtracted`. Tiles do not depend on each other, so with more than
/// one job they are spread over a rayon pool.

use super::error::WorkflowError;
use crate::config::BackgroundParams;
use crate::engine::ImageEngine;
use log::info;
use rayon::prelude::*;
use std::path::Path;

/// Subtract the background of every tile.
///
/// The first failure stops the batch and names the tile. Tiles already
/// written stay where they are. Returns the number of tiles written.
pub fn subtract_backgrounds<E, S>(
    raw_dir: &Path,
    out_dir: &Path,
    tiles: &[S],
    params: &BackgroundParams,
    engine: &E,
    jobs: usize,
) -> Result<usize, WorkflowError>
where
    E: ImageEngine + Sync,
    S: AsRef<str> + Sync,
{
    info!(
        "🧹 Subtracting background in {} and writing to {}",
        raw_dir.display(),
        out_dir.display()
    );

    if jobs <= 1 {
        for tile in tiles {
            subtract_one(raw_dir, out_dir, tile.as_ref(), params, engine)?;
        }
    } else {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
        pool.install(|| {
            tiles
                .par_iter()
                .try_for_each(|tile| subtract_one(raw_dir, out_dir, tile.as_ref(), params, engine))
        })?;
    }

    Ok(tiles.len())
}

fn subtract_one<E: ImageEngine>(
    raw_dir: &Path,
    out_dir: &Path,
    tile: &str,
    params: &BackgroundParams,
    engine: &E,
) -> Result<(), WorkflowError> {
    let source = raw_dir.join(tile);
    let dest = out_dir.join(tile);
    let failed = |source_err| WorkflowError::Engine {
        path: source.clone(),
        source: source_err,
    };

    let mut image = engine.open(&source).map_err(failed)?;
    engine.subtract_background(&mut image, params).map_err(failed)?;
    engine.save(image, &dest).map_err(failed)?;

    info!("   → {}", dest.display());
    Ok(())
}
