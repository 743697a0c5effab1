/// Directory-tree driver
///
/// The tree is snapshotted before anything is moved, every folder's stage
/// is worked out from its name, and each folder is then handled exactly
/// once as its own unit of work:
/// - unprocessed: reorganize, subtract, stitch
/// - `raw`: subtract into the sibling `bkg_subtracted`, stitch
/// - `bkg_subtracted`: stitch
///
/// A failing folder is logged and recorded; the walk carries on.

use super::background::subtract_backgrounds;
use super::error::{AtStage, Stage, StageFailure, WorkflowError};
use super::reorganize::reorganize;
use super::report::{DirectoryReport, Outcome, RunSummary};
use super::state::{DirectoryState, StageLayout};
use super::stitch::{stitch_directory, StitchOutcome};
use crate::config::PipelineConfig;
use crate::engine::ImageEngine;
use crate::tiles::{inspect_tiles, list_tiles, TileGeometry, TileGrid};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One folder of the snapshot, classified but not yet touched
struct WorkItem {
    dir: PathBuf,
    state: DirectoryState,
    tiles: io::Result<Vec<String>>,
}

/// Result of a folder that made it all the way through
struct Processed {
    stitched: StitchOutcome,
    tile_size: Option<TileGeometry>,
    subtracted: usize,
}

/// Walk `root` and process every tile folder under it.
///
/// Only a bad root is fatal. Per-folder failures end up in the summary.
pub fn run<E>(root: &Path, config: &PipelineConfig, engine: &E) -> Result<RunSummary, WorkflowError>
where
    E: ImageEngine + Sync,
{
    if !root.is_dir() {
        return Err(WorkflowError::NotADirectory(root.to_path_buf()));
    }
    let root = fs::canonicalize(root).map_err(|e| WorkflowError::io("resolve", root, e))?;

    info!("🔍 Scanning directory {} and subdirectories", root.display());

    let items = plan(&root);
    let claimed = claimed_directories(&items, config.min_batch_size);
    let mut summary = RunSummary::begin(&root);
    let mut held_back: Vec<(WorkItem, &Path)> = Vec::new();
    let mut failed_owners: HashMap<PathBuf, Stage> = HashMap::new();

    for item in items {
        if let Some(owner) = claimed.get(&item.dir) {
            debug!("Holding back {}, handled with {}", item.dir.display(), owner.display());
            held_back.push((item, owner.as_path()));
            continue;
        }

        let tiles = match item.tiles {
            Ok(tiles) => tiles,
            Err(e) => {
                error!("❌ Cannot list {}: {}", item.dir.display(), e);
                summary.push(DirectoryReport {
                    path: item.dir.clone(),
                    state: item.state,
                    tiles: 0,
                    outcome: Outcome::Failed {
                        stage: Stage::Scan,
                        error: WorkflowError::io("list", &item.dir, e).to_string(),
                    },
                });
                continue;
            }
        };

        if tiles.len() < config.min_batch_size {
            if !tiles.is_empty() {
                info!(
                    "⏭️  Skipping {}: {} tile(s), need at least {}",
                    item.dir.display(),
                    tiles.len(),
                    config.min_batch_size
                );
                summary.push(DirectoryReport {
                    path: item.dir.clone(),
                    state: item.state,
                    tiles: tiles.len(),
                    outcome: Outcome::Skipped {
                        reason: format!(
                            "{} tile(s), need at least {}",
                            tiles.len(),
                            config.min_batch_size
                        ),
                    },
                });
            }
            continue;
        }

        info!(
            "📂 Processing {} ({} tiles, {:?})",
            item.dir.display(),
            tiles.len(),
            item.state
        );

        let outcome = match process_directory(&item.dir, item.state, &tiles, config, engine) {
            Ok(done) => Outcome::Stitched {
                output: done.stitched.output,
                grid: done.stitched.grid,
                tile_size: done.tile_size,
                subtracted: done.subtracted,
            },
            Err(failure) => {
                error!("❌ {}: {}", item.dir.display(), failure);
                failed_owners.insert(item.dir.clone(), failure.stage);
                Outcome::Failed {
                    stage: failure.stage,
                    error: failure.error.to_string(),
                }
            }
        };

        summary.push(DirectoryReport {
            path: item.dir,
            state: item.state,
            tiles: tiles.len(),
            outcome,
        });
    }

    // A claimed folder is silent when its owner handled it. When the owner
    // failed first, its tiles were left alone and that has to show up.
    for (item, owner) in held_back {
        let (Some(stage), Ok(tiles)) = (failed_owners.get(owner), &item.tiles) else {
            continue;
        };
        if tiles.is_empty() {
            continue;
        }

        warn!(
            "⏭️  Not stitching {}: {} failed at {}",
            item.dir.display(),
            owner.display(),
            stage
        );
        summary.push(DirectoryReport {
            tiles: tiles.len(),
            path: item.dir,
            state: item.state,
            outcome: Outcome::Skipped {
                reason: format!("{} failed at {}", owner.display(), stage),
            },
        });
    }

    summary.finish();
    info!(
        "🏁 Automated stitching is done: {} stitched, {} skipped, {} failed",
        summary.stitched_count(),
        summary.skipped_count(),
        summary.failed_count()
    );

    Ok(summary)
}

/// Snapshot and classify every folder under `root`, parents first
fn plan(root: &Path) -> Vec<WorkItem> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("⚠️  Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| {
            let dir = entry.into_path();
            WorkItem {
                state: DirectoryState::of(&dir),
                tiles: list_tiles(&dir),
                dir,
            }
        })
        .collect()
}

/// Folders that belong to another folder's unit of work, mapped to their owner.
///
/// A tile folder owns its `raw` and `bkg_subtracted` children, and a
/// `raw` folder owns its sibling `bkg_subtracted`, so nothing is
/// subtracted or stitched twice in one run.
fn claimed_directories(items: &[WorkItem], min_batch: usize) -> HashMap<PathBuf, PathBuf> {
    let mut claimed = HashMap::new();

    for item in items {
        let has_batch = matches!(&item.tiles, Ok(tiles) if tiles.len() >= min_batch);
        if !has_batch || claimed.contains_key(&item.dir) {
            continue;
        }

        let layout = StageLayout::for_directory(&item.dir, item.state);
        match item.state {
            DirectoryState::Unprocessed => {
                claimed.insert(layout.raw, item.dir.clone());
                claimed.insert(layout.bkg_subtracted, item.dir.clone());
            }
            DirectoryState::Raw => {
                claimed.insert(layout.bkg_subtracted, item.dir.clone());
            }
            DirectoryState::BackgroundSubtracted => {}
        }
    }

    claimed
}

/// Take one folder from its current stage to a written mosaic
fn process_directory<E>(
    dir: &Path,
    state: DirectoryState,
    tiles: &[String],
    config: &PipelineConfig,
    engine: &E,
) -> Result<Processed, StageFailure>
where
    E: ImageEngine + Sync,
{
    // Names are checked before anything is moved
    let grid = TileGrid::from_names(tiles).at(Stage::Validate)?;

    let tile_size = if config.verify_tiles {
        inspect_tiles(dir, tiles).at(Stage::Inspect)?
    } else {
        None
    };

    let layout = StageLayout::for_directory(dir, state);

    let subtracted = match state {
        DirectoryState::Unprocessed => {
            reorganize(dir, tiles, config.min_batch_size).at(Stage::Reorganize)?;
            subtract_backgrounds(
                &layout.raw,
                &layout.bkg_subtracted,
                tiles,
                &config.background,
                engine,
                config.jobs,
            )
            .at(Stage::Subtract)?
        }
        DirectoryState::Raw => {
            fs::create_dir_all(&layout.bkg_subtracted)
                .map_err(|e| WorkflowError::io("create", &layout.bkg_subtracted, e))
                .at(Stage::Subtract)?;
            subtract_backgrounds(
                dir,
                &layout.bkg_subtracted,
                tiles,
                &config.background,
                engine,
                config.jobs,
            )
            .at(Stage::Subtract)?
        }
        DirectoryState::BackgroundSubtracted => 0,
    };

    let stitched = stitch_directory(
        &layout.bkg_subtracted,
        tiles,
        grid,
        &layout.output(&config.output_name),
        &config.stitching,
        engine,
    )
    .at(Stage::Stitch)?;

    Ok(Processed {
        stitched,
        tile_size,
        subtracted,
    })
}
