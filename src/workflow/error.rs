/// Workflow errors

use crate::engine::EngineError;
use crate::tiles::inspect::UnreadableTile;
use crate::tiles::TileNameError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Anything that can go wrong while processing one folder
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("{path} already exists, refusing to reorganize again")]
    DirectoryExists { path: PathBuf },

    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    TileName(#[from] TileNameError),

    #[error(transparent)]
    UnreadableTile(#[from] UnreadableTile),

    #[error("{path}: {source}")]
    Engine {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl WorkflowError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorkflowError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Step of the per-folder workflow an error happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Scan,
    Validate,
    Inspect,
    Reorganize,
    Subtract,
    Stitch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Scan => "scan",
            Stage::Validate => "filename validation",
            Stage::Inspect => "tile inspection",
            Stage::Reorganize => "reorganize",
            Stage::Subtract => "background subtraction",
            Stage::Stitch => "stitching",
        };
        f.write_str(name)
    }
}

/// A workflow error tagged with the stage it came from
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: WorkflowError,
}

/// Tag a fallible step with its stage
pub(crate) trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageFailure>;
}

impl<T, E: Into<WorkflowError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: Stage) -> Result<T, StageFailure> {
        self.map_err(|error| StageFailure {
            stage,
            error: error.into(),
        })
    }
}
