/// Run summary
///
/// One entry per folder that held tiles, saying what happened to it. The
/// summary is printed at the end of a run and can be written as JSON.

use super::error::Stage;
use super::state::DirectoryState;
use crate::tiles::{TileGeometry, TileGrid};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What happened to one folder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Stitched {
        output: PathBuf,
        grid: TileGrid,
        /// Pixel size of the first tile, when tiles were inspected
        tile_size: Option<TileGeometry>,
        /// Tiles background-subtracted in this run
        subtracted: usize,
    },
    Skipped {
        reason: String,
    },
    Failed {
        stage: Stage,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryReport {
    pub path: PathBuf,
    pub state: DirectoryState,
    pub tiles: usize,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub directories: Vec<DirectoryReport>,
}

impl RunSummary {
    /// Start a summary for a walk over `root`
    pub fn begin(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            started_at: Utc::now(),
            finished_at: None,
            directories: Vec::new(),
        }
    }

    pub fn push(&mut self, report: DirectoryReport) {
        self.directories.push(report);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn stitched_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Stitched { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    /// Report for one folder, if it was seen
    pub fn get(&self, path: &Path) -> Option<&DirectoryReport> {
        self.directories.iter().find(|report| report.path == path)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.directories
            .iter()
            .filter(|report| pred(&report.outcome))
            .count()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the summary as pretty JSON
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        fs::write(path, json)
    }
}
