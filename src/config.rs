/// Pipeline configuration
///
/// Every tuning constant of the stitching workflow lives here. The
/// defaults are the values the lab has always run with (rolling ball 50,
/// light background, 20% overlap, thresholds 0.30 / 2.50 / 3.50), so an
/// empty or partial JSON file behaves exactly like no file at all.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Rolling-ball background subtraction settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BackgroundParams {
    /// Rolling ball radius in pixels
    pub rolling_ball_radius: f64,
    /// Background is brighter than the objects (brightfield)
    pub light_background: bool,
}

impl Default for BackgroundParams {
    fn default() -> Self {
        Self {
            rolling_ball_radius: 50.0,
            light_background: true,
        }
    }
}

/// How overlapping tiles are blended into the mosaic
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    LinearBlending,
    Average,
    Median,
    MaxIntensity,
    MinIntensity,
    RandomTile,
}

/// Memory / speed trade-off of the stitcher
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComputationMode {
    SaveMemory,
    SaveTime,
}

/// Grid/collection stitching settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StitchParams {
    /// Filename template with `{yy}` (row) and `{xx}` (column) placeholders
    pub file_pattern: String,
    /// Estimated overlap between neighbouring tiles, in percent
    pub tile_overlap_percent: u32,
    pub first_index_x: u32,
    pub first_index_y: u32,
    pub fusion: FusionMethod,
    pub regression_threshold: f64,
    pub max_avg_displacement_threshold: f64,
    pub absolute_displacement_threshold: f64,
    /// Refine tile positions by cross-correlating the overlaps
    pub compute_overlap: bool,
    pub computation: ComputationMode,
    /// Tile layout file the stitcher writes next to the tiles
    pub output_textfile_name: String,
}

impl Default for StitchParams {
    fn default() -> Self {
        Self {
            file_pattern: "Image_R{yy}C{xx}_CH4.tif".to_string(),
            tile_overlap_percent: 20,
            first_index_x: 0,
            first_index_y: 0,
            fusion: FusionMethod::LinearBlending,
            regression_threshold: 0.30,
            max_avg_displacement_threshold: 2.50,
            absolute_displacement_threshold: 3.50,
            compute_overlap: true,
            computation: ComputationMode::SaveMemory,
            output_textfile_name: "TileConfiguration.txt".to_string(),
        }
    }
}

/// Everything the tree walk needs besides the root and the engine
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// A folder needs at least this many tiles to be processed
    pub min_batch_size: usize,
    /// Worker threads for background subtraction (1 = sequential)
    pub jobs: usize,
    /// Decode every tile before touching the folder
    pub verify_tiles: bool,
    /// Name of the mosaic written next to `raw` / `bkg_subtracted`
    pub output_name: String,
    pub background: BackgroundParams,
    pub stitching: StitchParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_batch_size: 2,
            jobs: 1,
            verify_tiles: true,
            output_name: "stitched.tif".to_string(),
            background: BackgroundParams::default(),
            stitching: StitchParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Convert to a pretty JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from a JSON string; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_json(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the workflow cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_batch_size == 0 {
            return Err(ConfigError::Invalid("min_batch_size must be at least 1".into()));
        }
        if self.jobs == 0 {
            return Err(ConfigError::Invalid("jobs must be at least 1".into()));
        }
        if self.output_name.trim().is_empty() {
            return Err(ConfigError::Invalid("output_name is empty".into()));
        }
        if !(self.background.rolling_ball_radius > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "rolling_ball_radius must be positive, got {}",
                self.background.rolling_ball_radius
            )));
        }
        if self.stitching.tile_overlap_percent > 100 {
            return Err(ConfigError::Invalid(format!(
                "tile_overlap_percent must be within 0..=100, got {}",
                self.stitching.tile_overlap_percent
            )));
        }
        if self.stitching.file_pattern.trim().is_empty() {
            return Err(ConfigError::Invalid("stitching.file_pattern is empty".into()));
        }
        Ok(())
    }
}
