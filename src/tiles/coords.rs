/// Grid coordinates encoded in tile filenames
///
/// Tiles are named like `Image_R{yy}C{xx}_CH4.tif`. The first run of
/// digits is the row, the second run is the column; anything after that
/// (the channel number, for instance) is ignored.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors raised while reading coordinates out of tile names
#[derive(Debug, Error)]
pub enum TileNameError {
    #[error("tile name `{file}` is malformed: {reason}")]
    Malformed { file: String, reason: String },

    #[error("no tiles to lay out")]
    Empty,
}

/// Zero-based position of one tile in the mosaic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub row: u32,
    pub col: u32,
}

/// Mosaic size in tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileGrid {
    /// Number of columns (max column index + 1)
    pub width: u32,
    /// Number of rows (max row index + 1)
    pub height: u32,
}

fn digit_runs() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"\d+").expect("digit pattern is valid"))
}

/// Parse the row and column out of a tile filename
pub fn parse_tile_coord(name: &str) -> Result<TileCoord, TileNameError> {
    let runs: Vec<&str> = digit_runs()
        .find_iter(name)
        .map(|m| m.as_str())
        .take(2)
        .collect();

    if runs.len() < 2 {
        return Err(TileNameError::Malformed {
            file: name.to_string(),
            reason: format!(
                "expected a row and a column number, found {} digit group(s)",
                runs.len()
            ),
        });
    }

    let parse = |run: &str, axis: &str| {
        run.parse::<u32>().map_err(|_| TileNameError::Malformed {
            file: name.to_string(),
            reason: format!("{} index `{}` is out of range", axis, run),
        })
    };

    Ok(TileCoord {
        row: parse(runs[0], "row")?,
        col: parse(runs[1], "column")?,
    })
}

impl TileGrid {
    /// Smallest grid holding every coordinate.
    ///
    /// Gaps in the index sequence are not detected; they just become
    /// blank cells in a larger grid.
    pub fn from_coords<I>(coords: I) -> Result<Self, TileNameError>
    where
        I: IntoIterator<Item = TileCoord>,
    {
        let mut max: Option<(u32, u32)> = None;

        for coord in coords {
            max = Some(match max {
                None => (coord.row, coord.col),
                Some((row, col)) => (row.max(coord.row), col.max(coord.col)),
            });
        }

        let (max_row, max_col) = max.ok_or(TileNameError::Empty)?;

        Ok(Self {
            width: max_col.saturating_add(1),
            height: max_row.saturating_add(1),
        })
    }

    /// Parse every name and compute the grid, failing on the first bad name
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, TileNameError> {
        let coords = names
            .iter()
            .map(|name| parse_tile_coord(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_coords(coords)
    }

    /// Number of cells in the grid
    pub fn cell_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl std::fmt::Display for TileGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
