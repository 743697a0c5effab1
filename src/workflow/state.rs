/// Processing stage of a folder, read from its name
///
/// A tile folder moves through three layouts:
/// - `scan/*.tif` (unprocessed)
/// - `scan/raw/*.tif` (reorganized, not yet subtracted)
/// - `scan/bkg_subtracted/*.tif` (subtracted, ready to stitch)
///
/// The stage is never stored anywhere; the folder name is the record.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Folder holding the original tiles
pub const RAW_DIR: &str = "raw";
/// Folder holding the background-subtracted tiles
pub const BKG_DIR: &str = "bkg_subtracted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryState {
    Unprocessed,
    Raw,
    BackgroundSubtracted,
}

impl DirectoryState {
    /// Classify a folder by its last path component
    pub fn of(dir: &Path) -> Self {
        match dir.file_name().and_then(|name| name.to_str()) {
            Some(RAW_DIR) => DirectoryState::Raw,
            Some(BKG_DIR) => DirectoryState::BackgroundSubtracted,
            _ => DirectoryState::Unprocessed,
        }
    }
}

/// Folders belonging to one tile set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLayout {
    /// Folder that holds `raw`, `bkg_subtracted` and the mosaic
    pub parent: PathBuf,
    pub raw: PathBuf,
    pub bkg_subtracted: PathBuf,
}

impl StageLayout {
    /// Layout rooted at `parent`
    pub fn under(parent: &Path) -> Self {
        Self {
            parent: parent.to_path_buf(),
            raw: parent.join(RAW_DIR),
            bkg_subtracted: parent.join(BKG_DIR),
        }
    }

    /// Layout a folder in the given state belongs to
    pub fn for_directory(dir: &Path, state: DirectoryState) -> Self {
        match state {
            DirectoryState::Unprocessed => Self::under(dir),
            DirectoryState::Raw | DirectoryState::BackgroundSubtracted => {
                Self::under(dir.parent().unwrap_or(dir))
            }
        }
    }

    /// Where the mosaic goes
    pub fn output(&self, name: &str) -> PathBuf {
        self.parent.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_name() {
        assert_eq!(DirectoryState::of(Path::new("/scan/raw")), DirectoryState::Raw);
        assert_eq!(
            DirectoryState::of(Path::new("/scan/bkg_subtracted")),
            DirectoryState::BackgroundSubtracted
        );
        assert_eq!(DirectoryState::of(Path::new("/scan")), DirectoryState::Unprocessed);
    }

    #[test]
    fn test_state_needs_whole_component() {
        assert_eq!(DirectoryState::of(Path::new("/scan/draw")), DirectoryState::Unprocessed);
        assert_eq!(DirectoryState::of(Path::new("/scan/raw/more")), DirectoryState::Unprocessed);
    }

    #[test]
    fn test_layout_for_each_state() {
        let unprocessed = StageLayout::for_directory(Path::new("/scan"), DirectoryState::Unprocessed);
        let raw = StageLayout::for_directory(Path::new("/scan/raw"), DirectoryState::Raw);
        let bkg = StageLayout::for_directory(
            Path::new("/scan/bkg_subtracted"),
            DirectoryState::BackgroundSubtracted,
        );

        assert_eq!(unprocessed, raw);
        assert_eq!(raw, bkg);
        assert_eq!(bkg.raw, PathBuf::from("/scan/raw"));
        assert_eq!(bkg.output("stitched.tif"), PathBuf::from("/scan/stitched.tif"));
    }
}
