/// Tile discovery and filename handling
///
/// This module handles:
/// - Picking tile images out of a directory listing (classify.rs)
/// - Reading grid coordinates out of tile filenames (coords.rs)
/// - Pre-flight decoding of tile files before anything is moved (inspect.rs)

pub mod classify;
pub mod coords;
pub mod inspect;

pub use classify::{classify_tiles, list_tiles};
pub use coords::{parse_tile_coord, TileCoord, TileGrid, TileNameError};
pub use inspect::{inspect_tiles, TileGeometry};
