//! Byte-budget tile cache shared across every area a slide reads tiles from.

pub mod tile_cache;

pub use tile_cache::{OwnerToken, TileCache, TileHandle, DEFAULT_CAPACITY_BYTES};
