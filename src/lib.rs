//! # wsi-inspect
//!
//! A library for reading whole slide image (WSI) pyramids directly from
//! disk and rendering arbitrary rectangles of them to ARGB32 surfaces.
//!
//! Scanner vendors each wrap a pyramid of tiled, compressed images in their
//! own TIFF dialect (or, for a handful of legacy formats, their own
//! container entirely). This crate hides that behind one reader: detect the
//! vendor, read its property map and associated images, and paint any
//! region of any pyramid level through a shared, byte-budgeted tile cache.
//!
//! ## Architecture
//!
//! - [`io`] - positioned file reads and an LRU of open file handles
//! - [`format`] - vendor detection and the Leica/Aperio/generic-TIFF parsers
//! - [`adapters`] - narrow typed accessors over non-TIFF vendor containers
//! - [`codec`] - tile payload decoding (JPEG, JPEG 2000, uncompressed) to ARGB32
//! - [`cache`] - the shared, byte-budgeted decoded-tile cache
//! - [`grid`] - pure tile-rectangle geometry and region compositing
//! - [`slide`] - the public [`slide::Slide`] façade tying all of the above together
//! - [`model`] - shared geometric and metadata types
//! - [`properties`] - the slide property map and well-known property names
//! - [`quickhash`] - the content-derived slide identity hash
//! - [`config`] - the `wsi-inspect` CLI's argument types
//!
//! ## Example
//!
//! ```rust,no_run
//! use wsi_inspect::slide::Slide;
//! use wsi_inspect::grid::RegionBuffer;
//!
//! let slide = Slide::open("sample.svs").expect("couldn't open slide");
//! let mut buffer = RegionBuffer::transparent(512, 512);
//! slide.paint_region(&mut buffer, 0, 0, 0, 512, 512).expect("couldn't paint region");
//! ```

pub mod adapters;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod grid;
pub mod io;
pub mod model;
pub mod properties;
pub mod quickhash;
pub mod slide;

pub use cache::{OwnerToken, TileCache, TileHandle, DEFAULT_CAPACITY_BYTES};
pub use config::{Cli, Command, ProbeArgs, RegionArgs};
pub use error::{IoError, SlideError, TiffError, TileError};
pub use format::detect::{detect_and_open, OpenedSlide, VendorState};
pub use format::tiff::{Compression, PyramidLevel, TiffPyramid, TileData};
pub use grid::{paint_region, RegionBuffer, RegionGrid};
pub use io::{HandleCache, PositionedReader, SlideFile};
pub use model::{Area, ArgbTile, AssociatedImage, Level, QuickhashSource};
pub use properties::PropertyMap;
pub use slide::Slide;
