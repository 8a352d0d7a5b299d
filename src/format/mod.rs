//! Format parsers for Whole Slide Image files.
//!
//! `tiff` holds the shared TIFF/BigTIFF container parser; `svs`, `leica` and
//! `generic_tiff` build vendor-specific pyramids on top of it. `detect` probes
//! an opened file and picks which of those to hand it to. `jpeg` is a small
//! shared helper for the Aperio abbreviated-stream JPEGTables quirk.

pub mod detect;
pub mod generic_tiff;
pub mod jpeg;
pub mod leica;
pub mod svs;
pub mod tiff;
