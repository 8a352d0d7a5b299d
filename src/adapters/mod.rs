//! Narrow typed accessors over non-TIFF container formats.
//!
//! These back no complete vendor decoder themselves -- only Leica SCN is
//! implemented end to end, and it sits on top of [`xml`]. `sqlite` and
//! `dicom` exist as thin, tested typed-getter wrappers so the core's shape
//! isn't biased toward TIFF alone, matching the roster in
//! `crate::format::detect`.

pub mod dicom;
pub mod sqlite;
pub mod xml;
