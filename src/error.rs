//! Error taxonomy for slide opening and rendering.
//!
//! Every fallible operation in this crate returns a [`SlideError`]. The four
//! variants mirror the four ways a slide can fail: the bytes don't belong to
//! any known format, the bytes belong to a known format but violate its
//! structural rules, a platform I/O call failed, or some other precondition
//! wasn't met. Deeper errors (TIFF parsing, I/O) are not hidden behind an
//! opaque wrapper: they are folded into a `Failed` chain via [`Context`] so
//! the final message reads like a breadcrumb trail back to the root cause.

use std::path::PathBuf;

use thiserror::Error;

/// Low-level I/O failure, always carrying the path and (when available) the
/// OS error number, so messages are actionable without re-opening the file.
#[derive(Debug, Clone, Error)]
pub enum IoError {
    #[error("couldn't open file {path}: {detail}")]
    Open {
        path: PathBuf,
        detail: String,
        errno: Option<i32>,
    },

    #[error("couldn't seek file {path}: {detail}")]
    Seek {
        path: PathBuf,
        detail: String,
        errno: Option<i32>,
    },

    #[error("couldn't read file {path}: {detail}")]
    Read {
        path: PathBuf,
        detail: String,
        errno: Option<i32>,
    },

    #[error("short read on {path}: expected {expected} bytes, got {got}")]
    ShortRead {
        path: PathBuf,
        expected: usize,
        got: usize,
    },

    #[error("range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },
}

impl IoError {
    /// Build an [`IoError::Open`]/[`IoError::Seek`]/[`IoError::Read`] from a
    /// `std::io::Error`, carrying its raw OS error number along for
    /// diagnostics.
    pub fn from_io(path: PathBuf, err: &std::io::Error, ctor: fn(PathBuf, String, Option<i32>) -> Self) -> Self {
        ctor(path, err.to_string(), err.raw_os_error())
    }

    /// The raw OS error number behind this failure, if any.
    pub fn os_errno(&self) -> Option<i32> {
        match self {
            IoError::Open { errno, .. } | IoError::Seek { errno, .. } | IoError::Read { errno, .. } => *errno,
            IoError::ShortRead { .. } | IoError::RangeOutOfBounds { .. } => None,
        }
    }
}

/// Errors that can occur while parsing a TIFF or BigTIFF container. Kept as
/// its own enum (rather than folded directly into [`SlideError`]) because it
/// is produced deep inside the TIFF adapter, far from any caller-facing
/// context string; callers see it only after [`Context::context`] has
/// prefixed it into a [`SlideError::BadData`].
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error("invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    #[error("invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    #[error("invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    #[error("file too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    #[error("invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    #[error("missing required tag: {0}")]
    MissingTag(&'static str),

    #[error("invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    #[error("unsupported compression: {0}")]
    UnsupportedCompression(String),

    #[error("file uses strips instead of tiles")]
    StripOrganization,

    #[error("unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Errors raised while decoding a tile's pixel bytes (JPEG/JPEG-2000 codec
/// adapters).
#[derive(Debug, Clone, Error)]
pub enum TileError {
    #[error("couldn't decode tile: {message}")]
    DecodeError { message: String },

    #[error("couldn't encode tile: {message}")]
    EncodeError { message: String },
}

/// The public error type returned by every fallible operation on a [`Slide`](crate::slide::Slide).
///
/// This is the Rust expression of the four-way taxonomy: a format the probe
/// chain didn't recognize, structurally bad data in a recognized format, an
/// I/O failure, or a catch-all logic failure. `BadData` and `Failed` both
/// carry a `context` chain built by [`Context::context`] so that wrapping
/// one error inside another produces a breadcrumb string instead of an
/// opaque wrapper.
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    /// The input doesn't match any known vendor format.
    #[error("{0}")]
    FormatNotSupported(String),

    /// Structurally invalid data in an otherwise recognized format.
    #[error("{context}: {detail}")]
    BadData { context: String, detail: String },

    /// A platform I/O call failed.
    #[error(transparent)]
    Io(#[from] IoError),

    /// Catch-all: unmet precondition, short read, internal invariant.
    #[error("{0}")]
    Failed(String),
}

impl From<TiffError> for SlideError {
    fn from(err: TiffError) -> Self {
        match err {
            TiffError::Io(io) => SlideError::Io(io),
            other => SlideError::BadData {
                context: "TIFF structure error".to_string(),
                detail: other.to_string(),
            },
        }
    }
}

impl From<TileError> for SlideError {
    fn from(err: TileError) -> Self {
        SlideError::Failed(err.to_string())
    }
}

/// Extension trait that prepends a context string to an error, mirroring the
/// "error out-parameter" idiom's context-prefixing without needing
/// out-parameters: `reader.read(...).context("Couldn't get size")?`.
///
/// Applying `.context(...)` to a `BadData` or `Failed` error nests the
/// existing message behind a new leading context, producing a chain like
/// `"Couldn't get size: Couldn't seek file /x: Invalid argument"`.
pub trait Context<T> {
    fn context(self, ctx: &str) -> Result<T, SlideError>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: Into<SlideError>,
{
    fn context(self, ctx: &str) -> Result<T, SlideError> {
        self.map_err(|e| {
            let err = e.into();
            SlideError::BadData {
                context: ctx.to_string(),
                detail: err.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_data_formats_as_chain() {
        let err = SlideError::BadData {
            context: "Couldn't get size".to_string(),
            detail: "Couldn't seek file /x: Invalid argument".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Couldn't get size: Couldn't seek file /x: Invalid argument"
        );
    }

    #[test]
    fn context_prefixes_existing_message() {
        let io_err: Result<(), IoError> = Err(IoError::Seek {
            path: PathBuf::from("/x"),
            detail: "Invalid argument".to_string(),
            errno: Some(22),
        });
        let result: Result<(), SlideError> = io_err.context("Couldn't get size");
        let msg = result.unwrap_err().to_string();
        assert!(msg.starts_with("Couldn't get size: "));
        assert!(msg.contains("Invalid argument"));
    }

    #[test]
    fn tiff_error_converts_to_bad_data() {
        let tiff_err = TiffError::StripOrganization;
        let slide_err: SlideError = tiff_err.into();
        assert!(matches!(slide_err, SlideError::BadData { .. }));
    }

    #[test]
    fn io_tiff_error_converts_to_io() {
        let tiff_err = TiffError::Io(IoError::RangeOutOfBounds {
            offset: 0,
            requested: 10,
            size: 5,
        });
        let slide_err: SlideError = tiff_err.into();
        assert!(matches!(slide_err, SlideError::Io(_)));
    }
}
