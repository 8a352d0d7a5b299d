//! Byte reader: opens slide files and exposes positioned reads.
//!
//! TIFF and its vendor derivatives are random-access formats — directories,
//! tile offsets, and tile data scatter across the file in no particular
//! order. Every read site therefore reads by absolute offset rather than by
//! maintaining a shared cursor, which is what [`PositionedReader`] expresses.

use std::fs::{File as StdFile, OpenOptions};
use std::os::unix::fs::{FileExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

use crate::error::IoError;

/// Adds `O_CLOEXEC` on open so a forked child (e.g. a codec library that
/// shells out) never inherits slide file descriptors.
const O_CLOEXEC: i32 = libc_cloexec();

#[inline]
const fn libc_cloexec() -> i32 {
    // Matches the value of O_CLOEXEC on Linux and the BSDs; avoids pulling in
    // a libc dependency just for one constant.
    0o2000000
}

/// Something that can be read by absolute offset. Implementations must be
/// thread-safe: the tile cache and grid painter call `read_exact_at`
/// concurrently from multiple rendering threads.
pub trait PositionedReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`.
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Total size of the underlying resource in bytes.
    fn size(&self) -> u64;

    /// A stable identifier for logging and cache-key scoping.
    fn identifier(&self) -> &str;
}

/// A slide file opened for random-access reads.
///
/// `SlideFile` is cheap to clone (an `Arc` around the underlying handle) and
/// is the type callers open once per slide; the [`HandleCache`](super::HandleCache)
/// hands out `Arc<SlideFile>` clones to concurrent readers rather than
/// opening the path again.
#[derive(Clone)]
pub struct SlideFile {
    inner: Arc<StdFile>,
    size: u64,
    path: PathBuf,
}

impl SlideFile {
    /// Open `path` for positioned reads, close-on-exec.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(O_CLOEXEC)
            .open(&path)
            .map_err(|e| IoError::Open {
                path: path.clone(),
                detail: e.to_string(),
                errno: e.raw_os_error(),
            })?;

        let size = file
            .metadata()
            .map_err(|e| IoError::Read {
                path: path.clone(),
                detail: e.to_string(),
                errno: e.raw_os_error(),
            })?
            .len();

        Ok(SlideFile {
            inner: Arc::new(file),
            size,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PositionedReader for SlideFile {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        if offset.saturating_add(len as u64) > self.size {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.size,
            });
        }
        if len == 0 {
            return Ok(Bytes::new());
        }

        let mut buf = vec![0u8; len];
        self.inner
            .read_exact_at(&mut buf, offset)
            .map_err(|e| IoError::Read {
                path: self.path.clone(),
                detail: e.to_string(),
                errno: e.raw_os_error(),
            })?;
        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        self.path.to_str().unwrap_or("<non-utf8 path>")
    }
}
