//! Bounded cache of open file handles.
//!
//! Opening a slide can mean opening several files (a main TIFF plus
//! associated label/macro images stored alongside it, or a companion index
//! for tiled vendor formats). Keeping every handle open for the lifetime of
//! the process risks exhausting the process's file descriptor limit when
//! many slides are open at once, so handles are kept in a small LRU keyed by
//! path and reopened on demand if evicted.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lru::LruCache;

use crate::error::IoError;
use crate::io::file::{PositionedReader, SlideFile};

/// Default number of file handles kept open at once.
pub const DEFAULT_CAPACITY: usize = 64;

/// A bounded, thread-safe cache of open [`SlideFile`] handles.
///
/// Cloning a `SlideFile` out of the cache is cheap (it's an `Arc` around the
/// OS handle), so callers hold their own clone for the duration of a read
/// rather than re-locking the cache per byte range.
pub struct HandleCache {
    entries: Mutex<LruCache<PathBuf, SlideFile>>,
}

impl HandleCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        HandleCache {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Get an open handle for `path`, opening it if not already cached.
    pub fn get(&self, path: impl AsRef<Path>) -> Result<SlideFile, IoError> {
        let path = path.as_ref();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(file) = entries.get(path) {
            return Ok(file.clone());
        }
        drop(entries);

        let file = SlideFile::open(path)?;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.put(path.to_path_buf(), file.clone());
        Ok(file)
    }

    /// Drop a cached handle for `path`, if any. Used when a slide is closed
    /// so its descriptor doesn't linger until evicted by unrelated opens.
    pub fn evict(&self, path: impl AsRef<Path>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.pop(path.as_ref());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HandleCache {
    fn default() -> Self {
        HandleCache::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, data: &[u8]) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    #[test]
    fn reuses_cached_handle() {
        let path = write_temp("wsi-handle-cache-reuse.bin", b"abc");
        let cache = HandleCache::new(4);
        let a = cache.get(&path).unwrap();
        let b = cache.get(&path).unwrap();
        assert_eq!(a.size(), b.size());
        assert_eq!(cache.len(), 1);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn evicts_least_recently_used() {
        let p1 = write_temp("wsi-handle-cache-lru-1.bin", b"a");
        let p2 = write_temp("wsi-handle-cache-lru-2.bin", b"bb");
        let p3 = write_temp("wsi-handle-cache-lru-3.bin", b"ccc");
        let cache = HandleCache::new(2);
        cache.get(&p1).unwrap();
        cache.get(&p2).unwrap();
        cache.get(&p3).unwrap();
        assert_eq!(cache.len(), 2);
        std::fs::remove_file(&p1).ok();
        std::fs::remove_file(&p2).ok();
        std::fs::remove_file(&p3).ok();
    }

    #[test]
    fn explicit_evict_drops_handle() {
        let path = write_temp("wsi-handle-cache-evict.bin", b"x");
        let cache = HandleCache::new(4);
        cache.get(&path).unwrap();
        assert_eq!(cache.len(), 1);
        cache.evict(&path);
        assert!(cache.is_empty());
        std::fs::remove_file(&path).ok();
    }
}
