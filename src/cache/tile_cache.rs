//! Tile cache: a single logical mapping `(owner_token, col, row) -> bytes`,
//! shared across every area a slide reads tiles from.
//!
//! `owner_token` is an opaque pointer-sized identity of the area producing
//! the tile, scoping entries to a specific pyramid directory. Entries with a
//! live [`TileHandle`] are pinned -- eviction skips them but leaves them
//! linked in the LRU chain, so a later pass picks them up once every handle
//! referencing them has dropped.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use lru::LruCache;

/// Default cache capacity: 32 MiB of tile bytes.
pub const DEFAULT_CAPACITY_BYTES: usize = 32 * 1024 * 1024;

/// Opaque identity of the area producing a tile. Vendors hand out one
/// distinct token per `Area`; the cache never interprets the value.
pub type OwnerToken = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    owner: OwnerToken,
    col: u32,
    row: u32,
}

struct Entry {
    bytes: Bytes,
    size: usize,
    refcount: usize,
}

struct Inner {
    map: LruCache<CacheKey, Entry>,
    used_bytes: usize,
}

/// A byte-budget LRU cache protected by a single mutex; hash and list
/// operations are O(1) per the `lru` crate's intrusive linked-list
/// implementation.
pub struct TileCache {
    inner: Mutex<Inner>,
    capacity_bytes: usize,
}

impl TileCache {
    pub fn new(capacity_bytes: usize) -> Arc<Self> {
        Arc::new(TileCache {
            inner: Mutex::new(Inner {
                map: LruCache::unbounded(),
                used_bytes: 0,
            }),
            capacity_bytes,
        })
    }

    pub fn with_default_capacity() -> Arc<Self> {
        Self::new(DEFAULT_CAPACITY_BYTES)
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    pub fn used_bytes(&self) -> usize {
        self.inner.lock().unwrap().used_bytes
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a tile, pinning it on hit. The returned handle's drop
    /// decrements the refcount again.
    pub fn get(self: &Arc<Self>, owner: OwnerToken, col: u32, row: u32) -> Option<(Bytes, TileHandle)> {
        let key = CacheKey { owner, col, row };
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.map.get_mut(&key)?;
        entry.refcount += 1;
        let bytes = entry.bytes.clone();
        drop(inner);
        Some((bytes, TileHandle { cache: Arc::clone(self), key }))
    }

    /// Insert or replace a tile, pinning the new entry and evicting
    /// least-recently-used unpinned entries until the budget holds.
    pub fn put(self: &Arc<Self>, owner: OwnerToken, col: u32, row: u32, bytes: Bytes) -> TileHandle {
        let key = CacheKey { owner, col, row };
        let size = bytes.len();
        let mut inner = self.inner.lock().unwrap();

        if let Some(old) = inner.map.pop(&key) {
            inner.used_bytes = inner.used_bytes.saturating_sub(old.size);
        }
        inner.map.put(key, Entry { bytes, size, refcount: 1 });
        inner.used_bytes += size;

        evict(&mut inner, self.capacity_bytes);
        drop(inner);
        TileHandle { cache: Arc::clone(self), key }
    }

    fn release(&self, key: &CacheKey) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entry) = inner.map.peek_mut(key) {
            entry.refcount = entry.refcount.saturating_sub(1);
        }
        evict(&mut inner, self.capacity_bytes);
    }
}

/// Unlink and free least-recently-used entries with `refcount == 0` until
/// `used_bytes` is within `capacity`. Pinned entries are skipped and remain
/// linked; if every entry is pinned, the budget is exceeded until one frees.
fn evict(inner: &mut Inner, capacity: usize) {
    if inner.used_bytes <= capacity {
        return;
    }
    let victims: Vec<CacheKey> = inner
        .map
        .iter()
        .rev()
        .filter(|(_, entry)| entry.refcount == 0)
        .map(|(key, _)| *key)
        .collect();

    for key in victims {
        if inner.used_bytes <= capacity {
            break;
        }
        if let Some(entry) = inner.map.pop(&key) {
            inner.used_bytes = inner.used_bytes.saturating_sub(entry.size);
        }
    }
}

/// A pinned reference to a cached tile. While any handle for a key is alive
/// the entry cannot be evicted; dropping the last handle releases the pin.
pub struct TileHandle {
    cache: Arc<TileCache>,
    key: CacheKey,
}

impl Drop for TileHandle {
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_put_then_hit() {
        let cache = TileCache::new(1024);
        assert!(cache.get(1, 0, 0).is_none());
        let _handle = cache.put(1, 0, 0, Bytes::from_static(b"tile"));
        let (bytes, _handle2) = cache.get(1, 0, 0).expect("hit after put");
        assert_eq!(&bytes[..], b"tile");
    }

    #[test]
    fn owner_token_scopes_entries() {
        let cache = TileCache::new(1024);
        cache.put(1, 0, 0, Bytes::from_static(b"a"));
        cache.put(2, 0, 0, Bytes::from_static(b"b"));
        assert_eq!(cache.get(1, 0, 0).unwrap().0, Bytes::from_static(b"a"));
        assert_eq!(cache.get(2, 0, 0).unwrap().0, Bytes::from_static(b"b"));
    }

    #[test]
    fn eviction_respects_budget() {
        let cache = TileCache::new(10);
        cache.put(1, 0, 0, Bytes::from(vec![0u8; 6]));
        cache.put(1, 0, 1, Bytes::from(vec![0u8; 6]));
        // second insert would exceed capacity, first (now LRU, unpinned since
        // its handle already dropped) gets evicted to make room.
        assert!(cache.get(1, 0, 0).is_none());
        assert!(cache.get(1, 0, 1).is_some());
    }

    #[test]
    fn pinned_entry_survives_eviction_pressure() {
        let cache = TileCache::new(10);
        let (_bytes, handle) = {
            cache.put(1, 0, 0, Bytes::from(vec![0u8; 6]));
            cache.get(1, 0, 0).unwrap()
        };
        // inserting another 6-byte tile would normally evict (0,0), but it's
        // pinned by `handle` so (0,1) can't be admitted within budget -- the
        // budget is exceeded instead of destroying a pinned entry.
        cache.put(1, 0, 1, Bytes::from(vec![0u8; 6]));
        assert!(cache.get(1, 0, 0).is_some());
        drop(handle);
    }

    #[test]
    fn release_on_drop_makes_entry_evictable_again() {
        let cache = TileCache::new(10);
        let put_handle = cache.put(1, 0, 0, Bytes::from(vec![0u8; 6]));
        drop(put_handle);
        cache.put(1, 0, 1, Bytes::from(vec![0u8; 6]));
        // (0,0)'s only handle was dropped before the second put, so it was a
        // valid eviction candidate and made room for (0,1).
        assert!(cache.get(1, 0, 0).is_none());
        assert!(cache.get(1, 0, 1).is_some());
    }
}
