//! Quickhash: a deterministic SHA-256 digest derived from the bytes a vendor
//! probe designates as representative of slide identity, exported as
//! `openslide.quickhash-1`.
//!
//! Two byte-identical files must hash the same regardless of which vendor
//! recognised them, so the digest is seeded with a label describing the
//! selection before the selected bytes themselves are folded in. Metadata
//! outside the selected range (timestamps, scan IDs in other directories)
//! never perturbs the result.

use sha2::{Digest, Sha256};

use crate::error::SlideError;
use crate::io::PositionedReader;
use crate::model::QuickhashSource;

/// Compute the quickhash digest by reading `source`'s byte range from
/// `reader` and hashing it behind `source.label`.
pub fn compute<R: PositionedReader>(reader: &R, source: &QuickhashSource) -> Result<String, SlideError> {
    let mut hasher = Sha256::new();
    hasher.update(source.label.as_bytes());
    hasher.update(b"\0");
    let bytes = reader.read_exact_at(source.offset, source.len as usize)?;
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use crate::error::IoError;

    struct MemReader(Vec<u8>);

    impl PositionedReader for MemReader {
        fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
            let start = offset as usize;
            let end = start + len;
            if end > self.0.len() {
                return Err(IoError::RangeOutOfBounds {
                    offset,
                    requested: len as u64,
                    size: self.0.len() as u64,
                });
            }
            Ok(Bytes::copy_from_slice(&self.0[start..end]))
        }
        fn size(&self) -> u64 {
            self.0.len() as u64
        }
        fn identifier(&self) -> &str {
            "mem"
        }
    }

    #[test]
    fn same_bytes_same_label_same_hash() {
        let reader = MemReader(vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let source = QuickhashSource { label: "generic-tiff-level0-tile0", offset: 0, len: 4 };
        let a = compute(&reader, &source).unwrap();
        let b = compute(&reader, &source).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn different_label_changes_hash() {
        let reader = MemReader(vec![1, 2, 3, 4]);
        let a = compute(&reader, &QuickhashSource { label: "a", offset: 0, len: 4 }).unwrap();
        let b = compute(&reader, &QuickhashSource { label: "b", offset: 0, len: 4 }).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn out_of_range_errors() {
        let reader = MemReader(vec![1, 2]);
        let result = compute(&reader, &QuickhashSource { label: "x", offset: 0, len: 10 });
        assert!(result.is_err());
    }
}
