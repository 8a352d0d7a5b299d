//! Typed accessor over DICOM-tagged byte streams (DICOM-backed slide
//! containers carry their pyramid alongside a tag dataset).
//!
//! Backs no complete vendor decoder -- only its shape constrains the core.
//! Rather than pull in a full DICOM toolkit, this reads flat Explicit VR
//! Little Endian element streams (the common transfer syntax) into a
//! `(group, element) -> raw bytes` map and exposes typed getters over it.
//! Sequence (`SQ`) elements are not expanded; their raw bytes are stored
//! as-is since no current caller needs to look inside one.

use std::collections::HashMap;

use crate::error::SlideError;

const PART10_PREAMBLE_LEN: usize = 128;
const PART10_MAGIC: &[u8] = b"DICM";

/// A DICOM element tag: `(group, element)`.
pub type Tag = (u16, u16);

/// A flat map from tag to raw element value bytes, parsed from an Explicit
/// VR Little Endian byte stream.
pub struct DicomDataset {
    values: HashMap<Tag, Vec<u8>>,
}

impl DicomDataset {
    /// Parse `bytes` as a DICOM element stream, skipping the Part 10
    /// preamble and `DICM` magic if present.
    pub fn parse(bytes: &[u8]) -> Result<Self, SlideError> {
        let body = strip_preamble(bytes);
        let mut values = HashMap::new();
        let mut cursor = 0usize;

        while cursor + 8 <= body.len() {
            let group = u16::from_le_bytes([body[cursor], body[cursor + 1]]);
            let element = u16::from_le_bytes([body[cursor + 2], body[cursor + 3]]);
            let vr = &body[cursor + 4..cursor + 6];
            let (header_len, value_len) = if uses_long_length(vr) {
                if cursor + 12 > body.len() {
                    break;
                }
                let len = u32::from_le_bytes([
                    body[cursor + 8],
                    body[cursor + 9],
                    body[cursor + 10],
                    body[cursor + 11],
                ]);
                (12, len as usize)
            } else {
                let len = u16::from_le_bytes([body[cursor + 6], body[cursor + 7]]);
                (8, len as usize)
            };

            let value_start = cursor + header_len;
            let value_end = value_start + value_len;
            if value_end > body.len() {
                return Err(SlideError::BadData {
                    context: "Couldn't parse DICOM element stream".to_string(),
                    detail: format!("element ({group:04X},{element:04X}) length runs past end of stream"),
                });
            }

            values.insert((group, element), body[value_start..value_end].to_vec());
            cursor = value_end;
        }

        Ok(DicomDataset { values })
    }

    /// Read a tag's value as a trimmed ASCII/UTF-8 string (DICOM pads
    /// string-valued elements with a trailing space or NUL to an even
    /// length).
    pub fn get_string(&self, tag: Tag) -> Option<String> {
        let raw = self.values.get(&tag)?;
        let text = std::str::from_utf8(raw).ok()?;
        Some(text.trim_end_matches(['\0', ' ']).to_string())
    }

    pub fn get_u16(&self, tag: Tag) -> Option<u16> {
        let raw = self.values.get(&tag)?;
        if raw.len() < 2 {
            return None;
        }
        Some(u16::from_le_bytes([raw[0], raw[1]]))
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.values.contains_key(&tag)
    }
}

fn strip_preamble(bytes: &[u8]) -> &[u8] {
    if bytes.len() > PART10_PREAMBLE_LEN + PART10_MAGIC.len()
        && &bytes[PART10_PREAMBLE_LEN..PART10_PREAMBLE_LEN + PART10_MAGIC.len()] == PART10_MAGIC
    {
        &bytes[PART10_PREAMBLE_LEN + PART10_MAGIC.len()..]
    } else {
        bytes
    }
}

/// VRs that use a 4-byte length field preceded by two reserved bytes,
/// rather than a plain 2-byte length.
fn uses_long_length(vr: &[u8]) -> bool {
    matches!(vr, b"OB" | b"OW" | b"OF" | b"SQ" | b"UT" | b"UN")
}
