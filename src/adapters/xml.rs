//! Typed XML accessor backing the Leica SCN decoder's `ImageDescription`
//! parsing (`crate::format::leica`).
//!
//! A thin wrapper over `quick_xml::de` rather than the older event-based
//! `Reader::from_str`/`read_event` API: the SCN schema is static enough that
//! deriving `Deserialize` on a handful of structs is both shorter and less
//! error-prone than hand-walking start/end tag events.

use serde::de::DeserializeOwned;

use crate::error::SlideError;

/// Deserialize an XML document into `T`, wrapping failures as `BadData`
/// under a caller-supplied context (e.g. "Couldn't parse SCN metadata").
pub fn parse<T: DeserializeOwned>(xml: &str, context: &str) -> Result<T, SlideError> {
    quick_xml::de::from_str(xml).map_err(|e| SlideError::BadData {
        context: context.to_string(),
        detail: e.to_string(),
    })
}
