//! Ordered slide property map with well-known OpenSlide-style keys.
//!
//! Vendors populate this with their own `<vendor>.*` raw tags plus derived
//! `openslide.*` keys; the map is exported verbatim through the public API.

use std::collections::BTreeMap;

use crate::model::Level;

pub const PROP_OBJECTIVE_POWER: &str = "openslide.objective-power";
pub const PROP_MPP_X: &str = "openslide.mpp-x";
pub const PROP_MPP_Y: &str = "openslide.mpp-y";
pub const PROP_QUICKHASH: &str = "openslide.quickhash-1";
pub const PROP_COMMENT: &str = "openslide.comment";
pub const PROP_VENDOR: &str = "openslide.vendor";
pub const PROP_BACKGROUND_COLOR: &str = "openslide.background-color";
pub const PROP_LEVEL_COUNT: &str = "openslide.level-count";

/// An ordered (by key) string-to-string map of slide metadata.
///
/// Backed by a `BTreeMap` rather than `HashMap` so iteration order is
/// deterministic, which keeps CLI output and test fixtures stable.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    values: BTreeMap<String, String>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Populate the `openslide.level-count` and per-level geometry keys from
    /// a finished level list. Called once after a vendor probe accepts.
    pub fn set_level_geometry(&mut self, levels: &[Level]) {
        self.set(PROP_LEVEL_COUNT, levels.len().to_string());
        for (i, level) in levels.iter().enumerate() {
            self.set(format!("openslide.level[{i}].width"), level.width.to_string());
            self.set(format!("openslide.level[{i}].height"), level.height.to_string());
            self.set(
                format!("openslide.level[{i}].downsample"),
                level.downsample.to_string(),
            );
            // A level's areas all share one tile grid size; take the first
            // as representative. A level with no areas (shouldn't happen
            // for an opened slide) contributes no tile-size keys.
            if let Some(area) = level.areas.first() {
                self.set(
                    format!("openslide.level[{i}].tile-width"),
                    area.tile_width.to_string(),
                );
                self.set(
                    format!("openslide.level[{i}].tile-height"),
                    area.tile_height.to_string(),
                );
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
