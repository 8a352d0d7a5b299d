//! Core data model shared by the vendor probes, the slide façade, and the
//! grid painter: pyramid levels built from one or more tile-grid areas,
//! associated (non-pyramid) images, and the byte range used for quickhash.

/// A positioned tile grid over a single TIFF directory, in pixel space.
///
/// Most vendors expose one area per level. Leica SCN slides can place more
/// than one main image's directory side by side within a single level, each
/// at its own `clicks_offset_{x,y}` translated into the level's pixel grid.
#[derive(Debug, Clone)]
pub struct Area {
    /// Index of the TIFF directory (IFD) backing this area.
    pub ifd_index: usize,
    /// Offset of this area's origin within the level, in pixels.
    pub offset_x: f64,
    pub offset_y: f64,
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tiles_across: u32,
    pub tiles_down: u32,
}

impl Area {
    pub fn tile_index(&self, col: u32, row: u32) -> Option<u32> {
        if col >= self.tiles_across || row >= self.tiles_down {
            return None;
        }
        Some(row * self.tiles_across + col)
    }
}

/// One pyramid level: overall pixel dimensions, downsample factor relative
/// to level 0, and the areas that compose it.
#[derive(Debug, Clone)]
pub struct Level {
    pub width: u32,
    pub height: u32,
    pub downsample: f64,
    /// Physical units ("clicks") per pixel at this level. 1.0 when the vendor
    /// has no notion of clicks (Aperio SVS, generic TIFF).
    pub clicks_per_pixel: f64,
    pub areas: Vec<Area>,
}

/// A non-pyramid image exposed by name: macro, label, thumbnail.
#[derive(Debug, Clone)]
pub struct AssociatedImage {
    pub ifd_index: usize,
    pub width: u32,
    pub height: u32,
}

/// The byte range hashed to produce `openslide.quickhash-1`, plus a label
/// describing the selection so two vendors that pick the same bytes for
/// different reasons don't collide.
#[derive(Debug, Clone)]
pub struct QuickhashSource {
    pub label: &'static str,
    pub offset: u64,
    pub len: u64,
}

/// A decoded tile's pixels: premultiplied ARGB32 (0xAARRGGBB), row-major.
#[derive(Debug, Clone)]
pub struct ArgbTile {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

impl ArgbTile {
    pub fn blank(width: u32, height: u32) -> Self {
        ArgbTile {
            width,
            height,
            pixels: vec![0u32; (width as usize) * (height as usize)],
        }
    }
}
