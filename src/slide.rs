//! The `Slide` façade: opens a file through the vendor probe chain, then
//! answers geometry/property queries and paints regions against it.
//!
//! Dispatch to the vendor-specific reader goes through [`VendorState`],
//! Rust's tagged-enum stand-in for the teacher's hand-written vtable: tile
//! reads are generic over the reader type, which would make a trait object
//! non-object-safe, so the enum's own methods do the matching instead.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::cache::{OwnerToken, TileCache};
use crate::codec;
use crate::error::SlideError;
use crate::format::detect::{detect_and_open, VendorState};
use crate::grid::{paint_region as grid_paint_region, RegionBuffer, RegionGrid};
use crate::io::{HandleCache, PositionedReader, SlideFile};
use crate::model::{Area, ArgbTile, AssociatedImage, Level};
use crate::properties::{PropertyMap, PROP_QUICKHASH};
use crate::quickhash;

/// Sticky single-slot error state: once set, every later call on the slide
/// observes the same error instead of attempting further work. A slide
/// cannot be repaired once poisoned; the caller must close and reopen.
#[derive(Default)]
struct ErrorState(Mutex<Option<SlideError>>);

impl ErrorState {
    fn check(&self) -> Result<(), SlideError> {
        match &*self.0.lock().unwrap() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn latch(&self, err: &SlideError) {
        let mut guard = self.0.lock().unwrap();
        if guard.is_none() {
            *guard = Some(err.clone());
        }
    }

    fn get(&self) -> Option<String> {
        self.0.lock().unwrap().as_ref().map(ToString::to_string)
    }
}

/// An opened whole-slide image: an ordered pyramid of [`Level`]s, metadata,
/// associated images, and opaque vendor state, backed by one file.
///
/// Supports concurrent `paint_region` and property reads from multiple
/// threads; the only mutable state is the sticky error slot and the shared
/// tile cache, both internally synchronized.
pub struct Slide {
    file: SlideFile,
    vendor: VendorState,
    levels: Vec<Level>,
    properties: PropertyMap,
    associated_images: std::collections::BTreeMap<String, AssociatedImage>,
    cache: Arc<TileCache>,
    errors: ErrorState,
}

impl Slide {
    /// Open `path`, probing for a recognised vendor format and computing its
    /// quickhash. Uses a fresh tile cache at the default capacity.
    pub fn open(path: impl AsRef<Path>) -> Result<Slide, SlideError> {
        Self::open_with_cache(path, TileCache::with_default_capacity())
    }

    /// Open `path` against a caller-supplied tile cache, e.g. one shared
    /// across several slides.
    pub fn open_with_cache(path: impl AsRef<Path>, cache: Arc<TileCache>) -> Result<Slide, SlideError> {
        let file = SlideFile::open(path.as_ref())?;
        Self::open_file_with_cache(file, cache)
    }

    /// Open via a [`HandleCache`] so repeated opens of the same path reuse
    /// one file descriptor instead of opening it again.
    pub fn open_via_handles(
        path: impl AsRef<Path>,
        handles: &HandleCache,
        cache: Arc<TileCache>,
    ) -> Result<Slide, SlideError> {
        let file = handles.get(path)?;
        Self::open_file_with_cache(file, cache)
    }

    fn open_file_with_cache(file: SlideFile, cache: Arc<TileCache>) -> Result<Slide, SlideError> {
        let opened = detect_and_open(&file)?;
        let quickhash = quickhash::compute(&file, &opened.quickhash_source)?;

        let mut properties = opened.properties;
        properties.set(PROP_QUICKHASH, quickhash);

        Ok(Slide {
            file,
            vendor: opened.state,
            levels: opened.levels,
            properties,
            associated_images: opened.associated_images,
            cache,
            errors: ErrorState::default(),
        })
    }

    pub fn vendor_name(&self) -> &'static str {
        self.vendor.vendor_name()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level_dimensions(&self, level: usize) -> Option<(u32, u32)> {
        self.levels.get(level).map(|l| (l.width, l.height))
    }

    pub fn level_downsample(&self, level: usize) -> Option<f64> {
        self.levels.get(level).map(|l| l.downsample)
    }

    /// Highest-index level whose downsample is `<= requested`, or 0 if none
    /// qualifies. Levels are stored with non-decreasing downsample, so the
    /// last one small enough wins.
    pub fn best_level_for_downsample(&self, requested: f64) -> usize {
        best_level_index(&self.levels, requested)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter()
    }

    pub fn associated_image_names(&self) -> impl Iterator<Item = &str> {
        self.associated_images.keys().map(String::as_str)
    }

    /// The sticky error raised by a prior call on this slide, if any.
    pub fn get_error(&self) -> Option<String> {
        self.errors.get()
    }

    /// Paint a level-0-coordinate region into `buffer`, sampled at `level`.
    /// `buffer` must already be sized `w x h`. Out-of-canvas pixels stay
    /// transparent black; on the slide's first failure the error is latched
    /// and every later call on this slide short-circuits with it.
    pub fn paint_region(
        &self,
        buffer: &mut RegionBuffer,
        x: i64,
        y: i64,
        level: usize,
        w: u32,
        h: u32,
    ) -> Result<(), SlideError> {
        self.errors.check()?;
        let result = self.paint_region_inner(buffer, x, y, level, w, h);
        if let Err(err) = &result {
            self.errors.latch(err);
        }
        result
    }

    fn paint_region_inner(
        &self,
        buffer: &mut RegionBuffer,
        x: i64,
        y: i64,
        level_index: usize,
        w: u32,
        h: u32,
    ) -> Result<(), SlideError> {
        if w == 0 || h == 0 {
            return Ok(());
        }
        let level = self.levels.get(level_index).ok_or_else(|| {
            SlideError::Failed(format!("level {level_index} out of range (have {})", self.levels.len()))
        })?;

        for area in &level.areas {
            let grid = area_grid(area);
            let origin_x = x as f64 / level.downsample - area.offset_x;
            let origin_y = y as f64 / level.downsample - area.offset_y;

            grid_paint_region(&grid, buffer, origin_x, origin_y, w, h, |surface, col, row, dst_x, dst_y| {
                self.read_and_blit(surface, area, col, row, dst_x, dst_y)
            })?;
        }
        Ok(())
    }

    /// Read the named associated (non-pyramid) image in full into `buffer`,
    /// which must already be sized to that image's dimensions.
    pub fn read_associated_image(&self, name: &str, buffer: &mut RegionBuffer) -> Result<(), SlideError> {
        self.errors.check()?;
        let result = self.read_associated_image_inner(name, buffer);
        if let Err(err) = &result {
            self.errors.latch(err);
        }
        result
    }

    fn read_associated_image_inner(&self, name: &str, buffer: &mut RegionBuffer) -> Result<(), SlideError> {
        let image = self
            .associated_images
            .get(name)
            .ok_or_else(|| SlideError::Failed(format!("no associated image named {name:?}")))?;
        let (tiles_across, tiles_down, tile_width, tile_height) =
            self.vendor.tile_geometry(image.ifd_index).ok_or_else(|| SlideError::Failed(format!(
                "no tile geometry for directory {}",
                image.ifd_index
            )))?;
        let area = Area {
            ifd_index: image.ifd_index,
            offset_x: 0.0,
            offset_y: 0.0,
            width: image.width,
            height: image.height,
            tile_width,
            tile_height,
            tiles_across,
            tiles_down,
        };
        let grid = area_grid(&area);
        grid_paint_region(&grid, buffer, 0.0, 0.0, image.width, image.height, |surface, col, row, dst_x, dst_y| {
            self.read_and_blit(surface, &area, col, row, dst_x, dst_y)
        })
    }

    /// `read_tile` from §4.7: consult the cache keyed on area + tile coords,
    /// decode and clip on miss, cache the encoded pixels, then blit.
    fn read_and_blit(
        &self,
        surface: &mut RegionBuffer,
        area: &Area,
        col: u32,
        row: u32,
        dst_x: f64,
        dst_y: f64,
    ) -> Result<(), SlideError> {
        let (tw, th) = clipped_tile_size(area, col, row);
        if tw == 0 || th == 0 {
            return Ok(());
        }
        let owner = owner_token(self.file.identifier(), area.ifd_index);

        if let Some((bytes, _handle)) = self.cache.get(owner, col, row) {
            let tile = bytes_to_argb(&bytes, tw, th);
            surface.blit(&tile, dst_x, dst_y);
            return Ok(());
        }

        let (raw, compression) = self.vendor.read_tile(&self.file, area.ifd_index, col, row)?;
        let mut tile = codec::decode_tile(&raw, compression)?;
        clip_tile(&mut tile, tw, th);
        let encoded = argb_to_bytes(&tile);
        let _handle = self.cache.put(owner, col, row, encoded);
        surface.blit(&tile, dst_x, dst_y);
        Ok(())
    }
}

/// Highest-index level whose downsample is `<= requested`, or 0 if none
/// qualifies.
fn best_level_index(levels: &[Level], requested: f64) -> usize {
    levels
        .iter()
        .enumerate()
        .filter(|(_, l)| l.downsample <= requested)
        .map(|(i, _)| i)
        .next_back()
        .unwrap_or(0)
}

fn area_grid(area: &Area) -> RegionGrid {
    RegionGrid {
        tiles_across: area.tiles_across,
        tiles_down: area.tiles_down,
        tile_width: area.tile_width,
        tile_height: area.tile_height,
    }
}

/// The exact pixel size of tile `(col, row)` once clipped to the area's real
/// extent -- edge tiles are smaller than the nominal tile size.
fn clipped_tile_size(area: &Area, col: u32, row: u32) -> (u32, u32) {
    let w = area.width.saturating_sub(col * area.tile_width).min(area.tile_width);
    let h = area.height.saturating_sub(row * area.tile_height).min(area.tile_height);
    (w, h)
}

/// Truncate a decoded tile down to `(width, height)`, padding with
/// transparent pixels if the codec produced something smaller than expected.
fn clip_tile(tile: &mut ArgbTile, width: u32, height: u32) {
    if tile.width == width && tile.height == height {
        return;
    }
    let copy_w = tile.width.min(width) as usize;
    let copy_h = tile.height.min(height) as usize;
    let mut pixels = vec![0u32; (width as usize) * (height as usize)];
    for y in 0..copy_h {
        let src_start = y * tile.width as usize;
        let dst_start = y * width as usize;
        pixels[dst_start..dst_start + copy_w].copy_from_slice(&tile.pixels[src_start..src_start + copy_w]);
    }
    tile.width = width;
    tile.height = height;
    tile.pixels = pixels;
}

/// Owner token scoping cache entries to one (file, directory) pair so a
/// tile cache shared across several open slides never aliases entries
/// across files.
fn owner_token(file_identifier: &str, ifd_index: usize) -> OwnerToken {
    let mut hasher = DefaultHasher::new();
    file_identifier.hash(&mut hasher);
    ifd_index.hash(&mut hasher);
    hasher.finish() as usize
}

fn argb_to_bytes(tile: &ArgbTile) -> bytes::Bytes {
    let mut buf = Vec::with_capacity(tile.pixels.len() * 4);
    for px in &tile.pixels {
        buf.extend_from_slice(&px.to_le_bytes());
    }
    bytes::Bytes::from(buf)
}

fn bytes_to_argb(bytes: &bytes::Bytes, width: u32, height: u32) -> ArgbTile {
    let pixels = bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    ArgbTile { width, height, pixels }
}
