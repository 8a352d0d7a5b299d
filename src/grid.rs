//! Grid / region painter: maps a caller's region draw onto a rectangle of
//! tile reads.
//!
//! A grid is plain geometry -- `tiles_across × tiles_down` cells of
//! `tile_w × tile_h` -- with no notion of files or caches. [`paint_region`]
//! walks the tile rectangle intersecting the requested region in row-major
//! order and hands each tile's destination offset to a caller-supplied
//! closure, which is expected to decode (or fetch from cache) and blit.
//! Offsets are fractional so compositing several areas at non-tile-aligned
//! offsets (Leica's side-by-side main images) stays seamless.

use crate::error::SlideError;
use crate::model::ArgbTile;

/// Tile geometry for one area, in the coordinate space `paint_region` reads
/// from: an integer grid of `tile_width × tile_height` cells.
#[derive(Debug, Clone, Copy)]
pub struct RegionGrid {
    pub tiles_across: u32,
    pub tiles_down: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl RegionGrid {
    /// The inclusive `[lo, hi]` tile-index range intersecting
    /// `[origin, origin + extent)`, or `None` if the requested span misses
    /// the grid entirely.
    fn index_range(origin: f64, extent: u32, tile_count: u32, tile_size: u32) -> Option<(u32, u32)> {
        if extent == 0 || tile_count == 0 {
            return None;
        }
        let lo = origin;
        let hi = origin + extent as f64 - 1.0;
        let grid_extent = tile_count as f64 * tile_size as f64;
        if hi < 0.0 || lo >= grid_extent {
            return None;
        }
        let lo_index = (lo.max(0.0) / tile_size as f64).floor() as u32;
        let hi_index = ((hi / tile_size as f64).floor() as u32).min(tile_count - 1);
        if lo_index >= tile_count {
            return None;
        }
        Some((lo_index, hi_index))
    }
}

/// A destination pixel buffer in premultiplied ARGB32, row-major, that
/// `paint_region` draws into. Starts fully transparent.
pub struct RegionBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

impl RegionBuffer {
    pub fn transparent(width: u32, height: u32) -> Self {
        RegionBuffer {
            width,
            height,
            pixels: vec![0u32; (width as usize) * (height as usize)],
        }
    }

    /// Composite `tile` with its top-left at fractional `(dst_x, dst_y)`,
    /// clipping to the buffer's bounds. Sub-pixel offsets round to the
    /// nearest integer pixel.
    pub fn blit(&mut self, tile: &ArgbTile, dst_x: f64, dst_y: f64) {
        let dst_x = dst_x.round() as i64;
        let dst_y = dst_y.round() as i64;
        for ty in 0..tile.height as i64 {
            let py = dst_y + ty;
            if py < 0 || py >= self.height as i64 {
                continue;
            }
            for tx in 0..tile.width as i64 {
                let px = dst_x + tx;
                if px < 0 || px >= self.width as i64 {
                    continue;
                }
                let src = tile.pixels[(ty as usize) * tile.width as usize + tx as usize];
                self.pixels[(py as usize) * self.width as usize + px as usize] = src;
            }
        }
    }
}

/// Walk the tile rectangle intersecting `[origin_x, origin_x + w) ×
/// [origin_y, origin_y + h)` in row-major order, invoking `read_tile_fn` for
/// each `(col, row)` with the tile's destination offset onto `surface`.
///
/// `origin_x`/`origin_y` are in the grid's own pixel space (already
/// translated by the caller from canvas coordinates to this area's local
/// origin). Returns immediately on the first callback failure.
pub fn paint_region<F>(
    grid: &RegionGrid,
    surface: &mut RegionBuffer,
    origin_x: f64,
    origin_y: f64,
    w: u32,
    h: u32,
    mut read_tile_fn: F,
) -> Result<(), SlideError>
where
    F: FnMut(&mut RegionBuffer, u32, u32, f64, f64) -> Result<(), SlideError>,
{
    if w == 0 || h == 0 {
        return Ok(());
    }

    let cols = match RegionGrid::index_range(origin_x, w, grid.tiles_across, grid.tile_width) {
        Some(range) => range,
        None => return Ok(()),
    };
    let rows = match RegionGrid::index_range(origin_y, h, grid.tiles_down, grid.tile_height) {
        Some(range) => range,
        None => return Ok(()),
    };

    for row in rows.0..=rows.1 {
        for col in cols.0..=cols.1 {
            let dst_x = col as f64 * grid.tile_width as f64 - origin_x;
            let dst_y = row as f64 * grid.tile_height as f64 - origin_y;
            read_tile_fn(surface, col, row, dst_x, dst_y)?;
        }
    }
    Ok(())
}
