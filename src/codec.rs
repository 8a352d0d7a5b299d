//! Tile pixel codecs: decodes a tile's compressed bytes into premultiplied
//! ARGB32 pixels for the grid painter.
//!
//! Mirrors the decode half of the teacher's JPEG re-encoder: source bytes go
//! through `image`'s JPEG decoder and come out as pixels rather than being
//! re-encoded. JPEG-2000 tiles (rare, but declared supported by
//! [`crate::format::tiff::Compression`]) go through `jpeg2k` instead.

use image::{DynamicImage, GenericImageView};

use crate::error::TileError;
use crate::format::tiff::Compression;
use crate::model::ArgbTile;

/// Decode a tile's compressed bytes into premultiplied ARGB32 pixels.
pub fn decode_tile(bytes: &[u8], compression: Compression) -> Result<ArgbTile, TileError> {
    match compression {
        Compression::Jpeg => decode_jpeg(bytes),
        Compression::Jpeg2000 => decode_jpeg2000(bytes),
        other => Err(TileError::DecodeError {
            message: format!("no pixel codec for compression {other:?}"),
        }),
    }
}

fn decode_jpeg(bytes: &[u8]) -> Result<ArgbTile, TileError> {
    let reader = image::ImageReader::with_format(std::io::Cursor::new(bytes), image::ImageFormat::Jpeg);
    let img = reader.decode().map_err(|e| TileError::DecodeError { message: e.to_string() })?;
    Ok(to_premultiplied_argb(&img))
}

fn decode_jpeg2000(bytes: &[u8]) -> Result<ArgbTile, TileError> {
    let image = jpeg2k::Image::from_bytes(bytes).map_err(|e| TileError::DecodeError {
        message: format!("jpeg2000 decode failed: {e}"),
    })?;
    let rgb = image
        .get_pixels(None)
        .map_err(|e| TileError::DecodeError { message: format!("jpeg2000 pixel extraction failed: {e}") })?;

    let width = rgb.width;
    let height = rgb.height;
    let channels = rgb.data.len() / (width as usize * height as usize).max(1);
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for px in rgb.data.chunks(channels.max(1)) {
        let (r, g, b) = match px {
            [r, g, b, ..] => (*r, *g, *b),
            [g] => (*g, *g, *g),
            _ => (0, 0, 0),
        };
        pixels.push(pack_argb(255, r, g, b));
    }
    Ok(ArgbTile { width, height, pixels })
}

fn to_premultiplied_argb(img: &DynamicImage) -> ArgbTile {
    let (width, height) = img.dimensions();
    let rgba = img.to_rgba8();
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for px in rgba.pixels() {
        let [r, g, b, a] = px.0;
        pixels.push(pack_argb(a, r, g, b));
    }
    ArgbTile { width, height, pixels }
}

/// Pack 8-bit channels into `0xAARRGGBB`, premultiplying color by alpha.
fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    let premul = |c: u8| -> u32 { (c as u32 * a as u32 + 127) / 255 };
    (a as u32) << 24 | premul(r) << 16 | premul(g) << 8 | premul(b)
}
