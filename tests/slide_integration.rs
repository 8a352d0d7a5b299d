//! End-to-end tests against real files on disk: open a synthesized TIFF,
//! probe its vendor, and paint regions through the public `Slide` façade.

mod support;

use wsi_inspect::error::SlideError;
use wsi_inspect::grid::RegionBuffer;
use wsi_inspect::slide::Slide;

fn write_fixture(bytes: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn opens_generic_tiled_tiff_as_generic_vendor() {
    let fixture = write_fixture(&support::create_tiff_with_jpeg_tile());
    let slide = Slide::open(fixture.path()).unwrap();

    assert_eq!(slide.vendor_name(), "Generic Pyramidal TIFF");
    assert_eq!(slide.level_count(), 1);
    assert_eq!(slide.level_dimensions(0), Some((2048, 1536)));
}

#[test]
fn opens_big_endian_tiff_identically_to_little_endian() {
    let fixture = write_fixture(&support::create_tiff_with_jpeg_tile_endian(support::ByteOrderType::BigEndian));
    let slide = Slide::open(fixture.path()).unwrap();
    assert_eq!(slide.level_dimensions(0), Some((2048, 1536)));
}

#[test]
fn opens_bigtiff_with_64_bit_offsets() {
    let fixture = write_fixture(&support::create_bigtiff_with_jpeg_tile());
    let slide = Slide::open(fixture.path()).unwrap();
    assert_eq!(slide.level_dimensions(0), Some((2048, 1536)));
}

#[test]
fn rejects_strip_organized_tiff() {
    let fixture = write_fixture(&support::create_strip_tiff());
    let err = Slide::open(fixture.path()).unwrap_err();
    assert!(matches!(err, SlideError::BadData { .. } | SlideError::FormatNotSupported(_)));
}

#[test]
fn rejects_unsupported_lzw_compression() {
    let fixture = write_fixture(&support::create_tiff_with_lzw_compression());
    let err = Slide::open(fixture.path()).unwrap_err();
    assert!(matches!(err, SlideError::BadData { .. } | SlideError::FormatNotSupported(_)));
}

#[test]
fn detects_aperio_svs_from_image_description() {
    let fixture = write_fixture(&support::create_svs_with_jpeg_tables());
    let slide = Slide::open(fixture.path()).unwrap();
    assert_eq!(slide.vendor_name(), "Aperio SVS");
    assert_eq!(slide.properties().find(|(k, _)| *k == "openslide.vendor"), Some(("openslide.vendor", "aperio")));
}

#[test]
fn paints_a_region_fully_inside_a_single_tile() {
    let fixture = write_fixture(&support::create_tiff_with_jpeg_tile());
    let slide = Slide::open(fixture.path()).unwrap();

    let mut buffer = RegionBuffer::transparent(64, 64);
    slide.paint_region(&mut buffer, 0, 0, 0, 64, 64).unwrap();

    // The synthetic tile is a solid-ish JPEG-compressed image; at minimum
    // every pixel in bounds should have been painted opaque, not left as
    // the buffer's initial transparent fill.
    assert!(buffer.pixels.iter().all(|&p| (p >> 24) & 0xFF == 0xFF));
}

#[test]
fn paints_a_region_spanning_multiple_tiles() {
    let fixture = write_fixture(&support::create_tiff_with_jpeg_tile());
    let slide = Slide::open(fixture.path()).unwrap();

    let mut buffer = RegionBuffer::transparent(600, 600);
    slide.paint_region(&mut buffer, 200, 200, 0, 600, 600).unwrap();
    assert_eq!(buffer.width, 600);
    assert_eq!(buffer.height, 600);
}

#[test]
fn region_request_past_level_dimensions_is_rejected() {
    let fixture = write_fixture(&support::create_tiff_with_jpeg_tile());
    let slide = Slide::open(fixture.path()).unwrap();

    let mut buffer = RegionBuffer::transparent(16, 16);
    let err = slide.paint_region(&mut buffer, 0, 0, 7, 16, 16).unwrap_err();
    assert!(matches!(err, SlideError::Failed(msg) if msg.contains("out of range")));
}

#[test]
fn a_latched_error_is_returned_on_every_subsequent_call() {
    let fixture = write_fixture(&support::create_tiff_with_jpeg_tile());
    let slide = Slide::open(fixture.path()).unwrap();

    let mut buffer = RegionBuffer::transparent(16, 16);
    assert!(slide.paint_region(&mut buffer, 0, 0, 99, 16, 16).is_err());
    assert!(slide.get_error().is_some());
    // A second, otherwise-valid call still surfaces the latched error.
    assert!(slide.paint_region(&mut buffer, 0, 0, 0, 16, 16).is_err());
}

#[test]
fn nonexistent_path_surfaces_an_io_error() {
    let err = Slide::open("/nonexistent/path/to/slide.tiff").unwrap_err();
    assert!(matches!(err, SlideError::Io(_)));
}

#[test]
fn garbage_bytes_are_rejected_as_unsupported() {
    let fixture = write_fixture(b"not a tiff file at all, just some bytes");
    let err = Slide::open(fixture.path()).unwrap_err();
    assert!(matches!(err, SlideError::FormatNotSupported(_)));
}
