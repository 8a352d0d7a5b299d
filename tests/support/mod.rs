//! Synthetic TIFF/BigTIFF/SVS byte builders shared by the integration tests.
//!
//! These build the smallest possible byte streams that satisfy the tile-tag
//! and compression requirements `format::tiff::validation` checks, so tests
//! exercise the real parser instead of a mock.

#![allow(dead_code)]

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

pub fn create_test_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder.encode_image(&img).unwrap();
    out
}

fn write_u16(data: &mut [u8], offset: usize, value: u16, byte_order: ByteOrderType) {
    match byte_order {
        ByteOrderType::LittleEndian => data[offset..offset + 2].copy_from_slice(&value.to_le_bytes()),
        ByteOrderType::BigEndian => data[offset..offset + 2].copy_from_slice(&value.to_be_bytes()),
    }
}

fn write_u32(data: &mut [u8], offset: usize, value: u32, byte_order: ByteOrderType) {
    match byte_order {
        ByteOrderType::LittleEndian => data[offset..offset + 4].copy_from_slice(&value.to_le_bytes()),
        ByteOrderType::BigEndian => data[offset..offset + 4].copy_from_slice(&value.to_be_bytes()),
    }
}

/// A minimal valid little-endian tiled TIFF: 2048x1536 pixels, 256x256
/// tiles (8x6), JPEG compression, every tile pointing at the same payload.
pub fn create_tiff_with_jpeg_tile() -> Vec<u8> {
    create_tiff_with_jpeg_tile_endian(ByteOrderType::LittleEndian)
}

pub fn create_tiff_with_jpeg_tile_endian(byte_order: ByteOrderType) -> Vec<u8> {
    let jpeg_data = create_test_jpeg(256, 256, 90);
    let jpeg_len = jpeg_data.len() as u32;

    let tile_data_offset = 1000u32;
    let tile_offsets_offset = 200u32;
    let tile_byte_counts_offset = 400u32;
    let tile_count = 48u32;

    let total_size = tile_data_offset as usize + jpeg_data.len() + 100;
    let mut data = vec![0u8; total_size];

    match byte_order {
        ByteOrderType::LittleEndian => {
            data[0] = b'I';
            data[1] = b'I';
        }
        ByteOrderType::BigEndian => {
            data[0] = b'M';
            data[1] = b'M';
        }
    }
    write_u16(&mut data, 2, 42, byte_order);
    write_u32(&mut data, 4, 8, byte_order);

    write_u16(&mut data, 8, 9, byte_order);
    let mut offset = 10;

    let mut write_entry = |data: &mut [u8], offset: &mut usize, tag: u16, typ: u16, count: u32, value: u32| {
        write_u16(data, *offset, tag, byte_order);
        write_u16(data, *offset + 2, typ, byte_order);
        write_u32(data, *offset + 4, count, byte_order);
        if typ == 3 && count == 1 {
            write_u16(data, *offset + 8, value as u16, byte_order);
            data[*offset + 10] = 0;
            data[*offset + 11] = 0;
        } else {
            write_u32(data, *offset + 8, value, byte_order);
        }
        *offset += 12;
    };

    write_entry(&mut data, &mut offset, 256, 4, 1, 2048); // ImageWidth
    write_entry(&mut data, &mut offset, 257, 4, 1, 1536); // ImageLength
    write_entry(&mut data, &mut offset, 258, 3, 1, 8); // BitsPerSample
    write_entry(&mut data, &mut offset, 259, 3, 1, 7); // Compression = JPEG
    write_entry(&mut data, &mut offset, 277, 3, 1, 1); // SamplesPerPixel
    write_entry(&mut data, &mut offset, 322, 4, 1, 256); // TileWidth
    write_entry(&mut data, &mut offset, 323, 4, 1, 256); // TileLength
    write_entry(&mut data, &mut offset, 324, 4, tile_count, tile_offsets_offset); // TileOffsets
    write_entry(&mut data, &mut offset, 325, 4, tile_count, tile_byte_counts_offset); // TileByteCounts

    write_u32(&mut data, offset, 0, byte_order);

    for i in 0..tile_count {
        let arr_offset = tile_offsets_offset as usize + (i as usize) * 4;
        write_u32(&mut data, arr_offset, tile_data_offset, byte_order);
    }
    for i in 0..tile_count {
        let arr_offset = tile_byte_counts_offset as usize + (i as usize) * 4;
        write_u32(&mut data, arr_offset, jpeg_len, byte_order);
    }

    data[tile_data_offset as usize..tile_data_offset as usize + jpeg_data.len()].copy_from_slice(&jpeg_data);
    data
}

/// A BigTIFF with the same 2048x1536/256x256 geometry as
/// [`create_tiff_with_jpeg_tile`], using 8-byte offsets throughout.
pub fn create_bigtiff_with_jpeg_tile() -> Vec<u8> {
    let jpeg_data = create_test_jpeg(256, 256, 90);
    let jpeg_len = jpeg_data.len() as u64;
    let tile_count = 48u64;

    let mut data = Vec::new();
    data.extend(b"II");
    data.extend(43u16.to_le_bytes());
    data.extend(8u16.to_le_bytes());
    data.extend(0u16.to_le_bytes());
    data.extend(16u64.to_le_bytes());

    let entry_count = 8u64;
    data.extend(entry_count.to_le_bytes());

    let write_entry = |data: &mut Vec<u8>, tag: u16, typ: u16, count: u64, value: u64| {
        data.extend(tag.to_le_bytes());
        data.extend(typ.to_le_bytes());
        data.extend(count.to_le_bytes());
        data.extend(value.to_le_bytes());
    };

    let ifd_end = 16 + 8 + (entry_count as usize * 20) + 8;
    let tile_offsets_offset = ifd_end as u64;
    let tile_byte_counts_offset = tile_offsets_offset + tile_count * 8;
    let tile_data_offset = tile_byte_counts_offset + tile_count * 8;

    write_entry(&mut data, 256, 4, 1, 2048);
    write_entry(&mut data, 257, 4, 1, 1536);
    write_entry(&mut data, 258, 3, 1, 8);
    write_entry(&mut data, 259, 3, 1, 7);
    write_entry(&mut data, 322, 3, 1, 256);
    write_entry(&mut data, 323, 3, 1, 256);
    write_entry(&mut data, 324, 16, tile_count, tile_offsets_offset);
    write_entry(&mut data, 325, 16, tile_count, tile_byte_counts_offset);

    data.extend(0u64.to_le_bytes());

    for _ in 0..tile_count {
        data.extend(tile_data_offset.to_le_bytes());
    }
    for _ in 0..tile_count {
        data.extend(jpeg_len.to_le_bytes());
    }
    data.extend(&jpeg_data);
    data
}

/// [`create_tiff_with_jpeg_tile`] with its Compression tag value rewritten
/// from JPEG (7) to LZW (5), which `validate_ifd` rejects.
pub fn create_tiff_with_lzw_compression() -> Vec<u8> {
    let mut data = create_tiff_with_jpeg_tile();
    // Entry 3 (Compression) starts at 10 + 3*12 = 46; its value field is 8
    // bytes in, at 54.
    data[54] = 5;
    data
}

/// A strip-organized (non-tiled) TIFF, which `validate_ifd` rejects outright.
pub fn create_strip_tiff() -> Vec<u8> {
    let jpeg_data = create_test_jpeg(256, 256, 90);
    let jpeg_len = jpeg_data.len() as u32;
    let strip_offset = 200u32;
    let total_size = strip_offset as usize + jpeg_data.len() + 100;
    let mut data = vec![0u8; total_size];

    data[0] = b'I';
    data[1] = b'I';
    data[2..4].copy_from_slice(&42u16.to_le_bytes());
    data[4..8].copy_from_slice(&8u32.to_le_bytes());
    data[8..10].copy_from_slice(&8u16.to_le_bytes());

    let mut offset = 10;
    let write_entry = |data: &mut [u8], offset: &mut usize, tag: u16, typ: u16, count: u32, value: u32| {
        data[*offset..*offset + 2].copy_from_slice(&tag.to_le_bytes());
        data[*offset + 2..*offset + 4].copy_from_slice(&typ.to_le_bytes());
        data[*offset + 4..*offset + 8].copy_from_slice(&count.to_le_bytes());
        data[*offset + 8..*offset + 12].copy_from_slice(&value.to_le_bytes());
        *offset += 12;
    };

    write_entry(&mut data, &mut offset, 256, 4, 1, 512);
    write_entry(&mut data, &mut offset, 257, 4, 1, 512);
    write_entry(&mut data, &mut offset, 258, 3, 1, 8);
    write_entry(&mut data, &mut offset, 259, 3, 1, 7);
    write_entry(&mut data, &mut offset, 273, 4, 1, strip_offset);
    write_entry(&mut data, &mut offset, 277, 3, 1, 1);
    write_entry(&mut data, &mut offset, 278, 4, 1, 512);
    write_entry(&mut data, &mut offset, 279, 4, 1, jpeg_len);

    data[offset..offset + 4].copy_from_slice(&0u32.to_le_bytes());
    data[strip_offset as usize..strip_offset as usize + jpeg_data.len()].copy_from_slice(&jpeg_data);
    data
}

fn split_jpeg_stream(jpeg: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut i = 2;
    while i < jpeg.len() - 1 {
        if jpeg[i] == 0xFF && jpeg[i + 1] == 0xDA {
            let tables = jpeg[2..i].to_vec();
            let scan_data = jpeg[i..jpeg.len() - 2].to_vec();
            return (tables, scan_data);
        }
        if jpeg[i] == 0xFF && jpeg[i + 1] != 0x00 && jpeg[i + 1] != 0xFF {
            if i + 4 <= jpeg.len() {
                let len = u16::from_be_bytes([jpeg[i + 2], jpeg[i + 3]]) as usize;
                i += 2 + len;
            } else {
                break;
            }
        } else {
            i += 1;
        }
    }
    (jpeg[2..jpeg.len() - 2].to_vec(), vec![])
}

fn create_jpeg_tables_blob(tables: &[u8]) -> Vec<u8> {
    let mut blob = vec![0xFF, 0xD8];
    blob.extend(tables);
    blob.extend([0xFF, 0xD9]);
    blob
}

fn create_abbreviated_jpeg(scan_data: &[u8]) -> Vec<u8> {
    let mut abbreviated = vec![0xFF, 0xD8];
    abbreviated.extend(scan_data);
    abbreviated.extend([0xFF, 0xD9]);
    abbreviated
}

/// An SVS-shaped TIFF: abbreviated (tables-less) JPEG tiles plus a
/// JPEGTables tag, and an Aperio-flavored ImageDescription.
pub fn create_svs_with_jpeg_tables() -> Vec<u8> {
    let full_jpeg = create_test_jpeg(256, 256, 90);
    let (tables, scan_data) = split_jpeg_stream(&full_jpeg);
    let jpeg_tables = create_jpeg_tables_blob(&tables);
    let abbreviated_tile = create_abbreviated_jpeg(&scan_data);
    let tile_len = abbreviated_tile.len() as u32;

    let description = b"Aperio Image Library v11.2.1\r\n46920x33014 [0,0,46000,32914] -> 2048x1536 JPEG/RGB Q=30|AppMag = 20|MPP = 0.2500";

    let ifd_offset = 8u32;
    let entry_count = 11u32;
    let ifd_size = 2 + entry_count as usize * 12 + 4;
    let arrays_offset = ifd_offset as usize + ifd_size;

    let tile_count = 48u32;
    let tile_offsets_offset = arrays_offset as u32;
    let tile_byte_counts_offset = tile_offsets_offset + tile_count * 4;
    let jpeg_tables_offset = tile_byte_counts_offset + tile_count * 4;
    let description_offset = jpeg_tables_offset + jpeg_tables.len() as u32;
    let tile_data_offset = description_offset + description.len() as u32 + 1;

    let total_size = tile_data_offset as usize + abbreviated_tile.len() + 100;
    let mut data = vec![0u8; total_size];

    data[0] = b'I';
    data[1] = b'I';
    data[2..4].copy_from_slice(&42u16.to_le_bytes());
    data[4..8].copy_from_slice(&ifd_offset.to_le_bytes());

    let mut offset = ifd_offset as usize;
    data[offset..offset + 2].copy_from_slice(&(entry_count as u16).to_le_bytes());
    offset += 2;

    let write_entry = |data: &mut [u8], offset: &mut usize, tag: u16, typ: u16, count: u32, value: u32| {
        data[*offset..*offset + 2].copy_from_slice(&tag.to_le_bytes());
        data[*offset + 2..*offset + 4].copy_from_slice(&typ.to_le_bytes());
        data[*offset + 4..*offset + 8].copy_from_slice(&count.to_le_bytes());
        data[*offset + 8..*offset + 12].copy_from_slice(&value.to_le_bytes());
        *offset += 12;
    };

    write_entry(&mut data, &mut offset, 256, 4, 1, 2048);
    write_entry(&mut data, &mut offset, 257, 4, 1, 1536);
    write_entry(&mut data, &mut offset, 258, 3, 1, 8);
    write_entry(&mut data, &mut offset, 259, 3, 1, 7);
    write_entry(&mut data, &mut offset, 270, 2, description.len() as u32 + 1, description_offset); // ImageDescription
    write_entry(&mut data, &mut offset, 277, 3, 1, 1);
    write_entry(&mut data, &mut offset, 322, 3, 1, 256);
    write_entry(&mut data, &mut offset, 323, 3, 1, 256);
    write_entry(&mut data, &mut offset, 324, 4, tile_count, tile_offsets_offset);
    write_entry(&mut data, &mut offset, 325, 4, tile_count, tile_byte_counts_offset);
    write_entry(&mut data, &mut offset, 347, 7, jpeg_tables.len() as u32, jpeg_tables_offset); // JPEGTables

    data[offset..offset + 4].copy_from_slice(&0u32.to_le_bytes());

    for i in 0..tile_count {
        let arr_offset = tile_offsets_offset as usize + (i as usize) * 4;
        data[arr_offset..arr_offset + 4].copy_from_slice(&tile_data_offset.to_le_bytes());
    }
    for i in 0..tile_count {
        let arr_offset = tile_byte_counts_offset as usize + (i as usize) * 4;
        data[arr_offset..arr_offset + 4].copy_from_slice(&tile_len.to_le_bytes());
    }

    data[jpeg_tables_offset as usize..jpeg_tables_offset as usize + jpeg_tables.len()].copy_from_slice(&jpeg_tables);
    data[description_offset as usize..description_offset as usize + description.len()].copy_from_slice(description);
    data[description_offset as usize + description.len()] = 0;
    data[tile_data_offset as usize..tile_data_offset as usize + abbreviated_tile.len()].copy_from_slice(&abbreviated_tile);

    data
}
