//! Vendor probe chain.
//!
//! A static ordered list of format descriptors decides which vendor decoder
//! opens a file: Leica SCN first (it carries its own unambiguous namespace
//! check), then Aperio SVS (`ImageDescription` sniffing), then generic
//! pyramidal TIFF as the catch-all. A probe that declines cleanly
//! (`FormatNotSupported`) is skipped silently; any other failure becomes a
//! *candidate* error, surfaced only if every later probe also declines.
//!
//! Non-TIFF vendors (SQLite- or DICOM-backed containers) aren't implemented
//! as full decoders here -- see `crate::adapters` -- so the chain below is
//! entirely TIFF-container probes.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::error::SlideError;
use crate::io::PositionedReader;
use crate::model::{Area, AssociatedImage, Level, QuickhashSource};
use crate::properties::{self, PropertyMap};

use super::generic_tiff::GenericTiffReader;
use super::leica::{self, LeicaReader, TileGridHandle};
use super::svs::SvsReader;
use super::tiff::{
    ByteOrder, Compression, Ifd, PyramidLevel, TiffHeader, TiffPyramid, TiffTag, ValueReader,
    BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE,
};

/// The vendor-specific reader backing an opened slide, dispatched by enum
/// rather than trait object: tile reads are generic over the reader type,
/// which would make a trait object not object-safe.
pub enum VendorState {
    Leica {
        reader: LeicaReader,
        grids: BTreeMap<usize, TileGridHandle>,
    },
    Svs(SvsReader),
    GenericTiff(GenericTiffReader),
}

impl VendorState {
    pub fn vendor_name(&self) -> &'static str {
        match self {
            VendorState::Leica { .. } => "Leica SCN",
            VendorState::Svs(_) => "Aperio SVS",
            VendorState::GenericTiff(_) => "Generic Pyramidal TIFF",
        }
    }

    /// `(tiles_across, tiles_down, tile_width, tile_height)` of the
    /// directory at `ifd_index`, regardless of whether it backs a pyramid
    /// level or an associated image.
    pub fn tile_geometry(&self, ifd_index: usize) -> Option<(u32, u32, u32, u32)> {
        match self {
            VendorState::Leica { grids, .. } => grids.get(&ifd_index).map(TileGridHandle::geometry),
            VendorState::Svs(svs) => (0..svs.level_count()).find_map(|i| {
                svs.get_level(i)
                    .filter(|l| l.level.ifd_index == ifd_index)
                    .map(|l| (l.level.tiles_x, l.level.tiles_y, l.level.tile_width, l.level.tile_height))
            }),
            VendorState::GenericTiff(generic) => (0..generic.level_count()).find_map(|i| {
                generic
                    .get_level(i)
                    .filter(|l| l.level.ifd_index == ifd_index)
                    .map(|l| (l.level.tiles_x, l.level.tiles_y, l.level.tile_width, l.level.tile_height))
            }),
        }
    }

    /// Read one tile's compressed bytes (JPEG-table-merged where the vendor
    /// needs it) plus the compression scheme to decode it with.
    pub fn read_tile<R: PositionedReader>(
        &self,
        reader: &R,
        ifd_index: usize,
        col: u32,
        row: u32,
    ) -> Result<(Bytes, Compression), SlideError> {
        match self {
            VendorState::Leica { grids, .. } => {
                let bytes = leica::read_tile(reader, grids, ifd_index, col, row)?;
                let compression = grids
                    .get(&ifd_index)
                    .and_then(TileGridHandle::compression)
                    .ok_or_else(|| SlideError::BadData {
                        context: "Leica SCN tile".to_string(),
                        detail: format!("unsupported compression in directory {ifd_index}"),
                    })?;
                Ok((bytes, compression))
            }
            VendorState::Svs(svs) => {
                let idx = (0..svs.level_count())
                    .find(|&i| svs.get_level(i).map(|l| l.level.ifd_index) == Some(ifd_index))
                    .ok_or_else(|| SlideError::BadData {
                        context: "Aperio SVS tile".to_string(),
                        detail: "Cannot set TIFF directory".to_string(),
                    })?;
                let bytes = svs.read_tile(reader, idx, col, row).map_err(SlideError::from)?;
                let level = svs.get_level(idx).expect("index just resolved above");
                let compression = Compression::from_u16(level.level.compression).ok_or_else(|| SlideError::BadData {
                    context: "Aperio SVS tile".to_string(),
                    detail: format!("unsupported compression: {}", level.level.compression),
                })?;
                Ok((bytes, compression))
            }
            VendorState::GenericTiff(generic) => {
                let idx = (0..generic.level_count())
                    .find(|&i| generic.get_level(i).map(|l| l.level.ifd_index) == Some(ifd_index))
                    .ok_or_else(|| SlideError::BadData {
                        context: "Generic TIFF tile".to_string(),
                        detail: "Cannot set TIFF directory".to_string(),
                    })?;
                let bytes = generic.read_tile(reader, idx, col, row).map_err(SlideError::from)?;
                let level = generic.get_level(idx).expect("index just resolved above");
                let compression = Compression::from_u16(level.level.compression).ok_or_else(|| SlideError::BadData {
                    context: "Generic TIFF tile".to_string(),
                    detail: format!("unsupported compression: {}", level.level.compression),
                })?;
                Ok((bytes, compression))
            }
        }
    }
}

/// Everything a successful probe hands back to the slide façade.
pub struct OpenedSlide {
    pub state: VendorState,
    pub levels: Vec<Level>,
    pub properties: PropertyMap,
    pub associated_images: BTreeMap<String, AssociatedImage>,
    pub quickhash_source: QuickhashSource,
}

/// Run the probe chain against an opened file, returning the first vendor
/// that accepts it.
pub fn detect_and_open<R: PositionedReader>(reader: &R) -> Result<OpenedSlide, SlideError> {
    if reader.size() < BIGTIFF_HEADER_SIZE as u64 {
        return Err(SlideError::FormatNotSupported(
            "file too small to be a valid TIFF".to_string(),
        ));
    }

    let header_bytes = reader
        .read_exact_at(0, BIGTIFF_HEADER_SIZE)
        .map_err(SlideError::from)?;

    if !is_tiff_header(&header_bytes) {
        return Err(SlideError::FormatNotSupported(
            "not a TIFF or BigTIFF file".to_string(),
        ));
    }

    let header = TiffHeader::parse(&header_bytes, reader.size()).map_err(SlideError::from)?;
    let ifds = TiffPyramid::parse_all_ifds(reader, &header).map_err(SlideError::from)?;
    let first_ifd = ifds.first();

    let mut candidate: Option<SlideError> = None;

    match LeicaReader::open(reader) {
        Ok(opened) => {
            return Ok(OpenedSlide {
                state: VendorState::Leica { reader: opened.reader, grids: opened.grids },
                levels: opened.levels,
                properties: opened.properties,
                associated_images: opened.associated_images,
                quickhash_source: opened.quickhash_source,
            })
        }
        Err(SlideError::FormatNotSupported(_)) => {}
        Err(other) => candidate = Some(other),
    }

    if let Some(ifd) = first_ifd {
        let description = read_image_description(reader, ifd, &header)?;
        let looks_aperio = description.as_deref().map(SvsReader::looks_like_aperio).unwrap_or(false);
        if looks_aperio {
            match SvsReader::open(reader) {
                Ok(svs) => return Ok(opened_from_svs(svs)),
                Err(e) => {
                    candidate.get_or_insert(SlideError::from(e));
                }
            }
        }
    }

    match GenericTiffReader::open(reader) {
        Ok(generic) => return Ok(opened_from_generic(generic)),
        Err(e) => {
            candidate.get_or_insert(SlideError::from(e));
        }
    }

    Err(candidate.unwrap_or_else(|| {
        SlideError::FormatNotSupported("no vendor probe recognised this file".to_string())
    }))
}

fn read_image_description<R: PositionedReader>(
    reader: &R,
    ifd: &Ifd,
    header: &TiffHeader,
) -> Result<Option<String>, SlideError> {
    let entry = match ifd.get_entry_by_tag(TiffTag::ImageDescription) {
        Some(e) => e,
        None => return Ok(None),
    };
    let values = ValueReader::new(reader, header);
    let description = values.read_string(entry).map_err(SlideError::from)?;
    Ok(Some(description))
}

fn single_area_level(level: &PyramidLevel) -> Level {
    Level {
        width: level.width,
        height: level.height,
        downsample: level.downsample,
        clicks_per_pixel: 1.0,
        areas: vec![Area {
            ifd_index: level.ifd_index,
            offset_x: 0.0,
            offset_y: 0.0,
            width: level.width,
            height: level.height,
            tile_width: level.tile_width,
            tile_height: level.tile_height,
            tiles_across: level.tiles_x,
            tiles_down: level.tiles_y,
        }],
    }
}

fn opened_from_svs(svs: SvsReader) -> OpenedSlide {
    let levels: Vec<Level> = (0..svs.level_count())
        .filter_map(|i| svs.get_level(i))
        .map(|l| single_area_level(&l.level))
        .collect();

    let mut props = PropertyMap::new();
    props.set(properties::PROP_VENDOR, "aperio");
    let metadata = svs.metadata();
    if let Some(mpp) = metadata.mpp {
        props.set(properties::PROP_MPP_X, mpp.to_string());
        props.set(properties::PROP_MPP_Y, mpp.to_string());
    }
    if let Some(mag) = metadata.magnification {
        props.set(properties::PROP_OBJECTIVE_POWER, mag.to_string());
    }
    for (k, v) in &metadata.properties {
        props.set(format!("aperio.{k}"), v.clone());
    }
    props.set_level_geometry(&levels);

    let quickhash_source = svs
        .get_level(svs.level_count().saturating_sub(1))
        .and_then(|l| l.get_tile_location(0, 0))
        .map(|(offset, len)| QuickhashSource { label: "aperio-svs-smallest-level-tile0", offset, len })
        .unwrap_or(QuickhashSource { label: "aperio-svs-empty", offset: 0, len: 0 });

    OpenedSlide {
        state: VendorState::Svs(svs),
        levels,
        properties: props,
        associated_images: BTreeMap::new(),
        quickhash_source,
    }
}

fn opened_from_generic(generic: GenericTiffReader) -> OpenedSlide {
    let levels: Vec<Level> = (0..generic.level_count())
        .filter_map(|i| generic.get_level(i))
        .map(|l| single_area_level(&l.level))
        .collect();

    let mut props = PropertyMap::new();
    props.set(properties::PROP_VENDOR, "generic-tiff");
    props.set_level_geometry(&levels);

    let quickhash_source = generic
        .get_level(generic.level_count().saturating_sub(1))
        .and_then(|l| l.get_tile_location(0, 0))
        .map(|(offset, len)| QuickhashSource { label: "generic-tiff-smallest-level-tile0", offset, len })
        .unwrap_or(QuickhashSource { label: "generic-tiff-empty", offset: 0, len: 0 });

    OpenedSlide {
        state: VendorState::GenericTiff(generic),
        levels,
        properties: props,
        associated_images: BTreeMap::new(),
        quickhash_source,
    }
}

/// Check if bytes represent a valid TIFF header.
///
/// This is a quick check that can be used before attempting full parsing.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    if bytes.len() < TIFF_HEADER_SIZE {
        return false;
    }

    let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
    if magic != 0x4949 && magic != 0x4D4D {
        return false;
    }

    let byte_order = if magic == 0x4949 {
        ByteOrder::LittleEndian
    } else {
        ByteOrder::BigEndian
    };

    let version = byte_order.read_u16(&bytes[2..4]);
    version == 42 || version == 43
}
