//! Leica SCN decoder.
//!
//! SCN slides are ordinary tiled TIFFs whose first directory's
//! `ImageDescription` carries an XML document describing a `collection` of
//! one or more `image`s, each contributing a set of `dimension`s (pyramid
//! levels) backed by their own TIFF directory. Unlike Aperio/generic TIFF,
//! more than one TIFF directory can belong to the *same* pyramid level — a
//! brightfield main image next to a fluorescence one, say — each positioned
//! within the level by its own click offset.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Deserialize;

use crate::error::{SlideError, TiffError};
use crate::io::PositionedReader;
use crate::model::{Area, AssociatedImage, Level, QuickhashSource};
use crate::properties::PropertyMap;

use super::jpeg::prepare_tile_jpeg;
use super::tiff::{
    Compression, PyramidLevel, TiffHeader, TiffPyramid, TiffTag, TileData, ValueReader,
    BIGTIFF_HEADER_SIZE,
};

/// The only XML namespace this decoder recognizes.
pub const SCN_NAMESPACE: &str = "http://www.leica-microsystems.com/scn/2010/10/01";

/// Main images must agree on resolution within 2% to be considered the
/// same slide scanned at consistent settings.
const RESOLUTION_SIMILARITY_THRESHOLD: f64 = 0.98;

// =============================================================================
// XML schema
// =============================================================================

#[derive(Debug, Deserialize)]
struct ScnDocument {
    collection: CollectionXml,
}

#[derive(Debug, Deserialize)]
struct CollectionXml {
    #[serde(rename = "@sizeX")]
    size_x: u32,
    #[serde(rename = "@sizeY")]
    size_y: u32,
    #[serde(rename = "@barcode", default)]
    barcode: Option<String>,
    #[serde(rename = "image", default)]
    images: Vec<ImageXml>,
}

#[derive(Debug, Deserialize)]
struct ImageXml {
    #[serde(rename = "creationDate", default)]
    creation_date: Option<String>,
    #[serde(rename = "device", default)]
    device: Option<DeviceXml>,
    #[serde(rename = "scanSettings", default)]
    scan_settings: Option<ScanSettingsXml>,
    view: ViewXml,
    pixels: PixelsXml,
}

#[derive(Debug, Deserialize, Default)]
struct DeviceXml {
    #[serde(rename = "@model", default)]
    model: Option<String>,
    #[serde(rename = "@version", default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScanSettingsXml {
    #[serde(rename = "illuminationSettings", default)]
    illumination_settings: Option<IlluminationSettingsXml>,
}

#[derive(Debug, Deserialize, Default)]
struct IlluminationSettingsXml {
    #[serde(rename = "illuminationSource", default)]
    illumination_source: Option<String>,
    #[serde(rename = "numericalAperture", default)]
    numerical_aperture: Option<f64>,
    #[serde(rename = "objectiveSettings", default)]
    objective_settings: Option<ObjectiveSettingsXml>,
}

#[derive(Debug, Deserialize, Default)]
struct ObjectiveSettingsXml {
    #[serde(default)]
    objective: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ViewXml {
    #[serde(rename = "@sizeX")]
    size_x: f64,
    #[serde(rename = "@sizeY")]
    size_y: f64,
    #[serde(rename = "@offsetX")]
    offset_x: f64,
    #[serde(rename = "@offsetY")]
    offset_y: f64,
}

#[derive(Debug, Deserialize)]
struct PixelsXml {
    #[serde(rename = "dimension", default)]
    dimensions: Vec<DimensionXml>,
}

#[derive(Debug, Deserialize)]
struct DimensionXml {
    #[serde(rename = "@ifd")]
    ifd: usize,
    #[serde(rename = "@sizeX")]
    size_x: u32,
    #[serde(rename = "@sizeY")]
    size_y: u32,
    #[serde(rename = "@z", default)]
    z: u32,
}

// =============================================================================
// Parsed, classified image
// =============================================================================

struct ParsedImage {
    illumination_source: Option<String>,
    numerical_aperture: Option<f64>,
    objective: Option<String>,
    creation_date: Option<String>,
    device_model: Option<String>,
    device_version: Option<String>,
    /// z==0 dimensions, sorted by decreasing width (= increasing downsample).
    dimensions: Vec<DimensionXml>,
    clicks_offset_x: f64,
    clicks_offset_y: f64,
    /// This image's own click width (`view.sizeX`), distinct from the
    /// collection's canvas-wide click width: a non-full-canvas main image
    /// (e.g. one stripe of a multi-area scan) has a smaller view extent
    /// than the collection it's placed in.
    view_size_x: f64,
    is_macro: bool,
}

impl ParsedImage {
    fn is_brightfield(&self) -> bool {
        self.illumination_source
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("brightfield"))
            .unwrap_or(false)
    }

    /// Clicks per pixel at `dim_index`, derived from this image's own view
    /// extent (not the collection's canvas-wide extent).
    fn clicks_per_pixel(&self, dim_index: usize) -> f64 {
        self.view_size_x / self.dimensions[dim_index].size_x as f64
    }
}

fn classify(image: ImageXml, collection: &CollectionXml) -> ParsedImage {
    let mut dimensions: Vec<DimensionXml> = image
        .pixels
        .dimensions
        .into_iter()
        .filter(|d| d.z == 0)
        .collect();
    dimensions.sort_by(|a, b| b.size_x.cmp(&a.size_x));

    let is_macro = image.view.offset_x == 0.0
        && image.view.offset_y == 0.0
        && (image.view.size_x - collection.size_x as f64).abs() < 0.5
        && (image.view.size_y - collection.size_y as f64).abs() < 0.5;

    let illumination = image
        .scan_settings
        .as_ref()
        .and_then(|s| s.illumination_settings.as_ref());

    ParsedImage {
        illumination_source: illumination.and_then(|i| i.illumination_source.clone()),
        numerical_aperture: illumination.and_then(|i| i.numerical_aperture),
        objective: illumination
            .and_then(|i| i.objective_settings.as_ref())
            .and_then(|o| o.objective.clone()),
        creation_date: image.creation_date,
        device_model: image.device.as_ref().and_then(|d| d.model.clone()),
        device_version: image.device.as_ref().and_then(|d| d.version.clone()),
        dimensions,
        clicks_offset_x: image.view.offset_x,
        clicks_offset_y: image.view.offset_y,
        view_size_x: image.view.size_x,
        is_macro,
    }
}

// =============================================================================
// Tile grid (one per TIFF directory a kept dimension references)
// =============================================================================

struct TileGrid {
    pyramid_level: PyramidLevel,
    tile_data: TileData,
}

/// Reader for Leica SCN slides: holds the TIFF header plus one tile grid per
/// directory referenced by a surviving main or macro dimension.
#[derive(Debug)]
pub struct LeicaReader {
    header: TiffHeader,
}

// We keep `header` on the reader for API symmetry with the other vendor
// readers, but tile grids are looked up by ifd index, not by level.
impl LeicaReader {
    pub fn header(&self) -> &TiffHeader {
        &self.header
    }
}

/// Everything a vendor probe produces, independent of the enclosing
/// dispatch enum.
pub struct LeicaOpen {
    pub reader: LeicaReader,
    pub grids: BTreeMap<usize, TileGridHandle>,
    pub levels: Vec<Level>,
    pub properties: PropertyMap,
    pub associated_images: BTreeMap<String, AssociatedImage>,
    pub quickhash_source: QuickhashSource,
}

/// Opaque handle so callers outside this module can read tiles without
/// reaching into `TileGrid`'s private fields.
#[derive(Debug)]
pub struct TileGridHandle(TileGrid);

impl TileGridHandle {
    /// `(tiles_across, tiles_down, tile_width, tile_height)` for this
    /// directory, needed by the grid painter regardless of which level or
    /// associated image the directory backs.
    pub fn geometry(&self) -> (u32, u32, u32, u32) {
        let level = &self.0.pyramid_level;
        (level.tiles_x, level.tiles_y, level.tile_width, level.tile_height)
    }

    pub fn compression(&self) -> Option<Compression> {
        Compression::from_u16(self.0.pyramid_level.compression)
    }
}

impl LeicaReader {
    /// Attempt to open `reader` as a Leica SCN slide.
    ///
    /// Returns `Err(SlideError::FormatNotSupported)` when the first
    /// directory's `ImageDescription` doesn't carry the SCN namespace, so
    /// the probe chain can move on to the next vendor silently.
    pub fn open<R: PositionedReader>(reader: &R) -> Result<LeicaOpen, SlideError> {
        let header_bytes = reader
            .read_exact_at(0, BIGTIFF_HEADER_SIZE)
            .map_err(TiffError::Io)?;
        let header = TiffHeader::parse(&header_bytes, reader.size()).map_err(SlideError::from)?;
        let ifds = TiffPyramid::parse_all_ifds(reader, &header).map_err(SlideError::from)?;

        let first_ifd = ifds
            .first()
            .ok_or_else(|| SlideError::FormatNotSupported("no TIFF directories".to_string()))?;

        let description_entry = first_ifd
            .get_entry_by_tag(TiffTag::ImageDescription)
            .ok_or_else(|| SlideError::FormatNotSupported("no ImageDescription tag".to_string()))?;

        let values = ValueReader::new(reader, &header);
        let description = values
            .read_string(description_entry)
            .map_err(SlideError::from)?;

        if !description.contains(SCN_NAMESPACE) {
            return Err(SlideError::FormatNotSupported(
                "ImageDescription is not an SCN document".to_string(),
            ));
        }

        let document: ScnDocument = crate::adapters::xml::parse(&description, "Couldn't parse SCN metadata")?;

        let collection = document.collection;
        let images: Vec<ParsedImage> = collection
            .images
            .into_iter()
            .map(|img| classify(img, &collection))
            .collect();

        let mut mains: Vec<&ParsedImage> = images
            .iter()
            .filter(|i| !i.is_macro && i.is_brightfield())
            .collect();
        let macros: Vec<&ParsedImage> = images
            .iter()
            .filter(|i| i.is_macro && i.is_brightfield())
            .collect();

        if macros.len() > 1 {
            return Err(SlideError::BadData {
                context: "Leica SCN metadata".to_string(),
                detail: "more than one macro image is not supported".to_string(),
            });
        }

        if mains.is_empty() {
            return Err(SlideError::BadData {
                context: "Leica SCN metadata".to_string(),
                detail: "no brightfield main image found".to_string(),
            });
        }

        let reference = mains.remove(0);
        let reference_dim_count = reference.dimensions.len();
        for other in &mains {
            if other.dimensions.len() != reference_dim_count {
                return Err(SlideError::BadData {
                    context: "Leica SCN metadata".to_string(),
                    detail: "Inconsistent main image resolutions".to_string(),
                });
            }
            if other.illumination_source != reference.illumination_source
                || other.objective != reference.objective
            {
                return Err(SlideError::BadData {
                    context: "Leica SCN metadata".to_string(),
                    detail: "Slides with dissimilar main images are not supported".to_string(),
                });
            }
            for i in 0..reference_dim_count {
                let cpp_ref = reference.clicks_per_pixel(i);
                let cpp_other = other.clicks_per_pixel(i);
                let similarity = cpp_ref.min(cpp_other) / cpp_ref.max(cpp_other);
                if similarity < RESOLUTION_SIMILARITY_THRESHOLD {
                    return Err(SlideError::BadData {
                        context: "Leica SCN metadata".to_string(),
                        detail: "Inconsistent main image resolutions".to_string(),
                    });
                }
            }
        }
        mains.insert(0, reference);

        // Per-level clicks_per_pixel: minimum across participating mains.
        let mut level_cpp = Vec::with_capacity(reference_dim_count);
        for i in 0..reference_dim_count {
            let cpp = mains
                .iter()
                .map(|m| m.clicks_per_pixel(i))
                .fold(f64::INFINITY, f64::min);
            level_cpp.push(cpp);
        }

        // Build a tile grid (and matching Area) for every (main, dimension)
        // still in play, plus the macro's chosen dimension.
        let mut grids: BTreeMap<usize, TileGridHandle> = BTreeMap::new();
        let mut levels = Vec::with_capacity(reference_dim_count);

        for (level_index, &cpp) in level_cpp.iter().enumerate() {
            let width = (collection.size_x as f64 / cpp).ceil() as u32;
            let height = (collection.size_y as f64 / cpp).ceil() as u32;
            let mut areas = Vec::with_capacity(mains.len());

            for main in &mains {
                let dim = &main.dimensions[level_index];
                let ifd = ifds
                    .get(dim.ifd)
                    .ok_or_else(|| SlideError::BadData {
                        context: "Leica SCN metadata".to_string(),
                        detail: format!("dimension references missing directory {}", dim.ifd),
                    })?
                    .clone();

                let compression = ifd.compression(header.byte_order);
                if !compression
                    .and_then(Compression::from_u16)
                    .map(|c| c.is_supported())
                    .unwrap_or(false)
                {
                    return Err(SlideError::BadData {
                        context: "Leica SCN metadata".to_string(),
                        detail: format!("unsupported compression in directory {}", dim.ifd),
                    });
                }

                let pyramid_level = PyramidLevel::from_ifd(ifd, dim.ifd, header.byte_order)
                    .ok_or_else(|| SlideError::BadData {
                        context: "Leica SCN metadata".to_string(),
                        detail: format!("directory {} is not tiled", dim.ifd),
                    })?;

                areas.push(Area {
                    ifd_index: dim.ifd,
                    offset_x: main.clicks_offset_x / cpp,
                    offset_y: main.clicks_offset_y / cpp,
                    width: pyramid_level.width,
                    height: pyramid_level.height,
                    tile_width: pyramid_level.tile_width,
                    tile_height: pyramid_level.tile_height,
                    tiles_across: pyramid_level.tiles_x,
                    tiles_down: pyramid_level.tiles_y,
                });

                if !grids.contains_key(&dim.ifd) {
                    let tile_data = TileData::load(reader, &pyramid_level, &header).map_err(SlideError::from)?;
                    grids.insert(dim.ifd, TileGridHandle(TileGrid { pyramid_level, tile_data }));
                }
            }

            levels.push(Level { width, height, downsample: 1.0, clicks_per_pixel: cpp, areas });
        }
        // Fix downsample relative to level 0 now that all levels exist.
        let base_width = levels[0].width as f64;
        for level in &mut levels {
            level.downsample = base_width / level.width as f64;
        }

        let mut associated_images = BTreeMap::new();
        let macro_image = macros.first();
        if let Some(m) = macro_image {
            if let Some(dim) = m.dimensions.first() {
                let ifd = ifds
                    .get(dim.ifd)
                    .ok_or_else(|| SlideError::BadData {
                        context: "Leica SCN metadata".to_string(),
                        detail: format!("macro references missing directory {}", dim.ifd),
                    })?
                    .clone();
                let pyramid_level = PyramidLevel::from_ifd(ifd, dim.ifd, header.byte_order)
                    .ok_or_else(|| SlideError::BadData {
                        context: "Leica SCN metadata".to_string(),
                        detail: format!("macro directory {} is not tiled", dim.ifd),
                    })?;
                associated_images.insert(
                    "macro".to_string(),
                    AssociatedImage { ifd_index: dim.ifd, width: pyramid_level.width, height: pyramid_level.height },
                );
                if !grids.contains_key(&dim.ifd) {
                    let tile_data = TileData::load(reader, &pyramid_level, &header).map_err(SlideError::from)?;
                    grids.insert(dim.ifd, TileGridHandle(TileGrid { pyramid_level, tile_data }));
                }
            }
        }

        let legacy_mode = macros.len() <= 1 && mains.len() == 1;
        let quickhash_source = if legacy_mode {
            let smallest = mains[0]
                .dimensions
                .last()
                .ok_or_else(|| SlideError::BadData {
                    context: "Leica SCN metadata".to_string(),
                    detail: "Couldn't locate TIFF directory for quickhash".to_string(),
                })?;
            resolve_quickhash_source("leica-scn-legacy-main", smallest.ifd, &grids)?
        } else {
            let m = macro_image.ok_or_else(|| SlideError::BadData {
                context: "Leica SCN metadata".to_string(),
                detail: "Couldn't locate TIFF directory for quickhash".to_string(),
            })?;
            let smallest = m.dimensions.last().ok_or_else(|| SlideError::BadData {
                context: "Leica SCN metadata".to_string(),
                detail: "Couldn't locate TIFF directory for quickhash".to_string(),
            })?;
            resolve_quickhash_source("leica-scn-macro", smallest.ifd, &grids)?
        };

        let mut properties = PropertyMap::new();
        properties.set(crate::properties::PROP_VENDOR, "leica");
        if let Some(barcode) = &collection.barcode {
            properties.set("leica.barcode", barcode.clone());
        }
        if let Some(aperture) = reference.numerical_aperture {
            properties.set("leica.aperture", aperture.to_string());
        }
        if let Some(date) = &reference.creation_date {
            properties.set("leica.creation-date", date.clone());
        }
        if let Some(model) = &reference.device_model {
            properties.set("leica.device-model", model.clone());
        }
        if let Some(version) = &reference.device_version {
            properties.set("leica.device-version", version.clone());
        }
        if let Some(source) = &reference.illumination_source {
            properties.set("leica.illumination-source", source.clone());
        }
        if let Some(objective) = &reference.objective {
            properties.set("leica.objective", objective.clone());
            let power: String = objective.chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
            if !power.is_empty() {
                properties.set(crate::properties::PROP_OBJECTIVE_POWER, power);
            }
        }

        let base_ifd_index = reference.dimensions[0].ifd;
        if let Some(base_ifd) = ifds.get(base_ifd_index) {
            if let (Some(unit_entry), Some(xres_entry), Some(yres_entry)) = (
                base_ifd.get_entry_by_tag(TiffTag::ResolutionUnit),
                base_ifd.get_entry_by_tag(TiffTag::XResolution),
                base_ifd.get_entry_by_tag(TiffTag::YResolution),
            ) {
                let unit = values.read_u32(unit_entry).unwrap_or(2);
                if unit == 3 {
                    if let Ok(xres) = values.read_rational(xres_entry) {
                        properties.set(crate::properties::PROP_MPP_X, (10000.0 / xres).to_string());
                    }
                    if let Ok(yres) = values.read_rational(yres_entry) {
                        properties.set(crate::properties::PROP_MPP_Y, (10000.0 / yres).to_string());
                    }
                }
            }
        }
        properties.set_level_geometry(&levels);

        Ok(LeicaOpen {
            reader: LeicaReader { header },
            grids,
            levels,
            properties,
            associated_images,
            quickhash_source,
        })
    }
}

fn resolve_quickhash_source(
    label: &'static str,
    ifd_index: usize,
    grids: &BTreeMap<usize, TileGridHandle>,
) -> Result<QuickhashSource, SlideError> {
    let grid = grids.get(&ifd_index).ok_or_else(|| SlideError::BadData {
        context: "Leica SCN metadata".to_string(),
        detail: "Couldn't locate TIFF directory for quickhash".to_string(),
    })?;
    let (offset, len) = grid
        .0
        .tile_data
        .get_tile_location(0)
        .ok_or_else(|| SlideError::BadData {
            context: "Leica SCN metadata".to_string(),
            detail: "Couldn't locate TIFF directory for quickhash".to_string(),
        })?;
    Ok(QuickhashSource { label, offset, len })
}

/// Read and JPEG-table-merge a tile from the directory at `ifd_index`.
pub fn read_tile<R: PositionedReader>(
    reader: &R,
    grids: &BTreeMap<usize, TileGridHandle>,
    ifd_index: usize,
    tile_x: u32,
    tile_y: u32,
) -> Result<Bytes, SlideError> {
    let grid = grids.get(&ifd_index).ok_or_else(|| SlideError::BadData {
        context: "Leica SCN tile".to_string(),
        detail: "Cannot set TIFF directory".to_string(),
    })?;
    let tile_index = grid.0.pyramid_level.tile_index(tile_x, tile_y).ok_or_else(|| {
        SlideError::Failed(format!("tile ({tile_x}, {tile_y}) out of range for directory {ifd_index}"))
    })?;
    let (offset, size) = grid
        .0
        .tile_data
        .get_tile_location(tile_index)
        .ok_or_else(|| SlideError::Failed(format!("tile index {tile_index} has no location")))?;
    let raw = reader.read_exact_at(offset, size as usize).map_err(TiffError::Io)?;
    let tables = grid.0.tile_data.jpeg_tables.as_ref();
    Ok(prepare_tile_jpeg(tables.map(|t| t.as_ref()), &raw))
}
