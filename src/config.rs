//! Command-line surface for `wsi-inspect`.
//!
//! This is not part of the core library contract (see `SlideError` and
//! `Slide` for that); it's the minimal CLI collaborator called out as
//! standing in for a real C-ABI shim, exercising `open`/`properties`/
//! `read_region` end to end for manual testing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cache::DEFAULT_CAPACITY_BYTES;

/// wsi-inspect - probe, inspect, and extract regions from whole slide images.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-inspect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Emit debug-level logs.
    #[arg(long, global = true, env = "WSI_VERBOSE")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Open a slide and report which vendor recognised it.
    Probe(ProbeArgs),

    /// Open a slide and print its property map.
    Properties(ProbeArgs),

    /// Extract a region and write it as a PNG.
    Region(RegionArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ProbeArgs {
    /// Path to the slide file.
    pub path: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct RegionArgs {
    /// Path to the slide file.
    pub path: PathBuf,

    /// Level-0 x coordinate of the region's top-left corner.
    #[arg(long, allow_hyphen_values = true)]
    pub x: i64,

    /// Level-0 y coordinate of the region's top-left corner.
    #[arg(long, allow_hyphen_values = true)]
    pub y: i64,

    /// Pyramid level to sample at.
    #[arg(long, default_value_t = 0)]
    pub level: usize,

    /// Region width in pixels.
    #[arg(long)]
    pub width: u32,

    /// Region height in pixels.
    #[arg(long)]
    pub height: u32,

    /// Output PNG path.
    #[arg(long, default_value = "region.png")]
    pub out: PathBuf,

    /// Tile cache capacity in bytes.
    #[arg(long, default_value_t = DEFAULT_CAPACITY_BYTES, env = "WSI_CACHE_BYTES")]
    pub cache_bytes: usize,
}
