//! wsi-inspect - a small CLI over the `wsi_inspect` library.
//!
//! Exercises `open`/`properties`/`read_region` end to end: `probe` reports
//! which vendor recognised a file, `properties` dumps its metadata, and
//! `region` extracts a rectangle to a PNG.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_inspect::cache::TileCache;
use wsi_inspect::config::{Cli, Command, ProbeArgs, RegionArgs};
use wsi_inspect::grid::RegionBuffer;
use wsi_inspect::slide::Slide;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Probe(args) => run_probe(args),
        Command::Properties(args) => run_properties(args),
        Command::Region(args) => run_region(args),
    }
}

fn run_probe(args: ProbeArgs) -> ExitCode {
    match Slide::open(&args.path) {
        Ok(slide) => {
            println!("vendor: {}", slide.vendor_name());
            println!("levels: {}", slide.level_count());
            for i in 0..slide.level_count() {
                let (w, h) = slide.level_dimensions(i).unwrap_or((0, 0));
                let downsample = slide.level_downsample(i).unwrap_or(1.0);
                println!("  level[{i}]: {w}x{h} (downsample {downsample})");
            }
            for name in slide.associated_image_names() {
                println!("associated image: {name}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("couldn't open {}: {e}", args.path.display());
            ExitCode::FAILURE
        }
    }
}

fn run_properties(args: ProbeArgs) -> ExitCode {
    match Slide::open(&args.path) {
        Ok(slide) => {
            for (key, value) in slide.properties() {
                println!("{key}={value}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("couldn't open {}: {e}", args.path.display());
            ExitCode::FAILURE
        }
    }
}

fn run_region(args: RegionArgs) -> ExitCode {
    let cache = TileCache::new(args.cache_bytes);
    let slide = match Slide::open_with_cache(&args.path, cache) {
        Ok(slide) => slide,
        Err(e) => {
            error!("couldn't open {}: {e}", args.path.display());
            return ExitCode::FAILURE;
        }
    };

    let mut buffer = RegionBuffer::transparent(args.width, args.height);
    if let Err(e) = slide.paint_region(&mut buffer, args.x, args.y, args.level, args.width, args.height) {
        error!("couldn't paint region: {e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = write_png(&buffer, &args.out) {
        error!("couldn't write {}: {e}", args.out.display());
        return ExitCode::FAILURE;
    }

    info!("wrote {}", args.out.display());
    ExitCode::SUCCESS
}

/// Un-premultiply and encode a region buffer as PNG. Premultiplied ARGB32
/// round-trips through straight RGBA by dividing color channels by alpha;
/// fully transparent pixels stay black rather than dividing by zero.
fn write_png(buffer: &RegionBuffer, path: &std::path::Path) -> Result<(), image::ImageError> {
    let mut img = image::RgbaImage::new(buffer.width, buffer.height);
    for (px, argb) in img.pixels_mut().zip(buffer.pixels.iter()) {
        let a = ((*argb >> 24) & 0xFF) as u8;
        let r = ((*argb >> 16) & 0xFF) as u8;
        let g = ((*argb >> 8) & 0xFF) as u8;
        let b = (*argb & 0xFF) as u8;
        let unpremul = |c: u8| -> u8 {
            if a == 0 {
                0
            } else {
                ((c as u32 * 255 + (a as u32 / 2)) / a as u32).min(255) as u8
            }
        };
        *px = image::Rgba([unpremul(r), unpremul(g), unpremul(b), a]);
    }
    img.save(path)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "wsi_inspect=debug" } else { "wsi_inspect=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
