//! TVDI CLI - drought classification over a synthetic demo scene
//!
//! Raster catalogs and boundary files are external collaborators of the
//! pipeline; this binary generates a deterministic synthetic year of LST
//! and NDVI frames instead, runs the full pipeline and prints the fitted
//! edge model, the class distribution and the district statistics table.

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tvdi_core::prelude::*;
use tvdi_pipeline::prelude::*;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tvdi")]
#[command(author, version, about = "TVDI drought classification pipeline", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline on a synthetic demo scene and print the results
    Demo {
        /// Grid size (rows and columns)
        #[arg(short, long, default_value = "40")]
        size: usize,
        /// Number of LST frames across the year
        #[arg(short = 'n', long, default_value = "36")]
        frames: usize,
        /// RNG seed for the edge-model pixel sample
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Demo { size, frames, seed } => demo(size, frames, seed),
    }
}

// ─── Demo scene ─────────────────────────────────────────────────────────

fn date(day_offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::days(day_offset)
}

/// Lesotho-like grid: 0.01 degree cells starting at 27E, 28.5S
fn demo_transform() -> GeoTransform {
    GeoTransform::new(27.0, -28.5, 0.01, -0.01)
}

fn lst_dn(celsius: f64) -> u16 {
    ((celsius + 273.15) / 0.02).round() as u16
}

fn ndvi_dn(ndvi: f64) -> i16 {
    (ndvi * 10_000.0).round() as i16
}

/// Synthetic year of raw product frames.
///
/// NDVI follows an east-west gradient with a mild seasonal cycle; LST
/// tracks the dry edge 45 - 10 * NDVI with a wetter band in the south.
/// A sparse checkerboard of low-quality pixels exercises the masking.
fn demo_scene(size: usize, n_frames: usize) -> (Vec<RawFrame<u16>>, Vec<RawFrame<i16>>) {
    let transform = demo_transform();
    let step = 365 / n_frames.max(1) as i64;

    let mut lst_frames = Vec::with_capacity(n_frames);
    let mut ndvi_frames = Vec::with_capacity(n_frames);

    for i in 0..n_frames {
        let season = (i as f64 / n_frames as f64 * std::f64::consts::TAU).sin() * 0.1;

        let mut lst: Raster<u16> = Raster::new(size, size);
        let mut ndvi: Raster<i16> = Raster::new(size, size);
        let mut lst_qc: Raster<u8> = Raster::new(size, size);
        let mut ndvi_qa: Raster<u8> = Raster::new(size, size);

        for row in 0..size {
            for col in 0..size {
                let greenness =
                    (0.15 + 0.6 * col as f64 / size as f64 + season).clamp(-1.0, 1.0);
                let wet_band = if row > size / 2 { -6.0 } else { 0.0 };
                let celsius = 45.0 - 10.0 * greenness + wet_band;

                ndvi.set(row, col, ndvi_dn(greenness)).unwrap();
                lst.set(row, col, lst_dn(celsius)).unwrap();

                // Every 13th pixel is flagged cloudy in the LST product
                let q = if (row * size + col + i) % 13 == 0 { 2 } else { 0 };
                lst_qc.set(row, col, q).unwrap();
                ndvi_qa.set(row, col, 0).unwrap();
            }
        }

        georef(&mut lst, transform);
        georef(&mut ndvi, transform);
        georef(&mut lst_qc, transform);
        georef(&mut ndvi_qa, transform);

        lst_frames.push(RawFrame::new(date(i as i64 * step), lst, lst_qc));
        // NDVI product lags the LST overpass by one day
        ndvi_frames.push(RawFrame::new(date(i as i64 * step + 1), ndvi, ndvi_qa));
    }

    (lst_frames, ndvi_frames)
}

fn georef<T: RasterElement>(raster: &mut Raster<T>, transform: GeoTransform) {
    raster.set_transform(transform);
    raster.set_crs(Some(CRS::wgs84()));
}

fn demo_regions(size: usize) -> (Region, Vec<Region>) {
    let transform = demo_transform();
    let (min_x, min_y, max_x, max_y) = transform.bounds(size, size);
    let mid_x = (min_x + max_x) / 2.0;

    let national = Region::rect("All Districts", min_x, min_y, max_x, max_y);
    let districts = vec![
        Region::rect("West", min_x, min_y, mid_x, max_y),
        Region::rect("East", mid_x, min_y, max_x, max_y),
    ];
    (national, districts)
}

// ─── Demo command ───────────────────────────────────────────────────────

fn demo(size: usize, frames: usize, seed: u64) -> Result<()> {
    let start = Instant::now();
    info!(size, frames, seed, "generating synthetic scene");

    let (lst_frames, ndvi_frames) = demo_scene(size, frames);
    let (national, districts) = demo_regions(size);

    let mut params = PipelineParams::new(date(0), date(365))?;
    params.edge_fit.seed = seed;

    let pipeline = Pipeline::new(params)?;
    let output = pipeline.run(&lst_frames, &ndvi_frames, &national)?;

    println!("Edge model:");
    println!("  wet edge          {:>8.3} C", output.model.wet_edge);
    println!("  dry edge slope    {:>8.3}", output.model.dry_edge_slope);
    println!("  dry edge intercept{:>8.3}", output.model.dry_edge_intercept);
    println!("  fallback          {:>8}", output.model.is_fallback);
    println!();

    let national_mean = region_mean(&output.mean_tvdi, &national);
    match national_mean {
        Some(mean) => println!("Mean TVDI: {mean:.3}"),
        None => println!("Mean TVDI: N/A"),
    }
    println!();

    println!("Class distribution:");
    let mut counts = [0usize; 6];
    for &c in output.classes.data().iter() {
        counts[c.min(5) as usize] += 1;
    }
    for class in 1..=5u8 {
        println!("  {:<18} {:>8}", class_label(class), counts[class as usize]);
    }
    if counts[0] > 0 {
        println!("  {:<18} {:>8}", "Unclassified", counts[0]);
    }
    println!();

    println!("District statistics:");
    println!("  {:<10} {:>10} {:>7} {:>12}", "District", "Mean class", "Class", "Area (km2)");
    for stat in district_stats(&output.classes, &districts) {
        let mean = stat
            .mean_class
            .map_or_else(|| "N/A".to_string(), |m| format!("{m:.3}"));
        let class = stat
            .class
            .map_or_else(|| "N/A".to_string(), |c| c.to_string());
        println!(
            "  {:<10} {:>10} {:>7} {:>12.1}",
            stat.name, mean, class, stat.area_km2
        );
    }

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "demo complete");
    Ok(())
}
