//! Region aggregation
//!
//! Reduces rasters over named polygon regions: spatial means, per-frame
//! region time series, monthly composites and the district statistics
//! table. A region with zero valid pixels yields `None`, not an error —
//! the UI shows it as "N/A".

use crate::composite::mean_composite;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tvdi_core::raster::{Raster, RasterElement};
use tvdi_core::region::Region;
use tvdi_core::series::RasterSeries;

/// Per-region statistics row
#[derive(Debug, Clone, Serialize)]
pub struct RegionStat {
    /// Region (district) name
    pub name: String,
    /// Spatial mean of the classification raster, `None` for empty regions
    pub mean_class: Option<f64>,
    /// Mean rounded to the nearest class integer
    pub class: Option<u8>,
    /// Geodesic polygon area in square kilometers
    pub area_km2: f64,
}

/// Spatial mean of a raster over a region.
///
/// Pixels whose center lies inside the region contribute; nodata pixels
/// are excluded. Returns `None` when no valid pixel falls in the region.
pub fn region_mean<T: RasterElement>(raster: &Raster<T>, region: &Region) -> Option<f64> {
    let (rows, cols) = raster.shape();
    let mut sum = 0.0;
    let mut count = 0usize;

    for row in 0..rows {
        for col in 0..cols {
            let value = unsafe { raster.get_unchecked(row, col) };
            if raster.is_nodata(value) {
                continue;
            }
            let (x, y) = raster.pixel_to_geo(col, row);
            if !region.contains(x, y) {
                continue;
            }
            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }
    }

    (count > 0).then(|| sum / count as f64)
}

/// Per-frame region mean across a series (time-series chart data).
///
/// One entry per frame, in time order; frames where the region has no
/// valid pixel carry `None`.
pub fn region_series(
    series: &RasterSeries,
    region: &Region,
) -> Vec<(DateTime<Utc>, Option<f64>)> {
    series
        .iter()
        .map(|f| (f.timestamp, region_mean(&f.raster, region)))
        .collect()
}

/// Mean raster of all frames falling in a calendar month (1-indexed).
///
/// Returns `None` when the month has no frames.
pub fn monthly_mean(series: &RasterSeries, month: u32) -> Option<Raster<f64>> {
    assert!(
        (1..=12).contains(&month),
        "month must be in 1..=12, got {month}"
    );

    let frames = series.frames_in_month(month);
    if frames.is_empty() {
        return None;
    }

    let refs: Vec<&Raster<f64>> = frames.iter().map(|f| &f.raster).collect();
    mean_composite(&refs).ok()
}

/// One statistics row per district: mean class, rounded class, area.
///
/// Districts that do not intersect any classified pixel get `None` for
/// both class columns; the area is computed from the geometry either way.
pub fn district_stats(class_raster: &Raster<u8>, districts: &[Region]) -> Vec<RegionStat> {
    districts
        .iter()
        .map(|district| {
            let mean_class = region_mean(class_raster, district);
            RegionStat {
                name: district.name().to_string(),
                mean_class,
                class: mean_class.map(|m| m.round() as u8),
                area_km2: district.area_km2(),
            }
        })
        .collect()
}
