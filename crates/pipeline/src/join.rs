//! Temporal join of two raster series
//!
//! The LST and NDVI products are sampled on different cadences; frames
//! are paired by nearest timestamp within a tolerance window. Primary
//! frames with no match inside the window are dropped silently — a data
//! gap, not an error.

use chrono::{DateTime, Duration, Utc};
use tvdi_core::raster::Raster;
use tvdi_core::series::RasterSeries;

/// Default join tolerance: 3 days
pub fn default_join_tolerance() -> Duration {
    Duration::days(3)
}

/// A co-registered (LST, NDVI) frame pair.
///
/// The timestamp is taken from the primary (LST) side.
#[derive(Debug, Clone)]
pub struct JoinedFrame {
    pub timestamp: DateTime<Utc>,
    pub lst: Raster<f64>,
    pub ndvi: Raster<f64>,
}

/// Join two series by nearest timestamp.
///
/// For each primary frame the secondary frame minimizing the absolute
/// timestamp difference is selected; the pair is kept only if that
/// difference is within `tolerance`. Ties go to the earliest secondary
/// frame in series order, which keeps the join deterministic.
pub fn join_series(
    primary: &RasterSeries,
    secondary: &RasterSeries,
    tolerance: Duration,
) -> Vec<JoinedFrame> {
    let mut joined = Vec::with_capacity(primary.len());

    for frame in primary.iter() {
        let mut best: Option<(Duration, usize)> = None;

        for (idx, candidate) in secondary.iter().enumerate() {
            let diff = (candidate.timestamp - frame.timestamp).abs();
            // Strict comparison: first-encountered wins on equal distance
            if best.map_or(true, |(best_diff, _)| diff < best_diff) {
                best = Some((diff, idx));
            }
        }

        if let Some((diff, idx)) = best {
            if diff <= tolerance {
                joined.push(JoinedFrame {
                    timestamp: frame.timestamp,
                    lst: frame.raster.clone(),
                    ndvi: secondary.frames()[idx].raster.clone(),
                });
            }
        }
    }

    joined
}
