//! Timestamped raster series
//!
//! A `RasterSeries` is the unit of exchange between pipeline stages: an
//! ordered sequence of single-band frames, sorted by timestamp. Stages
//! never mutate a series they received; each stage builds a new one.

use crate::raster::Raster;
use chrono::{DateTime, Datelike, Utc};

/// A single timestamped raster frame
#[derive(Debug, Clone)]
pub struct TimedRaster {
    pub timestamp: DateTime<Utc>,
    pub raster: Raster<f64>,
}

impl TimedRaster {
    pub fn new(timestamp: DateTime<Utc>, raster: Raster<f64>) -> Self {
        Self { timestamp, raster }
    }
}

/// An ordered sequence of raster frames, sorted by timestamp.
///
/// Insertion order of equal timestamps is preserved (stable sort), which
/// keeps joins and temporal reductions deterministic.
#[derive(Debug, Clone, Default)]
pub struct RasterSeries {
    frames: Vec<TimedRaster>,
}

impl RasterSeries {
    /// Build a series from frames, sorting by timestamp
    pub fn from_frames(mut frames: Vec<TimedRaster>) -> Self {
        frames.sort_by_key(|f| f.timestamp);
        Self { frames }
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the series has no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame at index
    pub fn get(&self, index: usize) -> Option<&TimedRaster> {
        self.frames.get(index)
    }

    /// All frames in time order
    pub fn frames(&self) -> &[TimedRaster] {
        &self.frames
    }

    /// Iterate frames in time order
    pub fn iter(&self) -> impl Iterator<Item = &TimedRaster> {
        self.frames.iter()
    }

    /// Timestamp of the first frame
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.frames.first().map(|f| f.timestamp)
    }

    /// Timestamp of the last frame
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.frames.last().map(|f| f.timestamp)
    }

    /// New series holding the frames with `start <= timestamp < end`
    pub fn filter_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> RasterSeries {
        Self {
            frames: self
                .frames
                .iter()
                .filter(|f| f.timestamp >= start && f.timestamp < end)
                .cloned()
                .collect(),
        }
    }

    /// Frames whose timestamp falls in the given 1-indexed calendar month
    pub fn frames_in_month(&self, month: u32) -> Vec<&TimedRaster> {
        self.frames
            .iter()
            .filter(|f| f.timestamp.month() == month)
            .collect()
    }
}

impl IntoIterator for RasterSeries {
    type Item = TimedRaster;
    type IntoIter = std::vec::IntoIter<TimedRaster>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}
