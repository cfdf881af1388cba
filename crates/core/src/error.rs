//! Error types shared across the TVDI workspace

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for TVDI pipeline operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Series contains no frames")]
    EmptySeries,

    #[error("No usable sample pairs for edge fitting")]
    EmptySample,

    #[error("Invalid date range: start {start} must precede end {end}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for TVDI pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
