//! # TVDI Core
//!
//! Core types for the TVDI drought classification pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic single-band raster grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS`: Coordinate Reference System handling
//! - `RasterSeries`: Timestamped, time-sorted sequence of raster frames
//! - `Region`: Named polygon regions (national boundary, districts)
//! - Shared error types

pub mod crs;
pub mod error;
pub mod raster;
pub mod region;
pub mod series;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use region::{Region, RegionSet};
pub use series::{RasterSeries, TimedRaster};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::region::{Region, RegionSet};
    pub use crate::series::{RasterSeries, TimedRaster};
}
