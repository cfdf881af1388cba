//! Coordinate Reference System handling
//!
//! The pipeline assumes all frames of a run share one grid and one CRS;
//! the type exists so frames can carry and compare that assumption.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CRS {
    /// EPSG code if known
    epsg: Option<u32>,
    /// WKT representation if no EPSG code applies
    wkt: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326), the working CRS of the pipeline
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation if set
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.epsg, &self.wkt) {
            (Some(code), _) => write!(f, "EPSG:{code}"),
            (None, Some(wkt)) => write!(f, "{wkt}"),
            (None, None) => write!(f, "unknown CRS"),
        }
    }
}
