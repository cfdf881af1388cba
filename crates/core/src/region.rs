//! Named polygon regions
//!
//! A `Region` is a named boundary (the national polygon or one district)
//! used for sampling, clipping and aggregation. Geometry coordinates are
//! geographic lon/lat (WGS84); areas are geodesic, not planar.

use geo::{Contains, GeodesicArea};
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon};

/// A named region with a multi-polygon boundary
#[derive(Debug, Clone)]
pub struct Region {
    name: String,
    geometry: MultiPolygon<f64>,
}

impl Region {
    /// Create a region from a multi-polygon
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }

    /// Create a region from a single polygon
    pub fn from_polygon(name: impl Into<String>, polygon: Polygon<f64>) -> Self {
        Self::new(name, MultiPolygon::new(vec![polygon]))
    }

    /// Axis-aligned rectangular region (min_x, min_y, max_x, max_y)
    pub fn rect(name: impl Into<String>, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        let ring = LineString::from(vec![
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: min_y },
            Coord { x: max_x, y: max_y },
            Coord { x: min_x, y: max_y },
            Coord { x: min_x, y: min_y },
        ]);
        Self::from_polygon(name, Polygon::new(ring, vec![]))
    }

    /// Region name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Region geometry
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Whether the point (x, y) lies inside the region
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.geometry.contains(&Point::new(x, y))
    }

    /// Geodesic area in square kilometers (WGS84 ellipsoid)
    pub fn area_km2(&self) -> f64 {
        self.geometry.geodesic_area_unsigned() / 1e6
    }
}

/// A collection of named regions (the district set)
#[derive(Debug, Clone, Default)]
pub struct RegionSet {
    regions: Vec<Region>,
}

impl RegionSet {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn push(&mut self, region: Region) {
        self.regions.push(region);
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Find a region by name
    pub fn by_name(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name() == name)
    }

    /// Region names, sorted alphabetically (dropdown order)
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.regions.iter().map(|r| r.name()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains() {
        let region = Region::rect("test", 27.0, -30.0, 29.0, -28.0);
        assert!(region.contains(28.0, -29.0));
        assert!(!region.contains(26.5, -29.0));
        assert!(!region.contains(28.0, -31.0));
    }

    #[test]
    fn test_geodesic_area_plausible() {
        // ~1 degree square near 29 degrees south: roughly 100km x 111km
        let region = Region::rect("square", 28.0, -29.0, 29.0, -28.0);
        let area = region.area_km2();
        assert!(area > 9_000.0 && area < 13_000.0, "area = {area}");
    }

    #[test]
    fn test_region_set_lookup() {
        let set = RegionSet::new(vec![
            Region::rect("Maseru", 27.0, -30.0, 28.0, -29.0),
            Region::rect("Berea", 27.5, -29.5, 28.5, -28.5),
        ]);
        assert_eq!(set.by_name("Berea").unwrap().name(), "Berea");
        assert!(set.by_name("Quthing").is_none());
        assert_eq!(set.names(), vec!["Berea", "Maseru"]);
    }
}
