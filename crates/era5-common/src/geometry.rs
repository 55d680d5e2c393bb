//! Organisation-unit boundaries on top of `geo`.
//!
//! Coordinates are `(lon, lat)` pairs in WGS84 degrees, the GeoJSON order.

use geo::{Area, BoundingRect, Contains, Coord, LineString, Point};

pub use geo::{MultiPolygon, Polygon};

use crate::BoundingBox;

/// Build a polygon from GeoJSON-style rings: the first ring is the
/// exterior, the rest are holes. `None` when there are no rings.
pub fn polygon_from_rings(rings: Vec<Vec<(f64, f64)>>) -> Option<Polygon> {
    let mut rings = rings.into_iter().map(LineString::from);
    let exterior = rings.next()?;
    Some(Polygon::new(exterior, rings.collect()))
}

/// Queries the importer makes against a zone boundary.
pub trait AreaExt {
    /// Bounding box of the boundary, `None` when it has no coordinates.
    fn bbox(&self) -> Option<BoundingBox>;

    /// Whether the point lies strictly inside; points in a hole are outside.
    fn covers_point(&self, lon: f64, lat: f64) -> bool;

    /// Whether the boundary encloses a non-zero area.
    fn has_area(&self) -> bool;
}

impl AreaExt for MultiPolygon {
    fn bbox(&self) -> Option<BoundingBox> {
        self.bounding_rect().map(BoundingBox::from)
    }

    fn covers_point(&self, lon: f64, lat: f64) -> bool {
        self.contains(&Point::new(lon, lat))
    }

    fn has_area(&self) -> bool {
        self.unsigned_area() > 0.0
    }
}

impl From<geo::Rect> for BoundingBox {
    fn from(rect: geo::Rect) -> Self {
        let Coord { x: min_lon, y: min_lat } = rect.min();
        let Coord { x: max_lon, y: max_lat } = rect.max();
        BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
    }
}
