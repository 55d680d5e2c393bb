//! Geographic bounding boxes.

use serde::{Deserialize, Serialize};

// Keeps edges that already sit on the step from being pushed out by rounding noise.
const SNAP_EPSILON: f64 = 1e-9;

/// A WGS84 bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Grow the box by `buffer` degrees on every side.
    pub fn expand(&self, buffer: f64) -> Self {
        Self {
            min_lon: self.min_lon - buffer,
            min_lat: self.min_lat - buffer,
            max_lon: self.max_lon + buffer,
            max_lat: self.max_lat + buffer,
        }
    }

    /// Round the edges outward to a multiple of `step` degrees.
    pub fn snap_outward(&self, step: f64) -> Self {
        Self {
            min_lon: (self.min_lon / step + SNAP_EPSILON).floor() * step,
            min_lat: (self.min_lat / step + SNAP_EPSILON).floor() * step,
            max_lon: (self.max_lon / step - SNAP_EPSILON).ceil() * step,
            max_lat: (self.max_lat / step - SNAP_EPSILON).ceil() * step,
        }
    }

    /// Clamp to valid geographic coordinates.
    pub fn clamp_to_valid(&self) -> Self {
        Self {
            min_lon: self.min_lon.clamp(-180.0, 180.0),
            min_lat: self.min_lat.clamp(-90.0, 90.0),
            max_lon: self.max_lon.clamp(-180.0, 180.0),
            max_lat: self.max_lat.clamp(-90.0, 90.0),
        }
    }

    /// CDS `area` order: `[north, west, south, east]`.
    pub fn to_cds_area(&self) -> [f64; 4] {
        [self.max_lat, self.min_lon, self.min_lat, self.max_lon]
    }
}
