//! Org-unit boundaries from `/api/organisationUnits.geojson`.
//!
//! The envelope is read loosely and each feature is parsed on its own, so
//! one broken boundary does not cost the whole level.

use era5_common::{polygon_from_rings, AreaExt, MultiPolygon, Polygon};
use geojson::{Feature, PolygonType, Value as GeometryValue};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::Dhis2Error;
use crate::types::OrgUnit;

/// Features of a DHIS2 org-unit FeatureCollection, not yet parsed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrgUnitFeatures {
    #[serde(default)]
    pub features: Vec<Value>,
}

impl OrgUnitFeatures {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Split features into org units with a polygonal boundary and the ids
    /// of those without a usable one. Features with no id are dropped.
    pub fn into_org_units(self) -> (Vec<OrgUnit>, Vec<String>) {
        let mut org_units = Vec::with_capacity(self.features.len());
        let mut skipped = Vec::new();

        for value in self.features {
            let Some(id) = value.get("id").and_then(Value::as_str).map(str::to_string) else {
                continue;
            };
            match org_unit(id.clone(), value) {
                Ok(Some(org_unit)) => org_units.push(org_unit),
                Ok(None) => skipped.push(id),
                Err(e) => {
                    warn!(error = %e, "Unreadable org unit boundary");
                    skipped.push(id);
                }
            }
        }

        (org_units, skipped)
    }
}

fn org_unit(id: String, value: Value) -> Result<Option<OrgUnit>, Dhis2Error> {
    let feature = Feature::from_json_value(value).map_err(|e| Dhis2Error::Geometry {
        id: id.clone(),
        reason: e.to_string(),
    })?;

    let Some(geometry) = feature.geometry.as_ref().and_then(|g| area(&g.value)) else {
        return Ok(None);
    };

    let name = feature
        .property("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| id.clone());
    let level = feature
        .property("level")
        .and_then(Value::as_u64)
        .and_then(|l| u32::try_from(l).ok());

    Ok(Some(OrgUnit {
        id,
        name,
        level,
        geometry,
    }))
}

/// Polygonal area of a geometry; `None` for points, lines and degenerate rings.
fn area(value: &GeometryValue) -> Option<MultiPolygon> {
    let polygons: Vec<Polygon> = match value {
        GeometryValue::Polygon(rings) => polygon(rings).into_iter().collect(),
        GeometryValue::MultiPolygon(polygons) => polygons.iter().filter_map(polygon).collect(),
        _ => return None,
    };
    let multi = MultiPolygon::new(polygons);
    multi.has_area().then_some(multi)
}

// Altitude, if present, is ignored.
fn polygon(rings: &PolygonType) -> Option<Polygon> {
    let rings = rings
        .iter()
        .map(|ring| {
            ring.iter()
                .filter(|p| p.len() >= 2)
                .map(|p| (p[0], p[1]))
                .collect()
        })
        .collect();
    polygon_from_rings(rings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn features(features: Vec<Value>) -> OrgUnitFeatures {
        serde_json::from_value(json!({ "type": "FeatureCollection", "features": features }))
            .unwrap()
    }

    fn feature(id: &str, geometry: Value) -> Value {
        json!({
            "type": "Feature",
            "id": id,
            "geometry": geometry,
            "properties": { "name": id, "level": 3 }
        })
    }

    #[test]
    fn test_polygon_with_hole() {
        let (org_units, skipped) = features(vec![feature(
            "ou",
            json!({
                "type": "Polygon",
                "coordinates": [
                    [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]],
                    [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 2.0], [1.0, 1.0]]
                ]
            }),
        )])
        .into_org_units();

        assert!(skipped.is_empty());
        let geometry = &org_units[0].geometry;
        assert_eq!(geometry.0.len(), 1);
        assert_eq!(geometry.0[0].interiors().len(), 1);
        assert!(!geometry.covers_point(1.5, 1.5));
        assert!(geometry.covers_point(3.0, 3.0));
        assert_eq!(org_units[0].level, Some(3));
    }

    #[test]
    fn test_multipolygon_with_altitude() {
        let (org_units, _) = features(vec![feature(
            "ou",
            json!({
                "type": "MultiPolygon",
                "coordinates": [
                    [[[0.0, 0.0, 10.0], [1.0, 0.0, 10.0], [1.0, 1.0, 10.0], [0.0, 0.0, 10.0]]],
                    [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]]
                ]
            }),
        )])
        .into_org_units();

        let geometry = &org_units[0].geometry;
        assert_eq!(geometry.0.len(), 2);
        assert_eq!(geometry.0[0].exterior().0[1].x, 1.0);
        assert_eq!(geometry.0[0].exterior().0[1].y, 0.0);
    }

    #[test]
    fn test_point_is_not_an_area() {
        let (org_units, skipped) = features(vec![feature(
            "facility",
            json!({ "type": "Point", "coordinates": [36.8, -1.3] }),
        )])
        .into_org_units();
        assert!(org_units.is_empty());
        assert_eq!(skipped, vec!["facility".to_string()]);
    }

    #[test]
    fn test_malformed_coordinates_are_skipped() {
        let (org_units, skipped) = features(vec![feature(
            "bad",
            json!({ "type": "Polygon", "coordinates": "nope" }),
        )])
        .into_org_units();
        assert!(org_units.is_empty());
        assert_eq!(skipped, vec!["bad".to_string()]);
    }

    #[test]
    fn test_feature_without_id_is_dropped() {
        let mut anonymous = feature("x", json!(null));
        anonymous.as_object_mut().unwrap().remove("id");
        let (org_units, skipped) = features(vec![anonymous]).into_org_units();
        assert!(org_units.is_empty());
        assert!(skipped.is_empty());
    }
}
