//! Org-unit fixtures in the shape DHIS2 returns from
//! `/api/organisationUnits.geojson`.

use serde_json::{json, Value};

/// A closed square ring, counter-clockwise.
pub fn square_ring(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Vec<[f64; 2]> {
    vec![
        [min_lon, min_lat],
        [max_lon, min_lat],
        [max_lon, max_lat],
        [min_lon, max_lat],
        [min_lon, min_lat],
    ]
}

/// A Polygon feature for one org unit.
pub fn polygon_feature(id: &str, name: &str, level: u32, rings: Vec<Vec<[f64; 2]>>) -> Value {
    json!({
        "type": "Feature",
        "id": id,
        "geometry": { "type": "Polygon", "coordinates": rings },
        "properties": { "name": name, "level": level }
    })
}

/// A square Polygon feature.
pub fn square_feature(id: &str, level: u32, bounds: (f64, f64, f64, f64)) -> Value {
    let (min_lon, min_lat, max_lon, max_lat) = bounds;
    polygon_feature(id, id, level, vec![square_ring(min_lon, min_lat, max_lon, max_lat)])
}

/// Wrap features in a FeatureCollection.
pub fn feature_collection(features: Vec<Value>) -> Value {
    json!({ "type": "FeatureCollection", "features": features })
}

/// Two neighbouring districts at level 2, side by side along the equator.
pub fn two_districts() -> Value {
    feature_collection(vec![
        square_feature("DiszpKrYNg8", 2, (36.0, -0.5, 36.5, 0.0)),
        square_feature("Vth0fbpFcsO", 2, (36.5, -0.5, 37.0, 0.0)),
    ])
}
