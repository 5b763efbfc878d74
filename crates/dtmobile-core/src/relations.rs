//! Linked locations and groups: geometry extraction and per-location distance.

use serde::Serialize;
use serde_json::Value;

use crate::geo::{distance, DistanceUnit, GeoPoint, KILOMETERS_PER_MILE};

/// Verbatim geometry taken from a location's raw geocoder payload.
///
/// `Value::Null` when the payload has no `results[0].geometry`.
pub type Geometry = Value;

#[derive(Debug, Clone, PartialEq)]
pub struct LinkedLocation {
    pub id: i64,
    pub display_name: String,
    /// Raw geocoder response; the point lives at `results[0].geometry.location`.
    pub raw_geometry: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedGroup {
    pub id: i64,
    #[serde(rename = "post_title")]
    pub display_name: String,
    pub permalink: String,
}

/// Distance from the reference location to one linked location.
///
/// Both fields are `None` when the location has no usable geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistancePair {
    pub miles: Option<f64>,
    pub kilometers: Option<f64>,
}

impl DistancePair {
    pub const UNKNOWN: Self = Self {
        miles: None,
        kilometers: None,
    };

    #[must_use]
    pub fn from_miles(miles: f64) -> Self {
        Self {
            miles: Some(miles),
            kilometers: Some(miles * KILOMETERS_PER_MILE),
        }
    }
}

/// Outcome of looking for a point inside a geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryLookup {
    Present(GeoPoint),
    /// Some level of the path is missing, or the geometry is empty.
    Absent,
    /// `location` exists but `lat`/`lng` are not numbers.
    Malformed,
}

/// `raw.results[0].geometry`, cloned, or `Value::Null`.
#[must_use]
pub fn extract_geometry(raw: &Value) -> Geometry {
    raw.get("results")
        .and_then(|results| results.get(0))
        .and_then(|first| first.get("geometry"))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Find `location.{lat,lng}` inside a geometry.
#[must_use]
pub fn locate(geometry: &Geometry) -> GeometryLookup {
    if is_empty_value(geometry) {
        return GeometryLookup::Absent;
    }
    let Some(location) = geometry.get("location").filter(|l| !is_empty_value(l)) else {
        return GeometryLookup::Absent;
    };
    match (
        location.get("lat").and_then(coordinate),
        location.get("lng").and_then(coordinate),
    ) {
        (Some(lat), Some(lng)) => GeometryLookup::Present(GeoPoint { lat, lng }),
        _ => GeometryLookup::Malformed,
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}

fn coordinate(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Relationship fields of one contact, each parallel to its source list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedRelations {
    pub locations: Vec<String>,
    pub locations_geometry: Vec<Geometry>,
    pub distances: Vec<DistancePair>,
    pub groups: Vec<LinkedGroup>,
}

/// Package linked locations and groups, measuring each location from
/// `user_location` in the order given.
#[must_use]
pub fn resolve_relations(
    locations: &[LinkedLocation],
    groups: &[LinkedGroup],
    user_location: GeoPoint,
) -> ResolvedRelations {
    let mut resolved = ResolvedRelations {
        locations: Vec::with_capacity(locations.len()),
        locations_geometry: Vec::with_capacity(locations.len()),
        distances: Vec::with_capacity(locations.len()),
        groups: groups.to_vec(),
    };

    for location in locations {
        let geometry = extract_geometry(&location.raw_geometry);
        let pair = match locate(&geometry) {
            GeometryLookup::Present(point) => {
                DistancePair::from_miles(distance(user_location, point, DistanceUnit::Mile))
            }
            GeometryLookup::Absent => DistancePair::UNKNOWN,
            GeometryLookup::Malformed => {
                tracing::debug!(
                    location_id = location.id,
                    "location geometry has a non-numeric point; distance unknown"
                );
                DistancePair::UNKNOWN
            }
        };

        resolved.locations.push(location.display_name.clone());
        resolved.locations_geometry.push(geometry);
        resolved.distances.push(pair);
    }

    resolved
}
