//! Great-circle distance between two lat/lng points.
//!
//! Uses the spherical law of cosines on a sphere of Earth's mean radius,
//! expressed through nautical-mile arc minutes: one minute of arc is one
//! nautical mile, and `1.1515` statute miles per nautical mile.

use serde::{Deserialize, Serialize};

pub const KILOMETERS_PER_MILE: f64 = 1.609_344;
pub const NAUTICAL_MILES_PER_MILE: f64 = 0.8684;

const ARC_MINUTES_PER_DEGREE: f64 = 60.0;
const MILES_PER_ARC_MINUTE: f64 = 1.1515;

/// A latitude/longitude pair in decimal degrees.
///
/// Range is not enforced; out-of-range values still produce a finite distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl std::str::FromStr for GeoPoint {
    type Err = String;

    /// Parses `"<lat>,<lng>"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("expected '<lat>,<lng>', got '{s}'"))?;
        let lat = lat
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
        let lng = lng
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid longitude '{lng}': {e}"))?;
        Ok(Self { lat, lng })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Mile,
    Kilometer,
    NauticalMile,
}

impl DistanceUnit {
    /// Convert a distance in statute miles into this unit.
    #[must_use]
    pub fn from_miles(self, miles: f64) -> f64 {
        match self {
            Self::Mile => miles,
            Self::Kilometer => miles * KILOMETERS_PER_MILE,
            Self::NauticalMile => miles * NAUTICAL_MILES_PER_MILE,
        }
    }
}

/// Great-circle distance from `from` to `to` in `unit`.
///
/// The cosine of the central angle is clamped to `[-1, 1]` before `acos`, so
/// rounding at coincident or antipodal points never yields `NaN`.
#[must_use]
pub fn distance(from: GeoPoint, to: GeoPoint, unit: DistanceUnit) -> f64 {
    if from == to {
        return 0.0;
    }

    let theta = (from.lng - to.lng).to_radians();
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let cos_angle = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * theta.cos();
    let degrees = cos_angle.clamp(-1.0, 1.0).acos().to_degrees();
    let miles = degrees * ARC_MINUTES_PER_DEGREE * MILES_PER_ARC_MINUTE;

    unit.from_miles(miles)
}
