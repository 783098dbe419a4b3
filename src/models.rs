use std::fmt;

use serde::{Deserialize, Serialize};

/// A worker position in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both coordinates are finite and inside the valid degree ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_to(&self, other: &Location) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Identifier of a facility known to the index, kept exactly as delivered.
///
/// Usually a uuid, but never parsed or normalized: the stored answer must
/// carry the same string the facility list does.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(String);

impl FacilityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for FacilityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for FacilityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

/// A facility as delivered by the spatial index.
///
/// `coordinates` follows GeoJSON order: `[lng, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityCandidate {
    pub uuid: FacilityId,
    pub name: String,
    pub coordinates: [f64; 2],
    #[serde(default)]
    pub properties: FacilityProperties,
}

impl FacilityCandidate {
    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn location(&self) -> Location {
        Location::new(self.lat(), self.lng())
    }

    pub fn sector(&self) -> Option<&str> {
        self.properties.sector.as_deref()
    }
}
