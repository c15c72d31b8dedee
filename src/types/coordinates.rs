//! Map coordinates and nearby points of interest.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback map center used before any address is resolved (Riyadh).
pub const FALLBACK_LAT: f64 = 24.7136;
pub const FALLBACK_LNG: f64 = 46.6753;

/// A validated (lat, lng) pair.
///
/// Construction goes through [`Coordinates::new`], so a value of this type is
/// always finite and in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = String;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Coordinates::new(raw.lat, raw.lng)
            .ok_or_else(|| format!("invalid coordinates ({}, {})", raw.lat, raw.lng))
    }
}

impl Coordinates {
    /// Build a coordinate pair, rejecting non-finite or out-of-range values
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }

    /// Parse the string lat/lon pair Nominatim returns
    pub fn parse(lat: &str, lon: &str) -> Option<Self> {
        let lat = lat.trim().parse().ok()?;
        let lng = lon.trim().parse().ok()?;
        Self::new(lat, lng)
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl Default for Coordinates {
    fn default() -> Self {
        Self {
            lat: FALLBACK_LAT,
            lng: FALLBACK_LNG,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// A shop near the selected location, rendered as an auxiliary marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyStore {
    pub coordinates: Coordinates,
    pub display_name: String,
}
