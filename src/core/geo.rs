//! Geographic helpers - great-circle distance and UK address fragments.
//!
//! Distances are in miles on a sphere of radius 3959 miles. Out-of-range
//! coordinates do not fail: the distance comes back as `0.0`, so callers that
//! care about data quality should check [`validate_coordinates`] themselves.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// A WGS-84 latitude/longitude pair in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, -90..=90
    pub lat: f64,
    /// Longitude, -180..=180
    pub lng: f64,
}

impl Coordinates {
    /// Builds a coordinate pair.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are inside WGS-84 ranges.
    #[must_use]
    pub fn is_valid(self) -> bool {
        validate_coordinates(self.lat, self.lng)
    }
}

/// Returns true when `|lat| <= 90` and `|lng| <= 180`. NaN is never valid.
#[must_use]
pub fn validate_coordinates(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// Haversine distance in miles between two points.
///
/// Returns `0.0` if either point is out of range.
#[must_use]
pub fn distance_miles(from: Coordinates, to: Coordinates) -> f64 {
    if !from.is_valid() || !to.is_valid() {
        return 0.0;
    }

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlat = (to.lat - from.lat).to_radians();
    let dlng = (to.lng - from.lng).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_MILES * c
}

/// Outward code of a UK postcode, used for redacted display.
///
/// `"SW1A 2AA"` becomes `"SW1A"`, `"M1 1AA"` becomes `"M1"`.
#[must_use]
pub fn extract_postcode_area(postcode: &str) -> &str {
    postcode.split_whitespace().next().unwrap_or("")
}

/// City from a geocoder label shaped like `"street, city, county, postcode, country"`.
#[must_use]
pub fn extract_city_from_label(label: &str) -> &str {
    if label.is_empty() {
        return "";
    }
    let parts: Vec<&str> = label.split(',').map(str::trim).collect();
    if parts.len() >= 3 {
        parts[parts.len() - 3]
    } else {
        parts[0]
    }
}
