//! Resolved geographic points.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::provider::RawPosition;

#[allow(clippy::expect_used)]
static LAT_LNG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?[0-9]+\.[0-9]+),\s?(-?[0-9]+\.[0-9]+)$").expect("coordinate pattern is valid")
});

/// A code/display-name pair, e.g. `US` / `United States`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
}

/// Place metadata returned by the places API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceInfo {
    pub id: String,
    pub country: Region,
    pub region: Region,
    pub county: Option<String>,
    pub city: Option<String>,
    pub suburb: Option<String>,
}

/// A resolved point on earth, optionally annotated with place metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    latitude: f64,
    longitude: f64,
    info: Option<PlaceInfo>,
    timestamp: DateTime<Utc>,
}

impl GeoPosition {
    pub fn new(
        latitude: f64,
        longitude: f64,
        info: Option<PlaceInfo>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            info,
            timestamp,
        }
    }

    /// Returns true if `s` is a `latitude,longitude` pair of signed decimals,
    /// optionally with a single space after the comma.
    pub fn is_coordinate_pair(s: &str) -> bool {
        LAT_LNG_RE.is_match(s)
    }

    /// Parse a `latitude,longitude` pair in the same format `is_coordinate_pair` accepts.
    pub fn parse_coordinate_pair(s: &str) -> Option<(f64, f64)> {
        let caps = LAT_LNG_RE.captures(s)?;
        let latitude = caps[1].parse().ok()?;
        let longitude = caps[2].parse().ok()?;
        Some((latitude, longitude))
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn info(&self) -> Option<&PlaceInfo> {
        self.info.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Move the position, keeping its metadata and timestamp.
    pub fn set_coordinates(&mut self, latitude: f64, longitude: f64) {
        self.latitude = latitude;
        self.longitude = longitude;
    }

    /// `latitude,longitude` literal suitable for a place or forecast query.
    pub fn coordinate_query(&self) -> String {
        format!(
            "{},{}",
            coordinate_literal(self.latitude),
            coordinate_literal(self.longitude)
        )
    }
}

impl From<RawPosition> for GeoPosition {
    fn from(raw: RawPosition) -> Self {
        Self::new(raw.latitude, raw.longitude, None, raw.timestamp)
    }
}

impl std::fmt::Display for GeoPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<&str> = match &self.info {
            Some(info) => [
                info.city.as_deref(),
                Some(info.region.name.as_str()),
                Some(info.country.name.as_str()),
            ]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect(),
            None => Vec::new(),
        };

        if parts.is_empty() {
            write!(f, "{}, {}", self.latitude, self.longitude)
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// Decimal text for a coordinate that always carries a fractional part,
/// so `34.0` stays recognisable as a coordinate rather than `34`.
pub fn coordinate_literal(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}
