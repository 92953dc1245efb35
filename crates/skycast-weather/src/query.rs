//! Query construction for the places and forecast data sources.
//!
//! A search term can be a free-text place (`"Paris"`, `"10001"`,
//! `"Los Angeles, United States"`) or a `latitude,longitude` pair. Coordinate
//! pairs are wrapped in parentheses so the remote API treats them as a point
//! rather than a place name.

use std::str::FromStr;

use skycast_core::Units;

use crate::position::GeoPosition;
use crate::types::WeatherError;

/// Fields selected from the places source unless the caller asks for others.
pub const DEFAULT_LOCATION_FIELDS: &[&str] = &[
    "woeid",
    "name",
    "country",
    "admin1",
    "admin2",
    "locality1",
    "locality2",
    "centroid",
];

/// Fields selected from the forecast source unless the caller asks for others.
pub const DEFAULT_WEATHER_FIELDS: &[&str] = &["*"];

/// Which query template to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Location,
    Weather,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::Location => "location",
            QueryKind::Weather => "weather",
        }
    }
}

impl FromStr for QueryKind {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "location" => Ok(QueryKind::Location),
            "weather" => Ok(QueryKind::Weather),
            other => Err(WeatherError::UnrecognizedQueryKind(other.to_string())),
        }
    }
}

/// Build a query of the given kind for `search_term`.
///
/// `fields` defaults per kind when `None` or empty; `units` defaults to Celsius
/// and only applies to weather queries.
pub fn build_query(
    kind: QueryKind,
    search_term: &str,
    fields: Option<&[&str]>,
    units: Option<Units>,
) -> String {
    let term = normalize_term(search_term);

    match kind {
        QueryKind::Location => location_query(&term, fields),
        QueryKind::Weather => weather_query(&term, fields, units.unwrap_or_default()),
    }
}

/// Same as [`build_query`], with the kind given by name.
///
/// # Errors
///
/// Returns [`WeatherError::UnrecognizedQueryKind`] for anything other than
/// `location` or `weather`.
pub fn query_for(
    kind: &str,
    search_term: &str,
    fields: Option<&[&str]>,
    units: Option<Units>,
) -> Result<String, WeatherError> {
    let kind: QueryKind = kind.parse()?;
    Ok(build_query(kind, search_term, fields, units))
}

fn normalize_term(search_term: &str) -> String {
    if GeoPosition::is_coordinate_pair(search_term) {
        format!("({search_term})")
    } else {
        search_term.replace('\\', "\\\\").replace('"', "\\\"")
    }
}

fn select_list(fields: Option<&[&str]>, defaults: &[&str]) -> String {
    match fields {
        Some(fields) if !fields.is_empty() => fields.join(","),
        _ => defaults.join(","),
    }
}

fn location_query(term: &str, fields: Option<&[&str]>) -> String {
    [
        format!("select {}", select_list(fields, DEFAULT_LOCATION_FIELDS)),
        "from geo.places(1)".to_string(),
        format!("where text=\"{term}\""),
    ]
    .join(" ")
}

fn weather_query(term: &str, fields: Option<&[&str]>, units: Units) -> String {
    [
        format!("select {}", select_list(fields, DEFAULT_WEATHER_FIELDS)),
        "from weather.forecast".to_string(),
        "where woeid in (".to_string(),
        "select woeid from geo.places(1)".to_string(),
        format!("where text=\"{term}\" limit 1"),
        format!(") and u=\"{}\" limit 1", units.code()),
    ]
    .join(" ")
}
