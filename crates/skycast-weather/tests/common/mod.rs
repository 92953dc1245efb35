//! Shared fixtures for the query API integration tests.

#![allow(dead_code)]

use skycast_core::EndpointsConfig;
use wiremock::MockServer;

pub const QUERY_PATH: &str = "/v1/public/yql";

/// Endpoints pointing every service at the mock server.
pub fn endpoints(server: &MockServer) -> EndpointsConfig {
    EndpointsConfig {
        query_url: server.uri(),
        query_path: QUERY_PATH.to_string(),
        geo_ip_url: server.uri(),
        request_timeout_secs: 5,
    }
}

/// Wrap `results` the way the query endpoint does.
pub fn envelope(results: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "query": {
            "count": 1,
            "created": "2026-10-19T18:00:00Z",
            "lang": "en-US",
            "results": results
        }
    })
}

pub fn place_json(woeid: &str, city: &str, region: &str, country: &str) -> serde_json::Value {
    serde_json::json!({
        "woeid": woeid,
        "name": city,
        "country": {"code": "US", "type": "Country", "content": country},
        "admin1": {"code": "US-CA", "type": "State", "content": region},
        "admin2": {"code": "", "type": "County", "content": "Los Angeles County"},
        "locality1": {"type": "Town", "content": city},
        "locality2": null,
        "centroid": {"latitude": "34.053490", "longitude": "-118.245323"}
    })
}

pub fn channel_json(days: usize) -> serde_json::Value {
    let forecast: Vec<serde_json::Value> = (0..days)
        .map(|i| {
            serde_json::json!({
                "code": "32",
                "date": format!("{} Oct 2026", 19 + i),
                "day": "Mon",
                "high": format!("{}", 24 + i),
                "low": "15",
                "text": "Sunny"
            })
        })
        .collect();

    serde_json::json!({
        "channel": {
            "units": {"distance": "km", "pressure": "mb", "speed": "km/h", "temperature": "C"},
            "location": {"city": "Los Angeles", "country": "United States", "region": " CA"},
            "wind": {"chill": "61", "direction": "250", "speed": "14.48"},
            "atmosphere": {"humidity": "63", "pressure": "1015.0", "rising": "0", "visibility": "16.1"},
            "item": {
                "lat": "34.05",
                "long": "-118.24",
                "condition": {
                    "code": "30",
                    "date": "Mon, 19 Oct 2026 11:00 AM PDT",
                    "temp": "22",
                    "text": "Partly Cloudy"
                },
                "forecast": forecast
            }
        }
    })
}
