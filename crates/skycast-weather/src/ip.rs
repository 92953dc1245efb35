//! Approximate location from the caller's public IP address.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use skycast_core::{EndpointsConfig, ReqwestErrorExt};
use tracing::instrument;

use crate::api::lenient_f64;
use crate::provider::{LocationProvider, ProviderKind, RawPosition};
use crate::types::{LocationError, WeatherError};

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    #[serde(deserialize_with = "lenient_f64")]
    latitude: f64,
    #[serde(deserialize_with = "lenient_f64")]
    longitude: f64,
    #[serde(default)]
    city: Option<String>,
}

/// Provider backed by an IP geolocation service exposing `GET <base>/json`.
#[derive(Debug, Clone)]
pub struct IpLocator {
    client: Client,
    url: String,
}

impl IpLocator {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| WeatherError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(endpoints: &EndpointsConfig) -> Result<Self, WeatherError> {
        Self::new(
            &endpoints.geo_ip_url,
            Duration::from_secs(endpoints.request_timeout_secs),
        )
    }

    fn lookup_url(&self) -> String {
        format!("{}/json", self.url)
    }
}

#[async_trait]
impl LocationProvider for IpLocator {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ip
    }

    #[instrument(skip(self), level = "debug")]
    async fn current_position(&self, timeout: Duration) -> Result<RawPosition, LocationError> {
        let response = self
            .client
            .get(self.lookup_url())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| LocationError::from(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LocationError::PositionUnavailable(format!(
                "IP lookup returned status {status}"
            )));
        }

        let body: IpLookupResponse = response.json().await.map_err(|e| {
            LocationError::PositionUnavailable(format!("Malformed IP lookup response: {e}"))
        })?;

        tracing::debug!(
            city = body.city.as_deref().unwrap_or("unknown"),
            "Located by IP at {}, {}",
            body.latitude,
            body.longitude
        );

        Ok(RawPosition {
            latitude: body.latitude,
            longitude: body.longitude,
            accuracy_meters: None,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_locates_from_json_endpoint() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ip": "203.0.113.7",
                "city": "Los Angeles",
                "latitude": 34.0544,
                "longitude": "-118.2441"
            })))
            .mount(&mock_server)
            .await;

        let locator = IpLocator::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
        let pos = locator
            .current_position(Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(pos.latitude, 34.0544);
        assert_eq!(pos.longitude, -118.2441);
        assert!(pos.accuracy_meters.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_position_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let locator = IpLocator::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
        let err = locator
            .current_position(Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, LocationError::PositionUnavailable(ref m) if m.contains("503")));
        assert_eq!(err.code(), 2);
    }

    #[tokio::test]
    async fn test_malformed_body_is_position_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ip": "203.0.113.7"
            })))
            .mount(&mock_server)
            .await;

        let locator = IpLocator::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
        let err = locator
            .current_position(Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, LocationError::PositionUnavailable(_)));
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"latitude": 1.0, "longitude": 2.0}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let locator = IpLocator::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
        let err = locator
            .current_position(Duration::from_millis(50))
            .await
            .unwrap_err();

        assert_eq!(err, LocationError::Timeout);
    }

    #[test]
    fn test_lookup_url_trims_trailing_slash() {
        let locator = IpLocator::new("https://freegeoip.net/", Duration::from_secs(1)).unwrap();
        assert_eq!(locator.lookup_url(), "https://freegeoip.net/json");
        assert_eq!(locator.kind(), ProviderKind::Ip);
    }
}
