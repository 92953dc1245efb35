//! Query endpoint client and the raw payloads it returns.
//!
//! Every response arrives wrapped as `{ "query": { "results": ... } }`; `results`
//! is `null` when nothing matched. Numbers are frequently sent as strings, so
//! numeric fields go through the lenient helpers below.

use std::time::Duration;

use reqwest::Client;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use skycast_core::{EndpointsConfig, ReqwestErrorExt};
use tracing::instrument;

use crate::types::WeatherError;

const USER_AGENT: &str = concat!("SkyCast/", env!("CARGO_PKG_VERSION"));

/// Thin client for the structured query endpoint.
#[derive(Debug, Clone)]
pub(crate) struct QueryApi {
    client: Client,
    endpoint: String,
}

impl QueryApi {
    pub(crate) fn new(endpoints: &EndpointsConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(endpoints.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WeatherError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoints.query_endpoint(),
        })
    }

    /// Run `query` and return the decoded `results`, or `None` when nothing matched.
    #[instrument(skip(self), level = "debug")]
    pub(crate) async fn run<T: DeserializeOwned>(
        &self,
        query: &str,
    ) -> Result<Option<T>, WeatherError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!("Query endpoint returned status {}", status);
            return Err(WeatherError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: QueryEnvelope<T> = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        Ok(envelope.query.results)
    }
}

#[derive(Debug, Deserialize)]
struct QueryEnvelope<T> {
    query: QueryBody<T>,
}

#[derive(Debug, Deserialize)]
struct QueryBody<T> {
    results: Option<T>,
}

/// Either a single record or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaceResults {
    pub place: OneOrMany<ApiPlace>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPlace {
    #[serde(deserialize_with = "string_or_number")]
    pub woeid: String,
    pub country: ApiPlaceName,
    pub admin1: ApiPlaceName,
    #[serde(default)]
    pub admin2: Option<ApiPlaceName>,
    #[serde(default)]
    pub locality1: Option<ApiPlaceName>,
    #[serde(default)]
    pub locality2: Option<ApiPlaceName>,
    pub centroid: ApiCentroid,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPlaceName {
    #[serde(default)]
    pub code: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCentroid {
    #[serde(deserialize_with = "lenient_f64")]
    pub latitude: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelResults {
    pub channel: ApiChannel,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiChannel {
    pub units: ApiUnits,
    pub location: ApiLocation,
    #[serde(default)]
    pub wind: ApiWind,
    #[serde(default)]
    pub atmosphere: ApiAtmosphere,
    pub item: ApiItem,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUnits {
    pub distance: String,
    pub pressure: String,
    pub speed: String,
    pub temperature: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiLocation {
    pub city: String,
    #[serde(default)]
    pub region: String,
    pub country: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiWind {
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub chill: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub direction: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiAtmosphere {
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub pressure: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub rising: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub visibility: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiItem {
    #[serde(deserialize_with = "lenient_f64")]
    pub lat: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub long: f64,
    pub condition: ApiCondition,
    #[serde(default)]
    pub forecast: Vec<ApiDay>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCondition {
    #[serde(deserialize_with = "lenient_i32")]
    pub code: i32,
    #[serde(default)]
    pub date: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub temp: f64,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiDay {
    #[serde(deserialize_with = "lenient_i32")]
    pub code: i32,
    pub date: String,
    pub day: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub high: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub low: f64,
    pub text: String,
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A number that may be sent as a JSON number or as a numeric string.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    number_from_value(&value)
        .ok_or_else(|| D::Error::custom(format!("expected a number, got {value}")))
}

/// Like [`lenient_f64`], but `null`, empty or non-numeric values become `None`.
pub(crate) fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

pub(crate) fn lenient_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| D::Error::custom(format!("expected an integer, got {value}")))
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_numbers_accept_strings() {
        let centroid: ApiCentroid =
            serde_json::from_str(r#"{"latitude": "34.05", "longitude": -118.25}"#).unwrap();
        assert_eq!(centroid.latitude, 34.05);
        assert_eq!(centroid.longitude, -118.25);
    }

    #[test]
    fn test_lenient_numbers_reject_garbage() {
        let result: Result<ApiCentroid, _> =
            serde_json::from_str(r#"{"latitude": "north", "longitude": 1.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_optional_numbers_tolerate_blanks() {
        let atmosphere: ApiAtmosphere = serde_json::from_str(
            r#"{"humidity": "81", "pressure": "1015.0", "rising": "0", "visibility": ""}"#,
        )
        .unwrap();
        assert_eq!(atmosphere.humidity, Some(81.0));
        assert_eq!(atmosphere.rising, Some(0.0));
        assert_eq!(atmosphere.visibility, None);
    }

    #[test]
    fn test_place_results_accept_single_object_or_list() {
        let place = serde_json::json!({
            "woeid": 2442047,
            "country": {"code": "US", "content": "United States"},
            "admin1": {"code": "US-CA", "content": "California"},
            "centroid": {"latitude": "34.05", "longitude": "-118.24"}
        });

        let single: PlaceResults =
            serde_json::from_value(serde_json::json!({ "place": place.clone() })).unwrap();
        assert_eq!(single.place.into_vec().len(), 1);

        let many: PlaceResults =
            serde_json::from_value(serde_json::json!({ "place": [place.clone(), place] }))
                .unwrap();
        let places = many.place.into_vec();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].woeid, "2442047");
    }

    #[test]
    fn test_null_results_decode_as_none() {
        let envelope: QueryEnvelope<PlaceResults> =
            serde_json::from_str(r#"{"query": {"count": 0, "results": null}}"#).unwrap();
        assert!(envelope.query.results.is_none());
    }
}
