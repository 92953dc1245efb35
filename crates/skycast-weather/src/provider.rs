use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::LocationError;

/// Which kind of source a provider is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Platform location service (GPS, Wi-Fi positioning, ...)
    Device,
    /// Approximate position from the public IP address
    Ip,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Device => f.write_str("device"),
            ProviderKind::Ip => f.write_str("ip"),
        }
    }
}

/// Position as reported by a provider, before it becomes a `GeoPosition`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// A source of the user's current position.
#[async_trait]
pub trait LocationProvider: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> ProviderKind;

    /// Whether this provider can be used in the current environment.
    async fn is_available(&self) -> bool {
        true
    }

    /// Locate the user, giving up after `timeout`.
    async fn current_position(&self, timeout: Duration) -> Result<RawPosition, LocationError>;
}
