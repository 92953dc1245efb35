//! Locating the user, with fallback from the device to the IP locator.
//!
//! The service starts on the device provider when one is supplied and
//! available, otherwise on the IP provider. A permission-denied failure moves
//! it to the IP provider for every later call; the failing call itself still
//! returns the error. Each provider change is broadcast as a
//! [`GeolocationEvent`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use skycast_core::Config;
use tokio::sync::broadcast;
use tracing::instrument;

use crate::device::DeviceLocator;
use crate::ip::IpLocator;
use crate::position::GeoPosition;
use crate::provider::{LocationProvider, ProviderKind};
use crate::types::{LocationError, WeatherError};

/// Default time a provider gets to locate the user.
pub const LOCATION_TIMEOUT: Duration = Duration::from_millis(5000);

/// How long past its own deadline a provider may run before the service stops
/// waiting for it.
const PROVIDER_GRACE: Duration = Duration::from_millis(500);

const EVENT_CAPACITY: usize = 16;

/// Why the active provider changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchReason {
    /// The device provider refused access
    PermissionDenied,
    /// A caller asked for a specific provider
    Requested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeolocationEvent {
    ProviderSwitched {
        from: ProviderKind,
        to: ProviderKind,
        reason: SwitchReason,
    },
}

pub struct GeolocationService {
    active: RwLock<Arc<dyn LocationProvider>>,
    fallback: Arc<dyn LocationProvider>,
    timeout: Duration,
    events: broadcast::Sender<GeolocationEvent>,
}

impl std::fmt::Debug for GeolocationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeolocationService")
            .field("active", &self.active_kind())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeolocationService {
    /// Create a service that prefers `device` and falls back to `fallback`.
    pub async fn new(
        device: Option<Arc<dyn LocationProvider>>,
        fallback: Arc<dyn LocationProvider>,
        timeout: Duration,
    ) -> Self {
        let initial = match device {
            Some(device) if device.is_available().await => device,
            Some(device) => {
                tracing::info!(
                    "{} location provider unavailable, using {}",
                    device.kind(),
                    fallback.kind()
                );
                Arc::clone(&fallback)
            }
            None => Arc::clone(&fallback),
        };

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            active: RwLock::new(initial),
            fallback,
            timeout,
            events,
        }
    }

    /// Build the service from configuration: the system location service when
    /// `geolocation.prefer_device` is set, the configured IP locator as fallback.
    pub async fn from_config(config: &Config) -> Result<Self, WeatherError> {
        let fallback: Arc<dyn LocationProvider> =
            Arc::new(IpLocator::from_config(&config.endpoints)?);

        let device = if config.geolocation.prefer_device {
            let locator: Arc<dyn LocationProvider> =
                Arc::new(DeviceLocator::new(config.geolocation.desktop_id.clone()));
            Some(locator)
        } else {
            None
        };

        Ok(Self::new(
            device,
            fallback,
            Duration::from_millis(config.geolocation.timeout_ms),
        )
        .await)
    }

    /// Locate the user with the active provider.
    ///
    /// # Errors
    ///
    /// The classified [`LocationError`] from the provider, or
    /// [`LocationError::Timeout`] when it does not answer in time.
    /// [`LocationError::PermissionDenied`] also switches to the fallback
    /// provider for later calls.
    #[instrument(skip(self), level = "info")]
    pub async fn current(&self) -> Result<GeoPosition, LocationError> {
        let provider = self.active_provider();
        let kind = provider.kind();

        let outcome = tokio::time::timeout(
            self.timeout + PROVIDER_GRACE,
            provider.current_position(self.timeout),
        )
        .await
        .unwrap_or(Err(LocationError::Timeout));

        match outcome {
            Ok(raw) => {
                tracing::debug!("Located via {} provider", kind);
                Ok(GeoPosition::from(raw))
            }
            Err(err) => {
                tracing::warn!(
                    provider = %kind,
                    code = err.code(),
                    "{} ({})",
                    err.user_message(),
                    err
                );
                if err == LocationError::PermissionDenied {
                    self.fall_back_from(&provider);
                }
                Err(err)
            }
        }
    }

    /// Make `provider` the active provider.
    pub fn switch_provider_to(&self, provider: Arc<dyn LocationProvider>) {
        let to = provider.kind();
        let from = {
            let mut active = self.active.write();
            let from = active.kind();
            *active = provider;
            from
        };

        tracing::info!("Switched location provider from {} to {}", from, to);
        self.emit(GeolocationEvent::ProviderSwitched {
            from,
            to,
            reason: SwitchReason::Requested,
        });
    }

    /// The provider `current()` will use next.
    pub fn active_provider(&self) -> Arc<dyn LocationProvider> {
        Arc::clone(&*self.active.read())
    }

    pub fn active_kind(&self) -> ProviderKind {
        self.active.read().kind()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Receive provider changes made from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GeolocationEvent> {
        self.events.subscribe()
    }

    fn fall_back_from(&self, failed: &Arc<dyn LocationProvider>) {
        let switched = {
            let mut active = self.active.write();
            // Another caller may already have switched away from the failed provider.
            if Arc::ptr_eq(&*active, failed) && !Arc::ptr_eq(&*active, &self.fallback) {
                *active = Arc::clone(&self.fallback);
                true
            } else {
                false
            }
        };

        if switched {
            let to = self.fallback.kind();
            tracing::info!("Falling back to {} location provider", to);
            self.emit(GeolocationEvent::ProviderSwitched {
                from: failed.kind(),
                to,
                reason: SwitchReason::PermissionDenied,
            });
        }
    }

    fn emit(&self, event: GeolocationEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}
