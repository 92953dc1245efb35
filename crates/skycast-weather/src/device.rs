//! Location from the platform's own location service.
//!
//! On Linux this is GeoClue2 over the system D-Bus. Other platforms report the
//! provider as unavailable, which makes the geolocation service start on the IP
//! locator.

use std::time::Duration;

use async_trait::async_trait;

use crate::provider::{LocationProvider, ProviderKind, RawPosition};
use crate::types::LocationError;

/// Provider backed by the operating system's location service.
#[derive(Debug, Clone)]
pub struct DeviceLocator {
    desktop_id: String,
}

impl DeviceLocator {
    /// `desktop_id` identifies the application to the location service, which
    /// uses it when deciding whether to grant access.
    pub fn new(desktop_id: impl Into<String>) -> Self {
        Self {
            desktop_id: desktop_id.into(),
        }
    }

    pub fn desktop_id(&self) -> &str {
        &self.desktop_id
    }
}

#[async_trait]
impl LocationProvider for DeviceLocator {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Device
    }

    async fn is_available(&self) -> bool {
        platform::is_available().await
    }

    async fn current_position(&self, timeout: Duration) -> Result<RawPosition, LocationError> {
        platform::locate(&self.desktop_id, timeout).await
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use futures_util::StreamExt;
    use tokio::time::Instant;
    use zbus::zvariant::OwnedObjectPath;
    use zbus::Connection;

    use crate::provider::RawPosition;
    use crate::types::LocationError;

    const GEOCLUE_SERVICE: &str = "org.freedesktop.GeoClue2";
    /// GCLUE_ACCURACY_LEVEL_CITY; weather does not need street-level fixes.
    const ACCURACY_LEVEL_CITY: u32 = 4;
    /// Upper bound on the bus queries behind `is_available`.
    pub(super) const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

    #[zbus::proxy(
        interface = "org.freedesktop.GeoClue2.Manager",
        default_service = "org.freedesktop.GeoClue2",
        default_path = "/org/freedesktop/GeoClue2/Manager",
        gen_blocking = false
    )]
    trait Manager {
        fn get_client(&self) -> zbus::Result<OwnedObjectPath>;
    }

    #[zbus::proxy(
        interface = "org.freedesktop.GeoClue2.Client",
        default_service = "org.freedesktop.GeoClue2",
        gen_blocking = false
    )]
    trait Client {
        fn start(&self) -> zbus::Result<()>;

        fn stop(&self) -> zbus::Result<()>;

        #[zbus(property)]
        fn set_desktop_id(&self, id: &str) -> zbus::Result<()>;

        #[zbus(property)]
        fn set_requested_accuracy_level(&self, level: u32) -> zbus::Result<()>;

        #[zbus(signal)]
        fn location_updated(
            &self,
            old_location: OwnedObjectPath,
            new_location: OwnedObjectPath,
        ) -> zbus::Result<()>;
    }

    #[zbus::proxy(
        interface = "org.freedesktop.GeoClue2.Location",
        default_service = "org.freedesktop.GeoClue2",
        gen_blocking = false
    )]
    trait Location {
        #[zbus(property)]
        fn latitude(&self) -> zbus::Result<f64>;

        #[zbus(property)]
        fn longitude(&self) -> zbus::Result<f64>;

        #[zbus(property)]
        fn accuracy(&self) -> zbus::Result<f64>;

        #[zbus(property)]
        fn timestamp(&self) -> zbus::Result<(u64, u64)>;
    }

    pub(super) async fn is_available() -> bool {
        match tokio::time::timeout(PROBE_TIMEOUT, probe()).await {
            Ok(available) => available,
            Err(_) => {
                tracing::debug!("Location service probe timed out");
                false
            }
        }
    }

    async fn probe() -> bool {
        let Ok(connection) = Connection::system().await else {
            return false;
        };
        let Ok(dbus) = zbus::fdo::DBusProxy::new(&connection).await else {
            return false;
        };

        let running = dbus.list_names().await.unwrap_or_default();
        let activatable = dbus.list_activatable_names().await.unwrap_or_default();

        running
            .iter()
            .chain(activatable.iter())
            .any(|name| name.as_str() == GEOCLUE_SERVICE)
    }

    pub(super) async fn locate(
        desktop_id: &str,
        timeout: Duration,
    ) -> Result<RawPosition, LocationError> {
        // Setup counts against the same budget as waiting for a fix.
        let deadline = Instant::now() + timeout;

        let connection = Connection::system().await.map_err(classify)?;
        let manager = ManagerProxy::new(&connection).await.map_err(classify)?;
        let client_path = manager.get_client().await.map_err(classify)?;

        let client = ClientProxy::builder(&connection)
            .path(client_path)
            .map_err(classify)?
            .build()
            .await
            .map_err(classify)?;

        client.set_desktop_id(desktop_id).await.map_err(classify)?;
        client
            .set_requested_accuracy_level(ACCURACY_LEVEL_CITY)
            .await
            .map_err(classify)?;

        let mut updates = client.receive_location_updated().await.map_err(classify)?;
        client.start().await.map_err(classify)?;

        let result = match tokio::time::timeout_at(deadline, updates.next()).await {
            Ok(Some(signal)) => match signal.args() {
                Ok(args) => {
                    let location_path = args.new_location().clone();
                    read_location(&connection, location_path).await
                }
                Err(e) => Err(classify(e)),
            },
            Ok(None) => Err(LocationError::PositionUnavailable(
                "location service closed the update stream".to_string(),
            )),
            Err(_) => Err(LocationError::Timeout),
        };

        if let Err(e) = client.stop().await {
            tracing::debug!("Failed to stop location client: {}", e);
        }

        result
    }

    async fn read_location(
        connection: &Connection,
        path: OwnedObjectPath,
    ) -> Result<RawPosition, LocationError> {
        let location = LocationProxy::builder(connection)
            .path(path)
            .map_err(classify)?
            .build()
            .await
            .map_err(classify)?;

        let latitude = location.latitude().await.map_err(classify)?;
        let longitude = location.longitude().await.map_err(classify)?;
        let accuracy = location.accuracy().await.ok();
        let timestamp = location
            .timestamp()
            .await
            .ok()
            .and_then(|(secs, micros)| {
                let secs = i64::try_from(secs).ok()?;
                let nanos = u32::try_from(micros.saturating_mul(1_000)).ok()?;
                DateTime::<Utc>::from_timestamp(secs, nanos)
            })
            .unwrap_or_else(Utc::now);

        Ok(RawPosition {
            latitude,
            longitude,
            accuracy_meters: accuracy,
            timestamp,
        })
    }

    fn classify(err: zbus::Error) -> LocationError {
        match &err {
            zbus::Error::MethodError(name, detail, _) => match name.as_str() {
                "org.freedesktop.DBus.Error.AccessDenied" => LocationError::PermissionDenied,
                "org.freedesktop.DBus.Error.ServiceUnknown"
                | "org.freedesktop.DBus.Error.NameHasNoOwner" => {
                    LocationError::PositionUnavailable(
                        detail.clone().unwrap_or_else(|| name.to_string()),
                    )
                }
                _ => LocationError::Unknown(err.to_string()),
            },
            zbus::Error::FDO(fdo) if matches!(**fdo, zbus::fdo::Error::AccessDenied(_)) => {
                LocationError::PermissionDenied
            }
            zbus::Error::InputOutput(_) | zbus::Error::Address(_) => {
                LocationError::PositionUnavailable(err.to_string())
            }
            _ => LocationError::Unknown(err.to_string()),
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use std::time::Duration;

    use crate::provider::RawPosition;
    use crate::types::LocationError;

    pub(super) async fn is_available() -> bool {
        false
    }

    pub(super) async fn locate(
        _desktop_id: &str,
        _timeout: Duration,
    ) -> Result<RawPosition, LocationError> {
        Err(LocationError::PositionUnavailable(
            "no system location service on this platform".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_locator_kind() {
        let locator = DeviceLocator::new("skycast");
        assert_eq!(locator.kind(), ProviderKind::Device);
        assert_eq!(locator.desktop_id(), "skycast");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_availability_probe_is_bounded() {
        let locator = DeviceLocator::new("skycast");
        let probe = tokio::time::timeout(
            platform::PROBE_TIMEOUT + Duration::from_secs(1),
            locator.is_available(),
        )
        .await;
        assert!(probe.is_ok());
    }

    #[cfg(not(target_os = "linux"))]
    #[tokio::test]
    async fn test_unsupported_platform_is_unavailable() {
        let locator = DeviceLocator::new("skycast");
        assert!(!locator.is_available().await);
        assert!(matches!(
            locator.current_position(Duration::from_secs(1)).await,
            Err(LocationError::PositionUnavailable(_))
        ));
    }
}
