//! Weather and location services for SkyCast
//!
//! Looks places up and fetches forecasts through a structured query API, and
//! locates the user with the system location service, falling back to an
//! IP-based lookup.

mod api;
pub mod device;
pub mod forecast;
pub mod geolocation;
pub mod ip;
pub mod places;
pub mod position;
pub mod provider;
pub mod query;
pub mod types;

pub use device::DeviceLocator;
pub use forecast::WeatherClient;
pub use geolocation::{GeolocationEvent, GeolocationService, SwitchReason, LOCATION_TIMEOUT};
pub use ip::IpLocator;
pub use places::PlaceFinder;
pub use position::{GeoPosition, PlaceInfo, Region};
pub use provider::{LocationProvider, ProviderKind, RawPosition};
pub use query::{build_query, query_for, QueryKind};
pub use skycast_core::Units;
pub use types::*;
