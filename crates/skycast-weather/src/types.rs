use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use skycast_core::{AppError, NetworkError};

/// Unit labels reported by the forecast API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSystem {
    pub distance: String,
    pub pressure: String,
    pub speed: String,
    pub temperature: String,
}

/// Where a forecast applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastLocation {
    pub city: String,
    pub region: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub chill: Option<f64>,
    pub direction: Option<f64>,
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Atmosphere {
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub rising: Option<f64>,
    pub visibility: Option<f64>,
}

/// Current condition merged with today's temperature range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayCondition {
    pub code: i32,
    pub date: String,
    pub temperature: f64,
    pub text: String,
    pub high: f64,
    pub low: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Today {
    pub wind: Wind,
    pub atmosphere: Atmosphere,
    pub condition: TodayCondition,
}

/// One day of the forecast sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub code: i32,
    pub date: String,
    pub day: String,
    pub high: f64,
    pub low: f64,
    pub text: String,
}

impl DailyForecast {
    /// Calendar date of this entry, when upstream uses the `19 Oct 2026` form.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%d %b %Y").ok()
    }
}

/// Normalized forecast for a single place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub date: DateTime<Utc>,
    pub units: UnitSystem,
    pub location: ForecastLocation,
    pub today: Today,
    /// Remaining days; never contains today's entry
    pub week: Vec<DailyForecast>,
}

/// Geolocation failures, classified the same way for every provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location unavailable: {0}")]
    PositionUnavailable(String),
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Unknown(String),
}

impl LocationError {
    /// Numeric code matching the W3C geolocation error codes (0 for unknown).
    pub fn code(&self) -> u16 {
        match self {
            Self::PermissionDenied => 1,
            Self::PositionUnavailable(_) => 2,
            Self::Timeout => 3,
            Self::Unknown(_) => 0,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "You denied permission for geolocation. Falling back to IP based location"
            }
            Self::PositionUnavailable(_) => "We couldn't find you on the map.",
            Self::Timeout => "Sorry! we ran out of time localizing you.",
            Self::Unknown(_) => "An unknown error occurred.",
        }
    }
}

impl From<NetworkError> for LocationError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::Timeout => Self::Timeout,
            NetworkError::ConnectionFailed(msg) | NetworkError::InvalidResponse(msg) => {
                Self::PositionUnavailable(msg)
            }
            NetworkError::ServerError { status, message } => {
                Self::PositionUnavailable(format!("{status}: {message}"))
            }
            NetworkError::TlsError(msg) => Self::Unknown(msg),
        }
    }
}

/// Weather, place lookup and query construction errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Unrecognized query type: {0}")]
    UnrecognizedQueryKind(String),
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Place not found: {0}")]
    PlaceNotFound(String),
    #[error("Forecast unavailable: {source}")]
    ForecastUnavailable {
        #[source]
        source: Box<WeatherError>,
    },
    #[error("Location error: {0}")]
    Location(#[from] LocationError),
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl WeatherError {
    /// Wrap an upstream failure of a forecast lookup.
    pub fn forecast_unavailable(cause: WeatherError) -> Self {
        match cause {
            already @ Self::ForecastUnavailable { .. } => already,
            other => Self::ForecastUnavailable {
                source: Box::new(other),
            },
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnrecognizedQueryKind(_) => "Unsupported query. This is a bug, please report it.",
            Self::Network(e) => e.user_message(),
            Self::Api { status, .. } if *status >= 500 => {
                "Weather service unavailable. Please try again later."
            }
            Self::Api { .. } => "Weather service error. Please try again.",
            Self::Parse(_) => "Received an unexpected response. Please try again.",
            Self::PlaceNotFound(_) => "Location not found. Check and try again.",
            Self::ForecastUnavailable { source } => match source.as_ref() {
                Self::PlaceNotFound(_) => "Location not found. Check and try again.",
                _ => "Forecast unavailable right now. Please try again later.",
            },
            Self::Location(e) => e.user_message(),
            Self::Client(_) => "Unable to start the network client.",
        }
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::Network(net) => AppError::Network(net),
            other => AppError::Service {
                detail: other.to_string(),
                user_message: other.user_message(),
            },
        }
    }
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        AppError::Service {
            detail: e.to_string(),
            user_message: e.user_message(),
        }
    }
}
