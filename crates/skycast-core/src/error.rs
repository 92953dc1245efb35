//! Error types shared by the SkyCast crates.
//!
//! Every error carries a `user_message()` safe to print as-is; `Display`
//! keeps the detail for logs.

use thiserror::Error;

/// Top-level error surfaced by the command-line front end.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A weather, place or location failure, already classified by the
    /// service that raised it.
    #[error("{detail}")]
    Service {
        detail: String,
        user_message: &'static str,
    },

    #[error("{0:#}")]
    Other(anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Service { user_message, .. } => *user_message,
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

impl From<anyhow::Error> for AppError {
    /// Recovers typed errors that travelled through `anyhow`.
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ConfigError>() {
            Ok(config) => return AppError::Config(config),
            Err(err) => err,
        };
        match err.downcast::<NetworkError>() {
            Ok(network) => AppError::Network(network),
            Err(err) => AppError::Other(err),
        }
    }
}

/// Transport-level failures talking to a remote service.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("TLS/SSL error: {0}")]
    TlsError(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
            NetworkError::TlsError(_) => "Secure connection failed. Check your network settings.",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => {
                "Invalid configuration. Check config.toml in the SkyCast config directory."
            }
            ConfigError::ParseError(_) => {
                "Configuration file is malformed. Fix or delete it to restore defaults."
            }
        }
    }
}

/// Classifies `reqwest` failures as [`NetworkError`]s.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_recovered_from_anyhow() {
        let err = anyhow::Error::new(ConfigError::Invalid("endpoints.query_url: bad".into()));
        let app: AppError = err.into();
        assert!(matches!(app, AppError::Config(ConfigError::Invalid(_))));
        assert!(app.user_message().starts_with("Invalid configuration"));
    }

    #[test]
    fn test_network_error_recovered_from_anyhow() {
        let app: AppError = anyhow::Error::new(NetworkError::Timeout).into();
        assert!(matches!(app, AppError::Network(NetworkError::Timeout)));
        assert_eq!(app.user_message(), "The request timed out. Please try again.");
    }

    #[test]
    fn test_other_errors_keep_context() {
        let err = anyhow::anyhow!("disk full").context("Failed to write config file");
        let app: AppError = err.into();
        assert!(matches!(app, AppError::Other(_)));
        assert_eq!(app.to_string(), "Failed to write config file: disk full");
    }

    #[test]
    fn test_service_error_keeps_its_message() {
        let app = AppError::Service {
            detail: "Place not found: Atlantis".into(),
            user_message: "Location not found. Check and try again.",
        };
        assert_eq!(app.to_string(), "Place not found: Atlantis");
        assert_eq!(app.user_message(), "Location not found. Check and try again.");
    }

    #[test]
    fn test_server_error_messages_depend_on_status() {
        let upstream = NetworkError::ServerError {
            status: 503,
            message: "down".into(),
        };
        assert!(upstream.user_message().contains("later"));

        let client = NetworkError::ServerError {
            status: 400,
            message: "bad".into(),
        };
        assert_eq!(client.user_message(), "The request failed. Please try again.");
    }
}
