use crate::model::WeatherReading;
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

pub mod weatherapi;

pub use weatherapi::WeatherApiProvider;

/// Why a fetch did not produce a reading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Non-success HTTP status. `message` comes from the body when it has one.
    #[error("{message}")]
    Provider { status: u16, message: String },

    #[error("{0}")]
    Network(String),

    #[error("Failed to parse weather response: {0}")]
    Parse(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,
}

impl FetchError {
    /// Timeouts and cancellations end a fetch without being shown to the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, FetchError::Timeout | FetchError::Cancelled)
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions for `city`, authenticated with `api_key`.
    async fn current(&self, api_key: &str, city: &str) -> Result<WeatherReading, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeout_and_cancel_are_silent() {
        assert!(FetchError::Timeout.is_silent());
        assert!(FetchError::Cancelled.is_silent());
        assert!(!FetchError::Network("offline".into()).is_silent());
        assert!(!FetchError::Parse("eof".into()).is_silent());
        assert!(!FetchError::Provider { status: 400, message: "bad".into() }.is_silent());
    }

    #[test]
    fn provider_error_displays_its_message_only() {
        let err = FetchError::Provider { status: 401, message: "API key is invalid.".into() };
        assert_eq!(err.to_string(), "API key is invalid.");
    }
}
