//! Error Types for the ETF Advisor

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Invalid investor profile: {0}")]
    InvalidProfile(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Price unavailable for {0}")]
    PriceUnavailable(String),

    #[error("Instrument not supported: {0}")]
    UnsupportedInstrument(String),

    #[error("Market data provider error: {0}")]
    Provider(String),

    #[error("Timed out fetching {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AdvisorError {
    /// Stable machine-readable code for API consumers
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidProfile(_) => "invalid_profile",
            Self::Config(_) => "config_error",
            Self::PriceUnavailable(_) => "price_unavailable",
            Self::UnsupportedInstrument(_) => "unsupported_instrument",
            Self::Provider(_) => "provider_error",
            Self::Timeout(_) => "timeout",
            Self::Network(_) => "network_error",
            Self::Serialization(_) => "serialization_error",
        }
    }

    /// Whether retrying the same request could succeed
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Timeout(_) | Self::Network(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidProfile(msg) => format!("The investment request is invalid: {msg}"),
            Self::Config(_) => "The advisor is misconfigured. Please contact the operator.".into(),
            Self::PriceUnavailable(symbol) => format!("No current price is available for {symbol}."),
            Self::UnsupportedInstrument(symbol) => format!("{symbol} is not in the supported fund list."),
            Self::Provider(_) | Self::Timeout(_) | Self::Network(_) => {
                "Market data is temporarily unavailable. Please try again shortly.".into()
            }
            Self::Serialization(_) => "The market data could not be read.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_retryability() {
        let err = AdvisorError::InvalidProfile("available_capital must be numeric".into());
        assert_eq!(err.code(), "invalid_profile");
        assert!(!err.is_retryable());
        assert!(err.user_message().contains("available_capital"));

        let err = AdvisorError::Timeout("0050".into());
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Timed out fetching 0050");
    }
}
