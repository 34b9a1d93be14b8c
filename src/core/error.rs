//! Failure kinds produced while looking up market data for one holding

use thiserror::Error;

/// Per-item lookup failure. Never aborts a batch; the fetcher records it
/// against the holding it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network failure, timeout or non-success HTTP status.
    #[error("Provider unavailable for {symbol}: {message}")]
    ProviderUnavailable { symbol: String, message: String },

    /// Provider answered but has no data for the symbol.
    #[error("No data found for symbol: {0}")]
    NotFound(String),

    /// Provider payload could not be decoded.
    #[error("Failed to parse provider response for {symbol}: {message}")]
    Parse { symbol: String, message: String },
}

impl FetchError {
    pub fn unavailable(symbol: &str, message: impl Into<String>) -> Self {
        FetchError::ProviderUnavailable {
            symbol: symbol.to_string(),
            message: message.into(),
        }
    }

    pub fn parse(symbol: &str, message: impl Into<String>) -> Self {
        FetchError::Parse {
            symbol: symbol.to_string(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FetchError::unavailable("TCS.NS", "HTTP error: 503 Service Unavailable").to_string(),
            "Provider unavailable for TCS.NS: HTTP error: 503 Service Unavailable"
        );
        assert_eq!(
            FetchError::NotFound("XYZ.NS".into()).to_string(),
            "No data found for symbol: XYZ.NS"
        );
        assert!(FetchError::NotFound("XYZ.NS".into()).is_not_found());
        assert!(!FetchError::parse("XYZ.NS", "bad json").is_not_found());
    }
}
