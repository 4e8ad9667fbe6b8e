//! Error taxonomy shared by the provider and the HTTP service

use thiserror::Error;

/// Failures reported by a market data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider does not know the ticker, or has no data for it.
    #[error("No data found for symbol: {0}")]
    NotFound(String),

    /// Network failure, timeout, unexpected status or unreadable payload.
    #[error("Upstream error for symbol {symbol}: {message}")]
    Upstream { symbol: String, message: String },

    /// The provider refused the parameter combination, e.g. a one minute
    /// interval over the full listing history.
    #[error("Request rejected for symbol {symbol}: {message}")]
    Rejected { symbol: String, message: String },
}

impl ProviderError {
    pub fn upstream(symbol: &str, message: impl Into<String>) -> Self {
        ProviderError::Upstream {
            symbol: symbol.to_string(),
            message: message.into(),
        }
    }

    pub fn rejected(symbol: &str, message: impl Into<String>) -> Self {
        ProviderError::Rejected {
            symbol: symbol.to_string(),
            message: message.into(),
        }
    }
}

/// Malformed request parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Invalid date range: {start} is not before {end}")]
    InvalidRange { start: String, end: String },
}
