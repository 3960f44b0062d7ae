use crate::backtest::{EngineError, InvalidInterval};
use crate::source::SourceError;
use thiserror::Error;

/// Caller-facing outcomes of a failed backtest request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BacktestError {
    #[error("Unsupported symbol: {0}")]
    UnsupportedSymbol(String),

    #[error("Unsupported interval: {0}")]
    UnsupportedInterval(String),

    #[error("Invalid price window: {0}")]
    InvalidWindow(String),

    #[error("Rate limited, retry in {retry_after_ms}ms")]
    RateLimited { retry_after_ms: i64 },

    #[error("Connectivity error: {0}")]
    ConnectivityError(String),

    #[error("Upstream rate limit: {0}")]
    RateLimitedUpstream(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Insufficient data for analysis")]
    InsufficientData,

    #[error("No trading opportunities found")]
    NoOpportunities,
}

impl BacktestError {
    /// Check if retrying the same request later may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            BacktestError::RateLimited { .. } => true,
            BacktestError::ConnectivityError(_) => true,
            BacktestError::RateLimitedUpstream(_) => true,
            BacktestError::Upstream(_) => true,
            BacktestError::InsufficientData => true,
            BacktestError::UnsupportedSymbol(_) => false,
            BacktestError::UnsupportedInterval(_) => false,
            BacktestError::InvalidWindow(_) => false,
            BacktestError::NoOpportunities => false,
        }
    }

    /// Message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            BacktestError::UnsupportedSymbol(symbol) => {
                format!("Symbol {} is not supported", symbol)
            }
            BacktestError::UnsupportedInterval(interval) => {
                format!("Interval {} is not supported, use 1h, 4h or 1d", interval)
            }
            BacktestError::InvalidWindow(_) => {
                "The configured history window is not valid".to_string()
            }
            BacktestError::RateLimited { retry_after_ms } => format!(
                "Please wait {} seconds between simulations",
                (retry_after_ms + 999) / 1000
            ),
            BacktestError::ConnectivityError(_) => {
                "Connection error. Check your internet connection.".to_string()
            }
            BacktestError::RateLimitedUpstream(_) => {
                "Request limit reached. Please wait a few minutes.".to_string()
            }
            BacktestError::Upstream(e) => format!("Error running the backtest: {}", e),
            BacktestError::InsufficientData => "Not enough data for the analysis".to_string(),
            BacktestError::NoOpportunities => {
                "No trading opportunities found with the current parameters".to_string()
            }
        }
    }
}

impl From<SourceError> for BacktestError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::RateLimit(msg) => BacktestError::RateLimitedUpstream(msg),
            SourceError::NetworkError(msg) => BacktestError::ConnectivityError(msg),
            SourceError::Timeout => {
                BacktestError::ConnectivityError("Connection timeout".to_string())
            }
            SourceError::InvalidSymbol(msg) => BacktestError::UnsupportedSymbol(msg),
            other => BacktestError::Upstream(other.to_string()),
        }
    }
}

impl From<EngineError> for BacktestError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InsufficientData => BacktestError::InsufficientData,
            EngineError::NoOpportunities => BacktestError::NoOpportunities,
        }
    }
}

impl From<InvalidInterval> for BacktestError {
    fn from(err: InvalidInterval) -> Self {
        BacktestError::UnsupportedInterval(err.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_mapping() {
        assert_eq!(
            BacktestError::from(SourceError::RateLimit("429".into())),
            BacktestError::RateLimitedUpstream("429".into())
        );
        assert!(matches!(
            BacktestError::from(SourceError::NetworkError("dns".into())),
            BacktestError::ConnectivityError(_)
        ));
        assert!(matches!(
            BacktestError::from(SourceError::Timeout),
            BacktestError::ConnectivityError(_)
        ));
        assert!(matches!(
            BacktestError::from(SourceError::ParseError("bad".into())),
            BacktestError::Upstream(_)
        ));
    }

    #[test]
    fn test_user_messages() {
        let err = BacktestError::RateLimited {
            retry_after_ms: 20_001,
        };
        assert_eq!(err.user_message(), "Please wait 21 seconds between simulations");
        assert!(err.is_recoverable());
        assert!(!BacktestError::UnsupportedSymbol("X".into()).is_recoverable());
        assert!(!BacktestError::InvalidWindow("0 days".into()).is_recoverable());
    }
}
