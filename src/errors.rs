use thiserror::Error;

/// Errors raised by the detection engine itself.
///
/// Absent history or market metadata is never an error; those cases are
/// scored as low-confidence inputs instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid trade {key}: {reason}")]
    InvalidTrade { key: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    pub fn invalid_trade(key: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidTrade {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
