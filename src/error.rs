//! Error types for the evaluation and allocation engine.
//!
//! Only malformed input and invalid configuration are errors. Business
//! outcomes (no edge, unaffordable unit, depleted bankroll) are returned as
//! successful results carrying a decision and reason.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed or out-of-range opportunity, bankroll or commission data.
    #[error("Invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },

    /// Threshold, multiplier or commission values outside their valid domain.
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },
}

impl EngineError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Field named by an `InvalidInput` error.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidInput { field, .. } => Some(field),
            Self::Configuration { .. } => None,
        }
    }
}
