//! Error types for Fable.

use thiserror::Error;

/// Top-level error type for Fable operations.
#[derive(Debug, Error)]
pub enum FableError {
    /// Battle construction or bookkeeping errors
    #[error("Battle error: {0}")]
    Battle(#[from] BattleError),

    /// Configuration and content errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Battle-specific errors.
///
/// `MissingData` is a content bug and aborts the construction attempt that hit
/// it. `InvalidOperation` and `InvalidInput` are programmer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleError {
    /// A required blueprint, mapping or array field is absent
    #[error("Missing data: {0}")]
    MissingData(String),

    /// An operation was attempted on the wrong team or in the wrong state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A restore-path setter received an out-of-range value
    #[error("Invalid input for {field}: {value} ({reason})")]
    InvalidInput {
        /// Field being set
        field: &'static str,
        /// Rejected value
        value: u64,
        /// Why it was rejected
        reason: String,
    },
}

impl BattleError {
    /// Shorthand for a [`BattleError::MissingData`].
    #[must_use]
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingData(what.into())
    }

    /// Shorthand for a [`BattleError::InvalidOperation`].
    #[must_use]
    pub fn invalid_operation(what: impl Into<String>) -> Self {
        Self::InvalidOperation(what.into())
    }
}

/// Configuration and content loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed
        path: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// File could not be parsed
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// Path that failed
        path: String,
        /// Parser message
        message: String,
    },
}

/// Result type alias for Fable operations.
pub type FableResult<T> = Result<T, FableError>;

/// Result type alias for battle operations.
pub type BattleResult<T> = Result<T, BattleError>;
