//! Error types for Keepfall.

use thiserror::Error;

/// Top-level error type for Keepfall operations.
///
/// Subsystem crates keep their own error enums and convert into this one at
/// the host boundary.
#[derive(Debug, Error)]
pub enum KeepfallError {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Level construction failed
    #[error("Level error: {0}")]
    Level(String),

    /// Inventory operation rejected
    #[error("Inventory error: {0}")]
    Inventory(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Keepfall operations.
pub type KeepfallResult<T> = Result<T, KeepfallError>;
