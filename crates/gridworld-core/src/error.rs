//! Error types for the grid-world core library

use thiserror::Error;

/// Core error type for grid-world operations
#[derive(Error, Debug)]
pub enum GridError {
    /// Invalid or contradictory configuration, raised before any solve begins
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Position outside the grid bounds
    #[error("Invalid position: ({row}, {col}) is outside a {size}x{size} grid")]
    InvalidPosition {
        /// Row index
        row: usize,
        /// Column index
        col: usize,
        /// Grid side length
        size: usize,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GridError {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Result type alias for grid-world operations
pub type Result<T> = std::result::Result<T, GridError>;
