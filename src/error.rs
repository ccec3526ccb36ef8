//! # Error Types
//!
//! Custom error types for Crossbar Input using `thiserror`.
//!
//! Only the plumbing around the classifier (configuration, device discovery,
//! journaling) can fail. The classifier itself degrades instead of erroring.

use thiserror::Error;

/// Main error type for Crossbar Input
#[derive(Debug, Error)]
pub enum CrossbarError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Controller access errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// No usable gamepad was found
    #[error("No gamepad found under /dev/input")]
    ControllerNotFound,

    /// Activation journal serialization errors
    #[error("Journal error: {0}")]
    Journal(#[from] serde_json::Error),
}

/// Result type alias for Crossbar Input
pub type Result<T> = std::result::Result<T, CrossbarError>;
