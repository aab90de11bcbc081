//! Error types for the scheduler.
//!
//! Nothing in here is raised during a tick. Per-tick failures are plain
//! values ([`crate::sanitizer::UselessReason`], [`crate::emergency::CrisisKind`],
//! [`crate::emergency::CancellationShortfall`]); these errors only cover the
//! load and export boundaries.

use thiserror::Error;

/// Result type alias using [`SchedulerError`].
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Top-level error type for scheduler IO boundaries.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Config file does not exist.
    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    /// Failed to read a file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Binary encoding or decoding failed.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Invalid scheduler state.
    #[error("Invalid scheduler state: {0}")]
    InvalidState(String),
}
