//! Error types for slot-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// An interval with `start >= end`, or a timestamp that failed to parse.
    #[error("Malformed interval: {0}")]
    MalformedInterval(String),

    /// A negative buffer or a non-positive minimum duration.
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
}

pub type Result<T> = std::result::Result<T, SlotError>;
