//! Error types for the calendar assistant.

use slot_engine::SlotError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    /// Malformed interval or invalid duration from the scheduling core.
    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The language model returned nothing usable.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// A hosted service answered with a non-success status.
    #[error("Provider error (HTTP {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Event not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AssistantError>;

/// Pull `error.message` out of a JSON API error body, falling back to the raw text.
///
/// Both Google and chat-completions APIs nest the message this way.
pub(crate) fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
