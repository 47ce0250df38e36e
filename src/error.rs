//! Error types for the playback engine.
//!
//! Every failure class a collaborator can produce maps to a variant here, so
//! callers can turn it into an observable degraded state ("translation
//! unavailable", "audio unavailable") instead of letting it propagate past
//! the view.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    // Network / transport failures and non-success statuses.
    #[error("Fetch failed: {message}")]
    Fetch { message: String },

    // A referenced resource expired or never existed server-side.
    #[error("Resource not found: {what}")]
    NotFound { what: String },

    // Auth collaborator signaled re-authentication; propagated, never handled here.
    #[error("Session expired; re-authentication required")]
    SessionExpired,

    // Payload failed the Track/Subtitle shape contract.
    #[error("Malformed payload: {message}")]
    MalformedData { message: String },

    // A previous generation for this content key failed; retry must be forced.
    #[error("Audio generation previously failed for this line")]
    AudioFailed,

    // Generation nominally succeeded but the byte stream could not be fetched.
    #[error("Audio bytes unavailable for generated handle: {message}")]
    AudioBytes { message: String },

    #[error("Audio playback failed: {message}")]
    Playback { message: String },

    #[error("Operation cancelled at stage={stage}")]
    Cancelled { stage: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::Fetch {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::MalformedData {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
