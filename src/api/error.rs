//! Error taxonomy of the API layer and create-path message normalization.

use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use super::auth::SessionError;
use super::decode::{DecodeError, ResponseDecoder};

/// Message shown when nothing better can be recovered from a failure.
pub const FALLBACK_MESSAGE: &str = "Something went wrong";

/// Outcome of trying to explain a failed create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureMessage {
    /// The backend explained the failure in its (encrypted) error body.
    Decoded(String),
    /// No usable explanation: no body, undecryptable body, or no message field.
    Fallback,
}

impl FailureMessage {
    /// The decoded message, or [`FALLBACK_MESSAGE`].
    pub fn as_str(&self) -> &str {
        match self {
            FailureMessage::Decoded(message) => message,
            FailureMessage::Fallback => FALLBACK_MESSAGE,
        }
    }
}

impl fmt::Display for FailureMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status. `body` is the raw, still-encrypted error body.
    #[error("Server responded with {status}")]
    Status { status: StatusCode, body: Vec<u8> },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid {entity} entity: missing identifier")]
    MissingIdentifier { entity: String },

    #[error("Unsupported entity type: {0}")]
    UnsupportedEntity(String),

    /// A create call failed; `message` is what the user should see.
    #[error("{message}")]
    Create {
        message: FailureMessage,
        #[source]
        source: Box<ApiError>,
    },

    #[error("Session unavailable: {0}")]
    Session(#[from] SessionError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Text for a user-facing notification.
    ///
    /// Only create failures carry a normalized message; everything else gets
    /// the generic fallback.
    pub fn user_message(&self) -> &str {
        match self {
            ApiError::Create { message, .. } => message.as_str(),
            _ => FALLBACK_MESSAGE,
        }
    }

    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            ApiError::Create { source, .. } => source.status(),
            _ => None,
        }
    }

    /// True for validation failures raised before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ApiError::MissingIdentifier { .. } | ApiError::UnsupportedEntity(_)
        )
    }
}

/// Recover a human message from a failed create call.
///
/// Never fails: an error without a body, or a body that does not decrypt to
/// JSON with a `message` or `error` string, yields [`FailureMessage::Fallback`].
pub fn normalize_failure(err: &ApiError, decoder: &ResponseDecoder) -> FailureMessage {
    let body = match err {
        ApiError::Status { body, .. } if !body.is_empty() => body,
        _ => return FailureMessage::Fallback,
    };

    match decoder.decode::<Value>(body) {
        Ok(value) => extract_message(&value)
            .map(FailureMessage::Decoded)
            .unwrap_or(FailureMessage::Fallback),
        Err(e) => {
            log::warn!("Error body could not be decoded: {}", e);
            FailureMessage::Fallback
        }
    }
}

fn extract_message(value: &Value) -> Option<String> {
    ["message", "error"].iter().find_map(|field| {
        value
            .get(field)?
            .as_str()
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string)
    })
}
