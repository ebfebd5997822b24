//! Response envelope decoding.
//!
//! The backend seals every response body, including error bodies. A body is
//! base64 text, optionally wrapped as a JSON string literal, holding an
//! AES-256-GCM envelope whose plaintext is the JSON payload.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use zeroize::Zeroize;

use crate::crypto::{self, EnvelopeError, EnvelopeKey};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Response body is empty")]
    Empty,
    #[error("Response body is not text")]
    NotText,
    #[error("Envelope could not be opened: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("Decrypted body is not the expected JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("Payload could not be serialized: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decrypts and parses envelope bodies with the shared key.
#[derive(Debug, Clone)]
pub struct ResponseDecoder {
    key: EnvelopeKey,
}

impl ResponseDecoder {
    /// Decoder for bodies sealed under `key`.
    pub fn new(key: EnvelopeKey) -> Self {
        Self { key }
    }

    /// Decrypt an envelope body and parse the plaintext as `T`.
    pub fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T, DecodeError> {
        let armored = strip_armor(body)?;
        let mut plaintext = crypto::open_base64(&armored, &self.key)?;

        let result = serde_json::from_slice(&plaintext).map_err(|e| {
            log::error!("Envelope plaintext is not valid JSON: {}", e);
            DecodeError::Json(e)
        });

        plaintext.zeroize();
        result
    }

    /// Seal a value the way the backend does. Used by local tooling and tests.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, DecodeError> {
        let mut json = serde_json::to_vec(value).map_err(DecodeError::Encode)?;
        let result = crypto::seal_base64(&json, &self.key).map_err(DecodeError::Envelope);
        json.zeroize();
        result
    }
}

/// Reduce a raw body to its base64 payload.
fn strip_armor(body: &[u8]) -> Result<String, DecodeError> {
    let text = std::str::from_utf8(body).map_err(|_| DecodeError::NotText)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    if trimmed.starts_with('"') {
        serde_json::from_str::<String>(trimmed).map_err(DecodeError::Json)
    } else {
        Ok(trimmed.to_string())
    }
}
