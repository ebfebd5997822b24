//! Console configuration from environment variables.
//!
//! The binary loads `.env` first (dotenvy), then reads:
//! `INVENTORY_API_URL`, `INVENTORY_ENVELOPE_KEY` (64 hex chars) or
//! `INVENTORY_ENVELOPE_PASSPHRASE`, `INVENTORY_SESSION` (`file` | `keychain`)
//! and `INVENTORY_TOKEN` (overrides the stored session).

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::api::auth::{
    KeychainSession, SessionError, SessionFile, SessionStore, StaticToken, TokenSource,
};
use crate::api::{ApiClient, ResponseDecoder};
use crate::crypto::{EnvelopeError, EnvelopeKey};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

const API_URL_VAR: &str = "INVENTORY_API_URL";
const ENVELOPE_KEY_VAR: &str = "INVENTORY_ENVELOPE_KEY";
const ENVELOPE_PASSPHRASE_VAR: &str = "INVENTORY_ENVELOPE_PASSPHRASE";
const SESSION_VAR: &str = "INVENTORY_SESSION";
const TOKEN_VAR: &str = "INVENTORY_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Set {ENVELOPE_KEY_VAR} or {ENVELOPE_PASSPHRASE_VAR}")]
    MissingEnvelopeKey,
    #[error("Invalid envelope key: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("Unknown session backend {0:?} (expected \"file\" or \"keychain\")")]
    UnknownSessionBackend(String),
    #[error("Session store unavailable: {0}")]
    Session(#[from] SessionError),
}

/// Where the login session is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionBackend {
    #[default]
    File,
    Keychain,
}

impl FromStr for SessionBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(SessionBackend::File),
            "keychain" => Ok(SessionBackend::Keychain),
            _ => Err(ConfigError::UnknownSessionBackend(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub api_url: String,
    pub envelope_key: EnvelopeKey,
    pub session: SessionBackend,
    /// Fixed token taking precedence over the stored session.
    pub token_override: Option<String>,
}

impl ConsoleConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let envelope_key = if let Some(hex_key) = get(ENVELOPE_KEY_VAR) {
            EnvelopeKey::from_hex(&hex_key)?
        } else if let Some(passphrase) = get(ENVELOPE_PASSPHRASE_VAR) {
            EnvelopeKey::from_passphrase(&passphrase)?
        } else {
            return Err(ConfigError::MissingEnvelopeKey);
        };

        let session = match get(SESSION_VAR) {
            Some(name) => name.parse()?,
            None => SessionBackend::default(),
        };

        Ok(Self {
            api_url: get(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            envelope_key,
            session,
            token_override: get(TOKEN_VAR),
        })
    }

    /// The configured persistent session store.
    pub fn session_store(&self) -> Result<Box<dyn SessionStore>, ConfigError> {
        Ok(match self.session {
            SessionBackend::File => Box::new(SessionFile::default_location()?),
            SessionBackend::Keychain => Box::new(KeychainSession::new()),
        })
    }

    /// Token source for the gateway: the override if set, else the session store.
    pub fn token_source(&self) -> Result<Arc<dyn TokenSource>, ConfigError> {
        if let Some(token) = &self.token_override {
            return Ok(Arc::new(StaticToken::new(token.clone())));
        }
        Ok(match self.session {
            SessionBackend::File => Arc::new(SessionFile::default_location()?),
            SessionBackend::Keychain => Arc::new(KeychainSession::new()),
        })
    }

    /// Gateway client for the configured backend, key and token source.
    pub fn build_client(&self) -> Result<ApiClient, ConfigError> {
        Ok(ApiClient::new(
            &self.api_url,
            self.token_source()?,
            ResponseDecoder::new(self.envelope_key.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            ConsoleConfig::from_lookup(lookup(&[(ENVELOPE_PASSPHRASE_VAR, "shop-secret")])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.session, SessionBackend::File);
        assert_eq!(config.token_override, None);
    }

    #[test]
    fn test_all_settings() {
        let hex_key = "ab".repeat(32);
        let config = ConsoleConfig::from_lookup(lookup(&[
            (API_URL_VAR, "https://shop.example.com/api"),
            (ENVELOPE_KEY_VAR, hex_key.as_str()),
            (SESSION_VAR, "Keychain"),
            (TOKEN_VAR, "tok"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://shop.example.com/api");
        assert_eq!(config.session, SessionBackend::Keychain);
        assert_eq!(config.token_override.as_deref(), Some("tok"));
        assert!(config.token_source().unwrap().token().unwrap().is_some());
    }

    #[test]
    fn test_hex_key_wins_over_passphrase() {
        let hex_key = "01".repeat(32);
        let config = ConsoleConfig::from_lookup(lookup(&[
            (ENVELOPE_KEY_VAR, hex_key.as_str()),
            (ENVELOPE_PASSPHRASE_VAR, "ignored"),
        ]))
        .unwrap();

        let sealed = crate::crypto::seal(b"{}", &config.envelope_key).unwrap();
        let expected = EnvelopeKey::from_bytes([0x01; 32]);
        assert!(crate::crypto::open(&sealed, &expected).is_ok());
    }

    #[test]
    fn test_missing_key() {
        let result = ConsoleConfig::from_lookup(lookup(&[(ENVELOPE_KEY_VAR, "  ")]));
        assert!(matches!(result, Err(ConfigError::MissingEnvelopeKey)));
    }

    #[test]
    fn test_bad_key_and_backend() {
        let result = ConsoleConfig::from_lookup(lookup(&[(ENVELOPE_KEY_VAR, "1234")]));
        assert!(matches!(result, Err(ConfigError::Envelope(_))));

        let result = ConsoleConfig::from_lookup(lookup(&[
            (ENVELOPE_PASSPHRASE_VAR, "p"),
            (SESSION_VAR, "cookie"),
        ]));
        assert!(matches!(result, Err(ConfigError::UnknownSessionBackend(_))));
    }
}
