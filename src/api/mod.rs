//! API access layer for the inventory backend.
//!
//! Provides the authenticated request gateway, envelope decoding, the entity
//! router for generic updates, and create-path error normalization.

pub mod auth;
pub mod client;
pub mod decode;
pub mod endpoints;
pub mod error;
pub mod router;
pub mod types;

#[cfg(test)]
mod tests;

pub use auth::{
    KeychainSession, Session, SessionFile, SessionStore, SharedToken, StaticToken, TokenSource,
};
pub use client::ApiClient;
pub use decode::{DecodeError, ResponseDecoder};
pub use endpoints::{fill_id, Resource};
pub use error::{normalize_failure, ApiError, FailureMessage, FALLBACK_MESSAGE};
pub use router::EntityKind;
pub use types::CallOptions;
