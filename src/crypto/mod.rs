//! Envelope cryptography shared with the inventory backend.
//!
//! Every response body the backend returns is an AES-256-GCM envelope
//! sealed under a key both sides hold.

pub mod envelope;
pub mod kdf;

pub use envelope::{open, open_base64, seal, seal_base64, EnvelopeError, EnvelopeKey};
