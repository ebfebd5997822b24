//! AES-256-GCM response envelopes.
//!
//! Sealed format: IV (12 bytes) || Ciphertext || Auth Tag (16 bytes).
//! On the wire the sealed bytes travel as standard base64 text.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::Engine;
use rand::RngCore;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::kdf;

/// Shared envelope key size in bytes (256 bits).
pub const ENVELOPE_KEY_SIZE: usize = 32;

/// AES-GCM IV size in bytes (96 bits).
pub const ENVELOPE_IV_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes (128 bits).
pub const ENVELOPE_TAG_SIZE: usize = 16;

/// Smallest possible sealed envelope: IV + tag around an empty plaintext.
const MIN_SEALED_SIZE: usize = ENVELOPE_IV_SIZE + ENVELOPE_TAG_SIZE;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("Envelope key must be {ENVELOPE_KEY_SIZE} bytes")]
    InvalidKeySize,
    #[error("Envelope key is not valid hex")]
    InvalidKeyHex,
    #[error("Envelope passphrase is empty")]
    EmptyPassphrase,
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed")]
    DecryptionFailed,
    #[error("Envelope too short ({0} bytes)")]
    Truncated(usize),
    #[error("Envelope is not valid base64")]
    InvalidBase64,
}

/// Key shared with the backend for sealing response bodies.
///
/// Wiped from memory on drop. `Debug` never prints the key bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EnvelopeKey([u8; ENVELOPE_KEY_SIZE]);

impl EnvelopeKey {
    pub fn from_bytes(bytes: [u8; ENVELOPE_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse a key given as 64 hex characters.
    pub fn from_hex(hex_key: &str) -> Result<Self, EnvelopeError> {
        let mut raw = hex::decode(hex_key.trim()).map_err(|_| EnvelopeError::InvalidKeyHex)?;
        let result = <[u8; ENVELOPE_KEY_SIZE]>::try_from(raw.as_slice())
            .map(Self)
            .map_err(|_| EnvelopeError::InvalidKeySize);
        raw.zeroize();
        result
    }

    /// Derive the key from a shared passphrase (HKDF-SHA256).
    pub fn from_passphrase(passphrase: &str) -> Result<Self, EnvelopeError> {
        kdf::derive_envelope_key(passphrase).map(Self)
    }

    /// Fresh random key. Only useful for tests and local tooling.
    pub fn generate() -> Self {
        let mut key = [0u8; ENVELOPE_KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnvelopeKey(..)")
    }
}

/// Seal plaintext under the envelope key with a random IV.
///
/// Returns: IV (12 bytes) || Ciphertext || Auth Tag (16 bytes)
pub fn seal(plaintext: &[u8], key: &EnvelopeKey) -> Result<Vec<u8>, EnvelopeError> {
    let mut iv = [0u8; ENVELOPE_IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let ciphertext = key
        .cipher()
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| EnvelopeError::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(ENVELOPE_IV_SIZE + ciphertext.len());
    sealed.extend_from_slice(&iv);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Open bytes produced by [`seal`].
pub fn open(sealed: &[u8], key: &EnvelopeKey) -> Result<Vec<u8>, EnvelopeError> {
    if sealed.len() < MIN_SEALED_SIZE {
        return Err(EnvelopeError::Truncated(sealed.len()));
    }

    let (iv, ciphertext) = sealed.split_at(ENVELOPE_IV_SIZE);
    key.cipher()
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| EnvelopeError::DecryptionFailed)
}

/// Seal and armor as base64, the form the backend puts on the wire.
pub fn seal_base64(plaintext: &[u8], key: &EnvelopeKey) -> Result<String, EnvelopeError> {
    let sealed = seal(plaintext, key)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(sealed))
}

/// Strip base64 armor and open.
pub fn open_base64(armored: &str, key: &EnvelopeKey) -> Result<Vec<u8>, EnvelopeError> {
    let sealed = base64::engine::general_purpose::STANDARD
        .decode(armored.trim())
        .map_err(|_| EnvelopeError::InvalidBase64)?;
    open(&sealed, key)
}
