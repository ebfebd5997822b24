//! HKDF-SHA256 derivation of the envelope key from a shared passphrase.
//!
//! Derivation path:
//!   passphrase (UTF-8 bytes)
//!     -> HKDF-SHA256(salt="InventoryConsole-v1", info="inventory-envelope-key-v1")
//!     -> 32-byte AES-256 key

use hkdf::Hkdf;
use sha2::Sha256;

use super::envelope::{EnvelopeError, ENVELOPE_KEY_SIZE};

const HKDF_SALT: &[u8] = b"InventoryConsole-v1";

const ENVELOPE_HKDF_INFO: &[u8] = b"inventory-envelope-key-v1";

pub(crate) fn derive_envelope_key(
    passphrase: &str,
) -> Result<[u8; ENVELOPE_KEY_SIZE], EnvelopeError> {
    if passphrase.is_empty() {
        return Err(EnvelopeError::EmptyPassphrase);
    }

    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), passphrase.as_bytes());
    let mut okm = [0u8; ENVELOPE_KEY_SIZE];
    // 32 bytes is far below the HKDF-SHA256 output limit
    hk.expand(ENVELOPE_HKDF_INFO, &mut okm)
        .map_err(|_| EnvelopeError::InvalidKeySize)?;
    Ok(okm)
}
