//! Secret codec: seal a text secret under a one-time address, open it again.

extern crate alloc;
use alloc::string::String;

use zeroize::Zeroizing;

use crate::address::Address;
use crate::error::{DecryptError, EncodingError};
use crate::wire::{self, AEAD_TAG_BYTES, NONCE_BYTES, VERSION_TAG};
use crate::{aead, kdf};

/// Encrypt `secret` under the key derived from `seed`.
///
/// Every call draws a fresh nonce, so sealing the same secret twice yields
/// two different envelopes.
pub fn encrypt_secret(secret: &str, seed: &Address) -> Result<String, EncodingError> {
    let key = Zeroizing::new(kdf::derive_key(&seed.to_lowercase_hex()));
    let nonce = aead::nonce()?;
    let aead_ct = aead::aead_seal(&key, &nonce, secret.as_bytes())?;
    Ok(wire::encode_wire(&nonce, &aead_ct))
}

/// Decrypt an `sm1` envelope with the key derived from `seed`.
pub fn decrypt_secret(envelope: &str, seed: &Address) -> Result<String, DecryptError> {
    let parts = wire::decode_wire(envelope)?;
    let key = Zeroizing::new(kdf::derive_key(&seed.to_lowercase_hex()));
    let plaintext = aead::aead_open(&key, &parts.nonce, &parts.aead_ciphertext)?;
    String::from_utf8(plaintext).map_err(|_| DecryptError::UnsupportedPayload)
}

/// Metadata visible without the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeInfo {
    pub version: &'static str,
    pub nonce_len: usize,
    pub ciphertext_len: usize,
    /// `None` when the ciphertext cannot even hold a tag.
    pub plaintext_len: Option<usize>,
}

impl EnvelopeInfo {
    /// Whether the field sizes are what `encrypt_secret` produces.
    pub fn is_well_formed(&self) -> bool {
        self.nonce_len == NONCE_BYTES && self.plaintext_len.is_some()
    }
}

/// Parse an envelope's structure without decrypting.
pub fn inspect(envelope: &str) -> Result<EnvelopeInfo, DecryptError> {
    let parts = wire::decode_wire(envelope)?;
    Ok(EnvelopeInfo {
        version: VERSION_TAG,
        nonce_len: parts.nonce.len(),
        ciphertext_len: parts.aead_ciphertext.len(),
        plaintext_len: parts.aead_ciphertext.len().checked_sub(AEAD_TAG_BYTES),
    })
}
