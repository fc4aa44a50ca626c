//! AEAD: AES-256-GCM (96-bit nonce, 128-bit tag, no AAD)

extern crate alloc;
use alloc::vec::Vec;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use getrandom::getrandom;

use crate::error::{DecryptError, EncodingError};
use crate::wire::{AEAD_TAG_BYTES, AES_KEY_BYTES, NONCE_BYTES};

/// Generate a random 12-byte nonce. Used during encryption only.
pub fn nonce() -> Result<[u8; NONCE_BYTES], EncodingError> {
    let mut n = [0u8; NONCE_BYTES];
    getrandom(&mut n).map_err(|_| EncodingError)?;
    Ok(n)
}

/// AEAD seal (encrypt path). Returns ciphertext || tag.
pub fn aead_seal(
    key: &[u8; AES_KEY_BYTES],
    nonce: &[u8; NONCE_BYTES],
    plaintext: &[u8],
) -> Result<Vec<u8>, EncodingError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncodingError)?;
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| EncodingError)
}

/// AEAD open (decrypt path).
///
/// Any nonce other than 12 bytes, or a ciphertext too short to hold a tag,
/// is an authentication failure, same as a bad tag.
pub fn aead_open(
    key: &[u8; AES_KEY_BYTES],
    nonce: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, DecryptError> {
    if nonce.len() != NONCE_BYTES || ciphertext.len() < AEAD_TAG_BYTES {
        return Err(DecryptError::Authentication);
    }
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| DecryptError::Authentication)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| DecryptError::Authentication)
}
