//! Wire format (sm1 text envelope)
//!
//! Format:
//!   "sm1" ":" base64(nonce[12]) ":" base64(aes_gcm_ct || tag[16])
//!
//! Base64 is the standard alphabet with padding. The envelope is ASCII and
//! is stored verbatim on-chain as a contract string.

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::DecryptError;

/// Version tag, first field of every envelope.
pub const VERSION_TAG: &str = "sm1";

/// Field delimiter.
pub const DELIMITER: char = ':';

/// Number of delimited fields.
pub const FIELD_COUNT: usize = 3;

pub const NONCE_BYTES: usize = 12;
pub const AEAD_TAG_BYTES: usize = 16;
pub const AES_KEY_BYTES: usize = 32;

/// Owned view of a parsed envelope.
///
/// The nonce is not length-checked here; a nonce of the wrong size can only
/// fail authentication, which the AEAD layer reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireComponents {
    pub nonce: Vec<u8>,
    pub aead_ciphertext: Vec<u8>,
}

pub fn decode_wire(envelope: &str) -> Result<WireComponents, DecryptError> {
    let parts: Vec<&str> = envelope.split(DELIMITER).collect();
    if parts.len() != FIELD_COUNT || parts[0] != VERSION_TAG {
        return Err(DecryptError::UnsupportedPayload);
    }

    let nonce = STANDARD
        .decode(parts[1])
        .map_err(|_| DecryptError::UnsupportedPayload)?;
    let aead_ciphertext = STANDARD
        .decode(parts[2])
        .map_err(|_| DecryptError::UnsupportedPayload)?;

    Ok(WireComponents {
        nonce,
        aead_ciphertext,
    })
}

pub fn encode_wire(nonce: &[u8; NONCE_BYTES], aead_ct: &[u8]) -> String {
    let nonce_b64 = STANDARD.encode(nonce);
    let ct_b64 = STANDARD.encode(aead_ct);

    let mut out = String::with_capacity(VERSION_TAG.len() + 2 + nonce_b64.len() + ct_b64.len());
    out.push_str(VERSION_TAG);
    out.push(DELIMITER);
    out.push_str(&nonce_b64);
    out.push(DELIMITER);
    out.push_str(&ct_b64);
    out
}
