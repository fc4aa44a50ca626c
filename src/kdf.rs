//! KDF (sm1)
//!
//! key = SHA-256(b"secretmint:" || lowercase("0x" || address_hex))
//!
//! Lower-casing makes the key independent of EIP-55 checksum casing.

extern crate alloc;
use alloc::vec::Vec;

use sha2::{Digest, Sha256};

use crate::wire::AES_KEY_BYTES;

/// Domain separation prefix.
pub const KDF_DOMAIN: &[u8] = b"secretmint:";

/// Derive the envelope key from an address string in any casing.
pub fn derive_key(address: &str) -> [u8; AES_KEY_BYTES] {
    let normalized = address.to_ascii_lowercase();

    let mut source = Vec::with_capacity(KDF_DOMAIN.len() + normalized.len());
    source.extend_from_slice(KDF_DOMAIN);
    source.extend_from_slice(normalized.as_bytes());

    let h = Sha256::digest(&source);
    let mut out = [0u8; AES_KEY_BYTES];
    out.copy_from_slice(&h);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casing_does_not_change_key() {
        let a = derive_key("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        let b = derive_key("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
        assert_eq!(a, b);
    }

    #[test]
    fn different_addresses_differ() {
        let a = derive_key("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
        let b = derive_key("0x2b5ad5c4795c026514f8317c7a215e218dccd6cf");
        assert_ne!(a, b);
    }
}
