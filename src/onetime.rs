//! One-time keys.
//!
//! A one-time key is a throwaway secp256k1 identity. Only its address is
//! ever used: it seeds the envelope key and is sealed on-chain. The private
//! half is zeroized as soon as the address has been derived.

use k256::ecdsa::SigningKey;
use rand_core::OsRng;

use crate::address::Address;

/// Address of an ephemeral key-pair, used only as a key-derivation seed.
#[derive(Debug)]
pub struct OneTimeKey {
    address: Address,
}

impl OneTimeKey {
    /// Generate from the OS CSPRNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self {
            address: Address::from_verifying_key(signing_key.verifying_key()),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn into_address(self) -> Address {
        self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_keys_differ() {
        let a = OneTimeKey::generate();
        let b = OneTimeKey::generate();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn into_address_keeps_the_address() {
        let key = OneTimeKey::generate();
        let addr = *key.address();
        assert_ne!(addr, Address::ZERO);
        assert_eq!(key.into_address(), addr);
    }
}
