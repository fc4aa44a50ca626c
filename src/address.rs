//! Ethereum account addresses.
//!
//! Parsing accepts any casing with or without the `0x` prefix. Display is
//! always the EIP-55 checksum form; [`Address::to_lowercase_hex`] gives the
//! form used for key derivation.

extern crate alloc;
use alloc::string::String;

use core::fmt;
use core::str::FromStr;

use k256::ecdsa::VerifyingKey;
use sha3::{Digest, Keccak256};

use crate::error::AddressError;

pub const ADDRESS_BYTES: usize = 20;

/// 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_BYTES]);

impl Address {
    pub const ZERO: Address = Address([0u8; ADDRESS_BYTES]);

    pub const fn from_bytes(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Address of a secp256k1 public key: last 20 bytes of
    /// keccak256(uncompressed_point[1..]).
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let hash = Keccak256::digest(&point.as_bytes()[1..]);
        let mut out = [0u8; ADDRESS_BYTES];
        out.copy_from_slice(&hash[12..]);
        Self(out)
    }

    /// `0x`-prefixed lower-case hex.
    pub fn to_lowercase_hex(&self) -> String {
        let mut s = String::with_capacity(2 + ADDRESS_BYTES * 2);
        s.push_str("0x");
        s.push_str(&hex::encode(self.0));
        s
    }

    /// EIP-55 mixed-case checksum form.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != ADDRESS_BYTES * 2 {
            return Err(AddressError(s.into()));
        }
        let mut out = [0u8; ADDRESS_BYTES];
        hex::decode_to_slice(digits, &mut out).map_err(|_| AddressError(s.into()))?;
        Ok(Self(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // EIP-55 reference vectors
    const CHECKSUMMED: &[&str] = &[
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn checksum_vectors() {
        for expected in CHECKSUMMED {
            let addr: Address = expected.to_lowercase().parse().unwrap();
            assert_eq!(&addr.to_checksum(), expected);
            assert_eq!(&addr.to_string(), expected);
        }
    }

    #[test]
    fn parse_any_casing() {
        let a: Address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap();
        let b: Address = "5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_lowercase_hex(), "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xZZaeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse::<Address>().is_err());
        assert!("".parse::<Address>().is_err());
    }

    #[test]
    fn address_of_private_key_one() {
        let mut sk = [0u8; 32];
        sk[31] = 1;
        let key = k256::ecdsa::SigningKey::from_bytes(&sk.into()).unwrap();
        let addr = Address::from_verifying_key(key.verifying_key());
        assert_eq!(addr.to_string(), "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
    }
}
