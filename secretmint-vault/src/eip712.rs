//! EIP-712 typed data for user-decryption authorization.
//!
//! digest = keccak256(0x19 0x01 || domainSeparator || hashStruct(message))
//!
//! The message binds the client decryption public key to a set of contracts
//! and a validity window:
//!
//! ```text
//! UserDecryptRequestVerification(
//!     bytes publicKey,
//!     address[] contractAddresses,
//!     uint256 startTimestamp,
//!     uint256 durationDays)
//! ```

use secretmint_envelope::Address;
use sha3::{Digest, Keccak256};

pub const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

pub const USER_DECRYPT_TYPE: &str = "UserDecryptRequestVerification(bytes publicKey,address[] contractAddresses,uint256 startTimestamp,uint256 durationDays)";

pub const PRIMARY_TYPE: &str = "UserDecryptRequestVerification";

pub const DOMAIN_NAME: &str = "Decryption";
pub const DOMAIN_VERSION: &str = "1";

const SECONDS_PER_DAY: u64 = 86_400;

fn keccak(data: &[u8]) -> [u8; 32] {
    let h = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&h);
    out
}

fn word_u64(v: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&v.to_be_bytes());
    out
}

fn word_address(a: &Address) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(a.as_bytes());
    out
}

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    /// Domain of the decryption relayer on `chain_id`.
    pub fn decryption(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: DOMAIN_NAME.into(),
            version: DOMAIN_VERSION.into(),
            chain_id,
            verifying_contract,
        }
    }

    pub fn separator(&self) -> [u8; 32] {
        let mut enc = Vec::with_capacity(32 * 5);
        enc.extend_from_slice(&keccak(EIP712_DOMAIN_TYPE.as_bytes()));
        enc.extend_from_slice(&keccak(self.name.as_bytes()));
        enc.extend_from_slice(&keccak(self.version.as_bytes()));
        enc.extend_from_slice(&word_u64(self.chain_id));
        enc.extend_from_slice(&word_address(&self.verifying_contract));
        keccak(&enc)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserDecryptRequestVerification {
    pub public_key: Vec<u8>,
    pub contract_addresses: Vec<Address>,
    /// Unix seconds.
    pub start_timestamp: u64,
    pub duration_days: u64,
}

impl UserDecryptRequestVerification {
    pub fn struct_hash(&self) -> [u8; 32] {
        let mut addrs = Vec::with_capacity(32 * self.contract_addresses.len());
        for a in &self.contract_addresses {
            addrs.extend_from_slice(&word_address(a));
        }

        let mut enc = Vec::with_capacity(32 * 5);
        enc.extend_from_slice(&keccak(USER_DECRYPT_TYPE.as_bytes()));
        enc.extend_from_slice(&keccak(&self.public_key));
        enc.extend_from_slice(&keccak(&addrs));
        enc.extend_from_slice(&word_u64(self.start_timestamp));
        enc.extend_from_slice(&word_u64(self.duration_days));
        keccak(&enc)
    }

    /// Whether `now` (unix seconds) falls inside `[start, start + days)`.
    pub fn is_valid_at(&self, now: u64) -> bool {
        let end = self
            .start_timestamp
            .saturating_add(self.duration_days.saturating_mul(SECONDS_PER_DAY));
        self.duration_days > 0 && now >= self.start_timestamp && now < end
    }

    pub fn covers(&self, contract: &Address) -> bool {
        self.contract_addresses.contains(contract)
    }
}

// ---------------------------------------------------------------------------
// Typed data (domain + message)
// ---------------------------------------------------------------------------

/// Complete typed-data statement presented to the wallet for signing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedData {
    pub domain: Eip712Domain,
    pub message: UserDecryptRequestVerification,
}

impl TypedData {
    pub fn new(domain: Eip712Domain, message: UserDecryptRequestVerification) -> Self {
        Self { domain, message }
    }

    /// The 32-byte digest a signer signs.
    pub fn signing_digest(&self) -> [u8; 32] {
        typed_data_digest(&self.domain.separator(), &self.message.struct_hash())
    }
}

fn typed_data_digest(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    let mut enc = Vec::with_capacity(2 + 64);
    enc.extend_from_slice(&[0x19, 0x01]);
    enc.extend_from_slice(domain_separator);
    enc.extend_from_slice(struct_hash);
    keccak(&enc)
}
