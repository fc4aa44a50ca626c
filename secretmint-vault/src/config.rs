//! Client configuration.
//!
//! Environment variables (all optional):
//!   SECRETMINT_CONTRACT_ADDRESS     - SecretMint contract (default: zero address)
//!   SECRETMINT_CHAIN_ID             - chain id (default: 11155111, Sepolia)
//!   SECRETMINT_DECRYPTION_CONTRACT  - EIP-712 verifying contract of the relayer
//!   SECRETMINT_MAX_SECRET_CHARS     - mint input limit (default: 320)

use secretmint_envelope::Address;
use serde::{Deserialize, Serialize};

pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;
/// Validity window of a user-decryption authorization. Not configurable.
pub const DEFAULT_DURATION_DAYS: u64 = 10;
pub const DEFAULT_MAX_SECRET_CHARS: usize = 320;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub contract_address: Address,
    pub chain_id: u64,
    pub decryption_contract: Address,
    pub max_secret_chars: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            contract_address: Address::ZERO,
            chain_id: SEPOLIA_CHAIN_ID,
            decryption_contract: Address::ZERO,
            max_secret_chars: DEFAULT_MAX_SECRET_CHARS,
        }
    }
}

impl VaultConfig {
    pub fn new(contract_address: Address) -> Self {
        Self {
            contract_address,
            ..Self::default()
        }
    }

    /// Load from `SECRETMINT_*` variables. Unset or unparsable values keep
    /// their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse_addr = |key: &str, fallback: Address| {
            match lookup(key).map(|v| v.parse::<Address>()) {
                Some(Ok(a)) => a,
                Some(Err(e)) => {
                    tracing::warn!(key, error = %e, "ignoring invalid address");
                    fallback
                }
                None => fallback,
            }
        };

        Self {
            contract_address: parse_addr("SECRETMINT_CONTRACT_ADDRESS", defaults.contract_address),
            chain_id: lookup("SECRETMINT_CHAIN_ID")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.chain_id),
            decryption_contract: parse_addr("SECRETMINT_DECRYPTION_CONTRACT", defaults.decryption_contract),
            max_secret_chars: lookup("SECRETMINT_MAX_SECRET_CHARS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_secret_chars),
        }
    }
}
