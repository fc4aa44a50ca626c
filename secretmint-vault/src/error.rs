//! Error types for sealing, contract calls and the vault.

use crate::types::{Handle, TokenId};
use secretmint_envelope::{DecryptError, EncodingError};
use thiserror::Error;

// ---------------------------------------------------------------------------
// FHE engine boundary
// ---------------------------------------------------------------------------

/// Errors reported by an FHE engine or decryption relayer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FheError {
    /// The relayer refused the request (ACL, signature, validity window).
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The encrypted input could not be built.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Network or service failure.
    #[error("transport: {0}")]
    Transport(String),
}

// ---------------------------------------------------------------------------
// Key sealing adapter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SealError {
    /// Engine not initialized yet. Retry after initialization completes.
    #[error("Encryption service is not ready.")]
    EncryptionServiceUnavailable,
    /// Caller lacks an on-chain grant (or the authorization was refused).
    /// Grant access, then retry.
    #[error("decryption not authorized: {0}")]
    DecryptionAuthorization(String),
    /// The relayer response did not contain the requested handle.
    #[error("Decryption response missing key")]
    MissingResult(Handle),
    /// Wallet refused or failed to sign.
    #[error("signing failed: {0}")]
    Signing(String),
    /// Any other engine failure.
    #[error("encryption engine: {0}")]
    Engine(String),
}

impl SealError {
    /// Whether retrying the same call can succeed without user action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SealError::EncryptionServiceUnavailable | SealError::MissingResult(_) | SealError::Engine(_)
        )
    }
}

impl From<FheError> for SealError {
    fn from(e: FheError) -> Self {
        match e {
            FheError::Rejected(msg) => SealError::DecryptionAuthorization(msg),
            other => SealError::Engine(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Contract boundary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("Only token owner")]
    OnlyTokenOwner,
    #[error("Token does not exist: {0}")]
    TokenNotFound(TokenId),
    #[error("Invalid input proof")]
    InvalidProof,
}

// ---------------------------------------------------------------------------
// Vault / mint workflow
// ---------------------------------------------------------------------------

/// Any failure in the mint or unlock workflow. The Display text is what the
/// per-token status shows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error(transparent)]
    Seal(#[from] SealError),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Decrypt(#[from] DecryptError),
    #[error("Failed to encrypt secret locally")]
    Encoding(#[from] EncodingError),
    #[error("Token data unavailable")]
    TokenDataUnavailable(TokenId),
    #[error("Transaction reverted: {0}")]
    Reverted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_maps_to_authorization() {
        let e: SealError = FheError::Rejected("no grant".into()).into();
        assert_eq!(e, SealError::DecryptionAuthorization("no grant".into()));
        assert!(!e.is_retryable());
    }

    #[test]
    fn transport_is_retryable() {
        let e: SealError = FheError::Transport("timeout".into()).into();
        assert!(e.is_retryable());
        assert!(SealError::EncryptionServiceUnavailable.is_retryable());
        assert!(SealError::MissingResult(Handle::ZERO).is_retryable());
    }

    #[test]
    fn vault_messages_are_user_facing() {
        let e = VaultError::from(SealError::EncryptionServiceUnavailable);
        assert_eq!(e.to_string(), "Encryption service is not ready.");
        let e = VaultError::from(ContractError::OnlyTokenOwner);
        assert_eq!(e.to_string(), "Only token owner");
        let e = VaultError::TokenDataUnavailable(TokenId(3));
        assert_eq!(e.to_string(), "Token data unavailable");
    }
}
