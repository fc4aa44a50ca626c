//! Core types: TokenId, Handle, InputProof, Receipt, TokenView, UnlockState.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// NFT token identifier. The contract numbers tokens from 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TokenId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// 32-byte FHE ciphertext handle, as stored on-chain (`bytes32`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Handle(pub [u8; 32]);

impl Handle {
    pub const ZERO: Handle = Handle([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self)
    }
}

/// Zero-knowledge proof that an encrypted input is well formed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputProof(pub Vec<u8>);

impl fmt::Debug for InputProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputProof({} bytes)", self.0.len())
    }
}

/// Transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

/// Confirmed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    /// `true` when the transaction succeeded.
    pub status: bool,
    /// Token minted by this transaction, if any.
    pub token_id: Option<TokenId>,
}

// ---------------------------------------------------------------------------
// Read-side projection
// ---------------------------------------------------------------------------

/// A token as seen from batched contract reads. Missing fields are still
/// loading (or their read failed) and are not errors by themselves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenView {
    pub token_id: TokenId,
    pub encrypted_secret: Option<String>,
    pub encrypted_key: Option<Handle>,
}

impl TokenView {
    pub fn pending(token_id: TokenId) -> Self {
        Self {
            token_id,
            encrypted_secret: None,
            encrypted_key: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.encrypted_secret.is_some() && self.encrypted_key.is_some()
    }

    /// Short preview of the envelope for listings.
    pub fn preview(&self) -> String {
        match &self.encrypted_secret {
            Some(env) if env.chars().count() > 24 => {
                format!("{}...", env.chars().take(24).collect::<String>())
            }
            Some(env) => env.clone(),
            None => "Loading...".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Unlock state machine
// ---------------------------------------------------------------------------

/// Per-token unlock state.
///
/// ```text
/// IDLE → PREPARING → AWAITING_AUTHORIZATION → DECRYPTING → UNLOCKED
///            │                │                    │
///            └────────────────┴────────────────────┴──→ FAILED
/// FAILED / UNLOCKED → PREPARING   (retry on the next user action)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlockState {
    Idle,
    Preparing,
    AwaitingAuthorization,
    Decrypting,
    Unlocked,
    Failed,
}

impl UnlockState {
    /// Whether an unlock is running for this token.
    pub fn in_flight(&self) -> bool {
        matches!(
            self,
            UnlockState::Preparing | UnlockState::AwaitingAuthorization | UnlockState::Decrypting
        )
    }

    /// Valid transitions from this state.
    pub fn valid_transitions(&self) -> &[UnlockState] {
        match self {
            UnlockState::Idle => &[UnlockState::Preparing, UnlockState::Failed],
            UnlockState::Preparing => &[UnlockState::AwaitingAuthorization, UnlockState::Failed],
            UnlockState::AwaitingAuthorization => &[UnlockState::Decrypting, UnlockState::Failed],
            UnlockState::Decrypting => &[UnlockState::Unlocked, UnlockState::Failed],
            UnlockState::Unlocked => &[UnlockState::Preparing, UnlockState::Failed],
            UnlockState::Failed => &[UnlockState::Preparing, UnlockState::Failed],
        }
    }

    pub fn can_transition_to(&self, target: UnlockState) -> bool {
        self.valid_transitions().contains(&target)
    }
}

impl fmt::Display for UnlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlockState::Idle => write!(f, "IDLE"),
            UnlockState::Preparing => write!(f, "PREPARING"),
            UnlockState::AwaitingAuthorization => write!(f, "AWAITING_AUTHORIZATION"),
            UnlockState::Decrypting => write!(f, "DECRYPTING"),
            UnlockState::Unlocked => write!(f, "UNLOCKED"),
            UnlockState::Failed => write!(f, "FAILED"),
        }
    }
}

/// One row of the vault's keyed table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStatus {
    pub state: UnlockState,
    /// Human-readable progress or failure message.
    pub message: Option<String>,
    /// Plaintext from the last successful unlock. Later failures keep it.
    pub secret: Option<String>,
}

impl Default for TokenStatus {
    fn default() -> Self {
        Self {
            state: UnlockState::Idle,
            message: None,
            secret: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_states() {
        assert!(!UnlockState::Idle.in_flight());
        assert!(UnlockState::Preparing.in_flight());
        assert!(UnlockState::AwaitingAuthorization.in_flight());
        assert!(UnlockState::Decrypting.in_flight());
        assert!(!UnlockState::Unlocked.in_flight());
        assert!(!UnlockState::Failed.in_flight());
    }

    #[test]
    fn transitions_follow_the_pipeline() {
        assert!(UnlockState::Idle.can_transition_to(UnlockState::Preparing));
        assert!(!UnlockState::Idle.can_transition_to(UnlockState::Decrypting));
        assert!(UnlockState::Decrypting.can_transition_to(UnlockState::Unlocked));
        assert!(!UnlockState::Preparing.can_transition_to(UnlockState::Unlocked));
        // no terminal lockout
        assert!(UnlockState::Failed.can_transition_to(UnlockState::Preparing));
    }

    #[test]
    fn preview_truncates() {
        let mut view = TokenView::pending(TokenId(1));
        assert_eq!(view.preview(), "Loading...");
        view.encrypted_secret = Some("sm1:AAECAwQFBgcICQoL:PwSDACYlJQDh7G15UyjvbBY6uaI4".into());
        assert_eq!(view.preview(), "sm1:AAECAwQFBgcICQoL:PwS...");
        assert!(!view.is_loaded());
    }

    #[test]
    fn handle_display() {
        let mut h = [0u8; 32];
        h[31] = 0xab;
        assert_eq!(
            Handle(h).to_string(),
            "0x00000000000000000000000000000000000000000000000000000000000000ab"
        );
        assert!(Handle::ZERO.is_zero());
    }
}
