//! Error types for envelope sealing and opening.

use thiserror::Error;

/// The encrypt path failed. Only reachable when the OS RNG is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("encoding error")]
pub struct EncodingError;

/// The decrypt path failed.
///
/// A malformed or foreign envelope is a data problem; a failed tag check
/// is a key or integrity problem. Neither is retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecryptError {
    /// Not an `sm1` envelope (wrong field count, tag, or encoding).
    #[error("Unsupported secret payload")]
    UnsupportedPayload,
    /// The AES-GCM tag did not verify under the derived key.
    #[error("Secret authentication failed")]
    Authentication,
}

/// Failure to parse an Ethereum address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address: {0}")]
pub struct AddressError(pub String);
