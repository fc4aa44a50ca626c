//! FHE engine boundary and the process-wide engine runtime.
//!
//! [`FheBackend`] is the seam to the FHE SDK / relayer: encrypted-input
//! building, decryption key-pair generation and `user_decrypt`. Real
//! deployments bind it to the relayer; tests use
//! [`crate::mock::InMemoryFhe`].
//!
//! [`FheRuntime`] owns the engine handle and its lifecycle:
//!
//! ```text
//! UNINITIALIZED → INITIALIZING → READY
//!       ↑               │
//!       │               └──→ FAILED
//!       └── teardown() ──────────┘
//! ```
//!
//! Callers never queue behind initialization: `engine()` fails fast with
//! `EncryptionServiceUnavailable` unless the runtime is READY. A teardown
//! during INITIALIZING abandons that attempt; its result is discarded.

use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use rand_core::OsRng;
use secretmint_envelope::Address;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use zeroize::Zeroizing;

use crate::error::{FheError, SealError};
use crate::signer::Signature;
use crate::types::{Handle, InputProof};

// ---------------------------------------------------------------------------
// Values and inputs
// ---------------------------------------------------------------------------

/// Plaintext value carried by an encrypted input or returned by decryption.
/// SecretMint only ever seals addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearValue {
    Address(Address),
}

impl ClearValue {
    /// Canonical bytes, used for handle derivation.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ClearValue::Address(a) => {
                let mut out = vec![0x07];
                out.extend_from_slice(a.as_bytes());
                out
            }
        }
    }
}

/// Encrypted input under construction, bound to a contract and the account
/// that will submit it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedInputBuilder {
    pub contract: Address,
    pub caller: Address,
    pub values: Vec<ClearValue>,
}

impl EncryptedInputBuilder {
    pub fn new(contract: Address, caller: Address) -> Self {
        Self {
            contract,
            caller,
            values: Vec::new(),
        }
    }

    pub fn add_address(&mut self, value: Address) -> &mut Self {
        self.values.push(ClearValue::Address(value));
        self
    }
}

/// One handle per added value, plus a single proof covering all of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handles: Vec<Handle>,
    pub input_proof: InputProof,
}

// ---------------------------------------------------------------------------
// User decryption
// ---------------------------------------------------------------------------

/// Client-generated key-pair the relayer re-encrypts results to. Lives for
/// one request.
pub struct DecryptionKeypair {
    pub public_key: Vec<u8>,
    pub private_key: Zeroizing<Vec<u8>>,
}

impl DecryptionKeypair {
    /// Fresh secp256k1 key-pair.
    pub fn generate() -> Self {
        let key = SigningKey::random(&mut OsRng);
        let public_key = key.verifying_key().to_encoded_point(true).as_bytes().to_vec();
        let private_key = Zeroizing::new(key.to_bytes().to_vec());
        Self {
            public_key,
            private_key,
        }
    }
}

impl fmt::Debug for DecryptionKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionKeypair")
            .field("public_key", &hex::encode(&self.public_key))
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandleContractPair {
    pub handle: Handle,
    pub contract: Address,
}

/// Everything `user_decrypt` needs; consumed by the call.
#[derive(Debug)]
pub struct UserDecryptRequest {
    pub pairs: Vec<HandleContractPair>,
    pub keypair: DecryptionKeypair,
    pub signature: Signature,
    pub contract_addresses: Vec<Address>,
    pub user: Address,
    pub start_timestamp: u64,
    pub duration_days: u64,
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FheBackend: Send + Sync {
    /// Encrypt the builder's values and prove them well formed.
    async fn encrypt(&self, input: EncryptedInputBuilder) -> Result<EncryptedInput, FheError>;

    fn generate_keypair(&self) -> DecryptionKeypair {
        DecryptionKeypair::generate()
    }

    /// Decrypt handles the user is allowed to read. Returns handle → value
    /// for every handle the relayer could resolve.
    async fn user_decrypt(
        &self,
        request: UserDecryptRequest,
    ) -> Result<HashMap<Handle, ClearValue>, FheError>;
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineStatus {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

enum EngineState<B> {
    Uninitialized,
    /// Tagged with the attempt that owns it.
    Initializing(u64),
    Ready(Arc<B>),
    Failed(String),
}

impl<B> EngineState<B> {
    fn status(&self) -> EngineStatus {
        match self {
            EngineState::Uninitialized => EngineStatus::Uninitialized,
            EngineState::Initializing(_) => EngineStatus::Initializing,
            EngineState::Ready(_) => EngineStatus::Ready,
            EngineState::Failed(_) => EngineStatus::Failed,
        }
    }
}

/// Shared, lazily-initialized engine handle.
pub struct FheRuntime<B> {
    state: RwLock<EngineState<B>>,
    attempts: AtomicU64,
}

impl<B: FheBackend> Default for FheRuntime<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: FheBackend> FheRuntime<B> {
    /// Uninitialized runtime.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState::Uninitialized),
            attempts: AtomicU64::new(0),
        }
    }

    /// Runtime that is READY from the start.
    pub fn ready(engine: B) -> Self {
        Self::ready_shared(Arc::new(engine))
    }

    /// READY runtime over an engine that is also held elsewhere.
    pub fn ready_shared(engine: Arc<B>) -> Self {
        Self {
            state: RwLock::new(EngineState::Ready(engine)),
            attempts: AtomicU64::new(0),
        }
    }

    /// Run `init` once. A second call while INITIALIZING or READY is a no-op;
    /// a FAILED runtime may be initialized again.
    ///
    /// If the runtime is torn down while `init` runs, the result is dropped
    /// and this returns `EncryptionServiceUnavailable`.
    pub async fn initialize<F, Fut>(&self, init: F) -> Result<(), SealError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<B, FheError>>,
    {
        let attempt = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            match *state {
                EngineState::Initializing(_) | EngineState::Ready(_) => return Ok(()),
                EngineState::Uninitialized | EngineState::Failed(_) => {
                    let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
                    *state = EngineState::Initializing(attempt);
                    attempt
                }
            }
        };

        tracing::debug!(attempt, "initializing FHE engine");
        let result = init().await;

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !matches!(*state, EngineState::Initializing(current) if current == attempt) {
            tracing::debug!(attempt, "FHE engine initialization abandoned");
            return Err(SealError::EncryptionServiceUnavailable);
        }
        match result {
            Ok(engine) => {
                *state = EngineState::Ready(Arc::new(engine));
                tracing::info!("FHE engine ready");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "FHE engine initialization failed");
                *state = EngineState::Failed(e.to_string());
                Err(SealError::Engine(e.to_string()))
            }
        }
    }

    pub fn status(&self) -> EngineStatus {
        self.state.read().unwrap_or_else(PoisonError::into_inner).status()
    }

    pub fn is_ready(&self) -> bool {
        self.status() == EngineStatus::Ready
    }

    /// Initialization error, if the last attempt failed.
    pub fn last_error(&self) -> Option<String> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            EngineState::Failed(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    /// The engine, or `EncryptionServiceUnavailable` if not READY.
    pub fn engine(&self) -> Result<Arc<B>, SealError> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            EngineState::Ready(engine) => Ok(engine.clone()),
            _ => Err(SealError::EncryptionServiceUnavailable),
        }
    }

    /// Drop the engine. In-flight operations keep their own `Arc`.
    pub fn teardown(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = EngineState::Uninitialized;
        tracing::debug!("FHE engine torn down");
    }
}
