//! In-memory FHE engine and SecretMint contract.
//!
//! Deterministic stand-ins for the relayer and the chain, so sealing, mint
//! and unlock can be exercised end to end without a live backend.
//!
//! Both doubles enforce the same rules as the real services: input proofs
//! are bound to contract and caller, the ACL gates `user_decrypt`, and only
//! a token's owner can grant access to it.

use async_trait::async_trait;
use chrono::Utc;
use secretmint_envelope::Address;
use sha3::{Digest, Keccak256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;

use crate::config::SEPOLIA_CHAIN_ID;
use crate::contract::SecretMintContract;
use crate::eip712::{Eip712Domain, TypedData, UserDecryptRequestVerification};
use crate::error::{ContractError, FheError};
use crate::fhe::{ClearValue, EncryptedInput, EncryptedInputBuilder, FheBackend, UserDecryptRequest};
use crate::types::{Handle, InputProof, Receipt, TokenId, TxHash};

fn keccak(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

// ---------------------------------------------------------------------------
// FHE engine
// ---------------------------------------------------------------------------

/// Binding recorded for every handle an input produced.
#[derive(Clone, Debug)]
struct InputBinding {
    contract: Address,
    caller: Address,
    proof: Vec<u8>,
}

#[derive(Default)]
struct FheLedger {
    counter: u64,
    values: HashMap<Handle, ClearValue>,
    inputs: HashMap<Handle, InputBinding>,
    acl: HashSet<(Handle, Address)>,
}

/// In-memory FHE engine and decryption relayer.
pub struct InMemoryFhe {
    domain: Eip712Domain,
    ledger: Mutex<FheLedger>,
    drop_results: AtomicBool,
}

impl Default for InMemoryFhe {
    fn default() -> Self {
        Self::new(Eip712Domain::decryption(SEPOLIA_CHAIN_ID, Address::ZERO))
    }
}

impl InMemoryFhe {
    /// Engine that verifies authorizations signed under `domain`.
    pub fn new(domain: Eip712Domain) -> Self {
        Self {
            domain,
            ledger: Mutex::new(FheLedger::default()),
            drop_results: AtomicBool::new(false),
        }
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, FheLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ACL grant, as `FHE.allow(handle, account)` does on-chain.
    pub fn allow(&self, handle: Handle, account: Address) {
        self.ledger().acl.insert((handle, account));
    }

    pub fn is_allowed(&self, handle: Handle, account: Address) -> bool {
        self.ledger().acl.contains(&(handle, account))
    }

    /// Whether `proof` was issued for `handle` submitted by `caller` to
    /// `contract`.
    pub fn verify_input(&self, handle: Handle, proof: &InputProof, contract: Address, caller: Address) -> bool {
        match self.ledger().inputs.get(&handle) {
            Some(binding) => {
                binding.contract == contract && binding.caller == caller && binding.proof == proof.0
            }
            None => false,
        }
    }

    /// When set, `user_decrypt` authorizes but returns an empty mapping.
    pub fn drop_results(&self, on: bool) {
        self.drop_results.store(on, Ordering::SeqCst);
    }

    fn authorize(&self, request: &UserDecryptRequest) -> Result<(), FheError> {
        let message = UserDecryptRequestVerification {
            public_key: request.keypair.public_key.clone(),
            contract_addresses: request.contract_addresses.clone(),
            start_timestamp: request.start_timestamp,
            duration_days: request.duration_days,
        };

        let now = Utc::now().timestamp().max(0) as u64;
        if !message.is_valid_at(now) {
            return Err(FheError::Rejected("authorization outside its validity window".into()));
        }

        let digest = TypedData::new(self.domain.clone(), message.clone()).signing_digest();
        if request.signature.recover(&digest) != Some(request.user) {
            return Err(FheError::Rejected("signature does not match user".into()));
        }

        let ledger = self.ledger();
        for pair in &request.pairs {
            if !message.covers(&pair.contract) {
                return Err(FheError::Rejected(format!(
                    "contract {} not covered by authorization",
                    pair.contract
                )));
            }
            if !ledger.acl.contains(&(pair.handle, request.user)) {
                return Err(FheError::Rejected(format!(
                    "{} is not allowed to decrypt {}",
                    request.user, pair.handle
                )));
            }
            if !ledger.acl.contains(&(pair.handle, pair.contract)) {
                return Err(FheError::Rejected(format!(
                    "contract {} is not allowed to use {}",
                    pair.contract, pair.handle
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FheBackend for InMemoryFhe {
    async fn encrypt(&self, input: EncryptedInputBuilder) -> Result<EncryptedInput, FheError> {
        if input.values.is_empty() {
            return Err(FheError::InvalidInput("no values added".into()));
        }

        let mut ledger = self.ledger();
        let mut handles = Vec::with_capacity(input.values.len());
        for value in &input.values {
            ledger.counter += 1;
            let handle = Handle(keccak(&[
                input.contract.as_bytes(),
                input.caller.as_bytes(),
                &ledger.counter.to_be_bytes(),
                &value.to_bytes(),
            ]));
            ledger.values.insert(handle, *value);
            handles.push(handle);
        }

        let mut parts: Vec<&[u8]> = handles.iter().map(|h| h.as_bytes().as_slice()).collect();
        parts.push(input.contract.as_bytes());
        parts.push(input.caller.as_bytes());
        let proof = keccak(&parts).to_vec();

        for handle in &handles {
            ledger.inputs.insert(
                *handle,
                InputBinding {
                    contract: input.contract,
                    caller: input.caller,
                    proof: proof.clone(),
                },
            );
        }

        Ok(EncryptedInput {
            handles,
            input_proof: InputProof(proof),
        })
    }

    async fn user_decrypt(
        &self,
        request: UserDecryptRequest,
    ) -> Result<HashMap<Handle, ClearValue>, FheError> {
        self.authorize(&request)?;

        if self.drop_results.load(Ordering::SeqCst) {
            return Ok(HashMap::new());
        }

        let ledger = self.ledger();
        Ok(request
            .pairs
            .iter()
            .filter_map(|pair| ledger.values.get(&pair.handle).map(|v| (pair.handle, *v)))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// SecretMint contract
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct TokenRecord {
    owner: Address,
    envelope: String,
    handle: Handle,
}

#[derive(Default)]
struct ChainState {
    next_token: u64,
    tokens: BTreeMap<TokenId, TokenRecord>,
}

/// In-memory SecretMint deployment sharing an [`InMemoryFhe`] ACL.
pub struct InMemorySecretMint {
    address: Address,
    fhe: Arc<InMemoryFhe>,
    state: RwLock<ChainState>,
    tx_nonce: AtomicU64,
}

impl InMemorySecretMint {
    pub fn new(address: Address, fhe: Arc<InMemoryFhe>) -> Arc<Self> {
        Arc::new(Self {
            address,
            fhe,
            state: RwLock::new(ChainState {
                next_token: 1,
                tokens: BTreeMap::new(),
            }),
            tx_nonce: AtomicU64::new(0),
        })
    }

    /// Client sending transactions from `account`.
    pub fn connect(self: &Arc<Self>, account: Address) -> InMemoryClient {
        InMemoryClient {
            chain: Arc::clone(self),
            account,
        }
    }

    pub async fn owner_of(&self, token_id: TokenId) -> Option<Address> {
        self.state.read().await.tokens.get(&token_id).map(|t| t.owner)
    }

    fn receipt(&self, from: Address, token_id: Option<TokenId>) -> Receipt {
        let nonce = self.tx_nonce.fetch_add(1, Ordering::SeqCst);
        Receipt {
            tx_hash: TxHash(keccak(&[self.address.as_bytes(), from.as_bytes(), &nonce.to_be_bytes()])),
            status: true,
            token_id,
        }
    }
}

/// [`InMemorySecretMint`] bound to one sending account.
#[derive(Clone)]
pub struct InMemoryClient {
    chain: Arc<InMemorySecretMint>,
    account: Address,
}

#[async_trait]
impl SecretMintContract for InMemoryClient {
    fn address(&self) -> Address {
        self.chain.address
    }

    fn account(&self) -> Address {
        self.account
    }

    async fn mint_secret(
        &self,
        envelope: &str,
        encrypted_address: Handle,
        proof: &InputProof,
    ) -> Result<Receipt, ContractError> {
        if !self
            .chain
            .fhe
            .verify_input(encrypted_address, proof, self.chain.address, self.account)
        {
            return Err(ContractError::InvalidProof);
        }

        let token_id = {
            let mut state = self.chain.state.write().await;
            let token_id = TokenId(state.next_token);
            state.next_token += 1;
            state.tokens.insert(
                token_id,
                TokenRecord {
                    owner: self.account,
                    envelope: envelope.to_string(),
                    handle: encrypted_address,
                },
            );
            token_id
        };
        self.chain.fhe.allow(encrypted_address, self.chain.address);

        tracing::debug!(%token_id, owner = %self.account, "token minted");
        Ok(self.chain.receipt(self.account, Some(token_id)))
    }

    async fn allow_secret_access(&self, token_id: TokenId, viewer: Address) -> Result<Receipt, ContractError> {
        let handle = {
            let state = self.chain.state.read().await;
            let token = state.tokens.get(&token_id).ok_or(ContractError::TokenNotFound(token_id))?;
            if token.owner != self.account {
                return Err(ContractError::OnlyTokenOwner);
            }
            token.handle
        };
        self.chain.fhe.allow(handle, viewer);

        tracing::debug!(%token_id, %viewer, "secret access granted");
        Ok(self.chain.receipt(self.account, None))
    }

    async fn get_token_secret(&self, token_id: TokenId) -> Result<(String, Handle), ContractError> {
        let state = self.chain.state.read().await;
        state
            .tokens
            .get(&token_id)
            .map(|t| (t.envelope.clone(), t.handle))
            .ok_or(ContractError::TokenNotFound(token_id))
    }

    async fn tokens_of_owner(&self, owner: Address) -> Result<Vec<TokenId>, ContractError> {
        let state = self.chain.state.read().await;
        Ok(state
            .tokens
            .iter()
            .filter(|(_, t)| t.owner == owner)
            .map(|(id, _)| *id)
            .collect())
    }
}
