//! Mint workflow: one-time key → local encryption → FHE seal → mint.
//!
//! Failures never escape as errors; they become the report's status text
//! and the mint action is re-enabled.

use secretmint_envelope::{encrypt_secret, Address, OneTimeKey};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::VaultConfig;
use crate::contract::SecretMintContract;
use crate::error::{SealError, VaultError};
use crate::events::{EventSink, VaultAction, VaultEvent};
use crate::fhe::FheBackend;
use crate::sealer::KeySealer;
use crate::types::{Receipt, TokenId};

pub const MSG_CONNECT_WALLET: &str = "Connect your wallet to mint.";
pub const MSG_EMPTY_SECRET: &str = "Enter a secret before minting.";
pub const MSG_MINT_IN_PROGRESS: &str = "A mint is already in progress.";
pub const MSG_MINT_COMPLETE: &str = "Mint complete. Your secret is now sealed.";

/// Outcome of one mint attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReport {
    pub status: String,
    pub token_id: Option<TokenId>,
    /// Address the secret was sealed under. Present only on success.
    pub one_time_address: Option<Address>,
}

impl MintReport {
    fn failed(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            token_id: None,
            one_time_address: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.one_time_address.is_some()
    }
}

pub struct Minter<B> {
    sealer: Arc<KeySealer<B>>,
    contract: Option<Arc<dyn SecretMintContract>>,
    max_secret_chars: usize,
    events: Arc<dyn EventSink>,
    minting: AtomicBool,
    status: Mutex<Option<String>>,
}

impl<B: FheBackend> Minter<B> {
    /// `contract` is `None` while no wallet is connected.
    pub fn new(
        sealer: Arc<KeySealer<B>>,
        contract: Option<Arc<dyn SecretMintContract>>,
        config: &VaultConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            sealer,
            contract,
            max_secret_chars: config.max_secret_chars,
            events,
            minting: AtomicBool::new(false),
            status: Mutex::new(None),
        }
    }

    pub fn is_minting(&self) -> bool {
        self.minting.load(Ordering::SeqCst)
    }

    /// Latest progress or result message.
    pub fn status(&self) -> Option<String> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_status(&self, message: impl Into<String>) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    fn reject(&self, message: impl Into<String>) -> MintReport {
        let report = MintReport::failed(message);
        self.set_status(report.status.clone());
        report
    }

    /// Seal `secret` into a new token owned by the connected account.
    pub async fn mint(&self, secret: &str) -> MintReport {
        let Some(contract) = self.contract.clone() else {
            return self.reject(MSG_CONNECT_WALLET);
        };
        if !self.sealer.is_ready() {
            return self.reject(SealError::EncryptionServiceUnavailable.to_string());
        }

        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return self.reject(MSG_EMPTY_SECRET);
        }
        if trimmed.chars().count() > self.max_secret_chars {
            return self.reject(format!("Secret exceeds {} characters.", self.max_secret_chars));
        }

        if self.minting.swap(true, Ordering::SeqCst) {
            return MintReport::failed(MSG_MINT_IN_PROGRESS);
        }

        let account = contract.account();
        self.events
            .record(VaultEvent::account_event(VaultAction::MintSubmitted).with_actor(Some(account)));

        let result = self.run(contract.as_ref(), trimmed).await;
        self.minting.store(false, Ordering::SeqCst);

        match result {
            Ok((receipt, one_time_address)) => {
                self.set_status(MSG_MINT_COMPLETE);
                self.events.record(
                    VaultEvent::account_event(VaultAction::MintCompleted)
                        .with_token(receipt.token_id)
                        .with_actor(Some(account))
                        .with_detail(receipt.tx_hash.to_string()),
                );
                MintReport {
                    status: MSG_MINT_COMPLETE.into(),
                    token_id: receipt.token_id,
                    one_time_address: Some(one_time_address),
                }
            }
            Err(e) => {
                let reason = e.to_string();
                self.events.record(
                    VaultEvent::account_event(VaultAction::MintFailed { reason: reason.clone() })
                        .with_actor(Some(account))
                        .with_failure(),
                );
                self.reject(reason)
            }
        }
    }

    async fn run(
        &self,
        contract: &dyn SecretMintContract,
        secret: &str,
    ) -> Result<(Receipt, Address), VaultError> {
        self.set_status("Generating one-time key...");
        let one_time = OneTimeKey::generate().into_address();

        self.set_status("Encrypting your secret locally...");
        let envelope = encrypt_secret(secret, &one_time)?;

        self.set_status("Encrypting the key with FHE...");
        let sealed = self
            .sealer
            .seal(one_time, contract.address(), contract.account())
            .await?;

        self.set_status("Submitting mint transaction...");
        let receipt = contract.mint_secret(&envelope, sealed.handle, &sealed.proof).await?;
        if !receipt.status {
            return Err(VaultError::Reverted(receipt.tx_hash.to_string()));
        }

        Ok((receipt, one_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContractError;
    use crate::events::InMemoryEventSink;
    use crate::fhe::FheRuntime;
    use crate::mock::{InMemoryFhe, InMemorySecretMint};
    use crate::types::{Handle, InputProof};
    use secretmint_envelope::decrypt_secret;

    const CONTRACT: Address = Address::from_bytes([0xC0; 20]);
    const ALICE: Address = Address::from_bytes([0xA1; 20]);

    struct Fixture {
        minter: Minter<InMemoryFhe>,
        chain: Arc<InMemorySecretMint>,
        events: Arc<InMemoryEventSink>,
    }

    fn fixture(connected: bool, ready: bool) -> Fixture {
        let fhe = Arc::new(InMemoryFhe::default());
        let runtime = if ready {
            FheRuntime::ready_shared(fhe.clone())
        } else {
            FheRuntime::new()
        };
        let config = VaultConfig::new(CONTRACT);
        let sealer = Arc::new(KeySealer::new(Arc::new(runtime), &config));
        let chain = InMemorySecretMint::new(CONTRACT, fhe);
        let contract: Option<Arc<dyn SecretMintContract>> =
            connected.then(|| Arc::new(chain.connect(ALICE)) as Arc<dyn SecretMintContract>);
        let events = Arc::new(InMemoryEventSink::new());
        Fixture {
            minter: Minter::new(sealer, contract, &config, events.clone()),
            chain,
            events,
        }
    }

    #[tokio::test]
    async fn mint_stores_decryptable_envelope() {
        let f = fixture(true, true);
        let report = f.minter.mint("  hello  ").await;
        assert_eq!(report.status, MSG_MINT_COMPLETE);
        assert_eq!(report.token_id, Some(TokenId(1)));
        assert!(report.is_success());
        assert!(!f.minter.is_minting());
        assert_eq!(f.minter.status().as_deref(), Some(MSG_MINT_COMPLETE));

        let (envelope, handle) = f.chain.connect(ALICE).get_token_secret(TokenId(1)).await.unwrap();
        assert!(!handle.is_zero());
        let address = report.one_time_address.unwrap();
        assert_eq!(decrypt_secret(&envelope, &address).unwrap(), "hello");

        let events = f.events.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].action, VaultAction::MintCompleted);
        assert_eq!(events[1].token_id, Some(TokenId(1)));
    }

    #[tokio::test]
    async fn preconditions_become_status() {
        let f = fixture(false, true);
        assert_eq!(f.minter.mint("hello").await.status, MSG_CONNECT_WALLET);

        let f = fixture(true, false);
        assert_eq!(f.minter.mint("hello").await.status, "Encryption service is not ready.");

        let f = fixture(true, true);
        assert_eq!(f.minter.mint("   ").await.status, MSG_EMPTY_SECRET);
        assert!(f.events.is_empty());
    }

    #[tokio::test]
    async fn length_limit_counts_characters() {
        let f = fixture(true, true);
        let report = f.minter.mint(&"x".repeat(321)).await;
        assert_eq!(report.status, "Secret exceeds 320 characters.");
        assert!(!report.is_success());

        // 320 multi-byte characters are within the limit.
        let report = f.minter.mint(&"é".repeat(320)).await;
        assert_eq!(report.status, MSG_MINT_COMPLETE);
    }

    struct RejectingContract;

    #[async_trait::async_trait]
    impl SecretMintContract for RejectingContract {
        fn address(&self) -> Address {
            CONTRACT
        }

        fn account(&self) -> Address {
            ALICE
        }

        async fn mint_secret(&self, _: &str, _: Handle, _: &InputProof) -> Result<Receipt, ContractError> {
            Err(ContractError::InvalidProof)
        }

        async fn allow_secret_access(&self, _: TokenId, _: Address) -> Result<Receipt, ContractError> {
            Err(ContractError::OnlyTokenOwner)
        }

        async fn get_token_secret(&self, id: TokenId) -> Result<(String, Handle), ContractError> {
            Err(ContractError::TokenNotFound(id))
        }

        async fn tokens_of_owner(&self, _: Address) -> Result<Vec<TokenId>, ContractError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn contract_failure_becomes_status() {
        let config = VaultConfig::new(CONTRACT);
        let runtime = Arc::new(FheRuntime::ready(InMemoryFhe::default()));
        let sealer = Arc::new(KeySealer::new(runtime, &config));
        let events = Arc::new(InMemoryEventSink::new());
        let contract: Arc<dyn SecretMintContract> = Arc::new(RejectingContract);
        let minter = Minter::new(sealer, Some(contract), &config, events.clone());

        let report = minter.mint("hello").await;
        assert_eq!(report.status, "Invalid input proof");
        assert_eq!(report.token_id, None);
        assert!(!minter.is_minting());

        let last = events.events().pop().unwrap();
        assert!(!last.success);
        assert_eq!(last.action, VaultAction::MintFailed { reason: "Invalid input proof".into() });
    }

    #[tokio::test]
    async fn mint_action_is_re_enabled() {
        let f = fixture(true, true);
        assert_eq!(f.minter.mint("a").await.token_id, Some(TokenId(1)));
        assert_eq!(f.minter.mint("b").await.token_id, Some(TokenId(2)));
        assert!(!f.minter.is_minting());
    }
}
