//! # SecretMint Vault
//!
//! FHE key sealing, minting and vault reconciliation for SecretMint NFTs.
//!
//! A secret is encrypted locally under a one-time address (see
//! `secretmint-envelope`); the address itself is sealed under FHE and
//! stored next to the envelope on-chain. Unlocking grants the owner ACL
//! access to the sealed address, recovers it through a signed
//! user-decryption request, and decrypts the envelope.
//!
//! Built on top of `secretmint-envelope` for the symmetric layer.
//!
//! ## Quick Start
//!
//! ```ignore
//! use secretmint_vault::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let config = VaultConfig::from_env();
//! let fhe = Arc::new(InMemoryFhe::default());
//! let runtime = Arc::new(FheRuntime::ready_shared(fhe.clone()));
//! let sealer = Arc::new(KeySealer::new(runtime, &config));
//!
//! let chain = InMemorySecretMint::new(config.contract_address, fhe);
//! let signer = Arc::new(LocalSigner::random());
//! let contract: Arc<dyn SecretMintContract> = Arc::new(chain.connect(signer.address()));
//! let events = Arc::new(TracingEventSink);
//!
//! let minter = Minter::new(sealer.clone(), Some(contract.clone()), &config, events.clone());
//! let report = minter.mint("hello").await;
//!
//! let vault = Vault::new(sealer, Some(Wallet::new(contract, signer)), events);
//! let row = vault.decrypt(report.token_id.unwrap()).await;
//! assert_eq!(row.secret.as_deref(), Some("hello"));
//! # });
//! ```

pub mod config;
pub mod contract;
pub mod eip712;
pub mod error;
pub mod events;
pub mod fhe;
pub mod minter;
pub mod mock;
pub mod sealer;
pub mod signer;
pub mod types;
pub mod vault;

pub use config::VaultConfig;
pub use contract::SecretMintContract;
pub use eip712::{Eip712Domain, TypedData, UserDecryptRequestVerification};
pub use error::{ContractError, FheError, SealError, VaultError};
pub use events::{EventSink, InMemoryEventSink, TracingEventSink, VaultAction, VaultEvent};
pub use fhe::{
    ClearValue, DecryptionKeypair, EncryptedInput, EncryptedInputBuilder, EngineStatus, FheBackend, FheRuntime,
    HandleContractPair, UserDecryptRequest,
};
pub use minter::{MintReport, Minter};
pub use mock::{InMemoryClient, InMemoryFhe, InMemorySecretMint};
pub use sealer::{KeySealer, SealedAddress};
pub use signer::{LocalSigner, Signature, TypedDataSigner};
pub use types::{Handle, InputProof, Receipt, TokenId, TokenStatus, TokenView, TxHash, UnlockState};
pub use vault::{Vault, Wallet};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use secretmint_envelope::{decrypt_secret, Address};
    use std::sync::Arc;
    use tokio::sync::Notify;

    const CONTRACT: Address = Address::from_bytes([0x5e; 20]);

    struct World {
        fhe: Arc<InMemoryFhe>,
        chain: Arc<InMemorySecretMint>,
        sealer: Arc<KeySealer<InMemoryFhe>>,
        config: VaultConfig,
        events: Arc<InMemoryEventSink>,
    }

    fn world() -> World {
        let config = VaultConfig::new(CONTRACT);
        let fhe = Arc::new(InMemoryFhe::new(Eip712Domain::decryption(
            config.chain_id,
            config.decryption_contract,
        )));
        let runtime = Arc::new(FheRuntime::ready_shared(fhe.clone()));
        World {
            chain: InMemorySecretMint::new(CONTRACT, fhe.clone()),
            sealer: Arc::new(KeySealer::new(runtime, &config)),
            events: Arc::new(InMemoryEventSink::new()),
            config,
            fhe,
        }
    }

    impl World {
        fn minter(&self, account: Address) -> Minter<InMemoryFhe> {
            let contract: Arc<dyn SecretMintContract> = Arc::new(self.chain.connect(account));
            Minter::new(self.sealer.clone(), Some(contract), &self.config, self.events.clone())
        }

        fn vault(&self, contract: Arc<dyn SecretMintContract>, signer: Arc<LocalSigner>) -> Vault<InMemoryFhe> {
            Vault::new(self.sealer.clone(), Some(Wallet::new(contract, signer)), self.events.clone())
        }
    }

    #[tokio::test]
    async fn mint_and_read_back() {
        let w = world();
        let signer = Arc::new(LocalSigner::random());
        let report = w.minter(signer.address()).mint("hello").await;
        assert!(report.is_success(), "{}", report.status);
        let token = report.token_id.unwrap();
        let one_time = report.one_time_address.unwrap();

        let client = w.chain.connect(signer.address());
        let (envelope, handle) = client.get_token_secret(token).await.unwrap();
        assert!(envelope.starts_with("sm1:"));
        assert_eq!(decrypt_secret(&envelope, &one_time).unwrap(), "hello");
        // Sealed for the contract only until the owner asks.
        assert!(w.fhe.is_allowed(handle, CONTRACT));
        assert!(!w.fhe.is_allowed(handle, signer.address()));

        let vault = w.vault(Arc::new(client), signer);
        let views = vault.refresh().await.unwrap();
        assert_eq!(views, vec![TokenView {
            token_id: token,
            encrypted_secret: Some(envelope),
            encrypted_key: Some(handle),
        }]);

        let row = vault.decrypt(token).await;
        assert_eq!(row.state, UnlockState::Unlocked);
        assert_eq!(row.secret.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn authorization_gating() {
        let w = world();
        let signer = LocalSigner::random();
        let owner = signer.address();
        let report = w.minter(owner).mint("gated").await;
        let token = report.token_id.unwrap();
        let one_time = report.one_time_address.unwrap();

        let client = w.chain.connect(owner);
        let (_, handle) = client.get_token_secret(token).await.unwrap();

        let err = w.sealer.unseal(handle, CONTRACT, owner, &signer).await.unwrap_err();
        assert!(matches!(err, SealError::DecryptionAuthorization(_)), "{err:?}");

        client.allow_secret_access(token, owner).await.unwrap();
        let recovered = w.sealer.unseal(handle, CONTRACT, owner, &signer).await.unwrap();
        assert_eq!(recovered, one_time);

        // A grant to the owner is not a grant to anyone else.
        let stranger = LocalSigner::random();
        let err = w
            .sealer
            .unseal(handle, CONTRACT, stranger.address(), &stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, SealError::DecryptionAuthorization(_)));
    }

    /// Contract client whose grant for one token blocks until released.
    struct GatedContract {
        inner: InMemoryClient,
        gated: TokenId,
        reached: Notify,
        release: Notify,
    }

    #[async_trait]
    impl SecretMintContract for GatedContract {
        fn address(&self) -> Address {
            self.inner.address()
        }

        fn account(&self) -> Address {
            self.inner.account()
        }

        async fn mint_secret(
            &self,
            envelope: &str,
            encrypted_address: Handle,
            proof: &InputProof,
        ) -> Result<Receipt, ContractError> {
            self.inner.mint_secret(envelope, encrypted_address, proof).await
        }

        async fn allow_secret_access(&self, token_id: TokenId, viewer: Address) -> Result<Receipt, ContractError> {
            if token_id == self.gated {
                self.reached.notify_one();
                self.release.notified().await;
            }
            self.inner.allow_secret_access(token_id, viewer).await
        }

        async fn get_token_secret(&self, token_id: TokenId) -> Result<(String, Handle), ContractError> {
            self.inner.get_token_secret(token_id).await
        }

        async fn tokens_of_owner(&self, owner: Address) -> Result<Vec<TokenId>, ContractError> {
            self.inner.tokens_of_owner(owner).await
        }
    }

    #[tokio::test]
    async fn per_token_independence() {
        let w = world();
        let signer = Arc::new(LocalSigner::random());
        let minter = w.minter(signer.address());
        let x = minter.mint("token x").await.token_id.unwrap();
        let y = minter.mint("token y").await.token_id.unwrap();

        let gate = Arc::new(GatedContract {
            inner: w.chain.connect(signer.address()),
            gated: y,
            reached: Notify::new(),
            release: Notify::new(),
        });
        let vault = w.vault(gate.clone(), signer);
        vault.refresh().await.unwrap();

        let (y_row, ()) = tokio::join!(vault.decrypt(y), async {
            gate.reached.notified().await;
            let y_before = vault.status(y).await;
            assert_eq!(y_before.state, UnlockState::AwaitingAuthorization);

            // X fails...
            w.fhe.drop_results(true);
            let x_row = vault.decrypt(x).await;
            assert_eq!(x_row.state, UnlockState::Failed);
            assert_eq!(vault.status(y).await, y_before);

            // ...and a retry of Y while in flight is not restarted.
            assert_eq!(vault.decrypt(y).await, y_before);

            // X succeeds, Y still untouched.
            w.fhe.drop_results(false);
            let x_row = vault.decrypt(x).await;
            assert_eq!(x_row.secret.as_deref(), Some("token x"));
            assert_eq!(vault.status(y).await, y_before);

            gate.release.notify_one();
        });

        assert_eq!(y_row.state, UnlockState::Unlocked);
        assert_eq!(y_row.secret.as_deref(), Some("token y"));
        assert_eq!(vault.decrypted(x).await.as_deref(), Some("token x"));
    }
}
