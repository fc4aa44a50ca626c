//! Vault reconciliation: list the connected account's tokens and unlock
//! them one at a time.
//!
//! Each token has a row in a keyed status table. Rows are independent: a
//! failure on one token never touches another, and the table lock is never
//! held across an `.await`, so any number of tokens can be in flight.
//!
//! Failures are recorded as the row's message, never returned as errors,
//! and never clear a secret an earlier unlock recovered.

use secretmint_envelope::{decrypt_secret, Address};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::contract::SecretMintContract;
use crate::error::{SealError, VaultError};
use crate::events::{EventSink, VaultAction, VaultEvent};
use crate::fhe::FheBackend;
use crate::sealer::KeySealer;
use crate::signer::TypedDataSigner;
use crate::types::{Handle, TokenId, TokenStatus, TokenView, UnlockState};

pub const MSG_CONNECT_WALLET: &str = "Connect your wallet to decrypt.";
pub const MSG_PREPARING: &str = "Preparing decryption...";
pub const MSG_GRANTING: &str = "Granting decryption access...";
pub const MSG_DECRYPTING: &str = "Requesting decryption...";
pub const MSG_COMPLETE: &str = "Decryption complete.";

/// Connected account: a contract client sending from it and a signer for it.
#[derive(Clone)]
pub struct Wallet {
    pub contract: Arc<dyn SecretMintContract>,
    pub signer: Arc<dyn TypedDataSigner>,
}

impl Wallet {
    pub fn new(contract: Arc<dyn SecretMintContract>, signer: Arc<dyn TypedDataSigner>) -> Self {
        Self { contract, signer }
    }

    pub fn account(&self) -> Address {
        self.contract.account()
    }
}

pub struct Vault<B> {
    sealer: Arc<KeySealer<B>>,
    wallet: Option<Wallet>,
    events: Arc<dyn EventSink>,
    views: RwLock<Vec<TokenView>>,
    table: RwLock<HashMap<TokenId, TokenStatus>>,
}

impl<B: FheBackend> Vault<B> {
    /// `wallet` is `None` while no wallet is connected.
    pub fn new(sealer: Arc<KeySealer<B>>, wallet: Option<Wallet>, events: Arc<dyn EventSink>) -> Self {
        Self {
            sealer,
            wallet,
            events,
            views: RwLock::new(Vec::new()),
            table: RwLock::new(HashMap::new()),
        }
    }

    pub fn identity(&self) -> Option<Address> {
        self.wallet.as_ref().map(Wallet::account)
    }

    /// Reload the account's tokens and their stored envelopes. Reads that
    /// fail leave the view's fields empty.
    pub async fn refresh(&self) -> Result<Vec<TokenView>, VaultError> {
        let Some(wallet) = &self.wallet else {
            self.views.write().await.clear();
            return Ok(Vec::new());
        };

        let ids = wallet.contract.tokens_of_owner(wallet.account()).await?;
        let mut views = Vec::with_capacity(ids.len());
        for token_id in ids {
            let mut view = TokenView::pending(token_id);
            match wallet.contract.get_token_secret(token_id).await {
                Ok((envelope, handle)) => {
                    view.encrypted_secret = Some(envelope);
                    view.encrypted_key = Some(handle);
                }
                Err(e) => tracing::debug!(%token_id, error = %e, "token read failed"),
            }
            views.push(view);
        }

        self.events.record(
            VaultEvent::account_event(VaultAction::TokensRefreshed { count: views.len() })
                .with_actor(Some(wallet.account())),
        );
        *self.views.write().await = views.clone();
        Ok(views)
    }

    /// Views from the last `refresh`.
    pub async fn tokens(&self) -> Vec<TokenView> {
        self.views.read().await.clone()
    }

    pub async fn status(&self, token_id: TokenId) -> TokenStatus {
        self.table.read().await.get(&token_id).cloned().unwrap_or_default()
    }

    pub async fn decrypted(&self, token_id: TokenId) -> Option<String> {
        self.table.read().await.get(&token_id).and_then(|s| s.secret.clone())
    }

    /// Unlock one token. Returns its final row; a token that is already
    /// in flight is left alone and its current row returned.
    pub async fn decrypt(&self, token_id: TokenId) -> TokenStatus {
        let wallet = match self.claim(token_id).await {
            Ok(wallet) => wallet,
            Err(row) => return row,
        };
        let actor = Some(wallet.account());
        self.events.record(
            VaultEvent::token_event(token_id, UnlockState::Preparing, VaultAction::UnlockStarted)
                .with_actor(actor),
        );

        match self.unlock(&wallet, token_id).await {
            Ok(secret) => {
                let row = TokenStatus {
                    state: UnlockState::Unlocked,
                    message: Some(MSG_COMPLETE.into()),
                    secret: Some(secret),
                };
                self.table.write().await.insert(token_id, row.clone());
                self.events.record(
                    VaultEvent::token_event(token_id, UnlockState::Unlocked, VaultAction::UnlockCompleted)
                        .with_actor(actor),
                );
                row
            }
            Err(e) => {
                let reason = e.to_string();
                let row = {
                    let mut table = self.table.write().await;
                    let row = table.entry(token_id).or_default();
                    row.state = UnlockState::Failed;
                    row.message = Some(reason.clone());
                    row.clone()
                };
                self.events.record(
                    VaultEvent::token_event(token_id, UnlockState::Failed, VaultAction::UnlockFailed { reason })
                        .with_actor(actor)
                        .with_failure(),
                );
                row
            }
        }
    }

    /// Move the row to PREPARING, or explain why not. The precondition
    /// check and the state change happen under one write lock. A secret
    /// recovered by an earlier unlock stays on the row.
    async fn claim(&self, token_id: TokenId) -> Result<Wallet, TokenStatus> {
        let mut table = self.table.write().await;
        let row = table.entry(token_id).or_default();
        if row.state.in_flight() {
            return Err(row.clone());
        }

        let checked = match (&self.wallet, self.sealer.is_ready()) {
            (None, _) => Err(MSG_CONNECT_WALLET.to_string()),
            (Some(_), false) => Err(SealError::EncryptionServiceUnavailable.to_string()),
            (Some(wallet), true) => Ok(wallet.clone()),
        };

        match checked {
            Ok(wallet) => {
                row.state = UnlockState::Preparing;
                row.message = Some(MSG_PREPARING.into());
                Ok(wallet)
            }
            Err(message) => {
                tracing::warn!(%token_id, %message, "unlock rejected");
                row.state = UnlockState::Failed;
                row.message = Some(message);
                Err(row.clone())
            }
        }
    }

    async fn advance(&self, token_id: TokenId, state: UnlockState, message: &str) {
        let mut table = self.table.write().await;
        let row = table.entry(token_id).or_default();
        debug_assert!(row.state.can_transition_to(state), "{} -> {}", row.state, state);
        row.state = state;
        row.message = Some(message.into());
    }

    async fn unlock(&self, wallet: &Wallet, token_id: TokenId) -> Result<String, VaultError> {
        let account = wallet.account();
        let (envelope, handle) = self.token_data(wallet, token_id).await?;

        self.advance(token_id, UnlockState::AwaitingAuthorization, MSG_GRANTING).await;
        let receipt = wallet.contract.allow_secret_access(token_id, account).await?;
        if !receipt.status {
            return Err(VaultError::Reverted(receipt.tx_hash.to_string()));
        }
        self.events.record(
            VaultEvent::token_event(
                token_id,
                UnlockState::AwaitingAuthorization,
                VaultAction::AccessGranted { viewer: account },
            )
            .with_actor(Some(account))
            .with_detail(receipt.tx_hash.to_string()),
        );

        self.advance(token_id, UnlockState::Decrypting, MSG_DECRYPTING).await;
        let one_time = self
            .sealer
            .unseal(handle, wallet.contract.address(), account, wallet.signer.as_ref())
            .await?;
        let secret = decrypt_secret(&envelope, &one_time)?;

        tracing::info!(%token_id, "secret unlocked");
        Ok(secret)
    }

    /// Cached envelope and handle, or a fresh contract read.
    async fn token_data(&self, wallet: &Wallet, token_id: TokenId) -> Result<(String, Handle), VaultError> {
        let cached = self
            .views
            .read()
            .await
            .iter()
            .find(|v| v.token_id == token_id)
            .and_then(|v| Some((v.encrypted_secret.clone()?, v.encrypted_key?)));

        let (envelope, handle) = match cached {
            Some(data) => data,
            None => wallet.contract.get_token_secret(token_id).await.map_err(|e| {
                tracing::debug!(%token_id, error = %e, "token read failed");
                VaultError::TokenDataUnavailable(token_id)
            })?,
        };

        if envelope.is_empty() || handle.is_zero() {
            return Err(VaultError::TokenDataUnavailable(token_id));
        }
        Ok((envelope, handle))
    }
}
