//! SecretMint contract interface.
//!
//! A client is bound to one account: writes are sent from `account()`, and
//! `allow_secret_access` reverts with `Only token owner` when that account
//! does not own the token. Write methods resolve once the transaction is
//! confirmed.

use async_trait::async_trait;
use secretmint_envelope::Address;

use crate::error::ContractError;
use crate::types::{Handle, InputProof, Receipt, TokenId};

#[async_trait]
pub trait SecretMintContract: Send + Sync {
    /// Deployed contract address.
    fn address(&self) -> Address;

    /// Account this client sends transactions from.
    fn account(&self) -> Address;

    /// Mint a token holding `envelope` and the sealed one-time address.
    /// Envelope and handle are stored atomically.
    async fn mint_secret(
        &self,
        envelope: &str,
        encrypted_address: Handle,
        proof: &InputProof,
    ) -> Result<Receipt, ContractError>;

    /// Grant `viewer` decryption rights on the token's sealed address.
    async fn allow_secret_access(&self, token_id: TokenId, viewer: Address) -> Result<Receipt, ContractError>;

    /// `(envelope, sealed address handle)`.
    async fn get_token_secret(&self, token_id: TokenId) -> Result<(String, Handle), ContractError>;

    /// Tokens held by `owner`, in mint order.
    async fn tokens_of_owner(&self, owner: Address) -> Result<Vec<TokenId>, ContractError>;
}
