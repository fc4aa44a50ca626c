//! Key sealing: put a one-time address under FHE, and get it back through
//! an authenticated user-decryption handshake.
//!
//! Authorization is enforced by the contract's ACL, not here. `unseal`
//! only runs the handshake; the relayer rejects callers without a grant.

use chrono::Utc;
use secretmint_envelope::Address;
use std::sync::Arc;

use crate::config::{VaultConfig, DEFAULT_DURATION_DAYS};
use crate::eip712::{Eip712Domain, TypedData, UserDecryptRequestVerification};
use crate::error::SealError;
use crate::fhe::{ClearValue, EncryptedInputBuilder, FheBackend, FheRuntime, HandleContractPair, UserDecryptRequest};
use crate::signer::TypedDataSigner;
use crate::types::{Handle, InputProof};

/// Ciphertext handle and proof that accompany a mint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedAddress {
    pub handle: Handle,
    pub proof: InputProof,
}

pub struct KeySealer<B> {
    runtime: Arc<FheRuntime<B>>,
    domain: Eip712Domain,
}

impl<B: FheBackend> KeySealer<B> {
    pub fn new(runtime: Arc<FheRuntime<B>>, config: &VaultConfig) -> Self {
        Self {
            runtime,
            domain: Eip712Domain::decryption(config.chain_id, config.decryption_contract),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.runtime.is_ready()
    }

    pub fn runtime(&self) -> &Arc<FheRuntime<B>> {
        &self.runtime
    }

    /// Encrypt `address` as an input for `contract`, submitted by `caller`.
    pub async fn seal(
        &self,
        address: Address,
        contract: Address,
        caller: Address,
    ) -> Result<SealedAddress, SealError> {
        let engine = self.runtime.engine()?;

        let mut input = EncryptedInputBuilder::new(contract, caller);
        input.add_address(address);
        let encrypted = engine.encrypt(input).await?;

        let handle = encrypted
            .handles
            .first()
            .copied()
            .ok_or_else(|| SealError::Engine("encrypted input returned no handle".into()))?;

        tracing::debug!(%handle, %contract, %caller, "sealed address");
        Ok(SealedAddress {
            handle,
            proof: encrypted.input_proof,
        })
    }

    /// Recover the address behind `handle`. `caller` must already hold an
    /// ACL grant for the handle, and `signer` must sign for `caller`.
    pub async fn unseal(
        &self,
        handle: Handle,
        contract: Address,
        caller: Address,
        signer: &dyn TypedDataSigner,
    ) -> Result<Address, SealError> {
        let engine = self.runtime.engine()?;

        let keypair = engine.generate_keypair();
        let contract_addresses = vec![contract];
        let start_timestamp = Utc::now().timestamp().max(0) as u64;

        let typed = TypedData::new(
            self.domain.clone(),
            UserDecryptRequestVerification {
                public_key: keypair.public_key.clone(),
                contract_addresses: contract_addresses.clone(),
                start_timestamp,
                duration_days: DEFAULT_DURATION_DAYS,
            },
        );
        let signature = signer.sign_typed_data(&typed).await?;

        let request = UserDecryptRequest {
            pairs: vec![HandleContractPair { handle, contract }],
            keypair,
            signature,
            contract_addresses,
            user: caller,
            start_timestamp,
            duration_days: DEFAULT_DURATION_DAYS,
        };
        let mut results = engine.user_decrypt(request).await?;

        match results.remove(&handle) {
            Some(ClearValue::Address(address)) => {
                tracing::debug!(%handle, %caller, "unsealed address");
                Ok(address)
            }
            None => Err(SealError::MissingResult(handle)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::InMemoryFhe;
    use crate::signer::LocalSigner;
    use secretmint_envelope::OneTimeKey;

    fn sealer(fhe: InMemoryFhe) -> (KeySealer<InMemoryFhe>, Arc<FheRuntime<InMemoryFhe>>) {
        let runtime = Arc::new(FheRuntime::ready(fhe));
        (KeySealer::new(runtime.clone(), &VaultConfig::default()), runtime)
    }

    #[tokio::test]
    async fn seal_requires_ready_engine() {
        let runtime: Arc<FheRuntime<InMemoryFhe>> = Arc::new(FheRuntime::new());
        let sealer = KeySealer::new(runtime, &VaultConfig::default());
        let err = sealer.seal(Address::ZERO, Address::ZERO, Address::ZERO).await.unwrap_err();
        assert_eq!(err, SealError::EncryptionServiceUnavailable);

        let signer = LocalSigner::random();
        let err = sealer
            .unseal(Handle::ZERO, Address::ZERO, signer.address(), &signer)
            .await
            .unwrap_err();
        assert_eq!(err, SealError::EncryptionServiceUnavailable);
    }

    #[tokio::test]
    async fn unseal_without_grant_is_rejected_then_succeeds() {
        let (sealer, runtime) = sealer(InMemoryFhe::default());
        let contract = Address::from_bytes([0xC0; 20]);
        let signer = LocalSigner::random();
        let one_time = OneTimeKey::generate().into_address();

        let sealed = sealer.seal(one_time, contract, signer.address()).await.unwrap();
        assert!(!sealed.handle.is_zero());

        let err = sealer
            .unseal(sealed.handle, contract, signer.address(), &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, SealError::DecryptionAuthorization(_)));

        let engine = runtime.engine().unwrap();
        engine.allow(sealed.handle, contract);
        engine.allow(sealed.handle, signer.address());

        let recovered = sealer
            .unseal(sealed.handle, contract, signer.address(), &signer)
            .await
            .unwrap();
        assert_eq!(recovered, one_time);
    }

    #[tokio::test]
    async fn signature_from_another_account_is_rejected() {
        let (sealer, runtime) = sealer(InMemoryFhe::default());
        let contract = Address::from_bytes([0xC0; 20]);
        let owner = LocalSigner::random();
        let impostor = LocalSigner::random();

        let sealed = sealer.seal(Address::from_bytes([1; 20]), contract, owner.address()).await.unwrap();
        let engine = runtime.engine().unwrap();
        engine.allow(sealed.handle, contract);
        engine.allow(sealed.handle, owner.address());

        let err = sealer
            .unseal(sealed.handle, contract, owner.address(), &impostor)
            .await
            .unwrap_err();
        assert!(matches!(err, SealError::DecryptionAuthorization(_)));
    }

    #[tokio::test]
    async fn dropped_result_is_missing() {
        let (sealer, runtime) = sealer(InMemoryFhe::default());
        let contract = Address::from_bytes([0xC0; 20]);
        let signer = LocalSigner::random();

        let sealed = sealer.seal(Address::from_bytes([2; 20]), contract, signer.address()).await.unwrap();
        let engine = runtime.engine().unwrap();
        engine.allow(sealed.handle, contract);
        engine.allow(sealed.handle, signer.address());
        engine.drop_results(true);

        let err = sealer
            .unseal(sealed.handle, contract, signer.address(), &signer)
            .await
            .unwrap_err();
        assert_eq!(err, SealError::MissingResult(sealed.handle));
    }

    /// Signs with the wrapped key and remembers what it was asked to sign.
    struct RecordingSigner {
        inner: LocalSigner,
        seen: std::sync::Mutex<Vec<TypedData>>,
    }

    #[async_trait::async_trait]
    impl TypedDataSigner for RecordingSigner {
        fn address(&self) -> Address {
            self.inner.address()
        }

        async fn sign_typed_data(&self, data: &TypedData) -> Result<crate::signer::Signature, SealError> {
            self.seen.lock().unwrap().push(data.clone());
            self.inner.sign_typed_data(data).await
        }
    }

    #[tokio::test]
    async fn authorization_window_is_ten_days() {
        let (sealer, runtime) = sealer(InMemoryFhe::default());
        let contract = Address::from_bytes([0xC0; 20]);
        let signer = RecordingSigner {
            inner: LocalSigner::random(),
            seen: std::sync::Mutex::new(Vec::new()),
        };

        let sealed = sealer.seal(Address::from_bytes([3; 20]), contract, signer.address()).await.unwrap();
        let engine = runtime.engine().unwrap();
        engine.allow(sealed.handle, contract);
        engine.allow(sealed.handle, signer.address());
        sealer.unseal(sealed.handle, contract, signer.address(), &signer).await.unwrap();

        let seen = signer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message.duration_days, 10);
        assert_eq!(seen[0].message.contract_addresses, vec![contract]);
    }
}
