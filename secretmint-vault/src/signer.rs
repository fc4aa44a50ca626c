//! Wallet signing seam and a local secp256k1 signer.

use async_trait::async_trait;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand_core::OsRng;
use secretmint_envelope::Address;
use std::fmt;

use crate::eip712::TypedData;
use crate::error::SealError;

/// 65-byte recoverable signature: r[32] || s[32] || v[1], v in {27, 28}.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 65]);

impl Signature {
    fn from_parts(signature: EcdsaSignature, recovery_id: RecoveryId) -> Self {
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte() + 27;
        Self(out)
    }

    /// Hex without the `0x` prefix, the form the relayer expects.
    pub fn to_hex_unprefixed(&self) -> String {
        hex::encode(self.0)
    }

    /// Recover the signing address for a 32-byte prehash.
    pub fn recover(&self, digest: &[u8; 32]) -> Option<Address> {
        let mut v = self.0[64];
        if v >= 27 {
            v -= 27;
        }
        let recovery_id = RecoveryId::from_byte(v)?;
        let signature = EcdsaSignature::from_slice(&self.0[..64]).ok()?;
        let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id).ok()?;
        Some(Address::from_verifying_key(&key))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(0x{})", self.to_hex_unprefixed())
    }
}

/// Whoever holds the caller's account key: a browser wallet, a hardware
/// wallet, or [`LocalSigner`]. Signing may wait on the user indefinitely.
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_typed_data(&self, data: &TypedData) -> Result<Signature, SealError>;
}

/// In-process signer over a secp256k1 key.
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl LocalSigner {
    pub fn random() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    pub fn from_bytes(private_key: &[u8; 32]) -> Result<Self, SealError> {
        let key = SigningKey::from_bytes(private_key.into())
            .map_err(|e| SealError::Signing(format!("invalid private key: {}", e)))?;
        Ok(Self::from_signing_key(key))
    }

    fn from_signing_key(key: SigningKey) -> Self {
        let address = Address::from_verifying_key(key.verifying_key());
        Self { key, address }
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner").field("address", &self.address).finish()
    }
}

#[async_trait]
impl TypedDataSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(&self, data: &TypedData) -> Result<Signature, SealError> {
        let digest = data.signing_digest();
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| SealError::Signing(e.to_string()))?;
        Ok(Signature::from_parts(signature, recovery_id))
    }
}
