//! # SecretMint Envelope
//!
//! Client-side sealing of NFT secrets under one-time address keys.
//!
//! ## Quick Start
//!
//! ```rust
//! use secretmint_envelope::{decrypt_secret, encrypt_secret, OneTimeKey};
//!
//! let key = OneTimeKey::generate();
//! let envelope = encrypt_secret("hello", key.address()).unwrap();
//! assert!(envelope.starts_with("sm1:"));
//!
//! // The address, not the private key, is the capability.
//! let address = key.into_address();
//! assert_eq!(decrypt_secret(&envelope, &address).unwrap(), "hello");
//! ```
//!
//! ## Properties
//!
//! - **AES-256-GCM**: 96-bit random nonce per call, 128-bit tag
//! - **Address-bound key**: SHA-256 over a domain prefix and the lower-cased
//!   address, so checksum casing never matters
//! - **Distinct failures**: malformed envelopes and failed authentication are
//!   separate error variants; unauthenticated plaintext is never returned
//! - **Stable wire format**: `sm1:<b64 nonce>:<b64 ciphertext||tag>`
//!
//! ## What's NOT Provided
//!
//! - Sealing the address itself (see `secretmint-vault`)
//! - Key management

#![deny(unsafe_code)]

extern crate alloc;

mod aead;
mod codec;
mod error;
mod onetime;

pub mod address;

// Wire and KDF internals are public for the CLI inspect command and
// interop tests, but are not stable API.
#[doc(hidden)]
pub mod kdf;
#[doc(hidden)]
pub mod wire;

pub use address::Address;
pub use codec::{decrypt_secret, encrypt_secret, inspect, EnvelopeInfo};
pub use error::{AddressError, DecryptError, EncodingError};
pub use onetime::OneTimeKey;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
