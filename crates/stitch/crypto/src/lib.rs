//! Stitch Crypto - the crypto provider boundary.
//!
//! The proposal pipeline never touches key material directly. It asks a
//! [`CryptoProvider`] to hash and sign assembled bytes, and treats every
//! provider failure as fatal for the message being built.
//!
//! - [`SoftwareCryptoProvider`]: ECDSA P-256 (low-S, DER) with PKCS#8 or SEC1 keys
//! - [`HashAlgorithm`]: SHA-256 and SHA3-256 digests, hex encoded
//! - [`encoding`]: base64-PEM decoding used at the caller boundary
//! - `mocks`: deterministic provider and key fixtures for tests, behind the
//!   `mocks` feature

#![deny(unsafe_code)]

pub mod encoding;
pub mod error;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod provider;
pub mod software;

pub use encoding::{decode_b64_pem, encode_b64_pem, pem_block_to_der, random_nonce};
pub use error::CryptoError;
#[cfg(any(test, feature = "mocks"))]
pub use mocks::MockCryptoProvider;
pub use provider::{CryptoProvider, HashAlgorithm};
pub use software::{parse_signing_key, sign_low_s, SoftwareCryptoProvider};
