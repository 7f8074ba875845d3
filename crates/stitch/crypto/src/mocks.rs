use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::encoding::pem_block_to_der;
use crate::error::CryptoError;
use crate::provider::{CryptoProvider, HashAlgorithm};
use crate::software::SoftwareCryptoProvider;

/// Org1 client certificate (self-signed P-256).
pub const ORG1_USER_CERT: &str = include_str!("../testdata/org1-user.crt");
/// PKCS#8 private key matching [`ORG1_USER_CERT`].
pub const ORG1_USER_KEY: &str = include_str!("../testdata/org1-user.key");
/// The same key as [`ORG1_USER_KEY`] in SEC1 form.
pub const ORG1_USER_SEC1_KEY: &str = include_str!("../testdata/org1-user.sec1.key");
/// Org2 peer certificate.
pub const ORG2_PEER_CERT: &str = include_str!("../testdata/org2-peer.crt");
/// PKCS#8 private key matching [`ORG2_PEER_CERT`].
pub const ORG2_PEER_KEY: &str = include_str!("../testdata/org2-peer.key");

const MOCK_SIGNATURE_TAG: &[u8] = b"mock-sig:";

/// Mock crypto provider for testing.
///
/// Signatures are `mock-sig:` followed by the SHA-256 of the message, so they
/// are deterministic and easy to check. Either operation can be configured
/// to fail, and every call is counted.
#[derive(Debug, Default)]
pub struct MockCryptoProvider {
    fail_sign: bool,
    fail_hash: bool,
    sign_calls: AtomicUsize,
    hash_calls: AtomicUsize,
}

impl MockCryptoProvider {
    /// A provider whose operations all succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose `sign` always fails.
    pub fn failing_signer() -> Self {
        Self {
            fail_sign: true,
            ..Self::default()
        }
    }

    /// A provider whose `digest` always fails.
    pub fn failing_hasher() -> Self {
        Self {
            fail_hash: true,
            ..Self::default()
        }
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    pub fn hash_calls(&self) -> usize {
        self.hash_calls.load(Ordering::SeqCst)
    }

    /// Signature this provider produces for `message`.
    pub fn expected_signature(message: &[u8]) -> Vec<u8> {
        let mut signature = MOCK_SIGNATURE_TAG.to_vec();
        signature.extend_from_slice(&Sha256::digest(message));
        signature
    }
}

#[async_trait]
impl CryptoProvider for MockCryptoProvider {
    async fn sign(&self, _private_key_pem: &str, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign {
            return Err(CryptoError::Unavailable("mock signer offline".into()));
        }
        Ok(Self::expected_signature(message))
    }

    async fn digest(
        &self,
        algorithm: HashAlgorithm,
        message: &[u8],
    ) -> Result<String, CryptoError> {
        self.hash_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_hash {
            return Err(CryptoError::Unavailable("mock hasher offline".into()));
        }
        SoftwareCryptoProvider.digest(algorithm, message).await
    }

    fn pem_to_der(&self, pem: &str) -> Result<Vec<u8>, CryptoError> {
        pem_block_to_der("pem", pem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_signatures_are_deterministic() {
        let provider = MockCryptoProvider::new();
        let first = provider.sign(ORG1_USER_KEY, b"payload").await.unwrap();
        let second = provider.sign(ORG2_PEER_KEY, b"payload").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, MockCryptoProvider::expected_signature(b"payload"));
        assert_eq!(provider.sign_calls(), 2);
    }

    #[tokio::test]
    async fn failing_signer_counts_and_fails() {
        let provider = MockCryptoProvider::failing_signer();
        assert!(provider.sign(ORG1_USER_KEY, b"payload").await.is_err());
        assert_eq!(provider.sign_calls(), 1);
        assert!(provider.hash(b"payload").await.is_ok());
    }

    #[tokio::test]
    async fn failing_hasher() {
        let provider = MockCryptoProvider::failing_hasher();
        let err = provider.hash(b"payload").await.unwrap_err();
        assert!(matches!(err, CryptoError::Unavailable(_)));
    }
}
