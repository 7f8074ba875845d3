use async_trait::async_trait;

use crate::error::CryptoError;

/// Digest algorithms the provider must support.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha3_256,
}

/// Signing and hashing boundary of the pipeline.
///
/// Builders call into the provider for every hash and signature they need.
/// A failure must surface as an error; no partially-signed message escapes.
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    /// Sign `message` with the PEM-encoded private key.
    ///
    /// Returns a DER-encoded ECDSA signature.
    async fn sign(&self, private_key_pem: &str, message: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Digest `message` and return the lowercase hex string.
    async fn digest(&self, algorithm: HashAlgorithm, message: &[u8])
        -> Result<String, CryptoError>;

    /// Decode the first PEM block in `pem` to DER bytes.
    fn pem_to_der(&self, pem: &str) -> Result<Vec<u8>, CryptoError>;

    /// SHA-256 of `message`, hex encoded.
    async fn hash(&self, message: &[u8]) -> Result<String, CryptoError> {
        self.digest(HashAlgorithm::Sha256, message).await
    }
}
