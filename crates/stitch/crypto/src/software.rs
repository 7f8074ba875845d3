use async_trait::async_trait;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::DecodePrivateKey;
use p256::SecretKey;
use sha2::{Digest, Sha256};
use sha3::Sha3_256;
use tracing::debug;

use crate::encoding::pem_block_to_der;
use crate::error::CryptoError;
use crate::provider::{CryptoProvider, HashAlgorithm};

/// Software ECDSA P-256 provider.
///
/// Keys are parsed per call and never cached. Signatures are normalised to
/// low-S form, which Fabric MSPs require.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareCryptoProvider;

impl SoftwareCryptoProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Parse a PKCS#8 (`PRIVATE KEY`) or SEC1 (`EC PRIVATE KEY`) PEM key.
pub fn parse_signing_key(private_key_pem: &str) -> Result<SigningKey, CryptoError> {
    let pem = private_key_pem.trim();
    let secret = if pem.contains("BEGIN EC PRIVATE KEY") {
        SecretKey::from_sec1_pem(pem).map_err(|e| CryptoError::InvalidKey(e.to_string()))?
    } else {
        SecretKey::from_pkcs8_pem(pem).map_err(|e| CryptoError::InvalidKey(e.to_string()))?
    };
    Ok(SigningKey::from(secret))
}

/// Sign with SHA-256 and return the low-S DER signature.
pub fn sign_low_s(key: &SigningKey, message: &[u8]) -> Vec<u8> {
    let signature: Signature = key.sign(message);
    let signature = signature.normalize_s().unwrap_or(signature);
    signature.to_der().as_bytes().to_vec()
}

#[async_trait]
impl CryptoProvider for SoftwareCryptoProvider {
    async fn sign(&self, private_key_pem: &str, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = parse_signing_key(private_key_pem)?;
        let signature = sign_low_s(&key, message);
        debug!(
            message_len = message.len(),
            signature_len = signature.len(),
            "Signed message"
        );
        Ok(signature)
    }

    async fn digest(
        &self,
        algorithm: HashAlgorithm,
        message: &[u8],
    ) -> Result<String, CryptoError> {
        let digest = match algorithm {
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(message)),
            HashAlgorithm::Sha3_256 => hex::encode(Sha3_256::digest(message)),
        };
        Ok(digest)
    }

    fn pem_to_der(&self, pem: &str) -> Result<Vec<u8>, CryptoError> {
        pem_block_to_der("pem", pem)
    }
}
