//! PEM and base64 helpers for key material supplied at the caller boundary.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;

use crate::error::CryptoError;

const PEM_PREFIX: &str = "-----BEGIN";

/// Decode base64-wrapped PEM text (the caller-boundary format) to PEM text.
///
/// Input that is already PEM text is returned unchanged.
pub fn decode_b64_pem(field: &str, value: &str) -> Result<String, CryptoError> {
    let trimmed = value.trim();
    if trimmed.starts_with(PEM_PREFIX) {
        return Ok(trimmed.to_string());
    }

    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| CryptoError::InvalidBase64 {
            field: field.to_string(),
            reason: e.to_string(),
        })?;

    let text = String::from_utf8(bytes).map_err(|_| CryptoError::InvalidPem {
        field: field.to_string(),
        reason: "decoded bytes are not UTF-8".into(),
    })?;

    if !text.trim_start().starts_with(PEM_PREFIX) {
        return Err(CryptoError::InvalidPem {
            field: field.to_string(),
            reason: "missing PEM header".into(),
        });
    }
    Ok(text)
}

/// Base64-encode PEM text, the inverse of [`decode_b64_pem`].
pub fn encode_b64_pem(pem: &str) -> String {
    STANDARD.encode(pem.as_bytes())
}

/// Decode the first PEM block to DER.
pub fn pem_block_to_der(field: &str, pem: &str) -> Result<Vec<u8>, CryptoError> {
    let block = pem::parse(pem).map_err(|e| CryptoError::InvalidPem {
        field: field.to_string(),
        reason: e.to_string(),
    })?;
    Ok(block.contents().to_vec())
}

/// Fresh random bytes for a proposal nonce.
pub fn random_nonce(len: usize) -> Vec<u8> {
    let mut nonce = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}
