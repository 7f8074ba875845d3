use thiserror::Error;

/// Errors raised at the crypto provider boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid PEM in {field}: {reason}")]
    InvalidPem { field: String, reason: String },

    #[error("invalid base64 in {field}: {reason}")]
    InvalidBase64 { field: String, reason: String },

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("crypto provider unavailable: {0}")]
    Unavailable(String),
}
