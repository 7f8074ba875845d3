use std::fmt;

use stitch_crypto::CryptoError;
use stitch_policy::PolicyError;
use thiserror::Error;

/// Errors from the proposal pipeline.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Caller input rejected before any cryptographic work.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("no successful endorsements among {rejected} responses")]
    NoSuccessfulEndorsements { rejected: usize },

    #[error("peer returned status {status}: {message}")]
    Rejected { status: i32, message: String },
}

impl From<ValidationErrors> for ProtocolError {
    fn from(errors: ValidationErrors) -> Self {
        ProtocolError::Validation(errors)
    }
}

impl From<stitch_protos::DecodeError> for ProtocolError {
    fn from(e: stitch_protos::DecodeError) -> Self {
        ProtocolError::Encoding(e.to_string())
    }
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

/// Every field violation found in a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            reason: reason.into(),
        });
    }

    /// Record `field` as missing when `value` is blank.
    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "is required");
        }
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ProtocolError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} {}", v.field, v.reason)?;
        }
        Ok(())
    }
}
