//! Client signing identity.

use std::fmt;

use stitch_crypto::decode_b64_pem;
use stitch_protos::msp::SerializedIdentity;
use zeroize::Zeroizing;

use crate::error::{ProtocolError, ValidationErrors};

/// MSP id, enrolment certificate and private key of the requesting client.
#[derive(Clone)]
pub struct SigningIdentity {
    msp_id: String,
    cert_pem: String,
    key_pem: Zeroizing<String>,
}

impl SigningIdentity {
    /// Build from PEM text.
    pub fn from_pem(
        msp_id: impl Into<String>,
        cert_pem: impl Into<String>,
        key_pem: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        let identity = Self {
            msp_id: msp_id.into(),
            cert_pem: cert_pem.into(),
            key_pem: Zeroizing::new(key_pem.into()),
        };
        let mut errors = ValidationErrors::new();
        errors.require("msp_id", &identity.msp_id);
        errors.require("client_cert", &identity.cert_pem);
        errors.require("client_prv_key", &identity.key_pem);
        errors.into_result()?;
        Ok(identity)
    }

    /// Build from base64-wrapped PEM, the format callers hand over.
    pub fn from_b64_pem(msp_id: &str, cert_b64: &str, key_b64: &str) -> Result<Self, ProtocolError> {
        let mut errors = ValidationErrors::new();
        let identity = Self::collect_b64(msp_id, cert_b64, key_b64, &mut errors);
        errors.into_result()?;
        identity.ok_or_else(|| ProtocolError::Validation(ValidationErrors::new()))
    }

    /// Decode identity fields, recording every problem in `errors`.
    pub(crate) fn collect_b64(
        msp_id: &str,
        cert_b64: &str,
        key_b64: &str,
        errors: &mut ValidationErrors,
    ) -> Option<Self> {
        errors.require("msp_id", msp_id);

        let cert = decode_field("client_cert_b64pem", cert_b64, errors);
        let key = decode_field("client_prv_key_b64pem", key_b64, errors).map(Zeroizing::new);

        match (msp_id.trim().is_empty(), cert, key) {
            (false, Some(cert_pem), Some(key_pem)) => Some(Self {
                msp_id: msp_id.to_string(),
                cert_pem,
                key_pem,
            }),
            _ => None,
        }
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    pub(crate) fn key_pem(&self) -> &str {
        &self.key_pem
    }

    /// Encoded `msp.SerializedIdentity`, the creator field of every header.
    pub fn serialize(&self) -> Vec<u8> {
        stitch_protos::encode(&SerializedIdentity {
            mspid: self.msp_id.clone(),
            id_bytes: self.cert_pem.as_bytes().to_vec(),
        })
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("msp_id", &self.msp_id)
            .field("cert_pem", &format_args!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Decode an optional base64-PEM field, recording a violation on failure.
pub(crate) fn decode_field(
    field: &str,
    value: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    if value.trim().is_empty() {
        errors.push(field, "is required");
        return None;
    }
    match decode_b64_pem(field, value) {
        Ok(pem) => Some(pem),
        Err(e) => {
            errors.push(field, e.to_string());
            None
        }
    }
}
