//! Transaction context and the header layer shared by every flow.

use chrono::Utc;
use stitch_crypto::{random_nonce, CryptoProvider};
use stitch_protos::common::{ChannelHeader, Header, HeaderType, SignatureHeader};
use stitch_protos::Timestamp;
use tracing::debug;

use crate::error::ProtocolError;
use crate::identity::SigningIdentity;

/// Nonce, creator and the transaction id derived from them.
///
/// The id is computed once and reused by every header of the same build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxContext {
    pub nonce: Vec<u8>,
    pub creator: Vec<u8>,
    pub tx_id: String,
}

impl TxContext {
    /// Fresh context with a random nonce of `nonce_len` bytes.
    pub async fn new(
        crypto: &dyn CryptoProvider,
        identity: &SigningIdentity,
        nonce_len: usize,
    ) -> Result<Self, ProtocolError> {
        Self::with_nonce(crypto, identity, random_nonce(nonce_len)).await
    }

    /// Context for a caller-supplied nonce. `tx_id = hex(SHA-256(nonce || creator))`.
    pub async fn with_nonce(
        crypto: &dyn CryptoProvider,
        identity: &SigningIdentity,
        nonce: Vec<u8>,
    ) -> Result<Self, ProtocolError> {
        let creator = identity.serialize();
        let mut preimage = Vec::with_capacity(nonce.len() + creator.len());
        preimage.extend_from_slice(&nonce);
        preimage.extend_from_slice(&creator);
        let tx_id = crypto.hash(&preimage).await?;
        debug!(tx_id = %tx_id, msp_id = identity.msp_id(), "Derived transaction id");
        Ok(Self {
            nonce,
            creator,
            tx_id,
        })
    }

    pub fn signature_header(&self) -> SignatureHeader {
        SignatureHeader {
            creator: self.creator.clone(),
            nonce: self.nonce.clone(),
        }
    }
}

/// Current wall-clock time as a protobuf timestamp.
pub fn now_timestamp() -> Timestamp {
    let now = Utc::now();
    Timestamp {
        seconds: now.timestamp(),
        nanos: now.timestamp_subsec_nanos() as i32,
    }
}

/// Channel header fields that vary per flow.
#[derive(Debug, Clone, Default)]
pub struct ChannelHeaderSpec<'a> {
    pub channel_id: &'a str,
    pub extension: Vec<u8>,
    pub tls_cert_hash: Vec<u8>,
}

pub fn build_channel_header(
    header_type: HeaderType,
    ctx: &TxContext,
    spec: ChannelHeaderSpec<'_>,
) -> ChannelHeader {
    ChannelHeader {
        r#type: header_type as i32,
        version: 0,
        timestamp: Some(now_timestamp()),
        channel_id: spec.channel_id.to_string(),
        tx_id: ctx.tx_id.clone(),
        epoch: 0,
        extension: spec.extension,
        tls_cert_hash: spec.tls_cert_hash,
    }
}

/// Outer header: encoded channel header plus encoded signature header.
pub fn build_header(channel_header: &ChannelHeader, ctx: &TxContext) -> Header {
    Header {
        channel_header: stitch_protos::encode(channel_header),
        signature_header: stitch_protos::encode(&ctx.signature_header()),
    }
}

/// SHA-256 of the DER form of a TLS client certificate.
pub async fn tls_cert_hash(
    crypto: &dyn CryptoProvider,
    tls_cert_pem: Option<&str>,
) -> Result<Vec<u8>, ProtocolError> {
    let Some(pem) = tls_cert_pem else {
        return Ok(Vec::new());
    };
    let der = crypto.pem_to_der(pem)?;
    digest_bytes(crypto, &der).await
}

/// SHA-256 through the provider, as raw bytes.
pub(crate) async fn digest_bytes(
    crypto: &dyn CryptoProvider,
    message: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let hex_digest = crypto.hash(message).await?;
    hex::decode(&hex_digest)
        .map_err(|e| ProtocolError::Encoding(format!("provider returned bad digest: {e}")))
}
