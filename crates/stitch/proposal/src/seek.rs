//! Seek flow: a signed deliver request for a block range.

use stitch_crypto::CryptoProvider;
use stitch_protos::common::{Envelope, HeaderType, Payload};
use stitch_protos::orderer::{seek_info, seek_position, SeekInfo, SeekNewest, SeekOldest, SeekPosition, SeekSpecified};
use tracing::debug;

use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, ValidationErrors};
use crate::header::{build_channel_header, build_header, tls_cert_hash, ChannelHeaderSpec, TxContext};
use crate::identity::SigningIdentity;

/// A position in the channel's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekTarget {
    Newest,
    Oldest,
    Specified(u64),
}

impl SeekTarget {
    fn to_wire(self) -> SeekPosition {
        let kind = match self {
            SeekTarget::Newest => seek_position::Type::Newest(SeekNewest {}),
            SeekTarget::Oldest => seek_position::Type::Oldest(SeekOldest {}),
            SeekTarget::Specified(number) => seek_position::Type::Specified(SeekSpecified { number }),
        };
        SeekPosition { r#type: Some(kind) }
    }
}

/// Whether the orderer waits for blocks that do not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekBehavior {
    #[default]
    BlockUntilReady,
    FailIfNotReady,
}

impl SeekBehavior {
    fn to_wire(self) -> seek_info::SeekBehavior {
        match self {
            SeekBehavior::BlockUntilReady => seek_info::SeekBehavior::BlockUntilReady,
            SeekBehavior::FailIfNotReady => seek_info::SeekBehavior::FailIfNotReady,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeekRequest {
    pub identity: SigningIdentity,
    pub channel_id: String,
    pub start: SeekTarget,
    pub stop: SeekTarget,
    pub behavior: SeekBehavior,
    pub tls_cert_pem: Option<String>,
}

impl SeekRequest {
    /// Request a single block (or the newest one).
    pub fn single(identity: SigningIdentity, channel_id: impl Into<String>, target: SeekTarget) -> Self {
        Self {
            identity,
            channel_id: channel_id.into(),
            start: target,
            stop: target,
            behavior: SeekBehavior::default(),
            tls_cert_pem: None,
        }
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        let mut errors = ValidationErrors::new();
        errors.require("channel_id", &self.channel_id);
        if let (SeekTarget::Specified(start), SeekTarget::Specified(stop)) = (self.start, self.stop) {
            if start > stop {
                errors.push("start", format!("block {start} is after stop block {stop}"));
            }
        }
        errors.into_result()
    }
}

/// A signed envelope and the transaction id inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedEnvelope {
    pub envelope: Envelope,
    pub tx_id: String,
}

impl SignedEnvelope {
    pub fn to_bytes(&self) -> Vec<u8> {
        stitch_protos::encode(&self.envelope)
    }
}

/// Build and sign a `DELIVER_SEEK_INFO` envelope.
pub async fn build_signed_seek_envelope(
    crypto: &dyn CryptoProvider,
    config: &ProtocolConfig,
    request: &SeekRequest,
) -> Result<SignedEnvelope, ProtocolError> {
    request.validate()?;

    let tls_cert_hash = tls_cert_hash(crypto, request.tls_cert_pem.as_deref()).await?;
    let ctx = TxContext::new(crypto, &request.identity, config.nonce_len).await?;
    let channel_header = build_channel_header(
        HeaderType::DeliverSeekInfo,
        &ctx,
        ChannelHeaderSpec {
            channel_id: &request.channel_id,
            extension: Vec::new(),
            tls_cert_hash,
        },
    );

    let seek_info = SeekInfo {
        start: Some(request.start.to_wire()),
        stop: Some(request.stop.to_wire()),
        behavior: request.behavior.to_wire() as i32,
    };
    let payload = Payload {
        header: Some(build_header(&channel_header, &ctx)),
        data: stitch_protos::encode(&seek_info),
    };

    let payload_bytes = stitch_protos::encode(&payload);
    let signature = crypto
        .sign(request.identity.key_pem(), &payload_bytes)
        .await?;
    debug!(tx_id = %ctx.tx_id, channel_id = %request.channel_id, "Signed seek envelope");

    Ok(SignedEnvelope {
        envelope: Envelope {
            payload: payload_bytes,
            signature,
        },
        tx_id: ctx.tx_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_crypto::mocks::{ORG1_USER_CERT, ORG1_USER_KEY};
    use stitch_crypto::MockCryptoProvider;
    use stitch_protos::common::ChannelHeader;

    fn identity() -> SigningIdentity {
        SigningIdentity::from_pem("Org1MSP", ORG1_USER_CERT, ORG1_USER_KEY).unwrap()
    }

    #[tokio::test]
    async fn seek_envelope_layout() {
        let crypto = MockCryptoProvider::new();
        let request = SeekRequest {
            start: SeekTarget::Specified(5),
            stop: SeekTarget::Newest,
            ..SeekRequest::single(identity(), "mychannel", SeekTarget::Oldest)
        };
        let signed = build_signed_seek_envelope(&crypto, &ProtocolConfig::default(), &request)
            .await
            .unwrap();

        let payload: Payload = stitch_protos::decode(&signed.envelope.payload).unwrap();
        let header = payload.header.unwrap();
        let channel_header: ChannelHeader = stitch_protos::decode(&header.channel_header).unwrap();
        assert_eq!(channel_header.r#type, HeaderType::DeliverSeekInfo as i32);
        assert_eq!(channel_header.tx_id, signed.tx_id);

        let info: SeekInfo = stitch_protos::decode(&payload.data).unwrap();
        assert_eq!(
            info.start.unwrap().r#type,
            Some(seek_position::Type::Specified(SeekSpecified { number: 5 }))
        );
        assert_eq!(
            info.stop.unwrap().r#type,
            Some(seek_position::Type::Newest(SeekNewest {}))
        );
        assert_eq!(info.behavior, seek_info::SeekBehavior::BlockUntilReady as i32);
        assert_eq!(
            signed.envelope.signature,
            MockCryptoProvider::expected_signature(&signed.envelope.payload)
        );
    }

    #[tokio::test]
    async fn rejects_inverted_range() {
        let crypto = MockCryptoProvider::new();
        let request = SeekRequest {
            start: SeekTarget::Specified(9),
            stop: SeekTarget::Specified(3),
            ..SeekRequest::single(identity(), "", SeekTarget::Newest)
        };
        let err = build_signed_seek_envelope(&crypto, &ProtocolConfig::default(), &request)
            .await
            .unwrap_err();
        match err {
            ProtocolError::Validation(errors) => assert_eq!(errors.fields(), vec!["channel_id", "start"]),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(crypto.sign_calls(), 0);
    }
}
