//! Config-update flow.

use stitch_crypto::{random_nonce, CryptoProvider};
use stitch_protos::common::{ConfigSignature, ConfigUpdateEnvelope, Envelope, HeaderType, Payload, SignatureHeader};
use tracing::debug;

use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, ValidationErrors};
use crate::header::{build_channel_header, build_header, ChannelHeaderSpec, TxContext};
use crate::identity::SigningIdentity;
use crate::seek::SignedEnvelope;

/// One signer's approval of a config update.
///
/// The signature covers `signature_header || config_update`.
pub async fn sign_config_update(
    crypto: &dyn CryptoProvider,
    config: &ProtocolConfig,
    identity: &SigningIdentity,
    config_update: &[u8],
) -> Result<ConfigSignature, ProtocolError> {
    if config_update.is_empty() {
        let mut errors = ValidationErrors::new();
        errors.push("config_update", "is required");
        return Err(errors.into());
    }

    let signature_header = stitch_protos::encode(&SignatureHeader {
        creator: identity.serialize(),
        nonce: random_nonce(config.nonce_len),
    });
    let mut message = signature_header.clone();
    message.extend_from_slice(config_update);
    let signature = crypto.sign(identity.key_pem(), &message).await?;
    debug!(msp_id = identity.msp_id(), "Signed config update");

    Ok(ConfigSignature {
        signature_header,
        signature,
    })
}

/// Wrap a config update and its collected signatures in a signed
/// `CONFIG_UPDATE` envelope.
pub async fn build_signed_config_update_envelope(
    crypto: &dyn CryptoProvider,
    config: &ProtocolConfig,
    identity: &SigningIdentity,
    channel_id: &str,
    config_update: &[u8],
    signatures: Vec<ConfigSignature>,
) -> Result<SignedEnvelope, ProtocolError> {
    let mut errors = ValidationErrors::new();
    errors.require("channel_id", channel_id);
    if config_update.is_empty() {
        errors.push("config_update", "is required");
    }
    errors.into_result()?;

    let ctx = TxContext::new(crypto, identity, config.nonce_len).await?;
    let channel_header = build_channel_header(
        HeaderType::ConfigUpdate,
        &ctx,
        ChannelHeaderSpec {
            channel_id,
            ..Default::default()
        },
    );
    let update_envelope = ConfigUpdateEnvelope {
        config_update: config_update.to_vec(),
        signatures,
    };
    let payload = Payload {
        header: Some(build_header(&channel_header, &ctx)),
        data: stitch_protos::encode(&update_envelope),
    };

    let payload_bytes = stitch_protos::encode(&payload);
    let signature = crypto.sign(identity.key_pem(), &payload_bytes).await?;
    debug!(
        tx_id = %ctx.tx_id,
        channel_id,
        signatures = update_envelope.signatures.len(),
        "Signed config update envelope"
    );

    Ok(SignedEnvelope {
        envelope: Envelope {
            payload: payload_bytes,
            signature,
        },
        tx_id: ctx.tx_id,
    })
}
