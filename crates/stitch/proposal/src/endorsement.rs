//! Endorsement flow: a signed proposal for endorsing peers.

use std::collections::BTreeMap;
use std::fmt;

use stitch_crypto::{encode_b64_pem, CryptoProvider};
use stitch_protos::common::HeaderType;
use stitch_protos::peer::{
    ChaincodeHeaderExtension, ChaincodeInvocationSpec, ChaincodeProposalPayload, ChaincodeSpec,
    Proposal, SignedProposal,
};
use tracing::debug;

use crate::chaincode::{build_chaincode_input, build_chaincode_spec, ChaincodeType};
use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, ValidationErrors};
use crate::header::{build_channel_header, build_header, tls_cert_hash, ChannelHeaderSpec, TxContext};
use crate::identity::{decode_field, SigningIdentity};

/// Caller parameters for an endorsement proposal. Key material is
/// base64-wrapped PEM.
#[derive(Clone, Default)]
pub struct EndorsementRequest {
    pub msp_id: String,
    pub client_cert_b64pem: String,
    pub client_prv_key_b64pem: String,
    pub client_tls_cert_b64pem: Option<String>,
    pub channel_id: String,
    pub chaincode_id: String,
    pub chaincode_version: Option<String>,
    pub chaincode_type: ChaincodeType,
    pub chaincode_function: Option<String>,
    pub chaincode_args: Vec<Vec<u8>>,
    pub transient_map: BTreeMap<String, Vec<u8>>,
    pub is_init: bool,
}

impl EndorsementRequest {
    pub fn new(
        msp_id: impl Into<String>,
        client_cert_b64pem: impl Into<String>,
        client_prv_key_b64pem: impl Into<String>,
        channel_id: impl Into<String>,
        chaincode_id: impl Into<String>,
    ) -> Self {
        Self {
            msp_id: msp_id.into(),
            client_cert_b64pem: client_cert_b64pem.into(),
            client_prv_key_b64pem: client_prv_key_b64pem.into(),
            channel_id: channel_id.into(),
            chaincode_id: chaincode_id.into(),
            ..Default::default()
        }
    }

    /// Request signed by an identity already loaded from PEM.
    pub fn for_identity(
        identity: &SigningIdentity,
        channel_id: impl Into<String>,
        chaincode_id: impl Into<String>,
    ) -> Self {
        Self::new(
            identity.msp_id(),
            encode_b64_pem(identity.cert_pem()),
            encode_b64_pem(identity.key_pem()),
            channel_id,
            chaincode_id,
        )
    }

    pub fn function(mut self, function: impl Into<String>) -> Self {
        self.chaincode_function = Some(function.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.chaincode_args.push(arg.into());
        self
    }

    pub fn transient(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.transient_map.insert(key.into(), value.into());
        self
    }

    pub fn tls_cert(mut self, tls_cert_b64pem: impl Into<String>) -> Self {
        self.client_tls_cert_b64pem = Some(tls_cert_b64pem.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.chaincode_version = Some(version.into());
        self
    }

    pub fn chaincode_type(mut self, chaincode_type: ChaincodeType) -> Self {
        self.chaincode_type = chaincode_type;
        self
    }

    pub fn init(mut self) -> Self {
        self.is_init = true;
        self
    }

    /// Check every field and decode key material. All violations are
    /// reported together.
    fn validate(&self) -> Result<(SigningIdentity, Option<String>), ProtocolError> {
        let mut errors = ValidationErrors::new();
        let identity = SigningIdentity::collect_b64(
            &self.msp_id,
            &self.client_cert_b64pem,
            &self.client_prv_key_b64pem,
            &mut errors,
        );
        errors.require("channel_id", &self.channel_id);
        errors.require("chaincode_id", &self.chaincode_id);
        let tls = self
            .client_tls_cert_b64pem
            .as_deref()
            .and_then(|tls| decode_field("client_tls_cert_b64pem", tls, &mut errors));
        if self.transient_map.keys().any(|k| k.is_empty()) {
            errors.push("transient_map", "keys must not be empty");
        }
        errors.into_result()?;

        let identity = identity.ok_or_else(|| ProtocolError::Validation(ValidationErrors::new()))?;
        Ok((identity, tls))
    }
}

impl fmt::Debug for EndorsementRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndorsementRequest")
            .field("msp_id", &self.msp_id)
            .field("channel_id", &self.channel_id)
            .field("chaincode_id", &self.chaincode_id)
            .field("chaincode_function", &self.chaincode_function)
            .field("args", &self.chaincode_args.len())
            .field("transient_keys", &self.transient_map.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// A signed proposal together with the proposal it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedEndorsementProposal {
    pub signed_proposal: SignedProposal,
    pub proposal: Proposal,
    pub tx_id: String,
}

impl SignedEndorsementProposal {
    /// Wire bytes of the signed proposal.
    pub fn to_bytes(&self) -> Vec<u8> {
        stitch_protos::encode(&self.signed_proposal)
    }
}

/// Build and sign an endorsement proposal with a fresh nonce.
pub async fn build_signed_endorsement_proposal(
    crypto: &dyn CryptoProvider,
    config: &ProtocolConfig,
    request: &EndorsementRequest,
) -> Result<SignedEndorsementProposal, ProtocolError> {
    build_with(crypto, config, request, None).await
}

/// Same as [`build_signed_endorsement_proposal`] with a caller-chosen nonce.
pub async fn build_signed_endorsement_proposal_with_nonce(
    crypto: &dyn CryptoProvider,
    config: &ProtocolConfig,
    request: &EndorsementRequest,
    nonce: Vec<u8>,
) -> Result<SignedEndorsementProposal, ProtocolError> {
    build_with(crypto, config, request, Some(nonce)).await
}

async fn build_with(
    crypto: &dyn CryptoProvider,
    config: &ProtocolConfig,
    request: &EndorsementRequest,
    nonce: Option<Vec<u8>>,
) -> Result<SignedEndorsementProposal, ProtocolError> {
    let (identity, tls_cert_pem) = request.validate()?;

    let input = build_chaincode_input(
        request.chaincode_function.as_deref(),
        &request.chaincode_args,
        request.is_init,
    );
    let spec = build_chaincode_spec(
        &request.chaincode_id,
        request.chaincode_version.as_deref(),
        request.chaincode_type,
        input,
        config.proposal_timeout_ms,
    );

    sign_proposal(
        crypto,
        config,
        &identity,
        ProposalTarget {
            channel_id: &request.channel_id,
            spec,
            transient_map: request.transient_map.clone(),
            tls_cert_pem: tls_cert_pem.as_deref(),
        },
        nonce,
    )
    .await
}

/// Everything a proposal carries besides identity and nonce.
pub(crate) struct ProposalTarget<'a> {
    pub channel_id: &'a str,
    pub spec: ChaincodeSpec,
    pub transient_map: BTreeMap<String, Vec<u8>>,
    pub tls_cert_pem: Option<&'a str>,
}

/// Assemble a proposal innermost-first and sign its bytes.
pub(crate) async fn sign_proposal(
    crypto: &dyn CryptoProvider,
    config: &ProtocolConfig,
    identity: &SigningIdentity,
    target: ProposalTarget<'_>,
    nonce: Option<Vec<u8>>,
) -> Result<SignedEndorsementProposal, ProtocolError> {
    let tls_cert_hash = tls_cert_hash(crypto, target.tls_cert_pem).await?;

    let ctx = match nonce {
        Some(nonce) => TxContext::with_nonce(crypto, identity, nonce).await?,
        None => TxContext::new(crypto, identity, config.nonce_len).await?,
    };

    let extension = ChaincodeHeaderExtension {
        chaincode_id: target.spec.chaincode_id.clone(),
    };
    let channel_header = build_channel_header(
        HeaderType::EndorserTransaction,
        &ctx,
        ChannelHeaderSpec {
            channel_id: target.channel_id,
            extension: stitch_protos::encode(&extension),
            tls_cert_hash,
        },
    );
    let header = build_header(&channel_header, &ctx);

    let invocation = ChaincodeInvocationSpec {
        chaincode_spec: Some(target.spec),
    };
    let payload = ChaincodeProposalPayload {
        input: stitch_protos::encode(&invocation),
        transient_map: target.transient_map,
    };
    let proposal = Proposal {
        header: stitch_protos::encode(&header),
        payload: stitch_protos::encode(&payload),
        extension: Vec::new(),
    };

    let proposal_bytes = stitch_protos::encode(&proposal);
    let signature = crypto.sign(identity.key_pem(), &proposal_bytes).await?;
    debug!(
        tx_id = %ctx.tx_id,
        channel_id = target.channel_id,
        proposal_len = proposal_bytes.len(),
        "Signed endorsement proposal"
    );

    Ok(SignedEndorsementProposal {
        signed_proposal: SignedProposal {
            proposal_bytes,
            signature,
        },
        proposal,
        tx_id: ctx.tx_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_crypto::encode_b64_pem;
    use stitch_crypto::mocks::{ORG1_USER_CERT, ORG1_USER_KEY};
    use stitch_crypto::MockCryptoProvider;
    use stitch_protos::common::{ChannelHeader, Header};

    fn request() -> EndorsementRequest {
        EndorsementRequest::new(
            "Org1MSP",
            encode_b64_pem(ORG1_USER_CERT),
            encode_b64_pem(ORG1_USER_KEY),
            "mychannel",
            "basic",
        )
        .function("CreateAsset")
        .arg("asset1")
        .arg("")
    }

    #[tokio::test]
    async fn proposal_layout() {
        let crypto = MockCryptoProvider::new();
        let signed = build_signed_endorsement_proposal(&crypto, &ProtocolConfig::default(), &request())
            .await
            .unwrap();

        let proposal: Proposal = stitch_protos::decode(&signed.signed_proposal.proposal_bytes).unwrap();
        assert_eq!(proposal, signed.proposal);
        assert_eq!(
            signed.signed_proposal.signature,
            MockCryptoProvider::expected_signature(&signed.signed_proposal.proposal_bytes)
        );

        let header: Header = stitch_protos::decode(&proposal.header).unwrap();
        let channel_header: ChannelHeader = stitch_protos::decode(&header.channel_header).unwrap();
        assert_eq!(channel_header.r#type, HeaderType::EndorserTransaction as i32);
        assert_eq!(channel_header.channel_id, "mychannel");
        assert_eq!(channel_header.tx_id, signed.tx_id);
        assert!(channel_header.tls_cert_hash.is_empty());

        let extension: ChaincodeHeaderExtension =
            stitch_protos::decode(&channel_header.extension).unwrap();
        assert_eq!(extension.chaincode_id.unwrap().name, "basic");

        let payload: ChaincodeProposalPayload = stitch_protos::decode(&proposal.payload).unwrap();
        let invocation: ChaincodeInvocationSpec = stitch_protos::decode(&payload.input).unwrap();
        let args = invocation.chaincode_spec.unwrap().input.unwrap().args;
        assert_eq!(args, vec![b"CreateAsset".to_vec(), b"asset1".to_vec(), Vec::new()]);
    }

    #[tokio::test]
    async fn tls_cert_is_hashed_into_header() {
        let crypto = MockCryptoProvider::new();
        let signed = build_signed_endorsement_proposal(
            &crypto,
            &ProtocolConfig::default(),
            &request().tls_cert(encode_b64_pem(ORG1_USER_CERT)),
        )
        .await
        .unwrap();
        let header: Header = stitch_protos::decode(&signed.proposal.header).unwrap();
        let channel_header: ChannelHeader = stitch_protos::decode(&header.channel_header).unwrap();
        assert_eq!(channel_header.tls_cert_hash.len(), 32);
    }

    #[tokio::test]
    async fn validation_runs_before_crypto() {
        let crypto = MockCryptoProvider::new();
        let mut bad = request();
        bad.channel_id.clear();
        bad.chaincode_id.clear();

        let err = build_signed_endorsement_proposal(&crypto, &ProtocolConfig::default(), &bad)
            .await
            .unwrap_err();
        match err {
            ProtocolError::Validation(errors) => {
                assert_eq!(errors.fields(), vec!["channel_id", "chaincode_id"])
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(crypto.sign_calls(), 0);
        assert_eq!(crypto.hash_calls(), 0);
    }

    #[tokio::test]
    async fn signing_failure_propagates() {
        let crypto = MockCryptoProvider::failing_signer();
        let err = build_signed_endorsement_proposal(&crypto, &ProtocolConfig::default(), &request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Crypto(_)));
    }
}
