//! Order flow: endorsed proposal plus responses into a signed transaction.

use stitch_crypto::CryptoProvider;
use stitch_protos::common::{ChannelHeader, Envelope, Header, Payload, SignatureHeader};
use stitch_protos::peer::{
    ChaincodeActionPayload, ChaincodeEndorsedAction, ChaincodeProposalPayload, Endorsement,
    Proposal, ProposalResponse, Transaction, TransactionAction,
};
use tracing::{debug, warn};

use crate::error::{ProtocolError, ValidationErrors};
use crate::header::digest_bytes;
use crate::identity::SigningIdentity;
use crate::seek::SignedEnvelope;

/// Peer status code for a successful endorsement.
pub const STATUS_SUCCESS: i32 = 200;

/// A signed `ENDORSER_TRANSACTION` envelope ready for the orderer.
pub type SignedTransaction = SignedEnvelope;

/// Whether the proposal hash covers the transient map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientMode {
    /// The payload as sent to the endorsers.
    Include,
    /// The payload as committed to the ledger.
    Strip,
}

/// Copy of a proposal payload without its transient map.
pub fn strip_transient(payload: &ChaincodeProposalPayload) -> ChaincodeProposalPayload {
    ChaincodeProposalPayload {
        input: payload.input.clone(),
        transient_map: Default::default(),
    }
}

/// SHA-256 over `channel_header || signature_header || payload`.
pub async fn proposal_hash(
    crypto: &dyn CryptoProvider,
    proposal: &Proposal,
    mode: TransientMode,
) -> Result<Vec<u8>, ProtocolError> {
    let header: Header = stitch_protos::decode(&proposal.header)?;
    let payload: ChaincodeProposalPayload = stitch_protos::decode(&proposal.payload)?;
    let payload_bytes = match mode {
        TransientMode::Include => stitch_protos::encode(&payload),
        TransientMode::Strip => stitch_protos::encode(&strip_transient(&payload)),
    };

    let mut preimage = header.channel_header.clone();
    preimage.extend_from_slice(&header.signature_header);
    preimage.extend_from_slice(&payload_bytes);
    digest_bytes(crypto, &preimage).await
}

/// Build and sign the transaction for an endorsed proposal.
///
/// Responses without status 200 or without an endorsement are skipped. The
/// build fails, without signing, when none remain. `identity` must be the
/// proposal's creator.
pub async fn build_signed_commit_transaction(
    crypto: &dyn CryptoProvider,
    identity: &SigningIdentity,
    proposal: &Proposal,
    responses: &[ProposalResponse],
) -> Result<SignedTransaction, ProtocolError> {
    let header: Header = stitch_protos::decode(&proposal.header)?;
    let signature_header: SignatureHeader = stitch_protos::decode(&header.signature_header)?;
    let channel_header: ChannelHeader = stitch_protos::decode(&header.channel_header)?;

    if signature_header.creator != identity.serialize() {
        let mut errors = ValidationErrors::new();
        errors.push("identity", "is not the creator of the proposal");
        return Err(errors.into());
    }

    let mut endorsements: Vec<Endorsement> = Vec::new();
    let mut response_payload: Option<&[u8]> = None;
    for (index, response) in responses.iter().enumerate() {
        let status = response.response.as_ref().map(|r| r.status).unwrap_or_default();
        let endorsement = match (&response.endorsement, status) {
            (Some(endorsement), STATUS_SUCCESS) => endorsement,
            _ => {
                let message = response
                    .response
                    .as_ref()
                    .map(|r| r.message.as_str())
                    .unwrap_or_default();
                warn!(index, status, reason = message, "Skipping failed endorsement response");
                continue;
            }
        };

        match response_payload {
            None => response_payload = Some(&response.payload),
            Some(first) if first != response.payload.as_slice() => {
                warn!(index, tx_id = %channel_header.tx_id, "Endorsement response payload differs from the first");
            }
            Some(_) => {}
        }
        endorsements.push(endorsement.clone());
    }

    let Some(response_payload) = response_payload else {
        return Err(ProtocolError::NoSuccessfulEndorsements {
            rejected: responses.len(),
        });
    };

    let proposal_payload: ChaincodeProposalPayload = stitch_protos::decode(&proposal.payload)?;
    let action_payload = ChaincodeActionPayload {
        chaincode_proposal_payload: stitch_protos::encode(&strip_transient(&proposal_payload)),
        action: Some(ChaincodeEndorsedAction {
            proposal_response_payload: response_payload.to_vec(),
            endorsements,
        }),
    };
    let transaction = Transaction {
        actions: vec![TransactionAction {
            header: header.signature_header.clone(),
            payload: stitch_protos::encode(&action_payload),
        }],
    };
    let payload = Payload {
        header: Some(header),
        data: stitch_protos::encode(&transaction),
    };

    let payload_bytes = stitch_protos::encode(&payload);
    let signature = crypto.sign(identity.key_pem(), &payload_bytes).await?;
    debug!(
        tx_id = %channel_header.tx_id,
        endorsements = action_payload.action.as_ref().map(|a| a.endorsements.len()).unwrap_or_default(),
        "Signed commit transaction"
    );

    Ok(SignedTransaction {
        envelope: Envelope {
            payload: payload_bytes,
            signature,
        },
        tx_id: channel_header.tx_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_crypto::mocks::{ORG1_USER_CERT, ORG1_USER_KEY, ORG2_PEER_CERT, ORG2_PEER_KEY};
    use stitch_crypto::{encode_b64_pem, MockCryptoProvider};
    use stitch_protos::peer::Response;

    use crate::config::ProtocolConfig;
    use crate::endorsement::{build_signed_endorsement_proposal, EndorsementRequest};

    async fn proposal(crypto: &MockCryptoProvider) -> Proposal {
        let request = EndorsementRequest::new(
            "Org1MSP",
            encode_b64_pem(ORG1_USER_CERT),
            encode_b64_pem(ORG1_USER_KEY),
            "mychannel",
            "basic",
        )
        .function("Transfer")
        .transient("secret", "s3cr3t");
        build_signed_endorsement_proposal(crypto, &ProtocolConfig::default(), &request)
            .await
            .unwrap()
            .proposal
    }

    fn response(status: i32, payload: &[u8]) -> ProposalResponse {
        ProposalResponse {
            version: 1,
            timestamp: None,
            response: Some(Response {
                status,
                message: String::new(),
                payload: Vec::new(),
            }),
            payload: payload.to_vec(),
            endorsement: Some(Endorsement {
                endorser: b"peer0".to_vec(),
                signature: b"sig".to_vec(),
            }),
        }
    }

    #[tokio::test]
    async fn rejects_foreign_signer() {
        let crypto = MockCryptoProvider::new();
        let proposal = proposal(&crypto).await;
        let other = SigningIdentity::from_pem("Org2MSP", ORG2_PEER_CERT, ORG2_PEER_KEY).unwrap();
        let before = crypto.sign_calls();
        let err = build_signed_commit_transaction(&crypto, &other, &proposal, &[response(200, b"rw")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Validation(_)));
        assert_eq!(crypto.sign_calls(), before);
    }

    #[tokio::test]
    async fn responses_without_endorsement_are_skipped() {
        let crypto = MockCryptoProvider::new();
        let proposal = proposal(&crypto).await;
        let identity = SigningIdentity::from_pem("Org1MSP", ORG1_USER_CERT, ORG1_USER_KEY).unwrap();
        let mut unendorsed = response(200, b"rw");
        unendorsed.endorsement = None;

        let err = build_signed_commit_transaction(&crypto, &identity, &proposal, &[unendorsed])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::NoSuccessfulEndorsements { rejected: 1 }
        ));
    }

    #[tokio::test]
    async fn strip_hash_differs_from_include_hash() {
        let crypto = MockCryptoProvider::new();
        let proposal = proposal(&crypto).await;
        let include = proposal_hash(&crypto, &proposal, TransientMode::Include)
            .await
            .unwrap();
        let strip = proposal_hash(&crypto, &proposal, TransientMode::Strip)
            .await
            .unwrap();
        assert_eq!(include.len(), 32);
        assert_ne!(include, strip);
    }
}
