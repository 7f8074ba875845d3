//! Response decoders and structural views of built messages.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use stitch_policy::{to_compact_string, CanonicalPolicy};
use stitch_protos::common::{ChannelHeader, Envelope, Header, HeaderType, Payload, SignatureHeader};
use stitch_protos::lifecycle::{
    query_installed_chaincodes_result, CheckCommitReadinessResult, InstallChaincodeResult,
    QueryChaincodeDefinitionResult, QueryChaincodeDefinitionsResult, QueryInstalledChaincodesResult,
};
use stitch_protos::msp::SerializedIdentity;
use stitch_protos::peer::{
    application_policy, collection_config, collection_policy_config, ApplicationPolicy, ChaincodeActionPayload,
    ChaincodeInvocationSpec, ChaincodeProposalPayload, CollectionConfigPackage, Proposal, ProposalResponse,
    SignedProposal, StaticCollectionConfig, Transaction,
};

use crate::commit::STATUS_SUCCESS;
use crate::error::ProtocolError;

/// The payload of a successful peer response.
///
/// A missing response or any status other than 200 is
/// [`ProtocolError::Rejected`].
pub fn decode_response_payload(response: &ProposalResponse) -> Result<&[u8], ProtocolError> {
    let Some(inner) = response.response.as_ref() else {
        return Err(ProtocolError::Rejected {
            status: 0,
            message: "response carries no status".into(),
        });
    };
    if inner.status != STATUS_SUCCESS {
        return Err(ProtocolError::Rejected {
            status: inner.status,
            message: inner.message.clone(),
        });
    }
    Ok(&inner.payload)
}

/// An installed chaincode package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledChaincode {
    pub package_id: String,
    pub label: String,
    /// Channel name to the `(name, version)` definitions using the package.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, Vec<ChaincodeReference>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChaincodeReference {
    pub name: String,
    pub version: String,
}

pub fn decode_install_result(payload: &[u8]) -> Result<InstalledChaincode, ProtocolError> {
    let result: InstallChaincodeResult = stitch_protos::decode(payload)?;
    Ok(InstalledChaincode {
        package_id: result.package_id,
        label: result.label,
        references: BTreeMap::new(),
    })
}

pub fn decode_installed_chaincodes(payload: &[u8]) -> Result<Vec<InstalledChaincode>, ProtocolError> {
    let result: QueryInstalledChaincodesResult = stitch_protos::decode(payload)?;
    Ok(result
        .installed_chaincodes
        .into_iter()
        .map(|installed| InstalledChaincode {
            package_id: installed.package_id,
            label: installed.label,
            references: installed
                .references
                .into_iter()
                .map(|(channel, refs)| (channel, references(refs)))
                .collect(),
        })
        .collect())
}

fn references(refs: query_installed_chaincodes_result::References) -> Vec<ChaincodeReference> {
    refs.chaincodes
        .into_iter()
        .map(|c| ChaincodeReference {
            name: c.name,
            version: c.version,
        })
        .collect()
}

/// A validation or endorsement policy with signature policies rendered in
/// compact notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationParameterView {
    SignaturePolicy(String),
    PolicyReference(String),
    Unset,
}

impl ValidationParameterView {
    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.is_empty() {
            return Ok(ValidationParameterView::Unset);
        }
        let policy: ApplicationPolicy = stitch_protos::decode(bytes)?;
        Self::from_wire(policy)
    }

    fn from_wire(policy: ApplicationPolicy) -> Result<Self, ProtocolError> {
        Ok(match policy.r#type {
            Some(application_policy::Type::SignaturePolicy(envelope)) => {
                let policy = CanonicalPolicy::from_envelope(&envelope)?;
                ValidationParameterView::SignaturePolicy(to_compact_string(&policy)?)
            }
            Some(application_policy::Type::ChannelConfigPolicyReference(reference)) => {
                ValidationParameterView::PolicyReference(reference)
            }
            None => ValidationParameterView::Unset,
        })
    }
}

/// A collection from a committed or approved definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionView {
    pub name: String,
    pub required_peer_count: i32,
    pub maximum_peer_count: i32,
    pub block_to_live: u64,
    pub member_only_read: bool,
    pub member_only_write: bool,
    pub member_orgs_policy: String,
    pub endorsement_policy: ValidationParameterView,
}

impl CollectionView {
    fn from_wire(config: StaticCollectionConfig) -> Result<Self, ProtocolError> {
        let member_orgs_policy = match config.member_orgs_policy.and_then(|p| p.payload) {
            Some(collection_policy_config::Payload::SignaturePolicy(envelope)) => {
                to_compact_string(&CanonicalPolicy::from_envelope(&envelope)?)?
            }
            None => String::new(),
        };
        let endorsement_policy = match config.endorsement_policy {
            Some(policy) => ValidationParameterView::from_wire(policy)?,
            None => ValidationParameterView::Unset,
        };
        Ok(CollectionView {
            name: config.name,
            required_peer_count: config.required_peer_count,
            maximum_peer_count: config.maximum_peer_count,
            block_to_live: config.block_to_live,
            member_only_read: config.member_only_read,
            member_only_write: config.member_only_write,
            member_orgs_policy,
            endorsement_policy,
        })
    }
}

fn collection_views(package: Option<CollectionConfigPackage>) -> Result<Vec<CollectionView>, ProtocolError> {
    package
        .map(|p| p.config)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|c| c.payload)
        .map(|collection_config::Payload::StaticCollectionConfig(config)| CollectionView::from_wire(config))
        .collect()
}

/// A chaincode definition as reported by `_lifecycle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaincodeDefinitionView {
    pub name: String,
    pub sequence: i64,
    pub version: String,
    pub endorsement_plugin: String,
    pub validation_plugin: String,
    pub validation_parameter: ValidationParameterView,
    pub collections: Vec<CollectionView>,
    pub init_required: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub approvals: BTreeMap<String, bool>,
}

/// Decode a `QueryChaincodeDefinition` result. The result does not repeat
/// the chaincode name, so the caller supplies it.
pub fn decode_chaincode_definition(name: &str, payload: &[u8]) -> Result<ChaincodeDefinitionView, ProtocolError> {
    let result: QueryChaincodeDefinitionResult = stitch_protos::decode(payload)?;
    Ok(ChaincodeDefinitionView {
        name: name.to_string(),
        sequence: result.sequence,
        version: result.version,
        endorsement_plugin: result.endorsement_plugin,
        validation_plugin: result.validation_plugin,
        validation_parameter: ValidationParameterView::from_bytes(&result.validation_parameter)?,
        collections: collection_views(result.collections)?,
        init_required: result.init_required,
        approvals: result.approvals,
    })
}

pub fn decode_chaincode_definitions(payload: &[u8]) -> Result<Vec<ChaincodeDefinitionView>, ProtocolError> {
    let result: QueryChaincodeDefinitionsResult = stitch_protos::decode(payload)?;
    result
        .chaincode_definitions
        .into_iter()
        .map(|def| {
            Ok(ChaincodeDefinitionView {
                name: def.name,
                sequence: def.sequence,
                version: def.version,
                endorsement_plugin: def.endorsement_plugin,
                validation_plugin: def.validation_plugin,
                validation_parameter: ValidationParameterView::from_bytes(&def.validation_parameter)?,
                collections: collection_views(def.collections)?,
                init_required: def.init_required,
                approvals: BTreeMap::new(),
            })
        })
        .collect()
}

/// Org MSP id to whether it has approved the definition.
pub fn decode_commit_readiness(payload: &[u8]) -> Result<BTreeMap<String, bool>, ProtocolError> {
    let result: CheckCommitReadinessResult = stitch_protos::decode(payload)?;
    Ok(result.approvals)
}

fn printable_args<S: Serializer>(args: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(args.iter().map(|arg| match std::str::from_utf8(arg) {
        Ok(s) if !s.chars().any(char::is_control) => s.to_string(),
        _ => format!("0x{}", hex::encode(arg)),
    }))
}

fn header_type_name(code: i32) -> String {
    match HeaderType::try_from(code) {
        Ok(kind) => format!("{kind:?}"),
        Err(_) => code.to_string(),
    }
}

struct HeaderParts {
    channel: ChannelHeader,
    creator_msp_id: String,
}

fn header_parts(header: &Header) -> Result<HeaderParts, ProtocolError> {
    let channel: ChannelHeader = stitch_protos::decode(&header.channel_header)?;
    let signature: SignatureHeader = stitch_protos::decode(&header.signature_header)?;
    let creator: SerializedIdentity = stitch_protos::decode(&signature.creator)?;
    Ok(HeaderParts {
        channel,
        creator_msp_id: creator.mspid,
    })
}

fn invocation_args(input: &[u8]) -> Result<(String, Vec<Vec<u8>>, bool), ProtocolError> {
    let invocation: ChaincodeInvocationSpec = stitch_protos::decode(input)?;
    let spec = invocation.chaincode_spec.unwrap_or_default();
    let chaincode_id = spec.chaincode_id.map(|id| id.name).unwrap_or_default();
    let input = spec.input.unwrap_or_default();
    Ok((chaincode_id, input.args, input.is_init))
}

/// What a signed proposal says, without its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalView {
    pub tx_id: String,
    pub channel_id: String,
    pub header_type: String,
    pub creator_msp_id: String,
    pub chaincode_id: String,
    #[serde(serialize_with = "printable_args")]
    pub args: Vec<Vec<u8>>,
    pub is_init: bool,
    pub transient_keys: Vec<String>,
    pub has_tls_cert_hash: bool,
}

pub fn decode_signed_proposal(bytes: &[u8]) -> Result<ProposalView, ProtocolError> {
    let signed: SignedProposal = stitch_protos::decode(bytes)?;
    let proposal: Proposal = stitch_protos::decode(&signed.proposal_bytes)?;
    let header: Header = stitch_protos::decode(&proposal.header)?;
    let parts = header_parts(&header)?;
    let payload: ChaincodeProposalPayload = stitch_protos::decode(&proposal.payload)?;
    let (chaincode_id, args, is_init) = invocation_args(&payload.input)?;

    Ok(ProposalView {
        tx_id: parts.channel.tx_id,
        channel_id: parts.channel.channel_id,
        header_type: header_type_name(parts.channel.r#type),
        creator_msp_id: parts.creator_msp_id,
        chaincode_id,
        args,
        is_init,
        transient_keys: payload.transient_map.into_keys().collect(),
        has_tls_cert_hash: !parts.channel.tls_cert_hash.is_empty(),
    })
}

/// What a signed transaction envelope commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub tx_id: String,
    pub channel_id: String,
    pub header_type: String,
    pub creator_msp_id: String,
    pub chaincode_id: String,
    #[serde(serialize_with = "printable_args")]
    pub args: Vec<Vec<u8>>,
    pub endorsements: usize,
    pub transient_keys: Vec<String>,
    /// The committed proposal payload bytes.
    #[serde(skip)]
    pub chaincode_proposal_payload: Vec<u8>,
    #[serde(skip)]
    pub proposal_response_payload: Vec<u8>,
}

pub fn decode_commit_envelope(bytes: &[u8]) -> Result<TransactionView, ProtocolError> {
    let envelope: Envelope = stitch_protos::decode(bytes)?;
    let payload: Payload = stitch_protos::decode(&envelope.payload)?;
    let header = payload
        .header
        .ok_or_else(|| ProtocolError::Encoding("envelope payload has no header".into()))?;
    let parts = header_parts(&header)?;

    let transaction: Transaction = stitch_protos::decode(&payload.data)?;
    let action = transaction
        .actions
        .into_iter()
        .next()
        .ok_or_else(|| ProtocolError::Encoding("transaction has no actions".into()))?;
    let action_payload: ChaincodeActionPayload = stitch_protos::decode(&action.payload)?;
    let proposal_payload: ChaincodeProposalPayload =
        stitch_protos::decode(&action_payload.chaincode_proposal_payload)?;
    let (chaincode_id, args, _) = invocation_args(&proposal_payload.input)?;
    let endorsed = action_payload.action.unwrap_or_default();

    Ok(TransactionView {
        tx_id: parts.channel.tx_id,
        channel_id: parts.channel.channel_id,
        header_type: header_type_name(parts.channel.r#type),
        creator_msp_id: parts.creator_msp_id,
        chaincode_id,
        args,
        endorsements: endorsed.endorsements.len(),
        transient_keys: proposal_payload.transient_map.into_keys().collect(),
        chaincode_proposal_payload: action_payload.chaincode_proposal_payload,
        proposal_response_payload: endorsed.proposal_response_payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_policy::parse_compact;
    use stitch_protos::lifecycle::query_chaincode_definitions_result::ChaincodeDefinition;
    use stitch_protos::peer::Response;

    fn response(status: i32, message: &str, payload: &[u8]) -> ProposalResponse {
        ProposalResponse {
            response: Some(Response {
                status,
                message: message.into(),
                payload: payload.to_vec(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn non_success_status_is_rejected() {
        let err = decode_response_payload(&response(500, "chaincode not found", b"")).unwrap_err();
        match err {
            ProtocolError::Rejected { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "chaincode not found");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(decode_response_payload(&ProposalResponse::default()).is_err());
        assert_eq!(decode_response_payload(&response(200, "", b"ok")).unwrap(), b"ok");
    }

    #[test]
    fn install_result() {
        let bytes = stitch_protos::encode(&InstallChaincodeResult {
            package_id: "basic_1.0:abc".into(),
            label: "basic_1.0".into(),
        });
        let installed = decode_install_result(&bytes).unwrap();
        assert_eq!(installed.package_id, "basic_1.0:abc");
        assert_eq!(installed.label, "basic_1.0");
    }

    #[test]
    fn installed_chaincodes_with_references() {
        let mut references = BTreeMap::new();
        references.insert(
            "mychannel".to_string(),
            query_installed_chaincodes_result::References {
                chaincodes: vec![query_installed_chaincodes_result::Chaincode {
                    name: "basic".into(),
                    version: "1.0".into(),
                }],
            },
        );
        let bytes = stitch_protos::encode(&QueryInstalledChaincodesResult {
            installed_chaincodes: vec![query_installed_chaincodes_result::InstalledChaincode {
                package_id: "basic_1.0:abc".into(),
                label: "basic_1.0".into(),
                references,
            }],
        });
        let installed = decode_installed_chaincodes(&bytes).unwrap();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].references["mychannel"][0].name, "basic");
    }

    #[test]
    fn definition_renders_policies() {
        let policy = parse_compact("AND('Org1MSP.peer', 'Org2MSP.peer')").unwrap();
        let validation = ApplicationPolicy {
            r#type: Some(application_policy::Type::SignaturePolicy(policy.to_envelope())),
        };
        let mut approvals = BTreeMap::new();
        approvals.insert("Org1MSP".to_string(), true);
        approvals.insert("Org2MSP".to_string(), false);
        let bytes = stitch_protos::encode(&QueryChaincodeDefinitionResult {
            sequence: 2,
            version: "1.1".into(),
            endorsement_plugin: "escc".into(),
            validation_plugin: "vscc".into(),
            validation_parameter: stitch_protos::encode(&validation),
            collections: None,
            init_required: false,
            approvals,
        });

        let view = decode_chaincode_definition("basic", &bytes).unwrap();
        assert_eq!(view.name, "basic");
        assert_eq!(view.sequence, 2);
        assert_eq!(
            view.validation_parameter,
            ValidationParameterView::SignaturePolicy("AND('Org1MSP.PEER', 'Org2MSP.PEER')".into())
        );
        assert_eq!(view.approvals.get("Org2MSP"), Some(&false));
    }

    #[test]
    fn definitions_list() {
        let bytes = stitch_protos::encode(&QueryChaincodeDefinitionsResult {
            chaincode_definitions: vec![ChaincodeDefinition {
                name: "basic".into(),
                sequence: 1,
                version: "1.0".into(),
                ..Default::default()
            }],
        });
        let views = decode_chaincode_definitions(&bytes).unwrap();
        assert_eq!(views[0].name, "basic");
        assert_eq!(views[0].validation_parameter, ValidationParameterView::Unset);
    }

    #[test]
    fn readiness_map() {
        let mut approvals = BTreeMap::new();
        approvals.insert("Org1MSP".to_string(), true);
        let bytes = stitch_protos::encode(&CheckCommitReadinessResult { approvals });
        assert_eq!(decode_commit_readiness(&bytes).unwrap()["Org1MSP"], true);
    }

    #[test]
    fn garbage_is_an_encoding_error() {
        assert!(matches!(
            decode_signed_proposal(&[0xff, 0xff, 0xff]),
            Err(ProtocolError::Encoding(_))
        ));
    }

    #[test]
    fn args_serialize_printably() {
        let view = ProposalView {
            tx_id: "t".into(),
            channel_id: "c".into(),
            header_type: "EndorserTransaction".into(),
            creator_msp_id: "Org1MSP".into(),
            chaincode_id: "basic".into(),
            args: vec![b"Transfer".to_vec(), vec![0, 1]],
            is_init: false,
            transient_keys: Vec::new(),
            has_tls_cert_hash: false,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["args"], serde_json::json!(["Transfer", "0x0001"]));
        assert_eq!(json["creatorMspId"], "Org1MSP");
    }
}
