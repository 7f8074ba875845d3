//! Chaincode lifecycle calls against the `_lifecycle` system chaincode.
//!
//! Each builder produces a [`LifecycleInvocation`]: the function name and the
//! encoded argument message. [`build_lifecycle_proposal`] wraps one in a
//! signed endorsement proposal.

use serde::{Deserialize, Serialize};
use stitch_crypto::CryptoProvider;
use stitch_policy::{normalize, PolicyInput};
use stitch_protos::lifecycle::{
    chaincode_source, ApproveChaincodeDefinitionForMyOrgArgs, ChaincodeSource, CheckCommitReadinessArgs,
    CommitChaincodeDefinitionArgs, InstallChaincodeArgs, QueryChaincodeDefinitionArgs,
    QueryChaincodeDefinitionsArgs, QueryInstalledChaincodesArgs,
};
use stitch_protos::peer::{application_policy, ApplicationPolicy, CollectionConfigPackage};
use tracing::debug;

use crate::chaincode::{build_chaincode_input, build_chaincode_spec, ChaincodeType};
use crate::collection::{collect_collection_package, CollectionConfig};
use crate::config::ProtocolConfig;
use crate::endorsement::{sign_proposal, ProposalTarget, SignedEndorsementProposal};
use crate::error::{ProtocolError, ValidationErrors};
use crate::identity::SigningIdentity;

pub const INSTALL_CHAINCODE: &str = "InstallChaincode";
pub const QUERY_INSTALLED_CHAINCODES: &str = "QueryInstalledChaincodes";
pub const APPROVE_CHAINCODE_DEFINITION: &str = "ApproveChaincodeDefinitionForMyOrg";
pub const CHECK_COMMIT_READINESS: &str = "CheckCommitReadiness";
pub const COMMIT_CHAINCODE_DEFINITION: &str = "CommitChaincodeDefinition";
pub const QUERY_CHAINCODE_DEFINITION: &str = "QueryChaincodeDefinition";
pub const QUERY_CHAINCODE_DEFINITIONS: &str = "QueryChaincodeDefinitions";

/// How a chaincode definition is validated at commit time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationParameter {
    /// The channel's configured endorsement policy.
    #[default]
    ChannelDefault,
    /// A named channel-config policy such as `/Channel/Application/Writers`.
    PolicyReference(String),
    /// An explicit signature policy in any accepted notation.
    SignaturePolicy(PolicyInput),
}

impl ValidationParameter {
    fn to_wire(&self, config: &ProtocolConfig) -> Result<ApplicationPolicy, ProtocolError> {
        let kind = match self {
            ValidationParameter::ChannelDefault => application_policy::Type::ChannelConfigPolicyReference(
                config.default_endorsement_policy_ref.clone(),
            ),
            ValidationParameter::PolicyReference(reference) => {
                application_policy::Type::ChannelConfigPolicyReference(reference.clone())
            }
            ValidationParameter::SignaturePolicy(input) => {
                application_policy::Type::SignaturePolicy(normalize(input)?.to_envelope())
            }
        };
        Ok(ApplicationPolicy { r#type: Some(kind) })
    }
}

/// Where an approving org gets the chaincode package from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// A package installed on this org's peers.
    Local(String),
    /// Approve without a local package.
    Unavailable,
}

impl PackageSource {
    fn to_wire(&self) -> ChaincodeSource {
        let kind = match self {
            PackageSource::Local(package_id) => chaincode_source::Type::LocalPackage(chaincode_source::Local {
                package_id: package_id.clone(),
            }),
            PackageSource::Unavailable => chaincode_source::Type::Unavailable(chaincode_source::Unavailable {}),
        };
        ChaincodeSource { r#type: Some(kind) }
    }
}

/// A chaincode definition as approved and committed by channel members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleDefinition {
    pub name: String,
    pub version: String,
    pub sequence: i64,
    #[serde(default)]
    pub init_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endorsement_plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_plugin: Option<String>,
    #[serde(default)]
    pub validation: ValidationParameter,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<CollectionConfig>,
}

impl LifecycleDefinition {
    pub fn new(name: impl Into<String>, version: impl Into<String>, sequence: i64) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            sequence,
            init_required: false,
            endorsement_plugin: None,
            validation_plugin: None,
            validation: ValidationParameter::ChannelDefault,
            collections: Vec::new(),
        }
    }
}

/// Fields shared by approve, readiness and commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonArgs {
    pub sequence: i64,
    pub name: String,
    pub version: String,
    pub endorsement_plugin: String,
    pub validation_plugin: String,
    pub validation_parameter: Vec<u8>,
    pub collections: Option<CollectionConfigPackage>,
    pub init_required: bool,
}

/// Validate a definition and resolve its defaults.
pub fn common_args(config: &ProtocolConfig, definition: &LifecycleDefinition) -> Result<CommonArgs, ProtocolError> {
    let mut errors = ValidationErrors::new();
    let common = collect_common_args(config, definition, &mut errors);
    errors.into_result()?;
    Ok(common)
}

/// Resolve a definition, recording every violation in `errors`. The result
/// is only meaningful when nothing was recorded.
fn collect_common_args(
    config: &ProtocolConfig,
    definition: &LifecycleDefinition,
    errors: &mut ValidationErrors,
) -> CommonArgs {
    errors.require("name", &definition.name);
    errors.require("version", &definition.version);
    if definition.sequence < 1 {
        errors.push("sequence", "must be at least 1");
    }
    let validation = match definition.validation.to_wire(config) {
        Ok(policy) => Some(policy),
        Err(e) => {
            errors.push("validation", e.to_string());
            None
        }
    };
    let collections = collect_collection_package(&definition.collections, errors);

    let plugin = |value: &Option<String>, default: &str| {
        value
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(default)
            .to_string()
    };
    CommonArgs {
        sequence: definition.sequence,
        name: definition.name.clone(),
        version: definition.version.clone(),
        endorsement_plugin: plugin(&definition.endorsement_plugin, &config.endorsement_plugin),
        validation_plugin: plugin(&definition.validation_plugin, &config.validation_plugin),
        validation_parameter: validation.map(|p| stitch_protos::encode(&p)).unwrap_or_default(),
        collections,
        init_required: definition.init_required,
    }
}

/// Whether a lifecycle call targets a channel or only the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationScope {
    Peer,
    Channel,
}

/// A `_lifecycle` function call ready to wrap in a proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleInvocation {
    pub function: &'static str,
    pub args: Vec<u8>,
    pub scope: InvocationScope,
}

impl LifecycleInvocation {
    fn peer(function: &'static str, args: Vec<u8>) -> Self {
        Self {
            function,
            args,
            scope: InvocationScope::Peer,
        }
    }

    fn channel(function: &'static str, args: Vec<u8>) -> Self {
        Self {
            function,
            args,
            scope: InvocationScope::Channel,
        }
    }
}

pub fn install_args(package: &[u8]) -> Result<LifecycleInvocation, ProtocolError> {
    if package.is_empty() {
        let mut errors = ValidationErrors::new();
        errors.push("chaincode_install_package", "is required");
        return Err(errors.into());
    }
    let args = InstallChaincodeArgs {
        chaincode_install_package: package.to_vec(),
    };
    Ok(LifecycleInvocation::peer(INSTALL_CHAINCODE, stitch_protos::encode(&args)))
}

pub fn approve_args(
    config: &ProtocolConfig,
    definition: &LifecycleDefinition,
    source: &PackageSource,
) -> Result<LifecycleInvocation, ProtocolError> {
    let mut errors = ValidationErrors::new();
    let common = collect_common_args(config, definition, &mut errors);
    if let PackageSource::Local(package_id) = source {
        errors.require("package_id", package_id);
    }
    errors.into_result()?;
    let args = ApproveChaincodeDefinitionForMyOrgArgs {
        sequence: common.sequence,
        name: common.name,
        version: common.version,
        endorsement_plugin: common.endorsement_plugin,
        validation_plugin: common.validation_plugin,
        validation_parameter: common.validation_parameter,
        collections: common.collections,
        init_required: common.init_required,
        source: Some(source.to_wire()),
    };
    Ok(LifecycleInvocation::channel(
        APPROVE_CHAINCODE_DEFINITION,
        stitch_protos::encode(&args),
    ))
}

pub fn check_readiness_args(
    config: &ProtocolConfig,
    definition: &LifecycleDefinition,
) -> Result<LifecycleInvocation, ProtocolError> {
    let common = common_args(config, definition)?;
    let args = CheckCommitReadinessArgs {
        sequence: common.sequence,
        name: common.name,
        version: common.version,
        endorsement_plugin: common.endorsement_plugin,
        validation_plugin: common.validation_plugin,
        validation_parameter: common.validation_parameter,
        collections: common.collections,
        init_required: common.init_required,
    };
    Ok(LifecycleInvocation::channel(CHECK_COMMIT_READINESS, stitch_protos::encode(&args)))
}

pub fn commit_args(
    config: &ProtocolConfig,
    definition: &LifecycleDefinition,
) -> Result<LifecycleInvocation, ProtocolError> {
    let common = common_args(config, definition)?;
    let args = CommitChaincodeDefinitionArgs {
        sequence: common.sequence,
        name: common.name,
        version: common.version,
        endorsement_plugin: common.endorsement_plugin,
        validation_plugin: common.validation_plugin,
        validation_parameter: common.validation_parameter,
        collections: common.collections,
        init_required: common.init_required,
    };
    Ok(LifecycleInvocation::channel(
        COMMIT_CHAINCODE_DEFINITION,
        stitch_protos::encode(&args),
    ))
}

pub fn query_installed_args() -> LifecycleInvocation {
    LifecycleInvocation::peer(
        QUERY_INSTALLED_CHAINCODES,
        stitch_protos::encode(&QueryInstalledChaincodesArgs {}),
    )
}

pub fn query_definition_args(name: &str) -> Result<LifecycleInvocation, ProtocolError> {
    let mut errors = ValidationErrors::new();
    errors.require("name", name);
    errors.into_result()?;
    let args = QueryChaincodeDefinitionArgs { name: name.to_string() };
    Ok(LifecycleInvocation::channel(
        QUERY_CHAINCODE_DEFINITION,
        stitch_protos::encode(&args),
    ))
}

pub fn query_definitions_args() -> LifecycleInvocation {
    LifecycleInvocation::channel(
        QUERY_CHAINCODE_DEFINITIONS,
        stitch_protos::encode(&QueryChaincodeDefinitionsArgs {}),
    )
}

/// Sign a proposal invoking `_lifecycle`. Peer-scoped calls ignore
/// `channel_id` and go out with an empty channel.
pub async fn build_lifecycle_proposal(
    crypto: &dyn CryptoProvider,
    config: &ProtocolConfig,
    identity: &SigningIdentity,
    channel_id: &str,
    invocation: &LifecycleInvocation,
) -> Result<SignedEndorsementProposal, ProtocolError> {
    let channel_id = match invocation.scope {
        InvocationScope::Peer => "",
        InvocationScope::Channel => {
            let mut errors = ValidationErrors::new();
            errors.require("channel_id", channel_id);
            errors.into_result()?;
            channel_id
        }
    };

    let input = build_chaincode_input(Some(invocation.function), &[invocation.args.clone()], false);
    let spec = build_chaincode_spec(
        &config.lifecycle_chaincode,
        None,
        ChaincodeType::Golang,
        input,
        config.proposal_timeout_ms,
    );
    debug!(function = invocation.function, channel_id, "Building lifecycle proposal");

    sign_proposal(
        crypto,
        config,
        identity,
        ProposalTarget {
            channel_id,
            spec,
            transient_map: Default::default(),
            tls_cert_pem: None,
        },
        None,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_crypto::mocks::{ORG1_USER_CERT, ORG1_USER_KEY};
    use stitch_crypto::MockCryptoProvider;
    use stitch_protos::common::{ChannelHeader, Header};
    use stitch_protos::peer::{ChaincodeInvocationSpec, ChaincodeProposalPayload};

    fn definition() -> LifecycleDefinition {
        LifecycleDefinition::new("basic", "1.0", 1)
    }

    fn decode_approve(invocation: &LifecycleInvocation) -> ApproveChaincodeDefinitionForMyOrgArgs {
        stitch_protos::decode(&invocation.args).unwrap()
    }

    #[test]
    fn common_args_fill_plugin_defaults() {
        let common = common_args(&ProtocolConfig::default(), &definition()).unwrap();
        assert_eq!(common.endorsement_plugin, "escc");
        assert_eq!(common.validation_plugin, "vscc");
        assert!(common.collections.is_none());

        let policy: ApplicationPolicy = stitch_protos::decode(&common.validation_parameter).unwrap();
        assert_eq!(
            policy.r#type,
            Some(application_policy::Type::ChannelConfigPolicyReference(
                "/Channel/Application/Endorsement".into()
            ))
        );
    }

    #[test]
    fn explicit_plugins_win() {
        let mut def = definition();
        def.endorsement_plugin = Some("custom-escc".into());
        def.validation_plugin = Some(" ".into());
        let common = common_args(&ProtocolConfig::default(), &def).unwrap();
        assert_eq!(common.endorsement_plugin, "custom-escc");
        assert_eq!(common.validation_plugin, "vscc");
    }

    #[test]
    fn invalid_definition_lists_fields() {
        let mut def = LifecycleDefinition::new("", "", 0);
        def.validation = ValidationParameter::SignaturePolicy("AND(".into());
        match common_args(&ProtocolConfig::default(), &def).unwrap_err() {
            ProtocolError::Validation(errors) => {
                assert_eq!(errors.fields(), vec!["name", "version", "sequence", "validation"])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn approve_carries_source() {
        let invocation = approve_args(
            &ProtocolConfig::default(),
            &definition(),
            &PackageSource::Local("basic_1.0:abc".into()),
        )
        .unwrap();
        assert_eq!(invocation.function, APPROVE_CHAINCODE_DEFINITION);
        assert_eq!(invocation.scope, InvocationScope::Channel);
        let args = decode_approve(&invocation);
        assert_eq!(args.sequence, 1);
        assert_eq!(
            args.source.unwrap().r#type,
            Some(chaincode_source::Type::LocalPackage(chaincode_source::Local {
                package_id: "basic_1.0:abc".into()
            }))
        );

        let unavailable =
            approve_args(&ProtocolConfig::default(), &definition(), &PackageSource::Unavailable).unwrap();
        assert!(matches!(
            decode_approve(&unavailable).source.unwrap().r#type,
            Some(chaincode_source::Type::Unavailable(_))
        ));
    }

    #[test]
    fn approve_rejects_blank_package_id() {
        let err = approve_args(
            &ProtocolConfig::default(),
            &definition(),
            &PackageSource::Local(String::new()),
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::Validation(_)));
    }

    #[test]
    fn approve_lists_definition_and_package_violations_together() {
        let mut def = definition();
        def.name = " ".into();
        match approve_args(
            &ProtocolConfig::default(),
            &def,
            &PackageSource::Local(" ".into()),
        )
        .unwrap_err()
        {
            ProtocolError::Validation(errors) => {
                assert_eq!(errors.fields(), vec!["name", "package_id"])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn readiness_and_commit_share_fields() {
        let mut def = definition();
        def.init_required = true;
        let readiness: CheckCommitReadinessArgs =
            stitch_protos::decode(&check_readiness_args(&ProtocolConfig::default(), &def).unwrap().args)
                .unwrap();
        let commit: CommitChaincodeDefinitionArgs =
            stitch_protos::decode(&commit_args(&ProtocolConfig::default(), &def).unwrap().args).unwrap();
        assert_eq!(readiness.name, commit.name);
        assert_eq!(readiness.validation_parameter, commit.validation_parameter);
        assert!(readiness.init_required && commit.init_required);
    }

    #[test]
    fn install_requires_package() {
        assert!(install_args(&[]).is_err());
        let invocation = install_args(b"tar.gz").unwrap();
        assert_eq!(invocation.scope, InvocationScope::Peer);
        let args: InstallChaincodeArgs = stitch_protos::decode(&invocation.args).unwrap();
        assert_eq!(args.chaincode_install_package, b"tar.gz");
    }

    #[tokio::test]
    async fn peer_scoped_calls_use_empty_channel() {
        let crypto = MockCryptoProvider::new();
        let identity = SigningIdentity::from_pem("Org1MSP", ORG1_USER_CERT, ORG1_USER_KEY).unwrap();
        let signed = build_lifecycle_proposal(
            &crypto,
            &ProtocolConfig::default(),
            &identity,
            "mychannel",
            &query_installed_args(),
        )
        .await
        .unwrap();

        let header: Header = stitch_protos::decode(&signed.proposal.header).unwrap();
        let channel_header: ChannelHeader = stitch_protos::decode(&header.channel_header).unwrap();
        assert_eq!(channel_header.channel_id, "");

        let payload: ChaincodeProposalPayload = stitch_protos::decode(&signed.proposal.payload).unwrap();
        let invocation: ChaincodeInvocationSpec = stitch_protos::decode(&payload.input).unwrap();
        let spec = invocation.chaincode_spec.unwrap();
        assert_eq!(spec.chaincode_id.unwrap().name, "_lifecycle");
        let args = spec.input.unwrap().args;
        assert_eq!(args[0], QUERY_INSTALLED_CHAINCODES.as_bytes());
        assert_eq!(args.len(), 2);
    }

    #[tokio::test]
    async fn channel_scoped_calls_need_channel() {
        let crypto = MockCryptoProvider::new();
        let identity = SigningIdentity::from_pem("Org1MSP", ORG1_USER_CERT, ORG1_USER_KEY).unwrap();
        let err = build_lifecycle_proposal(
            &crypto,
            &ProtocolConfig::default(),
            &identity,
            "",
            &query_definitions_args(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProtocolError::Validation(_)));
        assert_eq!(crypto.sign_calls(), 0);
    }
}
