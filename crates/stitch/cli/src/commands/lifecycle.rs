//! Chaincode lifecycle commands

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use stitch_crypto::CryptoProvider;
use stitch_proposal::{
    approve_args, build_lifecycle_proposal, check_readiness_args, commit_args, install_args,
    query_definition_args, query_definitions_args, query_installed_args, CollectionConfig, LifecycleDefinition,
    LifecycleInvocation, PackageSource, ProtocolConfig, SigningIdentity, ValidationParameter,
};

use crate::commands::policy::read_input;
use crate::config::CliConfig;
use crate::output::Output;

/// Definition fields shared by approve, readiness and commit
#[derive(Debug, Clone, Args)]
pub struct DefinitionArgs {
    /// Channel name
    #[arg(long)]
    pub channel: String,

    /// Chaincode name
    #[arg(long)]
    pub name: String,

    /// Chaincode version
    #[arg(long)]
    pub version: String,

    /// Definition sequence number
    #[arg(long)]
    pub sequence: i64,

    /// Signature policy for validation, in any notation
    #[arg(long, conflicts_with = "policy_reference")]
    pub signature_policy: Option<String>,

    /// Channel-config policy used for validation
    #[arg(long)]
    pub policy_reference: Option<String>,

    /// Endorsement plugin (defaults to the configured one)
    #[arg(long)]
    pub endorsement_plugin: Option<String>,

    /// Validation plugin (defaults to the configured one)
    #[arg(long)]
    pub validation_plugin: Option<String>,

    /// Require an init call before first use
    #[arg(long)]
    pub init_required: bool,

    /// JSON file with a list of private data collections
    #[arg(long)]
    pub collections_config: Option<String>,
}

impl DefinitionArgs {
    pub fn to_definition(&self) -> Result<LifecycleDefinition> {
        let validation = match (&self.signature_policy, &self.policy_reference) {
            (Some(policy), _) => ValidationParameter::SignaturePolicy(read_input(policy)?),
            (None, Some(reference)) => ValidationParameter::PolicyReference(reference.clone()),
            (None, None) => ValidationParameter::ChannelDefault,
        };
        let collections = match &self.collections_config {
            Some(path) => read_collections(path)?,
            None => Vec::new(),
        };
        Ok(LifecycleDefinition {
            name: self.name.clone(),
            version: self.version.clone(),
            sequence: self.sequence,
            init_required: self.init_required,
            endorsement_plugin: self.endorsement_plugin.clone(),
            validation_plugin: self.validation_plugin.clone(),
            validation,
            collections,
        })
    }
}

fn read_collections(path: &str) -> Result<Vec<CollectionConfig>> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("reading collections config {path}"))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing collections config {path}"))
}

/// Lifecycle subcommands
#[derive(Debug, Subcommand)]
pub enum LifecycleCommands {
    /// Install a chaincode package on the peer
    Install {
        /// Package file (.tar.gz)
        #[arg(long)]
        package: String,
    },

    /// List packages installed on the peer
    QueryInstalled,

    /// Approve a chaincode definition for this org
    Approve {
        #[command(flatten)]
        definition: DefinitionArgs,

        /// Installed package id; omit to approve without a local package
        #[arg(long)]
        package_id: Option<String>,
    },

    /// Check which orgs have approved a definition
    Readiness {
        #[command(flatten)]
        definition: DefinitionArgs,
    },

    /// Commit a chaincode definition to the channel
    Commit {
        #[command(flatten)]
        definition: DefinitionArgs,
    },

    /// Query one committed definition
    QueryCommitted {
        /// Channel name
        #[arg(long)]
        channel: String,

        /// Chaincode name; omit to list all definitions
        #[arg(long)]
        name: Option<String>,
    },
}

/// Resolve a command to its `_lifecycle` invocation and target channel.
pub fn resolve(command: &LifecycleCommands, protocol: &ProtocolConfig) -> Result<(LifecycleInvocation, String)> {
    Ok(match command {
        LifecycleCommands::Install { package } => {
            let bytes = std::fs::read(package).with_context(|| format!("reading package {package}"))?;
            (install_args(&bytes)?, String::new())
        }
        LifecycleCommands::QueryInstalled => (query_installed_args(), String::new()),
        LifecycleCommands::Approve { definition, package_id } => {
            let source = match package_id {
                Some(id) => PackageSource::Local(id.clone()),
                None => PackageSource::Unavailable,
            };
            let invocation = approve_args(protocol, &definition.to_definition()?, &source)?;
            (invocation, definition.channel.clone())
        }
        LifecycleCommands::Readiness { definition } => (
            check_readiness_args(protocol, &definition.to_definition()?)?,
            definition.channel.clone(),
        ),
        LifecycleCommands::Commit { definition } => (
            commit_args(protocol, &definition.to_definition()?)?,
            definition.channel.clone(),
        ),
        LifecycleCommands::QueryCommitted { channel, name } => {
            let invocation = match name {
                Some(name) => query_definition_args(name)?,
                None => query_definitions_args(),
            };
            (invocation, channel.clone())
        }
    })
}

/// Execute a lifecycle command
pub async fn execute(command: LifecycleCommands, config: &CliConfig, crypto: &dyn CryptoProvider) -> Result<Output> {
    let (invocation, channel) = resolve(&command, &config.protocol)?;
    let identity = config.identity.load().context("loading signing identity")?;
    sign(&invocation, &channel, &identity, &config.protocol, crypto).await
}

async fn sign(
    invocation: &LifecycleInvocation,
    channel: &str,
    identity: &SigningIdentity,
    protocol: &ProtocolConfig,
    crypto: &dyn CryptoProvider,
) -> Result<Output> {
    let signed = build_lifecycle_proposal(crypto, protocol, identity, channel, invocation).await?;
    tracing::info!(tx_id = %signed.tx_id, function = invocation.function, "Built lifecycle proposal");
    Ok(Output::Bytes(signed.to_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_crypto::mocks::{ORG1_USER_CERT, ORG1_USER_KEY};
    use stitch_crypto::MockCryptoProvider;
    use stitch_proposal::lifecycle::APPROVE_CHAINCODE_DEFINITION;
    use stitch_proposal::{decode_signed_proposal, InvocationScope};

    fn definition() -> DefinitionArgs {
        DefinitionArgs {
            channel: "mychannel".into(),
            name: "basic".into(),
            version: "1.0".into(),
            sequence: 1,
            signature_policy: Some("AND('Org1MSP.peer', 'Org2MSP.peer')".into()),
            policy_reference: None,
            endorsement_plugin: None,
            validation_plugin: None,
            init_required: false,
            collections_config: None,
        }
    }

    #[test]
    fn definition_args_pick_validation() {
        let def = definition().to_definition().unwrap();
        assert!(matches!(def.validation, ValidationParameter::SignaturePolicy(_)));

        let mut args = definition();
        args.signature_policy = None;
        args.policy_reference = Some("/Channel/Application/Writers".into());
        assert_eq!(
            args.to_definition().unwrap().validation,
            ValidationParameter::PolicyReference("/Channel/Application/Writers".into())
        );

        args.policy_reference = None;
        assert_eq!(args.to_definition().unwrap().validation, ValidationParameter::ChannelDefault);
    }

    #[test]
    fn approve_resolves_to_channel_invocation() {
        let (invocation, channel) = resolve(
            &LifecycleCommands::Approve {
                definition: definition(),
                package_id: Some("basic_1.0:abc".into()),
            },
            &ProtocolConfig::default(),
        )
        .unwrap();
        assert_eq!(invocation.function, APPROVE_CHAINCODE_DEFINITION);
        assert_eq!(invocation.scope, InvocationScope::Channel);
        assert_eq!(channel, "mychannel");
    }

    #[test]
    fn bad_policy_fails_before_signing() {
        let mut args = definition();
        args.signature_policy = Some("AND(".into());
        let err = resolve(&LifecycleCommands::Commit { definition: args }, &ProtocolConfig::default());
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn readiness_proposal_targets_lifecycle() {
        let crypto = MockCryptoProvider::new();
        let identity = SigningIdentity::from_pem("Org1MSP", ORG1_USER_CERT, ORG1_USER_KEY).unwrap();
        let protocol = ProtocolConfig::default();
        let (invocation, channel) =
            resolve(&LifecycleCommands::Readiness { definition: definition() }, &protocol).unwrap();

        let Output::Bytes(bytes) = sign(&invocation, &channel, &identity, &protocol, &crypto)
            .await
            .unwrap()
        else {
            panic!("expected bytes");
        };
        let view = decode_signed_proposal(&bytes).unwrap();
        assert_eq!(view.chaincode_id, "_lifecycle");
        assert_eq!(view.args[0], b"CheckCommitReadiness");
    }
}
