//! Proposal and transaction commands

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use stitch_crypto::{encode_b64_pem, CryptoProvider};
use stitch_proposal::{
    build_signed_endorsement_proposal, decode_commit_envelope, decode_signed_proposal, ChaincodeType,
    EndorsementRequest, ProtocolConfig, SigningIdentity,
};

use crate::config::CliConfig;
use crate::output::{decode_base64, Output};

/// Proposal subcommands
#[derive(Debug, Subcommand)]
pub enum ProposalCommands {
    /// Build and sign an endorsement proposal; prints it base64-encoded
    Build {
        /// Channel name
        #[arg(long)]
        channel: String,

        /// Chaincode name
        #[arg(long)]
        chaincode: String,

        /// Chaincode function
        #[arg(short, long)]
        function: Option<String>,

        /// Positional argument (repeatable)
        #[arg(short, long = "arg")]
        args: Vec<String>,

        /// Transient entry as `key=value` (repeatable)
        #[arg(short, long = "transient")]
        transient: Vec<String>,

        /// Chaincode runtime
        #[arg(long, default_value = "golang")]
        chaincode_type: String,

        /// Mark the invocation as the chaincode's init call
        #[arg(long)]
        init: bool,
    },

    /// Decode a base64 signed proposal
    Inspect {
        /// Base64 `SignedProposal` bytes
        proposal: String,
    },

    /// Decode a base64 transaction envelope
    InspectTransaction {
        /// Base64 `Envelope` bytes
        envelope: String,
    },
}

/// Split `key=value`. The value may itself contain `=`.
pub fn parse_transient(entry: &str) -> Result<(String, Vec<u8>)> {
    match entry.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.as_bytes().to_vec())),
        _ => bail!("transient entry '{entry}' is not key=value"),
    }
}

/// Execute a proposal command
pub async fn execute(command: ProposalCommands, config: &CliConfig, crypto: &dyn CryptoProvider) -> Result<Output> {
    match command {
        ProposalCommands::Inspect { proposal } => Output::json(&decode_signed_proposal(&decode_base64(&proposal)?)?),
        ProposalCommands::InspectTransaction { envelope } => {
            Output::json(&decode_commit_envelope(&decode_base64(&envelope)?)?)
        }
        build => {
            let identity = config.identity.load().context("loading signing identity")?;
            let tls_cert = config.identity.tls_cert()?;
            build_proposal(build, &identity, tls_cert.as_deref(), &config.protocol, crypto).await
        }
    }
}

/// Build the proposal for a `build` command with an already loaded identity.
pub async fn build_proposal(
    command: ProposalCommands,
    identity: &SigningIdentity,
    tls_cert_pem: Option<&str>,
    protocol: &ProtocolConfig,
    crypto: &dyn CryptoProvider,
) -> Result<Output> {
    let ProposalCommands::Build {
        channel,
        chaincode,
        function,
        args,
        transient,
        chaincode_type,
        init,
    } = command
    else {
        bail!("not a build command");
    };

    let mut request = EndorsementRequest::for_identity(identity, channel, chaincode)
        .chaincode_type(chaincode_type.parse::<ChaincodeType>()?);
    if let Some(function) = function {
        request = request.function(function);
    }
    for arg in args {
        request = request.arg(arg);
    }
    for entry in &transient {
        let (key, value) = parse_transient(entry)?;
        request = request.transient(key, value);
    }
    if let Some(pem) = tls_cert_pem {
        request = request.tls_cert(encode_b64_pem(pem));
    }
    if init {
        request = request.init();
    }

    let signed = build_signed_endorsement_proposal(crypto, protocol, &request).await?;
    tracing::info!(tx_id = %signed.tx_id, "Built endorsement proposal");
    Ok(Output::Bytes(signed.to_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_crypto::mocks::{ORG1_USER_CERT, ORG1_USER_KEY};
    use stitch_crypto::MockCryptoProvider;

    fn identity() -> SigningIdentity {
        SigningIdentity::from_pem("Org1MSP", ORG1_USER_CERT, ORG1_USER_KEY).unwrap()
    }

    fn build(transient: Vec<String>) -> ProposalCommands {
        ProposalCommands::Build {
            channel: "mychannel".into(),
            chaincode: "basic".into(),
            function: Some("ReadAsset".into()),
            args: vec!["asset1".into()],
            transient,
            chaincode_type: "go".into(),
            init: false,
        }
    }

    #[test]
    fn transient_entries_split_on_first_equals() {
        assert_eq!(
            parse_transient("price=a=b").unwrap(),
            ("price".to_string(), b"a=b".to_vec())
        );
        assert!(parse_transient("novalue").is_err());
        assert!(parse_transient("=x").is_err());
    }

    #[tokio::test]
    async fn build_then_inspect() {
        let crypto = MockCryptoProvider::new();
        let output = build_proposal(
            build(vec!["secret=shh".into()]),
            &identity(),
            None,
            &ProtocolConfig::default(),
            &crypto,
        )
        .await
        .unwrap();
        let encoded = output.render().unwrap();

        let inspected = execute(
            ProposalCommands::Inspect { proposal: encoded },
            &CliConfig::default(),
            &crypto,
        )
        .await
        .unwrap();
        let Output::Json(view) = inspected else {
            panic!("expected JSON");
        };
        assert_eq!(view["channelId"], "mychannel");
        assert_eq!(view["chaincodeId"], "basic");
        assert_eq!(view["args"], serde_json::json!(["ReadAsset", "asset1"]));
        assert_eq!(view["transientKeys"], serde_json::json!(["secret"]));
    }

    #[tokio::test]
    async fn build_without_identity_fails() {
        let crypto = MockCryptoProvider::new();
        let err = execute(build(Vec::new()), &CliConfig::default(), &crypto)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("loading signing identity"));
        assert_eq!(crypto.sign_calls(), 0);
    }
}
