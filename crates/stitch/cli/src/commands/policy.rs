//! Policy commands

use anyhow::{Context, Result};
use clap::Subcommand;
use stitch_policy::{
    detect_kind, evaluate, normalize, to_compact_string, ApprovalSet, PolicyInput, PolicyKind, PolicySpec,
};

use crate::output::Output;

/// Policy subcommands
#[derive(Debug, Subcommand)]
pub enum PolicyCommands {
    /// Parse a policy in any notation and print its canonical JSON
    Parse {
        /// Compact string or JSON document
        policy: String,
    },

    /// Render canonical or legacy JSON as a compact string
    Render {
        /// JSON document
        json: String,
    },

    /// Check whether a set of approvals satisfies a policy
    Eval {
        /// Policy in any notation
        policy: String,

        /// Approving principal as `msp.role` (repeatable)
        #[arg(short, long = "approve")]
        approvals: Vec<String>,
    },

    /// Classify an input as signature, implicit-meta or unknown
    Kind {
        /// Policy text
        input: String,
    },

    /// Encode a policy as a channel-config `common.Policy`
    Encode {
        /// Signature or implicit-meta policy
        policy: String,
    },
}

/// Interpret command-line text: JSON documents start with `{`, anything
/// else is compact notation.
pub fn read_input(text: &str) -> Result<PolicyInput> {
    if text.trim_start().starts_with('{') {
        PolicyInput::from_json_str(text).context("parsing policy JSON")
    } else {
        Ok(PolicyInput::from(text))
    }
}

/// Execute a policy command
pub fn execute(command: PolicyCommands) -> Result<Output> {
    match command {
        PolicyCommands::Parse { policy } => {
            let canonical = normalize(&read_input(&policy)?)?;
            Output::json(&canonical)
        }

        PolicyCommands::Render { json } => {
            let canonical = normalize(&read_input(&json)?)?;
            Ok(Output::Text(to_compact_string(&canonical)?))
        }

        PolicyCommands::Eval { policy, approvals } => {
            let canonical = normalize(&read_input(&policy)?)?;
            let approvals: ApprovalSet = approvals.into_iter().map(|key| (key, true)).collect();
            let verdict = if evaluate(&canonical, &approvals)? {
                "satisfied"
            } else {
                "not satisfied"
            };
            Ok(Output::Text(verdict.to_string()))
        }

        PolicyCommands::Kind { input } => {
            let kind = match detect_kind(&read_input(&input)?) {
                PolicyKind::Signature => "signature",
                PolicyKind::ImplicitMeta => "implicit-meta",
                PolicyKind::Unknown => "unknown",
            };
            Ok(Output::Text(kind.to_string()))
        }

        PolicyCommands::Encode { policy } => {
            let spec = PolicySpec::from_input(&read_input(&policy)?)?;
            Ok(Output::Bytes(stitch_protos::encode(&spec.to_wire_policy())))
        }
    }
}
