//! Protocol tunables.

use serde::{Deserialize, Serialize};

/// Protocol constants used by the builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Nonce length in bytes
    #[serde(default = "default_nonce_len")]
    pub nonce_len: usize,

    /// Endorsement plugin named in lifecycle definitions
    #[serde(default = "default_endorsement_plugin")]
    pub endorsement_plugin: String,

    /// Validation plugin named in lifecycle definitions
    #[serde(default = "default_validation_plugin")]
    pub validation_plugin: String,

    /// Channel policy used when a definition names no validation parameter
    #[serde(default = "default_endorsement_policy_ref")]
    pub default_endorsement_policy_ref: String,

    /// Name of the lifecycle system chaincode
    #[serde(default = "default_lifecycle_chaincode")]
    pub lifecycle_chaincode: String,

    /// Copied into `ChaincodeSpec.timeout`; 0 leaves it unset
    #[serde(default)]
    pub proposal_timeout_ms: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            nonce_len: default_nonce_len(),
            endorsement_plugin: default_endorsement_plugin(),
            validation_plugin: default_validation_plugin(),
            default_endorsement_policy_ref: default_endorsement_policy_ref(),
            lifecycle_chaincode: default_lifecycle_chaincode(),
            proposal_timeout_ms: 0,
        }
    }
}

fn default_nonce_len() -> usize {
    24
}

fn default_endorsement_plugin() -> String {
    "escc".to_string()
}

fn default_validation_plugin() -> String {
    "vscc".to_string()
}

fn default_endorsement_policy_ref() -> String {
    "/Channel/Application/Endorsement".to_string()
}

fn default_lifecycle_chaincode() -> String {
    "_lifecycle".to_string()
}
