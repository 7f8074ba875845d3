//! Chaincode descriptor builders.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stitch_protos::peer::{chaincode_spec, ChaincodeId, ChaincodeInput, ChaincodeSpec};

use crate::error::{ProtocolError, ValidationErrors};

/// Chaincode runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChaincodeType {
    #[default]
    Golang,
    Node,
    Java,
    Car,
}

impl ChaincodeType {
    fn to_wire(self) -> chaincode_spec::Type {
        match self {
            ChaincodeType::Golang => chaincode_spec::Type::Golang,
            ChaincodeType::Node => chaincode_spec::Type::Node,
            ChaincodeType::Java => chaincode_spec::Type::Java,
            ChaincodeType::Car => chaincode_spec::Type::Car,
        }
    }
}

impl FromStr for ChaincodeType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "golang" | "go" => Ok(ChaincodeType::Golang),
            "node" => Ok(ChaincodeType::Node),
            "java" => Ok(ChaincodeType::Java),
            "car" => Ok(ChaincodeType::Car),
            other => {
                let mut errors = ValidationErrors::new();
                errors.push("chaincode_type", format!("unknown chaincode type '{other}'"));
                Err(ProtocolError::Validation(errors))
            }
        }
    }
}

impl fmt::Display for ChaincodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChaincodeType::Golang => "golang",
            ChaincodeType::Node => "node",
            ChaincodeType::Java => "java",
            ChaincodeType::Car => "car",
        };
        f.write_str(name)
    }
}

/// Positional arguments: the function name first (when given), then each
/// caller argument. Empty arguments stay in place as zero-length entries.
pub fn build_chaincode_input(function: Option<&str>, args: &[Vec<u8>], is_init: bool) -> ChaincodeInput {
    let mut all = Vec::with_capacity(args.len() + 1);
    if let Some(function) = function.filter(|f| !f.is_empty()) {
        all.push(function.as_bytes().to_vec());
    }
    all.extend(args.iter().cloned());
    ChaincodeInput {
        args: all,
        decorations: Default::default(),
        is_init,
    }
}

pub fn build_chaincode_spec(
    chaincode_id: &str,
    version: Option<&str>,
    chaincode_type: ChaincodeType,
    input: ChaincodeInput,
    timeout_ms: u32,
) -> ChaincodeSpec {
    ChaincodeSpec {
        r#type: chaincode_type.to_wire() as i32,
        chaincode_id: Some(ChaincodeId {
            path: String::new(),
            name: chaincode_id.to_string(),
            version: version.unwrap_or_default().to_string(),
        }),
        input: Some(input),
        timeout: i32::try_from(timeout_ms).unwrap_or(i32::MAX),
    }
}
