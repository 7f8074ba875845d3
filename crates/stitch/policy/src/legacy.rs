//! Legacy nested-object notation.
//!
//! ```json
//! {
//!   "identities": [{ "role": { "name": "member", "mspId": "Org1MSP" } }],
//!   "policy": { "1-of": [{ "signed-by": 0 }] }
//! }
//! ```
//!
//! Deprecated as an input format but still accepted everywhere a policy is.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PolicyError;
use crate::json::json_rule_depth;
use crate::types::{CanonicalPolicy, Identity, MspRole, Rule};

const SIGNED_BY_KEY: &str = "signed-by";
const OF_SUFFIX: &str = "-of";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyRole {
    pub name: String,
    #[serde(rename = "mspId", alias = "msp_id")]
    pub msp_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyIdentity {
    pub role: LegacyRole,
}

/// Legacy policy. The rule tree stays as JSON because its group keys carry
/// the count (`"2-of"`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyPolicy {
    pub identities: Vec<LegacyIdentity>,
    pub policy: Value,
}

/// Does this JSON object look like a legacy policy?
pub fn is_legacy_shape(value: &Value) -> bool {
    value
        .as_object()
        .map(|o| o.contains_key("identities") && o.contains_key("policy"))
        .unwrap_or(false)
}

fn legacy_children(value: &Value) -> Option<&Vec<Value>> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    let (key, rules) = object.iter().next()?;
    if key.ends_with(OF_SUFFIX) {
        rules.as_array()
    } else {
        None
    }
}

impl LegacyPolicy {
    /// Read a legacy policy from JSON, bounding rule depth first.
    pub fn from_value(value: &Value) -> Result<Self, PolicyError> {
        let object = value
            .as_object()
            .ok_or_else(|| PolicyError::UnknownSyntax("expected a JSON object".into()))?;
        let policy = object
            .get("policy")
            .ok_or_else(|| PolicyError::Json("missing 'policy'".into()))?;
        json_rule_depth(policy, legacy_children)?;

        let identities = object
            .get("identities")
            .cloned()
            .ok_or_else(|| PolicyError::Json("missing 'identities'".into()))?;
        Ok(Self {
            identities: serde_json::from_value(identities)?,
            policy: policy.clone(),
        })
    }

    /// Convert to the canonical notation. Identity order and argument order
    /// are preserved.
    pub fn to_canonical(&self) -> Result<CanonicalPolicy, PolicyError> {
        json_rule_depth(&self.policy, legacy_children)?;

        let identities = self
            .identities
            .iter()
            .map(|identity| {
                let role: MspRole = identity.role.name.parse()?;
                Ok(Identity::role(identity.role.msp_id.clone(), role))
            })
            .collect::<Result<Vec<_>, PolicyError>>()?;

        let policy = CanonicalPolicy::new(identities, legacy_rule(&self.policy)?);
        policy.validate()?;
        Ok(policy)
    }
}

fn legacy_rule(value: &Value) -> Result<Rule, PolicyError> {
    let object = value
        .as_object()
        .ok_or_else(|| PolicyError::Json(format!("legacy rule must be an object: {value}")))?;
    let mut entries = object.iter();
    let (key, body) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(PolicyError::InvalidLegacyKey(
                object.keys().cloned().collect::<Vec<_>>().join(","),
            ))
        }
    };

    if key == SIGNED_BY_KEY {
        let index = body
            .as_u64()
            .and_then(|i| u32::try_from(i).ok())
            .ok_or_else(|| PolicyError::Json(format!("invalid signed-by index: {body}")))?;
        return Ok(Rule::SignedBy(index));
    }

    let count = key
        .strip_suffix(OF_SUFFIX)
        .ok_or_else(|| PolicyError::InvalidLegacyKey(key.clone()))?;
    let n: u32 = count
        .parse()
        .map_err(|_| PolicyError::InvalidLegacyKey(key.clone()))?;
    let rules = body
        .as_array()
        .ok_or_else(|| PolicyError::Json(format!("'{key}' must be an array")))?
        .iter()
        .map(legacy_rule)
        .collect::<Result<Vec<_>, _>>()?;
    if rules.is_empty() {
        return Err(PolicyError::EmptyRuleSet);
    }
    if n == 0 || n as usize > rules.len() {
        return Err(PolicyError::OutOfRange {
            n,
            available: rules.len(),
        });
    }
    Ok(Rule::NOutOf { n, rules })
}
