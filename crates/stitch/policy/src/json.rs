//! Canonical JSON input with key-casing normalisation.
//!
//! Accepts `principalClassification`/`principal_classification`,
//! `mspIdentifier`/`msp_identifier`/`mspId`/`msp_id`, `signedBy`/`signed_by`
//! and `nOutOf`/`n_out_of`. Roles may be names in any case or wire codes.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::PolicyError;
use crate::types::{CanonicalPolicy, Classification, Identity, MspRole, RolePrincipal, Rule, MAX_POLICY_DEPTH};

const SIGNED_BY: &[&str] = &["signedBy", "signed_by"];
const N_OUT_OF: &[&str] = &["nOutOf", "n_out_of"];
const MSP_ID: &[&str] = &["mspIdentifier", "msp_identifier", "mspId", "msp_id"];
const CLASSIFICATION: &[&str] = &["principalClassification", "principal_classification"];

pub(crate) fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| object.get(*name))
}

/// Does this JSON object look like a canonical policy?
pub fn is_canonical_shape(value: &Value) -> bool {
    value
        .as_object()
        .map(|o| o.contains_key("identities") && o.contains_key("rule"))
        .unwrap_or(false)
}

/// Nesting depth of a JSON rule tree, measured without recursion.
///
/// `children` returns the sub-rules of a group node, or `None` for a leaf.
pub(crate) fn json_rule_depth<F>(root: &Value, children: F) -> Result<(), PolicyError>
where
    F: Fn(&Value) -> Option<&Vec<Value>>,
{
    let mut stack = vec![(root, 0usize)];
    while let Some((value, depth)) = stack.pop() {
        if let Some(rules) = children(value) {
            let depth = depth + 1;
            if depth > MAX_POLICY_DEPTH {
                return Err(PolicyError::TooDeep {
                    limit: MAX_POLICY_DEPTH,
                });
            }
            stack.extend(rules.iter().map(|r| (r, depth)));
        }
    }
    Ok(())
}

/// JSON nesting a rule tree at [`MAX_POLICY_DEPTH`] can need. A canonical
/// group takes three levels (rule object, `nOutOf` object, `rules` array),
/// a legacy group two.
const MAX_JSON_NESTING: usize = 3 * MAX_POLICY_DEPTH + 8;

/// Parse JSON policy text with the engine's own depth bound.
///
/// serde_json stops at 128 levels by default, which is about 40 policy
/// groups. Here bracket nesting is measured first without recursion, then
/// the text is parsed with serde_json's limit lifted.
pub fn parse_json_text(text: &str) -> Result<Value, PolicyError> {
    if json_nesting(text) > MAX_JSON_NESTING {
        return Err(PolicyError::TooDeep {
            limit: MAX_POLICY_DEPTH,
        });
    }
    let mut deserializer = serde_json::Deserializer::from_str(text);
    deserializer.disable_recursion_limit();
    let value = Value::deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(value)
}

fn json_nesting(text: &str) -> usize {
    let (mut depth, mut max) = (0usize, 0usize);
    let (mut in_string, mut escaped) = (false, false);
    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                max = max.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

fn canonical_children(value: &Value) -> Option<&Vec<Value>> {
    let group = field(value.as_object()?, N_OUT_OF)?;
    group.as_object()?.get("rules")?.as_array()
}

/// Convert a canonical-shaped JSON value into a validated [`CanonicalPolicy`].
pub fn canonical_from_value(value: &Value) -> Result<CanonicalPolicy, PolicyError> {
    let object = value
        .as_object()
        .ok_or_else(|| PolicyError::UnknownSyntax("expected a JSON object".into()))?;

    let rule = object
        .get("rule")
        .ok_or_else(|| PolicyError::Json("missing 'rule'".into()))?;
    json_rule_depth(rule, canonical_children)?;

    let version = match object.get("version") {
        None | Some(Value::Null) => 0,
        Some(v) => v
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| PolicyError::Json(format!("invalid version: {v}")))?,
    };

    let identities = object
        .get("identities")
        .and_then(Value::as_array)
        .ok_or_else(|| PolicyError::Json("'identities' must be an array".into()))?
        .iter()
        .map(identity_from_value)
        .collect::<Result<Vec<_>, _>>()?;

    let policy = CanonicalPolicy {
        version,
        identities,
        rule: rule_from_value(rule)?,
    };
    policy.validate()?;
    Ok(policy)
}

fn identity_from_value(value: &Value) -> Result<Identity, PolicyError> {
    let object = value
        .as_object()
        .ok_or_else(|| PolicyError::Json(format!("identity must be an object: {value}")))?;

    let classification = match field(object, CLASSIFICATION) {
        None => Classification::Role,
        Some(Value::Number(n)) if n.as_i64() == Some(0) => Classification::Role,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("role") => Classification::Role,
        Some(other) => {
            return Err(PolicyError::Json(format!(
                "unsupported principal classification: {other}"
            )))
        }
    };

    let principal = object
        .get("principal")
        .and_then(Value::as_object)
        .ok_or_else(|| PolicyError::Json("identity is missing 'principal'".into()))?;
    let msp_id = field(principal, MSP_ID)
        .and_then(Value::as_str)
        .ok_or_else(|| PolicyError::Json("principal is missing an msp identifier".into()))?;
    let role = match principal.get("role") {
        Some(Value::String(name)) => name.parse()?,
        Some(Value::Number(code)) => code
            .as_i64()
            .and_then(MspRole::from_code)
            .ok_or_else(|| PolicyError::UnknownRole(code.to_string()))?,
        _ => return Err(PolicyError::Json("principal is missing 'role'".into())),
    };

    Ok(Identity {
        classification,
        principal: RolePrincipal::new(msp_id, role),
    })
}

// Depth is bounded by json_rule_depth before this is called.
fn rule_from_value(value: &Value) -> Result<Rule, PolicyError> {
    let object = value
        .as_object()
        .ok_or_else(|| PolicyError::Json(format!("rule must be an object: {value}")))?;

    if let Some(index) = field(object, SIGNED_BY) {
        let index = index
            .as_u64()
            .and_then(|i| u32::try_from(i).ok())
            .ok_or_else(|| PolicyError::Json(format!("invalid signedBy index: {index}")))?;
        return Ok(Rule::SignedBy(index));
    }

    if let Some(group) = field(object, N_OUT_OF) {
        let group = group
            .as_object()
            .ok_or_else(|| PolicyError::Json("nOutOf must be an object".into()))?;
        let n = group
            .get("n")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| PolicyError::InvalidOutOfCount(format!("{:?}", group.get("n"))))?;
        let rules = group
            .get("rules")
            .and_then(Value::as_array)
            .ok_or_else(|| PolicyError::Json("nOutOf is missing 'rules'".into()))?
            .iter()
            .map(rule_from_value)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Rule::NOutOf { n, rules });
    }

    Err(PolicyError::Json(format!(
        "rule must contain signedBy or nOutOf: {value}"
    )))
}
