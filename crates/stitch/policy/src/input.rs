//! Notation dispatch: any accepted policy input to a canonical policy.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use stitch_protos::common;

use crate::error::PolicyError;
use crate::implicit_meta::{parse_implicit_meta, ImplicitMetaSpec};
use crate::json::{canonical_from_value, is_canonical_shape, parse_json_text};
use crate::legacy::{is_legacy_shape, LegacyPolicy};
use crate::parser::parse_compact;
use crate::types::CanonicalPolicy;
use crate::wire::signature_policy_value;

/// A policy in any accepted notation.
///
/// Deserialises from a JSON string (compact notation) or a JSON object
/// (canonical or legacy, told apart by their keys).
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyInput {
    Compact(String),
    Json(Value),
    Canonical(CanonicalPolicy),
    Legacy(LegacyPolicy),
}

impl PolicyInput {
    /// Read a JSON document (an object, or a string holding compact
    /// notation). Nesting is bounded at [`crate::MAX_POLICY_DEPTH`] groups
    /// rather than serde_json's default recursion limit.
    pub fn from_json_str(text: &str) -> Result<Self, PolicyError> {
        Ok(parse_json_text(text)?.into())
    }
}

impl From<&str> for PolicyInput {
    fn from(s: &str) -> Self {
        PolicyInput::Compact(s.to_string())
    }
}

impl From<String> for PolicyInput {
    fn from(s: String) -> Self {
        PolicyInput::Compact(s)
    }
}

impl From<CanonicalPolicy> for PolicyInput {
    fn from(p: CanonicalPolicy) -> Self {
        PolicyInput::Canonical(p)
    }
}

impl From<LegacyPolicy> for PolicyInput {
    fn from(p: LegacyPolicy) -> Self {
        PolicyInput::Legacy(p)
    }
}

impl From<Value> for PolicyInput {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => PolicyInput::Compact(s),
            other => PolicyInput::Json(other),
        }
    }
}

impl Serialize for PolicyInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PolicyInput::Compact(s) => serializer.serialize_str(s),
            PolicyInput::Json(v) => v.serialize(serializer),
            PolicyInput::Canonical(p) => p.serialize(serializer),
            PolicyInput::Legacy(p) => p.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PolicyInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Value::deserialize(deserializer)?.into())
    }
}

/// What kind of policy an input describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Signature,
    ImplicitMeta,
    Unknown,
}

fn leading_word(s: &str) -> String {
    s.trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Classify an input by shape without fully parsing it.
pub fn detect_kind(input: &PolicyInput) -> PolicyKind {
    match input {
        PolicyInput::Compact(s) => {
            let rest_starts_group = |word: &str| {
                s.trim_start()[word.len()..].trim_start().starts_with('(')
            };
            match leading_word(s).as_str() {
                w @ ("AND" | "OR" | "OUTOF") if rest_starts_group(w) => PolicyKind::Signature,
                "ANY" | "ALL" | "MAJORITY" => PolicyKind::ImplicitMeta,
                _ => PolicyKind::Unknown,
            }
        }
        PolicyInput::Json(v) if is_canonical_shape(v) || is_legacy_shape(v) => {
            PolicyKind::Signature
        }
        PolicyInput::Json(_) => PolicyKind::Unknown,
        PolicyInput::Canonical(_) | PolicyInput::Legacy(_) => PolicyKind::Signature,
    }
}

/// Convert any signature-policy notation to a validated canonical policy.
///
/// Strings are compact notation. Objects with `identities` and `rule` are
/// canonical (key casing is normalised); objects with `identities` and
/// `policy` are legacy. Anything else is [`PolicyError::UnknownSyntax`].
pub fn normalize(input: &PolicyInput) -> Result<CanonicalPolicy, PolicyError> {
    match input {
        PolicyInput::Compact(s) => parse_compact(s),
        PolicyInput::Canonical(p) => {
            p.validate()?;
            Ok(p.clone())
        }
        PolicyInput::Legacy(p) => p.to_canonical(),
        PolicyInput::Json(Value::String(s)) => parse_compact(s),
        PolicyInput::Json(v) if is_canonical_shape(v) => canonical_from_value(v),
        PolicyInput::Json(v) if is_legacy_shape(v) => LegacyPolicy::from_value(v)?.to_canonical(),
        PolicyInput::Json(v) => Err(PolicyError::UnknownSyntax(truncate(&v.to_string()))),
    }
}

fn truncate(s: &str) -> String {
    const LIMIT: usize = 64;
    match s.char_indices().nth(LIMIT) {
        Some((i, _)) => format!("{}...", &s[..i]),
        None => s.to_string(),
    }
}

/// A channel-config policy: either a signature policy or an implicit-meta
/// rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySpec {
    Signature(CanonicalPolicy),
    ImplicitMeta(ImplicitMetaSpec),
}

impl PolicySpec {
    pub fn from_input(input: &PolicyInput) -> Result<Self, PolicyError> {
        match (detect_kind(input), input) {
            (PolicyKind::ImplicitMeta, PolicyInput::Compact(s)) => {
                Ok(PolicySpec::ImplicitMeta(parse_implicit_meta(s)))
            }
            (PolicyKind::Signature, _) => normalize(input).map(PolicySpec::Signature),
            _ => Err(PolicyError::UnknownSyntax(truncate(&describe(input)))),
        }
    }

    /// `common.Policy` with the matching type tag.
    pub fn to_wire_policy(&self) -> common::Policy {
        match self {
            PolicySpec::Signature(policy) => signature_policy_value(policy),
            PolicySpec::ImplicitMeta(spec) => common::Policy {
                r#type: common::policy::PolicyType::ImplicitMeta as i32,
                value: stitch_protos::encode(&spec.to_wire()),
            },
        }
    }
}

fn describe(input: &PolicyInput) -> String {
    match input {
        PolicyInput::Compact(s) => s.clone(),
        PolicyInput::Json(v) => v.to_string(),
        PolicyInput::Canonical(_) => "canonical policy".into(),
        PolicyInput::Legacy(_) => "legacy policy".into(),
    }
}
