//! Implicit-meta policies (`"MAJORITY Admins"`), used in channel config.

use std::fmt;

use stitch_protos::common::{implicit_meta_policy, ImplicitMetaPolicy};
use tracing::warn;

const DEFAULT_SUB_POLICY: &str = "Admins";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImplicitMetaRule {
    Any,
    All,
    #[default]
    Majority,
}

impl ImplicitMetaRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImplicitMetaRule::Any => "ANY",
            ImplicitMetaRule::All => "ALL",
            ImplicitMetaRule::Majority => "MAJORITY",
        }
    }

    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "ANY" => Some(ImplicitMetaRule::Any),
            "ALL" => Some(ImplicitMetaRule::All),
            "MAJORITY" => Some(ImplicitMetaRule::Majority),
            _ => None,
        }
    }

    fn to_wire(self) -> implicit_meta_policy::Rule {
        match self {
            ImplicitMetaRule::Any => implicit_meta_policy::Rule::Any,
            ImplicitMetaRule::All => implicit_meta_policy::Rule::All,
            ImplicitMetaRule::Majority => implicit_meta_policy::Rule::Majority,
        }
    }
}

/// A rule applied to a named sub-policy of every child config group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitMetaSpec {
    pub rule: ImplicitMetaRule,
    pub sub_policy: String,
}

impl Default for ImplicitMetaSpec {
    fn default() -> Self {
        Self {
            rule: ImplicitMetaRule::Majority,
            sub_policy: DEFAULT_SUB_POLICY.to_string(),
        }
    }
}

impl ImplicitMetaSpec {
    pub fn to_wire(&self) -> ImplicitMetaPolicy {
        ImplicitMetaPolicy {
            sub_policy: self.sub_policy.clone(),
            rule: self.rule.to_wire() as i32,
        }
    }

    pub fn from_wire(policy: &ImplicitMetaPolicy) -> Self {
        let rule = match implicit_meta_policy::Rule::try_from(policy.rule) {
            Ok(implicit_meta_policy::Rule::Any) => ImplicitMetaRule::Any,
            Ok(implicit_meta_policy::Rule::All) => ImplicitMetaRule::All,
            Ok(implicit_meta_policy::Rule::Majority) => ImplicitMetaRule::Majority,
            Err(_) => {
                warn!(rule = policy.rule, "Unknown implicit-meta rule, using MAJORITY");
                ImplicitMetaRule::Majority
            }
        };
        Self {
            rule,
            sub_policy: policy.sub_policy.clone(),
        }
    }
}

impl fmt::Display for ImplicitMetaSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.rule.as_str(), self.sub_policy)
    }
}

/// Parse `"<ANY|ALL|MAJORITY> <SubPolicy>"`.
///
/// Missing or unrecognised parts fall back to `MAJORITY` and `Admins`.
pub fn parse_implicit_meta(input: &str) -> ImplicitMetaSpec {
    let mut words = input.split_whitespace();
    let mut spec = ImplicitMetaSpec::default();

    match words.next().map(|w| (w, ImplicitMetaRule::parse(w))) {
        Some((_, Some(rule))) => spec.rule = rule,
        Some((word, None)) => {
            warn!(input = %input, rule = %word, "Unknown implicit-meta rule, using MAJORITY")
        }
        None => warn!(input = %input, "Empty implicit-meta policy, using MAJORITY Admins"),
    }

    match words.next() {
        Some(sub_policy) => spec.sub_policy = sub_policy.to_string(),
        None => warn!(input = %input, "Implicit-meta policy names no sub-policy, using Admins"),
    }

    spec
}
