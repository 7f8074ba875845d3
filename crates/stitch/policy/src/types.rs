//! Canonical policy model.
//!
//! This is the wire-shaped notation every other notation converts into.
//! Serialising a [`CanonicalPolicy`] produces the camelCase JSON form used by
//! Fabric client SDKs; deserialising goes through [`crate::json`] so that the
//! snake_case spellings and numeric codes are accepted as well.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PolicyError;

/// Maximum nesting of rule groups accepted from any notation.
pub const MAX_POLICY_DEPTH: usize = 1000;

/// MSP role of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MspRole {
    Member,
    Admin,
    Client,
    Peer,
    Orderer,
}

impl MspRole {
    pub const ALL: [MspRole; 5] = [
        MspRole::Member,
        MspRole::Admin,
        MspRole::Client,
        MspRole::Peer,
        MspRole::Orderer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MspRole::Member => "MEMBER",
            MspRole::Admin => "ADMIN",
            MspRole::Client => "CLIENT",
            MspRole::Peer => "PEER",
            MspRole::Orderer => "ORDERER",
        }
    }

    /// Numeric code used by `msp.MSPRole.MSPRoleType`.
    pub fn code(&self) -> i32 {
        match self {
            MspRole::Member => 0,
            MspRole::Admin => 1,
            MspRole::Client => 2,
            MspRole::Peer => 3,
            MspRole::Orderer => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(MspRole::Member),
            1 => Some(MspRole::Admin),
            2 => Some(MspRole::Client),
            3 => Some(MspRole::Peer),
            4 => Some(MspRole::Orderer),
            _ => None,
        }
    }
}

impl fmt::Display for MspRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MspRole {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MEMBER" => Ok(MspRole::Member),
            "ADMIN" => Ok(MspRole::Admin),
            "CLIENT" => Ok(MspRole::Client),
            "PEER" => Ok(MspRole::Peer),
            "ORDERER" => Ok(MspRole::Orderer),
            _ => Err(PolicyError::UnknownRole(s.to_string())),
        }
    }
}

/// Principal classification. Only role principals are expressible in the
/// policy notations this crate handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    #[default]
    Role,
}

/// An MSP id paired with a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RolePrincipal {
    #[serde(rename = "mspIdentifier")]
    pub msp_id: String,
    pub role: MspRole,
}

impl RolePrincipal {
    pub fn new(msp_id: impl Into<String>, role: MspRole) -> Self {
        Self {
            msp_id: msp_id.into(),
            role,
        }
    }

    /// Parse a `<mspId>.<role>` token. The msp id is everything before the
    /// last dot.
    pub fn parse(token: &str) -> Result<Self, PolicyError> {
        let (msp_id, role) = token
            .rsplit_once('.')
            .ok_or_else(|| PolicyError::InvalidPrincipal(token.to_string()))?;
        if msp_id.is_empty() || role.is_empty() {
            return Err(PolicyError::InvalidPrincipal(token.to_string()));
        }
        Ok(Self::new(msp_id, role.parse()?))
    }

    /// Display key, `<mspId>.<ROLE>`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.msp_id, self.role)
    }
}

/// One entry of a policy's identity list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Identity {
    #[serde(rename = "principalClassification")]
    pub classification: Classification,
    pub principal: RolePrincipal,
}

impl Identity {
    pub fn role(msp_id: impl Into<String>, role: MspRole) -> Self {
        Self {
            classification: Classification::Role,
            principal: RolePrincipal::new(msp_id, role),
        }
    }
}

/// Recursive policy rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
    /// Index into the policy's identity list.
    SignedBy(u32),
    /// At least `n` of `rules` must be satisfied.
    NOutOf { n: u32, rules: Vec<Rule> },
}

impl Rule {
    pub fn n_out_of(n: u32, rules: Vec<Rule>) -> Self {
        Rule::NOutOf { n, rules }
    }

    /// Deepest nesting of `NOutOf` groups. A bare `SignedBy` has depth 0.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((rule, depth)) = stack.pop() {
            if let Rule::NOutOf { rules, .. } = rule {
                let depth = depth + 1;
                max = max.max(depth);
                stack.extend(rules.iter().map(|r| (r, depth)));
            }
        }
        max
    }
}

/// Canonical signature policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalPolicy {
    pub version: i32,
    pub identities: Vec<Identity>,
    pub rule: Rule,
}

impl CanonicalPolicy {
    pub fn new(identities: Vec<Identity>, rule: Rule) -> Self {
        Self {
            version: 0,
            identities,
            rule,
        }
    }

    /// Check structural invariants without recursing: nesting depth,
    /// `SignedBy` indices, non-empty groups and `1 <= n <= rules`.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let identities = self.identities.len();
        let mut stack = vec![(&self.rule, 0usize)];
        while let Some((rule, depth)) = stack.pop() {
            match rule {
                Rule::SignedBy(index) => {
                    if *index as usize >= identities {
                        return Err(PolicyError::SignedByOutOfRange {
                            index: *index,
                            identities,
                        });
                    }
                }
                Rule::NOutOf { n, rules } => {
                    let depth = depth + 1;
                    if depth > MAX_POLICY_DEPTH {
                        return Err(PolicyError::TooDeep {
                            limit: MAX_POLICY_DEPTH,
                        });
                    }
                    if rules.is_empty() {
                        return Err(PolicyError::EmptyRuleSet);
                    }
                    if *n == 0 || *n as usize > rules.len() {
                        return Err(PolicyError::OutOfRange {
                            n: *n,
                            available: rules.len(),
                        });
                    }
                    stack.extend(rules.iter().map(|r| (r, depth)));
                }
            }
        }
        Ok(())
    }

    /// Principal referenced by a `SignedBy` index.
    pub fn principal(&self, index: u32) -> Result<&RolePrincipal, PolicyError> {
        self.identities
            .get(index as usize)
            .map(|identity| &identity.principal)
            .ok_or(PolicyError::SignedByOutOfRange {
                index,
                identities: self.identities.len(),
            })
    }

    /// Canonical JSON text.
    pub fn to_json(&self) -> Result<String, PolicyError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<'de> Deserialize<'de> for CanonicalPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        crate::json::canonical_from_value(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_splits_on_last_dot() {
        let principal = RolePrincipal::parse("org1.example.com.peer").unwrap();
        assert_eq!(principal.msp_id, "org1.example.com");
        assert_eq!(principal.role, MspRole::Peer);
        assert_eq!(principal.key(), "org1.example.com.PEER");
    }

    #[test]
    fn principal_errors() {
        assert!(matches!(
            RolePrincipal::parse("Org1MSP"),
            Err(PolicyError::InvalidPrincipal(_))
        ));
        assert!(matches!(
            RolePrincipal::parse(".member"),
            Err(PolicyError::InvalidPrincipal(_))
        ));
        assert!(matches!(
            RolePrincipal::parse("Org1MSP.owner"),
            Err(PolicyError::UnknownRole(_))
        ));
    }

    #[test]
    fn validate_catches_bad_indices_and_counts() {
        let identities = vec![Identity::role("Org1MSP", MspRole::Member)];
        let bad_index = CanonicalPolicy::new(
            identities.clone(),
            Rule::n_out_of(1, vec![Rule::SignedBy(1)]),
        );
        assert_eq!(
            bad_index.validate(),
            Err(PolicyError::SignedByOutOfRange {
                index: 1,
                identities: 1
            })
        );

        let bad_count =
            CanonicalPolicy::new(identities.clone(), Rule::n_out_of(2, vec![Rule::SignedBy(0)]));
        assert_eq!(
            bad_count.validate(),
            Err(PolicyError::OutOfRange { n: 2, available: 1 })
        );

        let zero = CanonicalPolicy::new(identities.clone(), Rule::n_out_of(0, vec![Rule::SignedBy(0)]));
        assert_eq!(zero.validate(), Err(PolicyError::OutOfRange { n: 0, available: 1 }));

        let empty = CanonicalPolicy::new(identities, Rule::n_out_of(1, vec![]));
        assert_eq!(empty.validate(), Err(PolicyError::EmptyRuleSet));
    }

    #[test]
    fn depth_is_iterative() {
        let mut rule = Rule::SignedBy(0);
        for _ in 0..=MAX_POLICY_DEPTH {
            rule = Rule::n_out_of(1, vec![rule]);
        }
        assert_eq!(rule.depth(), MAX_POLICY_DEPTH + 1);
        let policy = CanonicalPolicy::new(vec![Identity::role("Org1MSP", MspRole::Member)], rule);
        assert_eq!(
            policy.validate(),
            Err(PolicyError::TooDeep {
                limit: MAX_POLICY_DEPTH
            })
        );
    }

    #[test]
    fn serialises_camel_case() {
        let policy = CanonicalPolicy::new(
            vec![Identity::role("Org1MSP", MspRole::Admin)],
            Rule::n_out_of(1, vec![Rule::SignedBy(0)]),
        );
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "version": 0,
                "identities": [{
                    "principalClassification": "ROLE",
                    "principal": { "mspIdentifier": "Org1MSP", "role": "ADMIN" }
                }],
                "rule": { "nOutOf": { "n": 1, "rules": [{ "signedBy": 0 }] } }
            })
        );
    }
}
