//! Policy satisfaction.

use std::collections::{BTreeMap, HashSet};

use tracing::warn;

use crate::error::PolicyError;
use crate::types::{CanonicalPolicy, MspRole, RolePrincipal, Rule};

/// Approvals keyed by `<mspId>.<role>`.
///
/// The caller's map is kept as given. Role widening happens only in the
/// lookup table built for evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalSet {
    approvals: BTreeMap<String, bool>,
}

impl ApprovalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        Self {
            approvals: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Record an approval.
    pub fn approve(&mut self, key: impl Into<String>) -> &mut Self {
        self.approvals.insert(key.into(), true);
        self
    }

    pub fn as_map(&self) -> &BTreeMap<String, bool> {
        &self.approvals
    }

    /// Approved principals, with ADMIN and PEER approvals also granting
    /// MEMBER of the same MSP. PEER and ADMIN never imply each other.
    fn lookup(&self) -> HashSet<RolePrincipal> {
        let mut approved = HashSet::new();
        for (key, granted) in &self.approvals {
            if !granted {
                continue;
            }
            let principal = match RolePrincipal::parse(key) {
                Ok(principal) => principal,
                Err(e) => {
                    warn!(key = %key, error = %e, "Ignoring malformed approval key");
                    continue;
                }
            };
            if matches!(principal.role, MspRole::Admin | MspRole::Peer) {
                approved.insert(RolePrincipal::new(principal.msp_id.clone(), MspRole::Member));
            }
            approved.insert(principal);
        }
        approved
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for ApprovalSet {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// Evaluate `policy` against `approvals`.
///
/// `Ok(false)` means the policy is well formed but not satisfied; a malformed
/// policy is an error.
pub fn evaluate(policy: &CanonicalPolicy, approvals: &ApprovalSet) -> Result<bool, PolicyError> {
    policy.validate()?;
    let approved = approvals.lookup();
    evaluate_rule(policy, &policy.rule, &approved)
}

fn evaluate_rule(
    policy: &CanonicalPolicy,
    rule: &Rule,
    approved: &HashSet<RolePrincipal>,
) -> Result<bool, PolicyError> {
    match rule {
        Rule::SignedBy(index) => Ok(approved.contains(policy.principal(*index)?)),
        Rule::NOutOf { n, rules } => {
            let mut satisfied = 0u32;
            for child in rules {
                if evaluate_rule(policy, child, approved)? {
                    satisfied += 1;
                }
            }
            Ok(satisfied >= *n)
        }
    }
}
