//! Canonical policy back to the compact notation.

use crate::error::PolicyError;
use crate::types::{CanonicalPolicy, Rule};

/// Render a canonical policy as a compact string.
///
/// The keyword follows the rule the parser uses when building: `n` equal to
/// the number of children is `AND`, `n == 1` is `OR`, anything else is
/// `OutOf(n, ...)`. Leaves render as `'<mspId>.<ROLE>'`.
pub fn to_compact_string(policy: &CanonicalPolicy) -> Result<String, PolicyError> {
    policy.validate()?;
    let mut out = String::new();
    render_rule(policy, &policy.rule, &mut out)?;
    Ok(out)
}

fn render_rule(policy: &CanonicalPolicy, rule: &Rule, out: &mut String) -> Result<(), PolicyError> {
    match rule {
        Rule::SignedBy(index) => {
            let principal = policy.principal(*index)?;
            out.push('\'');
            out.push_str(&principal.key());
            out.push('\'');
        }
        Rule::NOutOf { n, rules } => {
            if rules.is_empty() {
                return Err(PolicyError::EmptyRuleSet);
            }
            if *n as usize == rules.len() {
                out.push_str("AND(");
            } else if *n == 1 {
                out.push_str("OR(");
            } else {
                out.push_str(&format!("OutOf({n}, "));
            }
            for (i, child) in rules.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_rule(policy, child, out)?;
            }
            out.push(')');
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_compact;
    use crate::types::{Identity, MspRole};

    #[test]
    fn renders_keywords_by_count() {
        let policy = parse_compact(
            "OR(AND('Org1.member','Org2.peer'), OutOf(2, 'Org1.admin', 'Org2.admin', 'Org3.admin'))",
        )
        .unwrap();
        assert_eq!(
            to_compact_string(&policy).unwrap(),
            "OR(AND('Org1.MEMBER', 'Org2.PEER'), OutOf(2, 'Org1.ADMIN', 'Org2.ADMIN', 'Org3.ADMIN'))"
        );
    }

    #[test]
    fn single_child_group_prefers_and() {
        let policy = parse_compact("OR('Org1.member')").unwrap();
        let rendered = to_compact_string(&policy).unwrap();
        assert_eq!(rendered, "AND('Org1.MEMBER')");
        assert_eq!(parse_compact(&rendered).unwrap(), policy);
    }

    #[test]
    fn lone_leaf() {
        let policy = parse_compact("'Org1.client'").unwrap();
        assert_eq!(to_compact_string(&policy).unwrap(), "'Org1.CLIENT'");
    }

    #[test]
    fn rejects_invalid_policy() {
        let policy = CanonicalPolicy::new(
            vec![Identity::role("Org1", MspRole::Member)],
            Rule::n_out_of(1, vec![Rule::SignedBy(3)]),
        );
        assert!(matches!(
            to_compact_string(&policy),
            Err(PolicyError::SignedByOutOfRange { index: 3, .. })
        ));

        let empty = CanonicalPolicy::new(vec![], Rule::n_out_of(0, vec![]));
        assert_eq!(to_compact_string(&empty), Err(PolicyError::EmptyRuleSet));
    }
}
