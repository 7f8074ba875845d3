//! Conversion between canonical policies and `common.SignaturePolicyEnvelope`.

use stitch_protos::common::{self, signature_policy, SignaturePolicy, SignaturePolicyEnvelope};
use stitch_protos::msp::{msp_principal, MspPrincipal, MspRole as WireMspRole};

use crate::error::PolicyError;
use crate::types::{CanonicalPolicy, Identity, MspRole, Rule, MAX_POLICY_DEPTH};

// Two message levels per group, plus the envelopes a policy travels in.
const _: () = assert!(2 * MAX_POLICY_DEPTH + 64 <= stitch_protos::MAX_MESSAGE_DEPTH);

impl CanonicalPolicy {
    /// Build the wire envelope. Principal bytes are an encoded `msp.MSPRole`.
    pub fn to_envelope(&self) -> SignaturePolicyEnvelope {
        SignaturePolicyEnvelope {
            version: self.version,
            rule: Some(rule_to_wire(&self.rule)),
            identities: self.identities.iter().map(identity_to_wire).collect(),
        }
    }

    /// Read a wire envelope. Only role principals are supported.
    pub fn from_envelope(envelope: &SignaturePolicyEnvelope) -> Result<Self, PolicyError> {
        let rule = envelope
            .rule
            .as_ref()
            .ok_or_else(|| PolicyError::Decode("signature policy envelope has no rule".into()))?;
        wire_depth(rule)?;

        let identities = envelope
            .identities
            .iter()
            .map(identity_from_wire)
            .collect::<Result<Vec<_>, _>>()?;

        let policy = CanonicalPolicy {
            version: envelope.version,
            identities,
            rule: rule_from_wire(rule)?,
        };
        policy.validate()?;
        Ok(policy)
    }
}

/// Encoded `common.SignaturePolicyEnvelope` bytes.
pub fn encode_envelope(policy: &CanonicalPolicy) -> Vec<u8> {
    stitch_protos::encode(&policy.to_envelope())
}

pub fn decode_envelope(bytes: &[u8]) -> Result<CanonicalPolicy, PolicyError> {
    let envelope: SignaturePolicyEnvelope = stitch_protos::decode(bytes)?;
    CanonicalPolicy::from_envelope(&envelope)
}

fn identity_to_wire(identity: &Identity) -> MspPrincipal {
    MspPrincipal {
        principal_classification: msp_principal::Classification::Role as i32,
        principal: stitch_protos::encode(&WireMspRole {
            msp_identifier: identity.principal.msp_id.clone(),
            role: identity.principal.role.code(),
        }),
    }
}

fn identity_from_wire(principal: &MspPrincipal) -> Result<Identity, PolicyError> {
    if principal.principal_classification != msp_principal::Classification::Role as i32 {
        return Err(PolicyError::Decode(format!(
            "unsupported principal classification {}",
            principal.principal_classification
        )));
    }
    let role: WireMspRole = stitch_protos::decode(&principal.principal)?;
    let code = MspRole::from_code(role.role.into())
        .ok_or_else(|| PolicyError::UnknownRole(role.role.to_string()))?;
    Ok(Identity::role(role.msp_identifier, code))
}

fn rule_to_wire(rule: &Rule) -> SignaturePolicy {
    let kind = match rule {
        Rule::SignedBy(index) => signature_policy::Type::SignedBy(*index as i32),
        Rule::NOutOf { n, rules } => signature_policy::Type::NOutOf(signature_policy::NOutOf {
            n: *n as i32,
            rules: rules.iter().map(rule_to_wire).collect(),
        }),
    };
    SignaturePolicy { r#type: Some(kind) }
}

fn wire_depth(root: &SignaturePolicy) -> Result<(), PolicyError> {
    let mut stack = vec![(root, 0usize)];
    while let Some((rule, depth)) = stack.pop() {
        if let Some(signature_policy::Type::NOutOf(group)) = &rule.r#type {
            let depth = depth + 1;
            if depth > MAX_POLICY_DEPTH {
                return Err(PolicyError::TooDeep {
                    limit: MAX_POLICY_DEPTH,
                });
            }
            stack.extend(group.rules.iter().map(|r| (r, depth)));
        }
    }
    Ok(())
}

fn rule_from_wire(rule: &SignaturePolicy) -> Result<Rule, PolicyError> {
    match &rule.r#type {
        Some(signature_policy::Type::SignedBy(index)) => u32::try_from(*index)
            .map(Rule::SignedBy)
            .map_err(|_| PolicyError::Decode(format!("negative signed_by index {index}"))),
        Some(signature_policy::Type::NOutOf(group)) => {
            let n = u32::try_from(group.n)
                .map_err(|_| PolicyError::InvalidOutOfCount(group.n.to_string()))?;
            let rules = group
                .rules
                .iter()
                .map(rule_from_wire)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Rule::NOutOf { n, rules })
        }
        None => Err(PolicyError::Decode("signature policy has no type".into())),
    }
}

/// Wrap a signature envelope as a generic `common.Policy`.
pub(crate) fn signature_policy_value(policy: &CanonicalPolicy) -> common::Policy {
    common::Policy {
        r#type: common::policy::PolicyType::Signature as i32,
        value: encode_envelope(policy),
    }
}
