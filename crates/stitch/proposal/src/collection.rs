//! Private data collection definitions.

use serde::{Deserialize, Serialize};
use stitch_policy::{normalize, PolicyInput};
use stitch_protos::peer::{
    application_policy, collection_config, collection_policy_config, ApplicationPolicy,
    CollectionConfigPackage, CollectionPolicyConfig, StaticCollectionConfig,
};

use crate::error::{ProtocolError, ValidationErrors};

/// Endorsement policy override for one collection. Exactly one of the two
/// fields must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEndorsementPolicy {
    #[serde(default, alias = "signature_policy", skip_serializing_if = "Option::is_none")]
    pub signature_policy: Option<PolicyInput>,
    #[serde(
        default,
        alias = "channel_config_policy_reference",
        skip_serializing_if = "Option::is_none"
    )]
    pub channel_config_policy_reference: Option<String>,
}

impl CollectionEndorsementPolicy {
    fn to_wire(&self, field: &str, errors: &mut ValidationErrors) -> Option<ApplicationPolicy> {
        let kind = match (&self.signature_policy, &self.channel_config_policy_reference) {
            (Some(policy), None) => match normalize(policy) {
                Ok(policy) => application_policy::Type::SignaturePolicy(policy.to_envelope()),
                Err(e) => {
                    errors.push(field, e.to_string());
                    return None;
                }
            },
            (None, Some(reference)) if !reference.trim().is_empty() => {
                application_policy::Type::ChannelConfigPolicyReference(reference.clone())
            }
            (Some(_), Some(_)) => {
                errors.push(
                    field,
                    "set either signaturePolicy or channelConfigPolicyReference, not both",
                );
                return None;
            }
            _ => {
                errors.push(
                    field,
                    "requires signaturePolicy or channelConfigPolicyReference",
                );
                return None;
            }
        };
        Some(ApplicationPolicy { r#type: Some(kind) })
    }
}

/// A static private data collection as supplied in a chaincode definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfig {
    pub name: String,
    #[serde(default, alias = "required_peer_count")]
    pub required_peer_count: i32,
    #[serde(default, alias = "maximum_peer_count", alias = "maxPeerCount")]
    pub maximum_peer_count: i32,
    #[serde(default, alias = "block_to_live")]
    pub block_to_live: u64,
    #[serde(default, alias = "member_only_read")]
    pub member_only_read: bool,
    #[serde(default, alias = "member_only_write")]
    pub member_only_write: bool,
    #[serde(alias = "member_orgs_policy", alias = "policy")]
    pub member_orgs_policy: PolicyInput,
    #[serde(default, alias = "endorsement_policy", skip_serializing_if = "Option::is_none")]
    pub endorsement_policy: Option<CollectionEndorsementPolicy>,
}

impl CollectionConfig {
    pub fn new(name: impl Into<String>, member_orgs_policy: impl Into<PolicyInput>) -> Self {
        Self {
            name: name.into(),
            required_peer_count: 0,
            maximum_peer_count: 1,
            block_to_live: 0,
            member_only_read: false,
            member_only_write: false,
            member_orgs_policy: member_orgs_policy.into(),
            endorsement_policy: None,
        }
    }

    /// Convert to the wire form, or explain every problem with it.
    pub fn to_wire(&self) -> Result<StaticCollectionConfig, ProtocolError> {
        let mut errors = ValidationErrors::new();
        let wire = self.collect_wire("collection", &mut errors);
        errors.into_result()?;
        wire.ok_or_else(|| ProtocolError::Validation(ValidationErrors::new()))
    }

    fn collect_wire(&self, prefix: &str, errors: &mut ValidationErrors) -> Option<StaticCollectionConfig> {
        errors.require(&format!("{prefix}.name"), &self.name);
        if self.required_peer_count < 0 {
            errors.push(format!("{prefix}.required_peer_count"), "must not be negative");
        }
        if self.maximum_peer_count < self.required_peer_count {
            errors.push(
                format!("{prefix}.maximum_peer_count"),
                format!(
                    "{} is below required_peer_count {}",
                    self.maximum_peer_count, self.required_peer_count
                ),
            );
        }

        let member_orgs_policy = match normalize(&self.member_orgs_policy) {
            Ok(policy) => Some(CollectionPolicyConfig {
                payload: Some(collection_policy_config::Payload::SignaturePolicy(
                    policy.to_envelope(),
                )),
            }),
            Err(e) => {
                errors.push(format!("{prefix}.member_orgs_policy"), e.to_string());
                None
            }
        };
        let endorsement_policy = match &self.endorsement_policy {
            Some(policy) => Some(policy.to_wire(&format!("{prefix}.endorsement_policy"), errors)?),
            None => None,
        };

        Some(StaticCollectionConfig {
            name: self.name.clone(),
            member_orgs_policy: Some(member_orgs_policy?),
            required_peer_count: self.required_peer_count,
            maximum_peer_count: self.maximum_peer_count,
            block_to_live: self.block_to_live,
            member_only_read: self.member_only_read,
            member_only_write: self.member_only_write,
            endorsement_policy,
        })
    }
}

/// Build the collection package for a chaincode definition. An empty list
/// yields `None`, which leaves the field unset on the wire.
pub fn build_collection_package(
    collections: &[CollectionConfig],
) -> Result<Option<CollectionConfigPackage>, ProtocolError> {
    let mut errors = ValidationErrors::new();
    let package = collect_collection_package(collections, &mut errors);
    errors.into_result()?;
    Ok(package)
}

pub(crate) fn collect_collection_package(
    collections: &[CollectionConfig],
    errors: &mut ValidationErrors,
) -> Option<CollectionConfigPackage> {
    if collections.is_empty() {
        return None;
    }
    let mut config = Vec::with_capacity(collections.len());
    for (index, collection) in collections.iter().enumerate() {
        if collections[..index].iter().any(|c| c.name == collection.name) {
            errors.push(
                format!("collections[{index}].name"),
                format!("duplicate collection '{}'", collection.name),
            );
        }
        if let Some(wire) = collection.collect_wire(&format!("collections[{index}]"), errors) {
            config.push(stitch_protos::peer::CollectionConfig {
                payload: Some(collection_config::Payload::StaticCollectionConfig(wire)),
            });
        }
    }
    Some(CollectionConfigPackage { config })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stitch_policy::{decode_envelope, to_compact_string};

    #[test]
    fn converts_member_policy() {
        let collection = CollectionConfig::new("private", "OR('Org1MSP.member', 'Org2MSP.member')");
        let wire = collection.to_wire().unwrap();
        assert_eq!(wire.name, "private");
        assert_eq!(wire.maximum_peer_count, 1);
        let Some(collection_policy_config::Payload::SignaturePolicy(envelope)) =
            wire.member_orgs_policy.unwrap().payload
        else {
            panic!("missing member policy");
        };
        let policy = decode_envelope(&stitch_protos::encode(&envelope)).unwrap();
        assert_eq!(
            to_compact_string(&policy).unwrap(),
            "OR('Org1MSP.MEMBER', 'Org2MSP.MEMBER')"
        );
        assert!(wire.endorsement_policy.is_none());
    }

    #[test]
    fn deserializes_from_json() {
        let collection: CollectionConfig = serde_json::from_value(json!({
            "name": "secrets",
            "requiredPeerCount": 1,
            "maxPeerCount": 3,
            "blockToLive": 100,
            "memberOnlyRead": true,
            "policy": "OR('Org1MSP.member')",
            "endorsementPolicy": { "channelConfigPolicyReference": "/Channel/Application/Writers" }
        }))
        .unwrap();
        let wire = collection.to_wire().unwrap();
        assert_eq!(wire.maximum_peer_count, 3);
        assert!(wire.member_only_read);
        assert_eq!(
            wire.endorsement_policy.unwrap().r#type,
            Some(application_policy::Type::ChannelConfigPolicyReference(
                "/Channel/Application/Writers".into()
            ))
        );
    }

    #[test]
    fn rejects_both_endorsement_fields() {
        let mut collection = CollectionConfig::new("private", "OR('Org1MSP.member')");
        collection.endorsement_policy = Some(CollectionEndorsementPolicy {
            signature_policy: Some("OR('Org1MSP.peer')".into()),
            channel_config_policy_reference: Some("/Channel/Application/Endorsement".into()),
        });
        match collection.to_wire().unwrap_err() {
            ProtocolError::Validation(errors) => {
                assert_eq!(errors.fields(), vec!["collection.endorsement_policy"])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_endorsement_policy() {
        let mut collection = CollectionConfig::new("private", "OR('Org1MSP.member')");
        collection.endorsement_policy = Some(CollectionEndorsementPolicy::default());
        assert!(matches!(collection.to_wire(), Err(ProtocolError::Validation(_))));
    }

    #[test]
    fn package_reports_every_bad_collection() {
        let mut bad = CollectionConfig::new("", "NOT A POLICY((");
        bad.maximum_peer_count = 0;
        bad.required_peer_count = 2;
        let collections = vec![
            CollectionConfig::new("a", "OR('Org1MSP.member')"),
            CollectionConfig::new("a", "OR('Org1MSP.member')"),
            bad,
        ];
        match build_collection_package(&collections).unwrap_err() {
            ProtocolError::Validation(errors) => assert_eq!(
                errors.fields(),
                vec![
                    "collections[1].name",
                    "collections[2].name",
                    "collections[2].maximum_peer_count",
                    "collections[2].member_orgs_policy",
                ]
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_list_has_no_package() {
        assert!(build_collection_package(&[]).unwrap().is_none());
    }
}
