//! Lifecycle argument encoding read back through the response decoders.

use std::collections::BTreeMap;

use stitch_crypto::mocks::{ORG1_USER_CERT, ORG1_USER_KEY};
use stitch_crypto::MockCryptoProvider;
use stitch_proposal::{
    approve_args, build_lifecycle_proposal, commit_args, decode_chaincode_definition, decode_signed_proposal,
    CollectionConfig, CollectionEndorsementPolicy, LifecycleDefinition, PackageSource, ProtocolConfig,
    ProtocolError, SigningIdentity, ValidationParameter, ValidationParameterView,
};
use stitch_protos::lifecycle::{ApproveChaincodeDefinitionForMyOrgArgs, QueryChaincodeDefinitionResult};

/// Echo approve args back as a query result, the way a peer reports a
/// definition it has approved.
fn approve_round_trip(definition: &LifecycleDefinition) -> stitch_proposal::ChaincodeDefinitionView {
    let invocation = approve_args(
        &ProtocolConfig::default(),
        definition,
        &PackageSource::Local("basic_1.0:0c1e".into()),
    )
    .unwrap();
    let args: ApproveChaincodeDefinitionForMyOrgArgs = stitch_protos::decode(&invocation.args).unwrap();
    let result = QueryChaincodeDefinitionResult {
        sequence: args.sequence,
        version: args.version,
        endorsement_plugin: args.endorsement_plugin,
        validation_plugin: args.validation_plugin,
        validation_parameter: args.validation_parameter,
        collections: args.collections,
        init_required: args.init_required,
        approvals: BTreeMap::new(),
    };
    decode_chaincode_definition(&args.name, &stitch_protos::encode(&result)).unwrap()
}

#[test]
fn signature_policy_reads_back_as_compact_string() {
    let mut definition = LifecycleDefinition::new("basic", "1.0", 1);
    definition.validation =
        ValidationParameter::SignaturePolicy("OutOf(2, 'Org1MSP.peer', 'Org2MSP.peer', 'Org3MSP.peer')".into());

    let view = approve_round_trip(&definition);
    assert_eq!(view.name, "basic");
    assert_eq!(
        view.validation_parameter,
        ValidationParameterView::SignaturePolicy(
            "OutOf(2, 'Org1MSP.PEER', 'Org2MSP.PEER', 'Org3MSP.PEER')".into()
        )
    );
}

#[test]
fn deepest_signature_policy_reads_back() {
    // Encoding, decoding and rendering recurse once per policy group.
    std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(|| {
            let depth = stitch_policy::MAX_POLICY_DEPTH;
            let text = format!(
                "{}'Org1MSP.PEER', 'Org2MSP.PEER'{}",
                "AND(".repeat(depth),
                ")".repeat(depth)
            );
            let mut definition = LifecycleDefinition::new("basic", "1.0", 1);
            definition.validation = ValidationParameter::SignaturePolicy(text.as_str().into());

            let view = approve_round_trip(&definition);
            assert_eq!(view.validation_parameter, ValidationParameterView::SignaturePolicy(text));
        })
        .unwrap()
        .join()
        .unwrap();
}

#[test]
fn policy_reference_reads_back_unchanged() {
    let mut definition = LifecycleDefinition::new("basic", "1.0", 1);
    definition.validation = ValidationParameter::PolicyReference("/Channel/Application/Writers".into());
    let view = approve_round_trip(&definition);
    assert_eq!(
        view.validation_parameter,
        ValidationParameterView::PolicyReference("/Channel/Application/Writers".into())
    );
}

#[test]
fn channel_default_reads_back_as_endorsement_reference() {
    let view = approve_round_trip(&LifecycleDefinition::new("basic", "1.0", 1));
    assert_eq!(
        view.validation_parameter,
        ValidationParameterView::PolicyReference("/Channel/Application/Endorsement".into())
    );
    assert_eq!(view.endorsement_plugin, "escc");
    assert_eq!(view.validation_plugin, "vscc");
}

#[test]
fn collections_read_back_with_policies() {
    let mut definition = LifecycleDefinition::new("basic", "1.0", 2);
    let mut collection = CollectionConfig::new("assetCollection", "OR('Org1MSP.member', 'Org2MSP.member')");
    collection.required_peer_count = 1;
    collection.maximum_peer_count = 2;
    collection.endorsement_policy = Some(CollectionEndorsementPolicy {
        signature_policy: Some("OR('Org1MSP.peer')".into()),
        channel_config_policy_reference: None,
    });
    definition.collections.push(collection);

    let view = approve_round_trip(&definition);
    assert_eq!(view.collections.len(), 1);
    let collection = &view.collections[0];
    assert_eq!(collection.name, "assetCollection");
    assert_eq!(collection.member_orgs_policy, "OR('Org1MSP.MEMBER', 'Org2MSP.MEMBER')");
    assert_eq!(
        collection.endorsement_policy,
        ValidationParameterView::SignaturePolicy("AND('Org1MSP.PEER')".into())
    );
}

#[test]
fn collection_with_both_endorsement_fields_is_rejected() {
    let mut definition = LifecycleDefinition::new("basic", "1.0", 1);
    let mut collection = CollectionConfig::new("assetCollection", "OR('Org1MSP.member')");
    collection.endorsement_policy = Some(CollectionEndorsementPolicy {
        signature_policy: Some("OR('Org1MSP.peer')".into()),
        channel_config_policy_reference: Some("/Channel/Application/Endorsement".into()),
    });
    definition.collections.push(collection);

    let err = commit_args(&ProtocolConfig::default(), &definition).unwrap_err();
    let ProtocolError::Validation(errors) = err else {
        panic!("expected a validation error");
    };
    assert_eq!(errors.fields(), vec!["collections[0].endorsement_policy"]);
}

#[test]
fn definition_deserializes_from_json() {
    let definition: LifecycleDefinition = serde_json::from_value(serde_json::json!({
        "name": "basic",
        "version": "1.0",
        "sequence": 3,
        "initRequired": true,
        "validation": { "signaturePolicy": "AND('Org1MSP.member', 'Org2MSP.member')" }
    }))
    .unwrap();
    assert_eq!(definition.sequence, 3);
    assert!(definition.init_required);
    let view = approve_round_trip(&definition);
    assert_eq!(
        view.validation_parameter,
        ValidationParameterView::SignaturePolicy("AND('Org1MSP.MEMBER', 'Org2MSP.MEMBER')".into())
    );
}

#[tokio::test]
async fn commit_proposal_targets_lifecycle_chaincode() {
    let crypto = MockCryptoProvider::new();
    let identity = SigningIdentity::from_pem("Org1MSP", ORG1_USER_CERT, ORG1_USER_KEY).unwrap();
    let config = ProtocolConfig::default();
    let invocation = commit_args(&config, &LifecycleDefinition::new("basic", "1.0", 1)).unwrap();

    let signed = build_lifecycle_proposal(&crypto, &config, &identity, "mychannel", &invocation)
        .await
        .unwrap();
    let view = decode_signed_proposal(&signed.to_bytes()).unwrap();
    assert_eq!(view.chaincode_id, "_lifecycle");
    assert_eq!(view.channel_id, "mychannel");
    assert_eq!(view.args[0], b"CommitChaincodeDefinition");
    assert_eq!(view.args[1], invocation.args);
}
