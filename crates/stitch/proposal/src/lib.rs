//! Stitch Proposal - Fabric transaction message builders.
//!
//! Builds the signed messages a Fabric client sends and decodes what comes
//! back:
//!
//! - endorsement proposals for chaincode invocation
//! - deliver seek envelopes for block retrieval
//! - commit transactions from endorsed proposals
//! - config-update envelopes and signatures
//! - `_lifecycle` calls for install, approve, readiness and commit
//!
//! All signing and hashing goes through a [`stitch_crypto::CryptoProvider`].
//! Every builder validates its whole request first and reports all bad
//! fields at once, before any cryptographic call is made.

#![deny(unsafe_code)]

pub mod chaincode;
pub mod collection;
pub mod commit;
pub mod config;
pub mod config_update;
pub mod decode;
pub mod endorsement;
pub mod error;
pub mod header;
pub mod identity;
pub mod lifecycle;
pub mod seek;

pub use chaincode::{build_chaincode_input, build_chaincode_spec, ChaincodeType};
pub use collection::{build_collection_package, CollectionConfig, CollectionEndorsementPolicy};
pub use commit::{
    build_signed_commit_transaction, proposal_hash, strip_transient, SignedTransaction, TransientMode,
    STATUS_SUCCESS,
};
pub use config::ProtocolConfig;
pub use config_update::{build_signed_config_update_envelope, sign_config_update};
pub use decode::{
    decode_chaincode_definition, decode_chaincode_definitions, decode_commit_envelope, decode_commit_readiness,
    decode_install_result, decode_installed_chaincodes, decode_response_payload, decode_signed_proposal,
    ChaincodeDefinitionView, ChaincodeReference, CollectionView, InstalledChaincode, ProposalView,
    TransactionView, ValidationParameterView,
};
pub use endorsement::{
    build_signed_endorsement_proposal, build_signed_endorsement_proposal_with_nonce, EndorsementRequest,
    SignedEndorsementProposal,
};
pub use error::{FieldViolation, ProtocolError, ValidationErrors};
pub use header::{build_channel_header, build_header, now_timestamp, ChannelHeaderSpec, TxContext};
pub use identity::SigningIdentity;
pub use lifecycle::{
    approve_args, build_lifecycle_proposal, check_readiness_args, commit_args, common_args, install_args,
    query_definition_args, query_definitions_args, query_installed_args, CommonArgs, InvocationScope,
    LifecycleDefinition, LifecycleInvocation, PackageSource, ValidationParameter,
};
pub use seek::{build_signed_seek_envelope, SeekBehavior, SeekRequest, SeekTarget, SignedEnvelope};
