//! Stitch Policy - the endorsement policy engine.
//!
//! Three notations describe the same signature policy:
//!
//! - **Compact**: `AND('Org1MSP.member', OutOf(1, 'Org2MSP.peer', 'Org3MSP.peer'))`
//! - **Legacy**: `{ identities: [{ role: { name, mspId } }], policy: { "2-of": [...] } }`
//! - **Canonical**: [`CanonicalPolicy`], the wire shape used internally
//!
//! [`normalize`] turns any of them into a validated [`CanonicalPolicy`],
//! [`to_compact_string`] renders one back for humans, and [`evaluate`]
//! checks it against a set of approvals. Every entry point bounds nesting at
//! [`MAX_POLICY_DEPTH`] before it recurses.
//!
//! ```
//! use stitch_policy::{evaluate, normalize, ApprovalSet};
//!
//! let policy = normalize(&"OR('Org1MSP.member', 'Org2MSP.member')".into()).unwrap();
//! let approvals = ApprovalSet::from_pairs([("Org1MSP.admin", true)]);
//! assert!(evaluate(&policy, &approvals).unwrap());
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod evaluate;
pub mod implicit_meta;
pub mod input;
pub mod json;
pub mod legacy;
pub mod parser;
pub mod render;
pub mod types;
pub mod wire;

pub use error::PolicyError;
pub use evaluate::{evaluate, ApprovalSet};
pub use implicit_meta::{parse_implicit_meta, ImplicitMetaRule, ImplicitMetaSpec};
pub use input::{detect_kind, normalize, PolicyInput, PolicyKind, PolicySpec};
pub use legacy::{LegacyIdentity, LegacyPolicy, LegacyRole};
pub use parser::parse_compact;
pub use render::to_compact_string;
pub use types::{
    CanonicalPolicy, Classification, Identity, MspRole, RolePrincipal, Rule, MAX_POLICY_DEPTH,
};
pub use wire::{decode_envelope, encode_envelope};
