//! Stitch Protos - Fabric wire messages.
//!
//! Hand-checked prost definitions for the subset of the Fabric protobuf
//! schema the client core builds and parses. Field numbers follow
//! fabric-protos v2; map fields are ordered so encoded bytes are stable.

#![deny(unsafe_code)]

pub mod common {
    include!("generated/common.rs");
}

pub mod msp {
    include!("generated/msp.rs");
}

pub mod orderer {
    include!("generated/orderer.rs");
}

pub mod peer {
    include!("generated/peer.rs");
}

pub mod lifecycle {
    include!("generated/lifecycle.rs");
}

use prost::encoding::{decode_key, decode_varint, WireType};

pub use prost::{DecodeError, Message};
pub use prost_types::Timestamp;

/// Deepest message nesting [`decode`] accepts.
///
/// A signature policy costs two levels per `NOutOf` group, so this leaves
/// room for a 1000-level policy inside the deepest Fabric wrapper
/// (signed proposal, invocation spec, lifecycle args, application policy).
pub const MAX_MESSAGE_DEPTH: usize = 2_200;

/// Encode a message to its protobuf bytes.
pub fn encode<M: Message>(message: &M) -> Vec<u8> {
    message.encode_to_vec()
}

/// Decode protobuf bytes into a typed message.
///
/// prost decodes nested messages recursively, so the nesting is measured
/// first with [`check_nesting`].
pub fn decode<M: Message + Default>(bytes: &[u8]) -> Result<M, DecodeError> {
    check_nesting(bytes, MAX_MESSAGE_DEPTH)?;
    M::decode(bytes)
}

/// Reject wire bytes nested deeper than `limit`, without recursing.
///
/// Every length-delimited field that parses as a message counts as a level,
/// so opaque `bytes` fields can only make the measured depth larger.
pub fn check_nesting(bytes: &[u8], limit: usize) -> Result<(), DecodeError> {
    let mut stack = vec![(bytes, 0usize)];
    while let Some((buf, depth)) = stack.pop() {
        let Some(children) = nested_fields(buf) else {
            continue;
        };
        if children.is_empty() {
            continue;
        }
        if depth >= limit {
            return Err(DecodeError::new(format!(
                "message nesting exceeds {limit} levels"
            )));
        }
        stack.extend(children.into_iter().map(|child| (child, depth + 1)));
    }
    Ok(())
}

/// Length-delimited field bodies of `buf`, or `None` if it is not a message.
fn nested_fields(mut buf: &[u8]) -> Option<Vec<&[u8]>> {
    let mut children = Vec::new();
    while !buf.is_empty() {
        let (_, wire_type) = decode_key(&mut buf).ok()?;
        let skip = match wire_type {
            WireType::Varint => {
                decode_varint(&mut buf).ok()?;
                0
            }
            WireType::SixtyFourBit => 8,
            WireType::ThirtyTwoBit => 4,
            WireType::LengthDelimited => {
                let len = usize::try_from(decode_varint(&mut buf).ok()?).ok()?;
                children.push(buf.get(..len)?);
                len
            }
            WireType::StartGroup | WireType::EndGroup => return None,
        };
        buf = buf.get(skip..)?;
    }
    Some(children)
}
