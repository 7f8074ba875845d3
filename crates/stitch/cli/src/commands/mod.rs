//! CLI command implementations

pub mod lifecycle;
pub mod policy;
pub mod proposal;
