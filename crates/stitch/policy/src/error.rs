use thiserror::Error;

/// Policy syntax and structure errors.
///
/// Every variant describes a malformed policy. A well-formed policy that is
/// simply not satisfied is `Ok(false)` from the evaluator, never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Unrecognised policy syntax: {0}")]
    UnknownSyntax(String),

    #[error("Policy is empty")]
    Empty,

    #[error("Unbalanced parentheses at offset {0}")]
    UnbalancedParentheses(usize),

    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("Unknown policy keyword: {0}")]
    UnknownKeyword(String),

    #[error("Unknown MSP role: {0}")]
    UnknownRole(String),

    #[error("Invalid principal '{0}', expected '<mspId>.<role>'")]
    InvalidPrincipal(String),

    #[error("Invalid OutOf count: {0}")]
    InvalidOutOfCount(String),

    #[error("OutOf count {n} is outside 1..={available}")]
    OutOfRange { n: u32, available: usize },

    #[error("signed-by index {index} out of range ({identities} identities)")]
    SignedByOutOfRange { index: u32, identities: usize },

    #[error("Policy nesting exceeds {limit} levels")]
    TooDeep { limit: usize },

    #[error("Policy group has no rules")]
    EmptyRuleSet,

    #[error("Invalid legacy policy key: {0}")]
    InvalidLegacyKey(String),

    #[error("Invalid policy JSON: {0}")]
    Json(String),

    #[error("Failed to decode policy: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for PolicyError {
    fn from(e: serde_json::Error) -> Self {
        PolicyError::Json(e.to_string())
    }
}

impl From<stitch_protos::DecodeError> for PolicyError {
    fn from(e: stitch_protos::DecodeError) -> Self {
        PolicyError::Decode(e.to_string())
    }
}
