//! Output formatting utilities

use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

/// What a command prints on success.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// A line of text
    Text(String),
    /// Pretty-printed JSON
    Json(serde_json::Value),
    /// Wire bytes, printed as base64
    Bytes(Vec<u8>),
}

impl Output {
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Output::Json(serde_json::to_value(value)?))
    }

    pub fn render(&self) -> Result<String> {
        Ok(match self {
            Output::Text(text) => text.clone(),
            Output::Json(value) => serde_json::to_string_pretty(value)?,
            Output::Bytes(bytes) => STANDARD.encode(bytes),
        })
    }
}

/// Decode base64 input, tolerating surrounding whitespace.
pub fn decode_base64(input: &str) -> Result<Vec<u8>> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}
