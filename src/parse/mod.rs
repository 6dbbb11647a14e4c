//! Parse phase: JSON → document model.

pub mod resolve;
pub mod types;

pub use types::*;

/// The document could not be deserialised.
#[derive(Debug, thiserror::Error)]
#[error("failed to parse configuration JSON: {0}")]
pub struct ParseError(#[from] pub serde_json::Error);

/// Deserialize a configuration JSON string into a `Document`.
pub fn parse(json: &str) -> Result<Document, ParseError> {
    Ok(serde_json::from_str::<Document>(json)?)
}
