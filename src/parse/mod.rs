//! Parse phase: JSON → typed workflow.

pub mod types;

pub use types::*;

use crate::error::ValidationIssue;

/// Deserialize a workflow JSON string into a `Workflow` struct.
pub fn parse(json: &str) -> Result<Workflow, Vec<ValidationIssue>> {
    serde_json::from_str::<Workflow>(json).map_err(|e| {
        vec![ValidationIssue::error(
            "INVALID_JSON",
            format!("Failed to parse workflow JSON: {}", e),
        )]
    })
}

/// Deserialize an already-decoded JSON value.
pub fn from_value(value: serde_json::Value) -> Result<Workflow, Vec<ValidationIssue>> {
    serde_json::from_value::<Workflow>(value).map_err(|e| {
        vec![ValidationIssue::error(
            "INVALID_JSON",
            format!("Workflow does not match the expected shape: {}", e),
        )]
    })
}
