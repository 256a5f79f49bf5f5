//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Maximum diff operations accepted in one request.
pub const MAX_OPERATIONS: usize = 5;
/// Highest output bucket a diff may connect from. Switch nodes top out well below.
pub const MAX_OUTPUT_INDEX: usize = 255;
/// Agent `maxIterations` above this yields a warning.
pub const MAX_ITERATIONS_WARNING_THRESHOLD: f64 = 50.0;
pub const MIN_SYSTEM_MESSAGE_LENGTH: usize = 20;
pub const MIN_TOOL_DESCRIPTION_LENGTH: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub max_operations: usize,
    pub max_iterations_warning: f64,
    pub min_system_message_length: usize,
    pub min_tool_description_length: usize,
    pub validate_nodes: bool,
    pub validate_connections: bool,
    pub validate_expressions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_operations: MAX_OPERATIONS,
            max_iterations_warning: MAX_ITERATIONS_WARNING_THRESHOLD,
            min_system_message_length: MIN_SYSTEM_MESSAGE_LENGTH,
            min_tool_description_length: MIN_TOOL_DESCRIPTION_LENGTH,
            validate_nodes: true,
            validate_connections: true,
            validate_expressions: true,
        }
    }
}

impl EngineConfig {
    /// Parse a partial JSON config; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
