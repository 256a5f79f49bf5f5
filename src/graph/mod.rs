//! Connection graph index over the raw connection map.

pub mod flow;
pub mod reverse;

pub use flow::FlowGraph;
pub use reverse::{ReverseConnection, ReverseIndex, connections_to};

use crate::parse::types::Workflow;

pub const AI_LANGUAGE_MODEL: &str = "ai_languageModel";
pub const AI_MEMORY: &str = "ai_memory";
pub const AI_TOOL: &str = "ai_tool";
pub const AI_EMBEDDING: &str = "ai_embedding";
pub const AI_VECTOR_STORE: &str = "ai_vectorStore";
pub const AI_DOCUMENT: &str = "ai_document";
pub const AI_TEXT_SPLITTER: &str = "ai_textSplitter";
pub const AI_OUTPUT_PARSER: &str = "ai_outputParser";

/// Capability port types, authored from the providing sub-node.
pub const AI_CONNECTION_TYPES: [&str; 8] = [
    AI_LANGUAGE_MODEL,
    AI_MEMORY,
    AI_TOOL,
    AI_EMBEDDING,
    AI_VECTOR_STORE,
    AI_DOCUMENT,
    AI_TEXT_SPLITTER,
    AI_OUTPUT_PARSER,
];

pub fn is_ai_connection_type(port_type: &str) -> bool {
    AI_CONNECTION_TYPES.contains(&port_type)
}

/// Free-function form of [`ReverseIndex::build`].
pub fn build_reverse_index(workflow: &Workflow) -> ReverseIndex {
    ReverseIndex::build(workflow)
}
