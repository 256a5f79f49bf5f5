//! Diagnostic types shared by every validation and patch phase.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parse::types::WorkflowNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A single finding produced by validation or by a failed patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.code.as_deref().unwrap_or("-");
        match &self.node_name {
            Some(name) => write!(
                f,
                "[{}:{}] {} (node '{}')",
                self.severity, code, self.message, name
            ),
            None => write!(f, "[{}:{}] {}", self.severity, code, self.message),
        }
    }
}

impl ValidationIssue {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, Some(code), message)
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, Some(code), message)
    }

    pub fn info(code: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, Some(code), message)
    }

    /// Guidance without a machine-readable code.
    pub fn advice(severity: Severity, message: impl Into<String>) -> Self {
        Self::new(severity, None, message)
    }

    fn new(severity: Severity, code: Option<&str>, message: impl Into<String>) -> Self {
        ValidationIssue {
            severity,
            node_id: None,
            node_name: None,
            message: message.into(),
            code: code.map(str::to_string),
        }
    }

    /// Attach the node the issue was found on.
    pub fn for_node(mut self, node: &WorkflowNode) -> Self {
        if !node.id.is_empty() {
            self.node_id = Some(node.id.clone());
        }
        self.node_name = Some(node.name.clone());
        self
    }

    /// Attach a node by name only, for findings on connection keys that may
    /// not resolve to a node.
    pub fn for_node_name(mut self, name: impl Into<String>) -> Self {
        self.node_name = Some(name.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

/// Failure of a single diff operation. Converted into an error-severity
/// [`ValidationIssue`] before it reaches the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiffError {
    #[error("Too many operations: {count} exceeds the limit of {limit} per request")]
    TooManyOperations { count: usize, limit: usize },

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node with name \"{0}\" already exists")]
    DuplicateNodeName(String),

    #[error("Invalid node type \"{0}\". Must include a package prefix (e.g. \"n8n-nodes-base.webhook\")")]
    InvalidNodeType(String),

    #[error("Node is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Source node not found: {0}")]
    SourceNotFound(String),

    #[error("Target node not found: {0}")]
    TargetNotFound(String),

    #[error("Connection already exists from \"{from}\" to \"{target}\"")]
    ConnectionExists { from: String, target: String },

    #[error("No connection found from \"{from}\" to \"{target}\"")]
    ConnectionNotFound { from: String, target: String },

    #[error("Invalid update path '{0}'")]
    InvalidUpdatePath(String),

    #[error("Invalid value for '{path}': {reason}")]
    InvalidValue { path: String, reason: String },
}

impl DiffError {
    pub fn code(&self) -> &'static str {
        match self {
            DiffError::TooManyOperations { .. } => "TOO_MANY_OPERATIONS",
            DiffError::NodeNotFound(_) => "NODE_NOT_FOUND",
            DiffError::DuplicateNodeName(_) => "DUPLICATE_NODE_NAME",
            DiffError::InvalidNodeType(_) => "INVALID_NODE_TYPE",
            DiffError::MissingField(_) => "MISSING_FIELD",
            DiffError::SourceNotFound(_) => "SOURCE_NODE_NOT_FOUND",
            DiffError::TargetNotFound(_) => "TARGET_NODE_NOT_FOUND",
            DiffError::ConnectionExists { .. } => "CONNECTION_EXISTS",
            DiffError::ConnectionNotFound { .. } => "CONNECTION_NOT_FOUND",
            DiffError::InvalidUpdatePath(_) => "INVALID_UPDATE_PATH",
            DiffError::InvalidValue { .. } => "INVALID_VALUE",
        }
    }
}

impl From<DiffError> for ValidationIssue {
    fn from(e: DiffError) -> Self {
        ValidationIssue::error(e.code(), e.to_string())
    }
}
