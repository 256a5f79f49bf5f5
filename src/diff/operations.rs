//! Edit operations accepted by the diff engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::parse::types::WorkflowNode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    // Node operations (first pass)
    AddNode(AddNodeOp),
    RemoveNode(NodeRef),
    UpdateNode(UpdateNodeOp),
    MoveNode(MoveNodeOp),
    EnableNode(NodeRef),
    DisableNode(NodeRef),

    // Everything else (second pass)
    AddConnection(AddConnectionOp),
    RemoveConnection(RemoveConnectionOp),
    RewireConnection(RewireConnectionOp),
    CleanStaleConnections(CleanStaleConnectionsOp),
    UpdateSettings(UpdateSettingsOp),
    UpdateMetadata(UpdateMetadataOp),
    AddTag(TagOp),
    RemoveTag(TagOp),
}

impl Operation {
    /// Node-shaped operations run before connection and metadata operations.
    pub fn is_node_operation(&self) -> bool {
        matches!(
            self,
            Operation::AddNode(_)
                | Operation::RemoveNode(_)
                | Operation::UpdateNode(_)
                | Operation::MoveNode(_)
                | Operation::EnableNode(_)
                | Operation::DisableNode(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Operation::AddNode(_) => "addNode",
            Operation::RemoveNode(_) => "removeNode",
            Operation::UpdateNode(_) => "updateNode",
            Operation::MoveNode(_) => "moveNode",
            Operation::EnableNode(_) => "enableNode",
            Operation::DisableNode(_) => "disableNode",
            Operation::AddConnection(_) => "addConnection",
            Operation::RemoveConnection(_) => "removeConnection",
            Operation::RewireConnection(_) => "rewireConnection",
            Operation::CleanStaleConnections(_) => "cleanStaleConnections",
            Operation::UpdateSettings(_) => "updateSettings",
            Operation::UpdateMetadata(_) => "updateMetadata",
            Operation::AddTag(_) => "addTag",
            Operation::RemoveTag(_) => "removeTag",
        }
    }
}

/// A node addressed by id or by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
}

impl NodeRef {
    pub fn by_name(name: impl Into<String>) -> Self {
        NodeRef {
            node_id: None,
            node_name: Some(name.into()),
        }
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        NodeRef {
            node_id: Some(id.into()),
            node_name: None,
        }
    }

    /// Human-readable form for error messages.
    pub fn describe(&self) -> String {
        self.node_id
            .as_deref()
            .or(self.node_name.as_deref())
            .unwrap_or("<unspecified>")
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddNodeOp {
    pub node: WorkflowNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateNodeOp {
    #[serde(flatten)]
    pub target: NodeRef,
    /// Dot-path → new value; `null` removes the field.
    pub updates: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveNodeOp {
    #[serde(flatten)]
    pub target: NodeRef,
    pub position: [f64; 2],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddConnectionOp {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_index: Option<usize>,
    /// `"true"` / `"false"` output of an IF node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Output number of a Switch node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveConnectionOp {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_input: Option<String>,
    /// When absent, the edge is removed from whichever output holds it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_index: Option<usize>,
    #[serde(default)]
    pub ignore_errors: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewireConnectionOp {
    pub source: String,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanStaleConnectionsOp {
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateSettingsOp {
    pub settings: Map<String, Value>,
}

/// Top-level workflow fields such as `name`, `description` or `tags`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateMetadataOp {
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagOp {
    pub tag: String,
}
