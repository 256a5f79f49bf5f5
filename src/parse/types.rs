//! Rust types for the workflow graph JSON.
//!
//! Unknown top-level and per-node fields are carried through `extra` so a
//! patched workflow serializes back with everything the caller sent.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

pub type Parameters = Map<String, Value>;

/// `connections[sourceName][portType][outputIndex]` -> edges leaving that port.
pub type Connections = IndexMap<String, NodeOutputs>;
pub type NodeOutputs = IndexMap<String, Vec<OutputBucket>>;
pub type OutputBucket = Vec<ConnectionTarget>;

pub const MAIN_PORT: &str = "main";

// =============================================================================
// TOP-LEVEL WORKFLOW
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default, deserialize_with = "deserialize_connections")]
    pub connections: Connections,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Workflow {
    pub fn node_by_name(&self, name: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn node_by_id(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| !n.id.is_empty() && n.id == id)
    }

    /// Resolve a caller-supplied reference, trying the name first and the id second.
    pub fn find_node(&self, reference: &str) -> Option<&WorkflowNode> {
        self.node_by_name(reference)
            .or_else(|| self.node_by_id(reference))
    }

    pub fn node_index(&self, reference: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.name == reference)
            .or_else(|| {
                self.nodes
                    .iter()
                    .position(|n| !n.id.is_empty() && n.id == reference)
            })
    }

    /// Output buckets of `source` for the given port type.
    pub fn outputs(&self, source: &str, port_type: &str) -> Option<&Vec<OutputBucket>> {
        self.connections.get(source).and_then(|o| o.get(port_type))
    }

    pub fn main_outputs(&self, source: &str) -> Option<&Vec<OutputBucket>> {
        self.outputs(source, MAIN_PORT)
    }

    /// True when any `main` output bucket of `source` has at least one edge.
    pub fn has_main_output(&self, source: &str) -> bool {
        self.main_outputs(source)
            .is_some_and(|buckets| buckets.iter().flatten().any(|t| !t.node.is_empty()))
    }

    /// Total number of edges in the connection map, malformed ones included.
    pub fn edge_count(&self) -> usize {
        self.connections
            .values()
            .flat_map(|outputs| outputs.values())
            .flat_map(|buckets| buckets.iter())
            .map(Vec::len)
            .sum()
    }
}

// =============================================================================
// NODES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OnError {
    ContinueRegularOutput,
    ContinueErrorOutput,
    StopWorkflow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_version: Option<Number>,
    #[serde(default)]
    pub position: [f64; 2],
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<OnError>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl WorkflowNode {
    pub fn type_version(&self) -> Option<f64> {
        self.type_version.as_ref().and_then(Number::as_f64)
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(Value::as_str)
    }

    /// A string parameter that is present and not just whitespace.
    pub fn param_non_empty(&self, key: &str) -> Option<&str> {
        self.param_str(key).filter(|s| !s.trim().is_empty())
    }

    pub fn param_is_true(&self, key: &str) -> bool {
        self.param(key).and_then(Value::as_bool) == Some(true)
    }

    /// Lookup inside the `options` collection parameter.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.param("options")
            .and_then(Value::as_object)
            .and_then(|o| o.get(key))
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.as_ref().is_some_and(|c| !c.is_empty())
    }

    pub fn has_credential(&self, key: &str) -> bool {
        self.credentials
            .as_ref()
            .is_some_and(|c| c.contains_key(key))
    }
}

// =============================================================================
// CONNECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    pub node: String,
    #[serde(rename = "type", default = "main_port")]
    pub port_type: String,
    #[serde(default)]
    pub index: usize,
}

fn main_port() -> String {
    MAIN_PORT.to_string()
}

impl ConnectionTarget {
    pub fn new(node: impl Into<String>, port_type: impl Into<String>, index: usize) -> Self {
        ConnectionTarget {
            node: node.into(),
            port_type: port_type.into(),
            index,
        }
    }

    /// Decode one raw edge. Anything that is not an object with a string
    /// `node` yields an empty-named target, which the index skips.
    pub fn from_value(value: &Value) -> Self {
        let obj = value.as_object();
        let field = |key: &str| obj.and_then(|o| o.get(key));
        ConnectionTarget {
            node: field("node")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            port_type: field("type")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(main_port),
            index: field("index")
                .and_then(Value::as_u64)
                .and_then(|i| usize::try_from(i).ok())
                .unwrap_or(0),
        }
    }
}

/// Lenient decoding of the raw connection map: null buckets become empty,
/// malformed edges become empty-named targets, non-array ports are dropped.
fn deserialize_connections<'de, D>(deserializer: D) -> Result<Connections, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut connections = Connections::new();

    for (source, outputs) in raw {
        let Some(outputs) = outputs.as_object() else {
            continue;
        };
        let mut node_outputs = NodeOutputs::new();
        for (port_type, buckets) in outputs {
            let Some(buckets) = buckets.as_array() else {
                continue;
            };
            let decoded = buckets
                .iter()
                .map(|bucket| match bucket.as_array() {
                    Some(edges) => edges.iter().map(ConnectionTarget::from_value).collect(),
                    None => Vec::new(),
                })
                .collect();
            node_outputs.insert(port_type.clone(), decoded);
        }
        connections.insert(source, node_outputs);
    }

    Ok(connections)
}
