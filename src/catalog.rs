//! Node type catalog: pre-computed capability metadata supplied by the host.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::normalize::normalize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    pub node_type: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_versioned: bool,
    #[serde(default)]
    pub latest_version: Option<f64>,
    /// Declared `main` input count, when fixed.
    #[serde(default)]
    pub inputs: Option<usize>,
    /// Declared `main` output count, when fixed.
    #[serde(default)]
    pub outputs: Option<usize>,
    #[serde(default)]
    pub is_trigger: bool,
    #[serde(default)]
    pub is_ai_tool: bool,
}

/// Synchronous lookup of node metadata by (normalized) type.
pub trait NodeCatalog {
    fn descriptor(&self, node_type: &str) -> Option<&NodeDescriptor>;
}

/// In-memory catalog keyed by canonical node type.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<String, NodeDescriptor>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_descriptors(descriptors: impl IntoIterator<Item = NodeDescriptor>) -> Self {
        let mut catalog = Self::new();
        for d in descriptors {
            catalog.insert(d);
        }
        catalog
    }

    /// Build from a JSON array of descriptors.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let descriptors: Vec<NodeDescriptor> = serde_json::from_str(json)?;
        Ok(Self::from_descriptors(descriptors))
    }

    pub fn insert(&mut self, mut descriptor: NodeDescriptor) {
        descriptor.node_type = normalize(&descriptor.node_type);
        self.entries.insert(descriptor.node_type.clone(), descriptor);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl NodeCatalog for StaticCatalog {
    fn descriptor(&self, node_type: &str) -> Option<&NodeDescriptor> {
        self.entries
            .get(node_type)
            .or_else(|| self.entries.get(&normalize(node_type)))
    }
}
