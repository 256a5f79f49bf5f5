//! Reverse adjacency index: for every node, the edges that feed into it.
//!
//! Capability connections (`ai_languageModel`, `ai_tool`, ...) are keyed under
//! the sub-node that provides the capability, so "what feeds this agent" can
//! only be answered by walking the whole map and grouping by target.

use std::collections::HashMap;

use serde::Serialize;

use crate::parse::types::Workflow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseConnection {
    pub source_name: String,
    /// Port type the edge was authored under; equals the connection type.
    pub source_type: String,
    /// Output bucket of the source the edge leaves from.
    pub source_output: usize,
    /// Input index on the target.
    pub index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ReverseIndex {
    incoming: HashMap<String, Vec<ReverseConnection>>,
}

impl ReverseIndex {
    /// One pass over every edge. Edges with an empty source or target name
    /// are dropped without complaint.
    pub fn build(workflow: &Workflow) -> Self {
        let mut incoming: HashMap<String, Vec<ReverseConnection>> = HashMap::new();

        for (source_name, outputs) in &workflow.connections {
            if source_name.is_empty() {
                continue;
            }
            for (port_type, buckets) in outputs {
                for (output, bucket) in buckets.iter().enumerate() {
                    for target in bucket {
                        if target.node.is_empty() {
                            continue;
                        }
                        incoming
                            .entry(target.node.clone())
                            .or_default()
                            .push(ReverseConnection {
                                source_name: source_name.clone(),
                                source_type: port_type.clone(),
                                source_output: output,
                                index: target.index,
                            });
                    }
                }
            }
        }

        ReverseIndex { incoming }
    }

    /// Every incoming edge of `node_name`, any port type.
    pub fn incoming(&self, node_name: &str) -> &[ReverseConnection] {
        self.incoming
            .get(node_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Incoming edges of one port type, or all capability edges when
    /// `port_type` is `None`.
    pub fn connections_to(&self, node_name: &str, port_type: Option<&str>) -> Vec<&ReverseConnection> {
        self.incoming(node_name)
            .iter()
            .filter(|c| match port_type {
                Some(t) => c.source_type == t,
                None => super::is_ai_connection_type(&c.source_type),
            })
            .collect()
    }

    pub fn count(&self, node_name: &str, port_type: &str) -> usize {
        self.incoming(node_name)
            .iter()
            .filter(|c| c.source_type == port_type)
            .count()
    }

    pub fn has_incoming(&self, node_name: &str) -> bool {
        !self.incoming(node_name).is_empty()
    }

    /// Number of distinct target nodes in the index.
    pub fn len(&self) -> usize {
        self.incoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incoming.is_empty()
    }
}

/// Incoming edges of `node_name`; an absent index yields nothing.
pub fn connections_to(
    node_name: &str,
    index: Option<&ReverseIndex>,
    port_type: Option<&str>,
) -> Vec<ReverseConnection> {
    index
        .map(|idx| {
            idx.connections_to(node_name, port_type)
                .into_iter()
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}
