//! petgraph view of the `main` data-flow edges, used for cycle detection.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::normalize::short_name;
use crate::parse::types::{MAIN_PORT, Workflow};

/// Node types whose purpose is to loop back on themselves.
const LOOP_NODE_TYPES: &[&str] = &["splitInBatches"];

pub struct FlowGraph {
    pub graph: DiGraph<String, usize>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl FlowGraph {
    /// Build over existing nodes only; edges naming unknown nodes are left
    /// to the structural validator.
    pub fn build(workflow: &Workflow) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for node in &workflow.nodes {
            if node.name.is_empty() || node_indices.contains_key(&node.name) {
                continue;
            }
            let idx = graph.add_node(node.name.clone());
            node_indices.insert(node.name.clone(), idx);
        }

        for (source, outputs) in &workflow.connections {
            let Some(&s) = node_indices.get(source) else {
                continue;
            };
            let Some(buckets) = outputs.get(MAIN_PORT) else {
                continue;
            };
            for (output, bucket) in buckets.iter().enumerate() {
                for target in bucket {
                    if let Some(&t) = node_indices.get(&target.node) {
                        graph.add_edge(s, t, output);
                    }
                }
            }
        }

        FlowGraph {
            graph,
            node_indices,
        }
    }

    /// Strongly connected groups of nodes that form a cycle and contain no
    /// loop node. Each group is sorted by name.
    pub fn cycles(&self, workflow: &Workflow) -> Vec<Vec<String>> {
        let is_loop_node = |name: &str| {
            workflow
                .node_by_name(name)
                .is_some_and(|n| LOOP_NODE_TYPES.contains(&short_name(&n.node_type)))
        };

        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1
                    || scc
                        .first()
                        .is_some_and(|&n| self.graph.find_edge(n, n).is_some())
            })
            .map(|scc| {
                let mut names: Vec<String> =
                    scc.into_iter().map(|n| self.graph[n].clone()).collect();
                names.sort();
                names
            })
            .filter(|names| !names.iter().any(|n| is_loop_node(n)))
            .collect();

        cycles.sort();
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workflow(connections: serde_json::Value) -> Workflow {
        serde_json::from_value(json!({
            "nodes": [
                { "name": "A", "type": "nodes-base.set" },
                { "name": "B", "type": "nodes-base.set" },
                { "name": "C", "type": "nodes-base.splitInBatches" }
            ],
            "connections": connections
        }))
        .unwrap()
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let wf = workflow(json!({ "A": { "main": [[{ "node": "A" }]] } }));
        assert_eq!(FlowGraph::build(&wf).cycles(&wf), vec![vec!["A".to_string()]]);
    }

    #[test]
    fn loop_node_breaks_the_cycle() {
        let wf = workflow(json!({
            "C": { "main": [[], [{ "node": "B" }]] },
            "B": { "main": [[{ "node": "C" }]] }
        }));
        assert!(FlowGraph::build(&wf).cycles(&wf).is_empty());
    }

    #[test]
    fn capability_edges_are_ignored() {
        let wf = workflow(json!({
            "A": { "ai_tool": [[{ "node": "B", "type": "ai_tool" }]] },
            "B": { "main": [[{ "node": "A" }]] }
        }));
        let flow = FlowGraph::build(&wf);
        assert_eq!(flow.graph.edge_count(), 1);
        assert!(flow.cycles(&wf).is_empty());
    }
}
