//! Graph-level structural validation, independent of node class.

use std::collections::HashSet;

use crate::catalog::NodeCatalog;
use crate::error::ValidationIssue;
use crate::graph::{FlowGraph, ReverseIndex};
use crate::normalize::short_name;
use crate::parse::types::{MAIN_PORT, OnError, OutputBucket, Workflow, WorkflowNode};

const STICKY_NOTE: &str = "stickyNote";

/// Catalog flag first, then the naming convention of trigger node types.
pub fn is_trigger(node: &WorkflowNode, catalog: &dyn NodeCatalog) -> bool {
    if let Some(descriptor) = catalog.descriptor(&node.node_type) {
        if descriptor.is_trigger {
            return true;
        }
    }
    let name = short_name(&node.node_type).to_lowercase();
    name.ends_with("trigger") || name == "webhook"
}

fn is_sticky_note(node: &WorkflowNode) -> bool {
    short_name(&node.node_type) == STICKY_NOTE
}

// ---------------------------------------------------------------------------
// Node identity
// ---------------------------------------------------------------------------

pub fn validate_nodes_structure(
    workflow: &Workflow,
    catalog: &dyn NodeCatalog,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if workflow.nodes.is_empty() {
        issues.push(ValidationIssue::error(
            "EMPTY_WORKFLOW",
            "Workflow has no nodes. Add at least one node to create a valid workflow.",
        ));
        return issues;
    }

    let mut names = HashSet::new();
    let mut ids = HashSet::new();
    for node in &workflow.nodes {
        if node.name.trim().is_empty() {
            issues.push(
                ValidationIssue::error("MISSING_NODE_NAME", "Node has no name")
                    .for_node(node),
            );
        } else if !names.insert(node.name.as_str()) {
            issues.push(
                ValidationIssue::error(
                    "DUPLICATE_NODE_NAME",
                    format!("Duplicate node name: \"{}\"", node.name),
                )
                .for_node(node),
            );
        }

        if !node.id.is_empty() && !ids.insert(node.id.as_str()) {
            issues.push(
                ValidationIssue::error(
                    "DUPLICATE_NODE_ID",
                    format!("Duplicate node ID: \"{}\"", node.id),
                )
                .for_node(node),
            );
        }

        if node.node_type.trim().is_empty() {
            issues.push(
                ValidationIssue::error("MISSING_NODE_TYPE", "Node has no type")
                    .for_node(node),
            );
        }
    }

    let has_trigger = workflow
        .nodes
        .iter()
        .any(|n| !n.disabled && is_trigger(n, catalog));
    let only_notes = workflow.nodes.iter().all(is_sticky_note);
    if !has_trigger && !only_notes {
        issues.push(ValidationIssue::warning(
            "NO_TRIGGER",
            "Workflow has no trigger nodes. It can only be executed manually or as a sub-workflow.",
        ));
    }

    issues
}

// ---------------------------------------------------------------------------
// Catalog lookups: existence and versioning
// ---------------------------------------------------------------------------

pub fn validate_node_catalog(workflow: &Workflow, catalog: &dyn NodeCatalog) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for node in workflow.nodes.iter().filter(|n| !n.disabled) {
        if node.node_type.trim().is_empty() || is_sticky_note(node) {
            continue;
        }

        let Some(descriptor) = catalog.descriptor(&node.node_type) else {
            issues.push(
                ValidationIssue::warning(
                    "UNKNOWN_NODE_TYPE",
                    format!(
                        "Unknown node type: \"{}\". Node-specific checks that depend on the catalog were skipped.",
                        node.node_type
                    ),
                )
                .for_node(node),
            );
            continue;
        };

        if !descriptor.is_versioned {
            continue;
        }

        match (node.type_version(), descriptor.latest_version) {
            (None, _) => issues.push(
                ValidationIssue::error(
                    "MISSING_TYPE_VERSION",
                    format!(
                        "Missing required property 'typeVersion'. Node type {} is versioned.",
                        node.node_type
                    ),
                )
                .for_node(node),
            ),
            (Some(version), Some(latest)) if version > latest => issues.push(
                ValidationIssue::error(
                    "INVALID_TYPE_VERSION",
                    format!(
                        "typeVersion {} exceeds maximum supported version {}",
                        version, latest
                    ),
                )
                .for_node(node),
            ),
            (Some(version), Some(latest)) if version < latest => issues.push(
                ValidationIssue::warning(
                    "OUTDATED_TYPE_VERSION",
                    format!("Outdated typeVersion: {}. Latest is {}", version, latest),
                )
                .for_node(node),
            ),
            _ => {}
        }
    }

    issues
}

// ---------------------------------------------------------------------------
// Connections: references, ports, duplicates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionCounts {
    pub valid: usize,
    pub invalid: usize,
}

pub fn validate_connections(
    workflow: &Workflow,
    catalog: &dyn NodeCatalog,
    issues: &mut Vec<ValidationIssue>,
) -> ConnectionCounts {
    let mut counts = ConnectionCounts::default();
    let mut seen = HashSet::new();

    for (source, outputs) in &workflow.connections {
        let source_node = workflow.node_by_name(source);
        if source_node.is_none() {
            counts.invalid += 1;
            issues.push(unknown_node_issue(workflow, source, "UNKNOWN_SOURCE_NODE", || {
                format!("Connection from non-existent node: \"{}\"", source)
            }));
        }

        for (port_type, buckets) in outputs {
            if port_type == MAIN_PORT {
                if let Some(node) = source_node {
                    check_output_count(node, buckets, catalog, issues);
                }
            }

            for (output, bucket) in buckets.iter().enumerate() {
                for target in bucket {
                    if target.node.is_empty() {
                        counts.invalid += 1;
                        issues.push(
                            ValidationIssue::warning(
                                "MALFORMED_CONNECTION",
                                format!(
                                    "Connection from \"{}\" ({}[{}]) has an entry without a target node name",
                                    source, port_type, output
                                ),
                            )
                            .for_node_name(source.as_str()),
                        );
                        continue;
                    }

                    let Some(target_node) = workflow.node_by_name(&target.node) else {
                        counts.invalid += 1;
                        issues.push(
                            unknown_node_issue(workflow, &target.node, "UNKNOWN_TARGET_NODE", || {
                                format!(
                                    "Connection to non-existent node: \"{}\" from \"{}\"",
                                    target.node, source
                                )
                            })
                            .for_node_name(source.as_str()),
                        );
                        continue;
                    };

                    if source_node.is_some() {
                        counts.valid += 1;
                    }

                    if target.port_type == MAIN_PORT {
                        if let Some(inputs) = catalog
                            .descriptor(&target_node.node_type)
                            .and_then(|d| d.inputs)
                        {
                            if target.index >= inputs {
                                issues.push(
                                    ValidationIssue::error(
                                        "INVALID_INPUT_INDEX",
                                        format!(
                                            "Connection from \"{}\" targets input {} of \"{}\", which only has {} input(s)",
                                            source, target.index, target.node, inputs
                                        ),
                                    )
                                    .for_node(target_node),
                                );
                            }
                        }
                    }

                    let key = (
                        source.as_str(),
                        port_type.as_str(),
                        output,
                        target.node.as_str(),
                        target.port_type.as_str(),
                        target.index,
                    );
                    if !seen.insert(key) {
                        issues.push(
                            ValidationIssue::warning(
                                "DUPLICATE_CONNECTION",
                                format!(
                                    "Duplicate connection from \"{}\" ({}[{}]) to \"{}\"",
                                    source, port_type, output, target.node
                                ),
                            )
                            .for_node_name(source.as_str()),
                        );
                    }
                }
            }
        }
    }

    counts
}

/// A reference that names no node. When it matches a node id the message
/// says so, since connections must use names.
fn unknown_node_issue(
    workflow: &Workflow,
    reference: &str,
    code: &str,
    message: impl FnOnce() -> String,
) -> ValidationIssue {
    match workflow.node_by_id(reference) {
        Some(node) => ValidationIssue::error(
            "CONNECTION_USES_NODE_ID",
            format!(
                "Connection uses node ID \"{}\" instead of node name \"{}\". Connections must reference nodes by name.",
                reference, node.name
            ),
        ),
        None => ValidationIssue::error(code, message()),
    }
}

fn check_output_count(
    node: &WorkflowNode,
    buckets: &[OutputBucket],
    catalog: &dyn NodeCatalog,
    issues: &mut Vec<ValidationIssue>,
) {
    let Some(declared) = catalog
        .descriptor(&node.node_type)
        .and_then(|d| d.outputs)
    else {
        return;
    };
    let allowed = if node.on_error == Some(OnError::ContinueErrorOutput) {
        declared + 1
    } else {
        declared
    };

    for output in allowed..buckets.len() {
        if buckets[output].iter().any(|t| !t.node.is_empty()) {
            issues.push(
                ValidationIssue::error(
                    "INVALID_OUTPUT_INDEX",
                    format!(
                        "Output index {} on \"{}\" exceeds its output count ({})",
                        output, node.name, allowed
                    ),
                )
                .for_node(node),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Topology: disconnected nodes and cycles
// ---------------------------------------------------------------------------

pub fn validate_topology(
    workflow: &Workflow,
    index: &ReverseIndex,
    catalog: &dyn NodeCatalog,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if workflow.nodes.len() > 1 {
        for node in &workflow.nodes {
            if node.disabled || is_sticky_note(node) {
                continue;
            }
            let has_outgoing = workflow.connections.get(&node.name).is_some_and(|outputs| {
                outputs
                    .values()
                    .flatten()
                    .flatten()
                    .any(|t| !t.node.is_empty())
            });
            if !has_outgoing && !index.has_incoming(&node.name) {
                let message = if is_trigger(node, catalog) {
                    "Trigger node is not connected to any other nodes"
                } else {
                    "Node is not connected to any other nodes"
                };
                issues.push(ValidationIssue::warning("DISCONNECTED_NODE", message).for_node(node));
            }
        }
    }

    let flow = FlowGraph::build(workflow);
    for cycle in flow.cycles(workflow) {
        issues.push(ValidationIssue::error(
            "WORKFLOW_CYCLE",
            format!(
                "Workflow contains a cycle (infinite loop) through: {}",
                cycle.join(" -> ")
            ),
        ));
    }

    issues
}
