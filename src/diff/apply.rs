//! Per-operation mutation of the working copy.
//!
//! Each function either applies its operation completely or returns a
//! [`DiffError`] without having touched the workflow.

use serde_json::{Map, Number, Value};
use tracing::debug;
use uuid::Uuid;

use super::operations::{
    AddConnectionOp, AddNodeOp, CleanStaleConnectionsOp, MoveNodeOp, NodeRef, Operation,
    RemoveConnectionOp, RewireConnectionOp, TagOp, UpdateMetadataOp, UpdateNodeOp,
    UpdateSettingsOp,
};
use crate::config::MAX_OUTPUT_INDEX;
use crate::error::DiffError;
use crate::parse::types::{ConnectionTarget, Connections, MAIN_PORT, Workflow, WorkflowNode};

pub fn apply_operation(workflow: &mut Workflow, op: &Operation) -> Result<(), DiffError> {
    match op {
        Operation::AddNode(op) => add_node(workflow, op),
        Operation::RemoveNode(target) => remove_node(workflow, target),
        Operation::UpdateNode(op) => update_node(workflow, op),
        Operation::MoveNode(op) => move_node(workflow, op),
        Operation::EnableNode(target) => set_disabled(workflow, target, false),
        Operation::DisableNode(target) => set_disabled(workflow, target, true),
        Operation::AddConnection(op) => add_connection(workflow, op),
        Operation::RemoveConnection(op) => remove_connection(workflow, op),
        Operation::RewireConnection(op) => rewire_connection(workflow, op),
        Operation::CleanStaleConnections(op) => clean_stale_connections(workflow, op),
        Operation::UpdateSettings(op) => update_settings(workflow, op),
        Operation::UpdateMetadata(op) => update_metadata(workflow, op),
        Operation::AddTag(op) => add_tag(workflow, op),
        Operation::RemoveTag(op) => remove_tag(workflow, op),
    }
}

/// Stable id for a node added without one, so the same request always
/// produces the same workflow.
pub fn derive_node_id(name: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

// =============================================================================
// NODE OPERATIONS
// =============================================================================

fn resolve_node(workflow: &Workflow, target: &NodeRef) -> Result<usize, DiffError> {
    let by_id = target.node_id.as_deref().and_then(|id| {
        workflow
            .nodes
            .iter()
            .position(|n| !n.id.is_empty() && n.id == id)
            // Callers sometimes put a name in nodeId.
            .or_else(|| workflow.nodes.iter().position(|n| n.name == id))
    });
    let by_name = || {
        target
            .node_name
            .as_deref()
            .and_then(|name| workflow.nodes.iter().position(|n| n.name == name))
    };
    by_id
        .or_else(by_name)
        .ok_or_else(|| DiffError::NodeNotFound(target.describe()))
}

fn add_node(workflow: &mut Workflow, op: &AddNodeOp) -> Result<(), DiffError> {
    let mut node = op.node.clone();
    if node.name.trim().is_empty() {
        return Err(DiffError::MissingField("name"));
    }
    if node.node_type.trim().is_empty() {
        return Err(DiffError::MissingField("type"));
    }
    if workflow.node_by_name(&node.name).is_some() {
        return Err(DiffError::DuplicateNodeName(node.name));
    }
    if !node.node_type.contains('.') {
        return Err(DiffError::InvalidNodeType(node.node_type));
    }

    if node.id.is_empty() {
        node.id = derive_node_id(&node.name);
    }
    if node.type_version.is_none() {
        node.type_version = Some(Number::from(1));
    }
    workflow.nodes.push(node);
    Ok(())
}

fn remove_node(workflow: &mut Workflow, target: &NodeRef) -> Result<(), DiffError> {
    let index = resolve_node(workflow, target)?;
    let removed = workflow.nodes.remove(index);

    workflow.connections.shift_remove(&removed.name);
    let sources: Vec<String> = workflow.connections.keys().cloned().collect();
    for source in sources {
        retain_targets(&mut workflow.connections, &source, |t| t.node != removed.name);
    }
    Ok(())
}

fn move_node(workflow: &mut Workflow, op: &MoveNodeOp) -> Result<(), DiffError> {
    let index = resolve_node(workflow, &op.target)?;
    workflow.nodes[index].position = op.position;
    Ok(())
}

fn set_disabled(workflow: &mut Workflow, target: &NodeRef, disabled: bool) -> Result<(), DiffError> {
    let index = resolve_node(workflow, target)?;
    workflow.nodes[index].disabled = disabled;
    Ok(())
}

fn update_node(workflow: &mut Workflow, op: &UpdateNodeOp) -> Result<(), DiffError> {
    let index = resolve_node(workflow, &op.target)?;
    let current = &workflow.nodes[index];
    let old_name = current.name.clone();

    let mut value = serde_json::to_value(current).map_err(|e| DiffError::InvalidValue {
        path: String::new(),
        reason: e.to_string(),
    })?;
    for (path, new_value) in &op.updates {
        if path.is_empty() || path == "id" {
            return Err(DiffError::InvalidUpdatePath(path.clone()));
        }
        set_path(&mut value, path, new_value.clone())?;
    }

    let updated: WorkflowNode = serde_json::from_value(value).map_err(|e| DiffError::InvalidValue {
        path: op.updates.keys().cloned().collect::<Vec<_>>().join(", "),
        reason: e.to_string(),
    })?;
    if updated.name.trim().is_empty() {
        return Err(DiffError::MissingField("name"));
    }

    if updated.name != old_name {
        if workflow.node_by_name(&updated.name).is_some() {
            return Err(DiffError::DuplicateNodeName(updated.name));
        }
        debug!(from = %old_name, to = %updated.name, "renaming node");
        rename_references(&mut workflow.connections, &old_name, &updated.name);
    }
    workflow.nodes[index] = updated;
    Ok(())
}

/// Set `path` (dot-separated) inside `root`, creating intermediate objects.
/// A `null` value removes the leaf.
pub fn set_path(root: &mut Value, path: &str, new_value: Value) -> Result<(), DiffError> {
    let invalid = || DiffError::InvalidUpdatePath(path.to_string());
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid());
    }
    let (leaf, parents) = segments.split_last().ok_or_else(invalid)?;

    let mut cursor = root;
    for segment in parents {
        let object = cursor.as_object_mut().ok_or_else(invalid)?;
        let child = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if child.is_null() {
            *child = Value::Object(Map::new());
        }
        cursor = child;
    }

    let object = cursor.as_object_mut().ok_or_else(invalid)?;
    if new_value.is_null() {
        object.remove(*leaf);
    } else {
        object.insert(leaf.to_string(), new_value);
    }
    Ok(())
}

fn rename_references(connections: &mut Connections, old: &str, new: &str) {
    let renamed: Connections = std::mem::take(connections)
        .into_iter()
        .map(|(source, outputs)| {
            let source = if source == old { new.to_string() } else { source };
            (source, outputs)
        })
        .collect();
    *connections = renamed;

    for target in connections
        .values_mut()
        .flat_map(|outputs| outputs.values_mut())
        .flatten()
        .flatten()
    {
        if target.node == old {
            target.node = new.to_string();
        }
    }
}

// =============================================================================
// CONNECTION OPERATIONS
// =============================================================================

/// Output index from an explicit index, an IF `branch` or a Switch `case`,
/// capped at [`MAX_OUTPUT_INDEX`].
fn output_index(
    source_index: Option<usize>,
    branch: Option<&str>,
    case: Option<usize>,
) -> Result<usize, DiffError> {
    let index = requested_output_index(source_index, branch, case)?;
    if index > MAX_OUTPUT_INDEX {
        let path = if source_index.is_some() { "sourceIndex" } else { "case" };
        return Err(DiffError::InvalidValue {
            path: path.into(),
            reason: format!("output index {} exceeds the maximum of {}", index, MAX_OUTPUT_INDEX),
        });
    }
    Ok(index)
}

fn requested_output_index(
    source_index: Option<usize>,
    branch: Option<&str>,
    case: Option<usize>,
) -> Result<usize, DiffError> {
    if let Some(index) = source_index {
        return Ok(index);
    }
    match branch {
        Some("true") => return Ok(0),
        Some("false") => return Ok(1),
        Some(other) => {
            return Err(DiffError::InvalidValue {
                path: "branch".into(),
                reason: format!("expected \"true\" or \"false\", got \"{}\"", other),
            });
        }
        None => {}
    }
    Ok(case.unwrap_or(0))
}

fn node_name_of(workflow: &Workflow, reference: &str) -> Option<String> {
    workflow.find_node(reference).map(|n| n.name.clone())
}

fn add_connection(workflow: &mut Workflow, op: &AddConnectionOp) -> Result<(), DiffError> {
    let source = node_name_of(workflow, &op.source)
        .ok_or_else(|| DiffError::SourceNotFound(op.source.clone()))?;
    let target = node_name_of(workflow, &op.target)
        .ok_or_else(|| DiffError::TargetNotFound(op.target.clone()))?;

    let port = op.source_output.as_deref().unwrap_or(MAIN_PORT);
    // AI capability edges arrive on the port of the same type.
    let target_port = op.target_input.as_deref().unwrap_or(port);
    let index = output_index(op.source_index, op.branch.as_deref(), op.case)?;
    let edge = ConnectionTarget::new(target, target_port, op.target_index.unwrap_or(0));

    insert_edge(workflow, &source, port, index, edge)
}

fn insert_edge(
    workflow: &mut Workflow,
    source: &str,
    port: &str,
    index: usize,
    edge: ConnectionTarget,
) -> Result<(), DiffError> {
    let exists = workflow
        .outputs(source, port)
        .and_then(|buckets| buckets.get(index))
        .is_some_and(|bucket| bucket.contains(&edge));
    if exists {
        return Err(DiffError::ConnectionExists {
            from: source.to_string(),
            target: edge.node,
        });
    }

    let buckets = workflow
        .connections
        .entry(source.to_string())
        .or_default()
        .entry(port.to_string())
        .or_default();
    let needed = index.checked_add(1).ok_or_else(|| DiffError::InvalidValue {
        path: "sourceIndex".into(),
        reason: format!("output index {} is out of range", index),
    })?;
    if buckets.len() < needed {
        buckets.resize_with(needed, Vec::new);
    }
    buckets[index].push(edge);
    Ok(())
}

fn remove_connection(workflow: &mut Workflow, op: &RemoveConnectionOp) -> Result<(), DiffError> {
    // Stale edges may point at nodes that no longer exist; fall back to the raw name.
    let source = node_name_of(workflow, &op.source).unwrap_or_else(|| op.source.clone());
    let target = node_name_of(workflow, &op.target).unwrap_or_else(|| op.target.clone());
    let port = op.source_output.as_deref().unwrap_or(MAIN_PORT);

    let removed = take_edge(
        workflow,
        &source,
        port,
        op.source_index,
        &target,
        op.target_input.as_deref(),
    );
    if removed.is_none() && !op.ignore_errors {
        return Err(DiffError::ConnectionNotFound {
            from: source,
            target,
        });
    }
    Ok(())
}

/// Remove the first matching edge and prune what it leaves empty.
fn take_edge(
    workflow: &mut Workflow,
    source: &str,
    port: &str,
    bucket_index: Option<usize>,
    target: &str,
    target_port: Option<&str>,
) -> Option<(usize, ConnectionTarget)> {
    let buckets = workflow.connections.get_mut(source)?.get_mut(port)?;
    let found = buckets.iter().enumerate().find_map(|(i, bucket)| {
        if bucket_index.is_some_and(|wanted| wanted != i) {
            return None;
        }
        bucket
            .iter()
            .position(|t| t.node == target && target_port.is_none_or(|p| t.port_type == p))
            .map(|pos| (i, pos))
    });
    let (i, pos) = found?;
    let edge = buckets[i].remove(pos);
    prune_source(&mut workflow.connections, source);
    Some((i, edge))
}

fn rewire_connection(workflow: &mut Workflow, op: &RewireConnectionOp) -> Result<(), DiffError> {
    let source = node_name_of(workflow, &op.source)
        .ok_or_else(|| DiffError::SourceNotFound(op.source.clone()))?;
    let from = node_name_of(workflow, &op.from).unwrap_or_else(|| op.from.clone());
    let to = node_name_of(workflow, &op.to).ok_or_else(|| DiffError::TargetNotFound(op.to.clone()))?;
    let port = op.source_output.as_deref().unwrap_or(MAIN_PORT);

    let explicit = op.source_index.is_some() || op.branch.is_some() || op.case.is_some();
    let wanted = if explicit {
        Some(output_index(op.source_index, op.branch.as_deref(), op.case)?)
    } else {
        None
    };

    // Check the destination first so a failure leaves the workflow untouched.
    let mut trial = workflow.clone();
    let (index, old_edge) = take_edge(&mut trial, &source, port, wanted, &from, None).ok_or_else(
        || DiffError::ConnectionNotFound {
            from: source.clone(),
            target: from.clone(),
        },
    )?;
    let edge = ConnectionTarget::new(to, old_edge.port_type, old_edge.index);
    insert_edge(&mut trial, &source, port, index, edge)?;
    *workflow = trial;
    Ok(())
}

fn clean_stale_connections(
    workflow: &mut Workflow,
    op: &CleanStaleConnectionsOp,
) -> Result<(), DiffError> {
    let names: std::collections::HashSet<String> =
        workflow.nodes.iter().map(|n| n.name.clone()).collect();

    let mut cleaned = workflow.connections.clone();
    let before = workflow.edge_count();
    cleaned.retain(|source, _| names.contains(source));
    let sources: Vec<String> = cleaned.keys().cloned().collect();
    for source in sources {
        retain_targets(&mut cleaned, &source, |t| names.contains(&t.node));
    }

    let after: usize = cleaned
        .values()
        .flat_map(|outputs| outputs.values())
        .flatten()
        .map(Vec::len)
        .sum();
    debug!(removed = before - after, dry_run = op.dry_run, "stale connections");
    if !op.dry_run {
        workflow.connections = cleaned;
    }
    Ok(())
}

fn retain_targets(
    connections: &mut Connections,
    source: &str,
    mut keep: impl FnMut(&ConnectionTarget) -> bool,
) {
    let Some(outputs) = connections.get_mut(source) else {
        return;
    };
    for bucket in outputs.values_mut().flatten() {
        bucket.retain(&mut keep);
    }
    prune_source(connections, source);
}

/// Drop trailing empty buckets, then empty ports, then the empty source key.
/// Leading empty buckets stay so output indices keep their meaning.
fn prune_source(connections: &mut Connections, source: &str) {
    let Some(outputs) = connections.get_mut(source) else {
        return;
    };
    for buckets in outputs.values_mut() {
        while buckets.last().is_some_and(Vec::is_empty) {
            buckets.pop();
        }
    }
    outputs.retain(|_, buckets| !buckets.is_empty());
    if outputs.is_empty() {
        connections.shift_remove(source);
    }
}

// =============================================================================
// WORKFLOW-LEVEL OPERATIONS
// =============================================================================

fn update_settings(workflow: &mut Workflow, op: &UpdateSettingsOp) -> Result<(), DiffError> {
    let settings = workflow.settings.get_or_insert_with(Map::new);
    for (key, value) in &op.settings {
        settings.insert(key.clone(), value.clone());
    }
    Ok(())
}

fn update_metadata(workflow: &mut Workflow, op: &UpdateMetadataOp) -> Result<(), DiffError> {
    // Validate everything before applying anything.
    for (key, value) in &op.metadata {
        match key.as_str() {
            "nodes" | "connections" | "settings" => {
                return Err(DiffError::InvalidUpdatePath(key.clone()));
            }
            "name" if !value.is_string() => {
                return Err(DiffError::InvalidValue {
                    path: key.clone(),
                    reason: "workflow name must be a string".into(),
                });
            }
            "tags" if !value.is_array() => {
                return Err(DiffError::InvalidValue {
                    path: key.clone(),
                    reason: "tags must be an array".into(),
                });
            }
            _ => {}
        }
    }

    for (key, value) in &op.metadata {
        match (key.as_str(), value) {
            ("name", Value::String(name)) => workflow.name = Some(name.clone()),
            (_, Value::Null) => {
                workflow.extra.remove(key);
            }
            _ => {
                workflow.extra.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(())
}

/// Tags are plain strings or `{ id, name }` objects.
fn tag_matches(value: &Value, tag: &str) -> bool {
    match value {
        Value::String(s) => s == tag,
        Value::Object(o) => o.get("name").and_then(Value::as_str) == Some(tag),
        _ => false,
    }
}

fn add_tag(workflow: &mut Workflow, op: &TagOp) -> Result<(), DiffError> {
    if op.tag.trim().is_empty() {
        return Err(DiffError::MissingField("tag"));
    }
    let tags = workflow
        .extra
        .entry("tags")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !tags.is_array() {
        *tags = Value::Array(Vec::new());
    }
    if let Value::Array(items) = tags {
        if !items.iter().any(|t| tag_matches(t, &op.tag)) {
            items.push(Value::String(op.tag.clone()));
        }
    }
    Ok(())
}

fn remove_tag(workflow: &mut Workflow, op: &TagOp) -> Result<(), DiffError> {
    if let Some(Value::Array(items)) = workflow.extra.get_mut("tags") {
        items.retain(|t| !tag_matches(t, &op.tag));
    }
    Ok(())
}
