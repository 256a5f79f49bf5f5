//! Error-branch wiring: a node that sets `onError: continueErrorOutput` gets
//! one extra `main` output after its regular ones, `main[1]` for most nodes.

use crate::catalog::NodeCatalog;
use crate::error::ValidationIssue;
use crate::parse::types::{ConnectionTarget, OnError, Workflow, WorkflowNode};

const ERROR_HANDLER_NAME_HINTS: &[&str] = &["error", "handler", "catch", "fail", "exception"];
const ERROR_HANDLER_TYPE_HINTS: &[&str] = &["respondtowebhook", "emailsend"];

/// Name/type heuristic for nodes that look like they handle failures.
pub fn looks_like_error_handler(node: &WorkflowNode) -> bool {
    let name = node.name.to_lowercase();
    let node_type = node.node_type.to_lowercase();
    ERROR_HANDLER_NAME_HINTS.iter().any(|hint| name.contains(hint))
        || ERROR_HANDLER_TYPE_HINTS.iter().any(|hint| node_type.contains(hint))
}

/// Index of the error output: right after the declared regular outputs.
fn error_output_index(node: &WorkflowNode, catalog: &dyn NodeCatalog) -> usize {
    catalog
        .descriptor(&node.node_type)
        .and_then(|d| d.outputs)
        .unwrap_or(1)
}

pub fn validate_error_outputs(workflow: &Workflow, catalog: &dyn NodeCatalog) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for node in &workflow.nodes {
        let buckets = workflow.main_outputs(&node.name);
        let error_index = error_output_index(node, catalog);
        let has_error_setting = node.on_error == Some(OnError::ContinueErrorOutput);
        let has_error_connections = buckets
            .and_then(|b| b.get(error_index))
            .is_some_and(|bucket| bucket.iter().any(|t| !t.node.is_empty()));

        if has_error_setting && !has_error_connections {
            issues.push(
                ValidationIssue::error(
                    "ERROR_OUTPUT_NOT_CONNECTED",
                    format!(
                        "Node has onError: 'continueErrorOutput' but no error output connections in main[{0}]. \
                         Add error handler connections to main[{0}] or change onError to 'continueRegularOutput' or 'stopWorkflow'.",
                        error_index
                    ),
                )
                .for_node(node),
            );
        }

        if !has_error_setting && has_error_connections {
            issues.push(
                ValidationIssue::warning(
                    "MISSING_ON_ERROR",
                    format!(
                        "Node has error output connections in main[{}] but missing onError: 'continueErrorOutput'. \
                         Add this property to properly handle errors.",
                        error_index
                    ),
                )
                .for_node(node),
            );
        }

        let Some(success) = buckets.and_then(|b| b.first()) else {
            continue;
        };
        if success.len() < 2 {
            continue;
        }

        let (handlers, others): (Vec<&ConnectionTarget>, Vec<&ConnectionTarget>) =
            success.iter().partition(|t| {
                workflow
                    .node_by_name(&t.node)
                    .is_some_and(looks_like_error_handler)
            });
        // Only a mix of handlers and regular nodes in main[0] is misplaced.
        if handlers.is_empty() || others.is_empty() {
            continue;
        }

        issues.push(
            ValidationIssue::error(
                "INCORRECT_ERROR_OUTPUT",
                incorrect_error_output_message(&node.name, success, &handlers, &others),
            )
            .for_node(node),
        );
    }

    issues
}

fn edge_line(target: &ConnectionTarget) -> String {
    format!(
        "      {{\"node\": \"{}\", \"type\": \"{}\", \"index\": {}}}",
        target.node, target.port_type, target.index
    )
}

fn edge_lines<'a>(targets: impl IntoIterator<Item = &'a ConnectionTarget>) -> String {
    targets
        .into_iter()
        .map(edge_line)
        .collect::<Vec<_>>()
        .join(",\n")
}

/// The offending fragment and its two-array correction.
fn incorrect_error_output_message(
    source: &str,
    current: &[ConnectionTarget],
    handlers: &[&ConnectionTarget],
    others: &[&ConnectionTarget],
) -> String {
    let handler_names = handlers
        .iter()
        .map(|t| format!("\"{}\"", t.node))
        .collect::<Vec<_>>()
        .join(", ");

    let mut message = format!(
        "Incorrect error output configuration. Nodes {} appear to be error handlers but are in main[0] \
         (success output) along with other nodes.\n\n",
        handler_names
    );

    message.push_str("INCORRECT (current):\n");
    message.push_str(&format!(
        "\"{}\": {{\n  \"main\": [\n    [  // main[0] has multiple nodes mixed together\n{}\n    ]\n  ]\n}}\n\n",
        source,
        edge_lines(current)
    ));

    message.push_str("CORRECT (should be):\n");
    message.push_str(&format!(
        "\"{}\": {{\n  \"main\": [\n    [  // main[0] = success output\n{}\n    ],\n    [  // main[1] = error output\n{}\n    ]\n  ]\n}}\n\n",
        source,
        edge_lines(others.iter().copied()),
        edge_lines(handlers.iter().copied())
    ));

    message.push_str(&format!(
        "Also add: \"onError\": \"continueErrorOutput\" to the \"{}\" node.",
        source
    ));
    message
}
