//! Lint for `{{ }}` expressions embedded in node parameters.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::ValidationIssue;
use crate::parse::types::{Workflow, WorkflowNode};

static NODE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\$(?:node\[\s*["']([^"']+)["']\s*\]|\(\s*["']([^"']+)["']\s*\))"#)
        .expect("node reference pattern is valid")
});

/// Checks every string parameter that contains expression braces. Returns the
/// number of expressions inspected.
pub fn validate_expressions(workflow: &Workflow, issues: &mut Vec<ValidationIssue>) -> usize {
    let mut inspected = 0;
    for node in workflow.nodes.iter().filter(|n| !n.disabled) {
        for (key, value) in &node.parameters {
            walk(workflow, node, key, value, issues, &mut inspected);
        }
    }
    inspected
}

fn walk(
    workflow: &Workflow,
    node: &WorkflowNode,
    path: &str,
    value: &Value,
    issues: &mut Vec<ValidationIssue>,
    inspected: &mut usize,
) {
    match value {
        Value::String(s) => {
            if s.contains("{{") {
                *inspected += 1;
                check_expression(workflow, node, path, s, issues);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(workflow, node, &format!("{path}[{i}]"), item, issues, inspected);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                walk(workflow, node, &format!("{path}.{key}"), item, issues, inspected);
            }
        }
        _ => {}
    }
}

fn check_expression(
    workflow: &Workflow,
    node: &WorkflowNode,
    path: &str,
    expr: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if !expr.starts_with('=') {
        issues.push(
            ValidationIssue::warning(
                "EXPRESSION_MISSING_PREFIX",
                format!(
                    "Parameter '{}' contains {{{{ }}}} but is not marked as an expression. Prefix the value with '=' to evaluate it.",
                    path
                ),
            )
            .for_node(node),
        );
    }

    if expr.starts_with('=') && expr.matches("{{").count() != expr.matches("}}").count() {
        issues.push(
            ValidationIssue::error(
                "UNBALANCED_EXPRESSION",
                format!("Parameter '{}' has unmatched expression brackets {{{{ }}}}", path),
            )
            .for_node(node),
        );
    }

    for caps in NODE_REFERENCE.captures_iter(expr) {
        let Some(name) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        if workflow.node_by_name(name.as_str()).is_none() {
            issues.push(
                ValidationIssue::error(
                    "UNKNOWN_NODE_REFERENCE",
                    format!(
                        "Parameter '{}' references node \"{}\" which does not exist",
                        path,
                        name.as_str()
                    ),
                )
                .for_node(node),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workflow_with_param(value: Value) -> Workflow {
        serde_json::from_value(json!({
            "nodes": [
                { "id": "1", "name": "Source", "type": "nodes-base.set", "parameters": {} },
                { "id": "2", "name": "Use", "type": "nodes-base.set", "parameters": { "value": value } }
            ],
            "connections": {}
        }))
        .unwrap()
    }

    fn codes(wf: &Workflow) -> Vec<String> {
        let mut issues = Vec::new();
        validate_expressions(wf, &mut issues);
        issues.into_iter().filter_map(|i| i.code).collect()
    }

    #[test]
    fn well_formed_expression_is_clean() {
        let wf = workflow_with_param(json!("={{ $('Source').item.json.id }}"));
        assert!(codes(&wf).is_empty());
    }

    #[test]
    fn missing_prefix_and_unknown_reference() {
        let wf = workflow_with_param(json!({ "nested": ["{{ $node[\"Ghost\"].json.x }}"] }));
        let codes = codes(&wf);
        assert!(codes.contains(&"EXPRESSION_MISSING_PREFIX".to_string()));
        assert!(codes.contains(&"UNKNOWN_NODE_REFERENCE".to_string()));
    }

    #[test]
    fn unbalanced_brackets() {
        let wf = workflow_with_param(json!("={{ $json.a }"));
        assert!(codes(&wf).contains(&"UNBALANCED_EXPRESSION".to_string()));
    }
}
