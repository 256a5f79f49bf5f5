//! Chat Trigger rules. Streaming only works when the trigger feeds an AI Agent
//! that has no main outputs of its own.

use serde_json::Value;

use super::{AGENT, RuleContext, is_type};
use crate::error::ValidationIssue;
use crate::normalize::normalize;
use crate::parse::types::WorkflowNode;

pub const DEFAULT_RESPONSE_MODE: &str = "lastNode";

/// `options.responseMode`, then a top-level `responseMode`, else `lastNode`.
pub fn response_mode(node: &WorkflowNode) -> &str {
    node.option("responseMode")
        .and_then(Value::as_str)
        .or_else(|| node.param_str("responseMode"))
        .unwrap_or(DEFAULT_RESPONSE_MODE)
}

pub fn validate_chat_trigger(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mode = response_mode(node);

    let first = ctx
        .workflow
        .main_outputs(&node.name)
        .and_then(|buckets| buckets.first())
        .and_then(|bucket| bucket.iter().find(|t| !t.node.is_empty()));
    let Some(first) = first else {
        issues.push(
            ValidationIssue::error(
                "MISSING_CONNECTIONS",
                format!(
                    "Chat Trigger \"{}\" has no outgoing connections. Connect it to an AI Agent or workflow.",
                    node.name
                ),
            )
            .for_node(node),
        );
        return issues;
    };

    let Some(target) = ctx.workflow.node_by_name(&first.node) else {
        return issues;
    };
    let target_is_agent = is_type(target, AGENT);

    if mode == "streaming" {
        if !target_is_agent {
            issues.push(
                ValidationIssue::error(
                    "STREAMING_WRONG_TARGET",
                    format!(
                        "Chat Trigger \"{}\" has responseMode=\"streaming\" but connects to \"{}\" ({}). \
                         Streaming mode only works with AI Agent. Change responseMode to \"lastNode\" \
                         or connect to an AI Agent.",
                        node.name,
                        target.name,
                        normalize(&target.node_type)
                    ),
                )
                .for_node(node),
            );
        } else if ctx.workflow.has_main_output(&target.name) {
            issues.push(
                ValidationIssue::error(
                    "STREAMING_AGENT_HAS_OUTPUT",
                    format!(
                        "AI Agent \"{}\" is in streaming mode but has outgoing main connections. \
                         Remove all main output connections - responses stream back through Chat Trigger.",
                        target.name
                    ),
                )
                .for_node(target),
            );
        }
    }

    if mode == DEFAULT_RESPONSE_MODE && target_is_agent {
        issues.push(
            ValidationIssue::info(
                "CONSIDER_STREAMING",
                format!(
                    "Chat Trigger \"{}\" uses responseMode=\"lastNode\" with AI Agent. Consider using \
                     responseMode=\"streaming\" for real-time responses.",
                    node.name
                ),
            )
            .for_node(node),
        );
    }

    issues
}
