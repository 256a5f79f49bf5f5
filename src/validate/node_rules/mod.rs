//! Per-node-class validation rules, dispatched on the normalized node type.
//!
//! Each rule is a plain function over the node, the reverse index and the
//! workflow. Types without an entry produce no findings.

pub mod agent;
pub mod chain;
pub mod chat_trigger;
pub mod tools;

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::config::EngineConfig;
use crate::error::ValidationIssue;
use crate::graph::{AI_TOOL, ReverseIndex};
use crate::normalize::normalize;
use crate::parse::types::{Workflow, WorkflowNode};

pub const AGENT: &str = "nodes-langchain.agent";
pub const CHAT_TRIGGER: &str = "nodes-langchain.chatTrigger";
pub const CHAIN_LLM: &str = "nodes-langchain.chainLlm";

pub struct RuleContext<'a> {
    pub workflow: &'a Workflow,
    pub index: &'a ReverseIndex,
    pub config: &'a EngineConfig,
}

pub type NodeRule = fn(&WorkflowNode, &RuleContext<'_>) -> Vec<ValidationIssue>;

static REGISTRY: LazyLock<HashMap<&'static str, NodeRule>> = LazyLock::new(|| {
    let mut rules: HashMap<&'static str, NodeRule> = HashMap::new();
    rules.insert(AGENT, agent::validate_agent);
    rules.insert(CHAT_TRIGGER, chat_trigger::validate_chat_trigger);
    rules.insert(CHAIN_LLM, chain::validate_basic_chain);
    for &(node_type, rule) in tools::TOOL_RULES {
        rules.insert(node_type, rule);
    }
    rules
});

/// Cheap membership test: does this type have node-class rules?
pub fn has_rules(node_type: &str) -> bool {
    REGISTRY.contains_key(normalize(node_type).as_str())
}

pub fn is_tool_sub_node(node_type: &str) -> bool {
    let normalized = normalize(node_type);
    tools::TOOL_RULES.iter().any(|(t, _)| *t == normalized)
}

pub(crate) fn is_type(node: &WorkflowNode, canonical: &str) -> bool {
    normalize(&node.node_type) == canonical
}

/// Run the rule registered for this node's type, if any.
pub fn validate_node(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    let normalized = normalize(&node.node_type);
    let Some(rule) = REGISTRY.get(normalized.as_str()) else {
        return Vec::new();
    };

    let mut issues = rule(node, ctx);
    if tools::TOOL_RULES.iter().any(|(t, _)| *t == normalized) {
        issues.extend(tool_connected(node, ctx));
    }
    issues
}

/// Every enabled node with registered rules.
pub fn validate_all(ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    ctx.workflow
        .nodes
        .iter()
        .filter(|n| !n.disabled && has_rules(&n.node_type))
        .flat_map(|n| validate_node(n, ctx))
        .collect()
}

fn tool_connected(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    let connected = ctx
        .workflow
        .outputs(&node.name, AI_TOOL)
        .is_some_and(|buckets| buckets.iter().flatten().any(|t| !t.node.is_empty()));
    if connected {
        return Vec::new();
    }
    vec![
        ValidationIssue::warning(
            "TOOL_NOT_CONNECTED",
            format!(
                "Tool \"{}\" is not connected to an AI Agent. Connect it through an ai_tool connection.",
                node.name
            ),
        )
        .for_node(node),
    ]
}
