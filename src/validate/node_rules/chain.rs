//! Basic LLM Chain: an agent without tools, iterations or fallback models.

use super::RuleContext;
use super::agent::check_prompt_text;
use crate::error::ValidationIssue;
use crate::graph::{AI_LANGUAGE_MODEL, AI_MEMORY, AI_TOOL};
use crate::parse::types::WorkflowNode;

pub fn validate_basic_chain(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let name = &node.name;

    let models = ctx.index.count(name, AI_LANGUAGE_MODEL);
    if models == 0 {
        issues.push(ValidationIssue::error(
            "MISSING_LANGUAGE_MODEL",
            format!(
                "Basic LLM Chain \"{}\" requires an ai_languageModel connection. Connect a language model node.",
                name
            ),
        ));
    } else if models > 1 {
        issues.push(ValidationIssue::error(
            "MULTIPLE_LANGUAGE_MODELS",
            format!(
                "Basic LLM Chain \"{}\" has {} ai_languageModel connections. Basic LLM Chain only supports \
                 1 language model (no fallback).",
                name, models
            ),
        ));
    }

    let memories = ctx.index.count(name, AI_MEMORY);
    if memories > 1 {
        issues.push(ValidationIssue::error(
            "MULTIPLE_MEMORY_CONNECTIONS",
            format!(
                "Basic LLM Chain \"{}\" has {} ai_memory connections. Only 1 memory is allowed.",
                name, memories
            ),
        ));
    }

    if ctx.index.count(name, AI_TOOL) > 0 {
        issues.push(ValidationIssue::error(
            "TOOLS_NOT_SUPPORTED",
            format!(
                "Basic LLM Chain \"{}\" has ai_tool connections. Basic LLM Chain does not support tools. \
                 Use AI Agent if you need tool support.",
                name
            ),
        ));
    }

    check_prompt_text(node, "Basic LLM Chain", &mut issues);

    issues.into_iter().map(|i| i.for_node(node)).collect()
}
