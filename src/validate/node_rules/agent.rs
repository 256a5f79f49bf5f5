//! AI Agent rules: capability cardinality, prompt, streaming, iterations.

use serde_json::Value;

use super::{CHAT_TRIGGER, RuleContext, is_type};
use crate::error::{Severity, ValidationIssue};
use crate::graph::{AI_LANGUAGE_MODEL, AI_MEMORY, AI_OUTPUT_PARSER, AI_TOOL};
use crate::parse::types::WorkflowNode;

pub fn validate_agent(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let name = &node.name;

    // Language models: one, or two when the second is a fallback.
    let models = ctx.index.count(name, AI_LANGUAGE_MODEL);
    let needs_fallback = node.param_is_true("needsFallback");
    match models {
        0 => issues.push(ValidationIssue::error(
            "MISSING_LANGUAGE_MODEL",
            format!(
                "AI Agent \"{}\" requires an ai_languageModel connection. Connect a language model node \
                 (e.g. OpenAI Chat Model, Anthropic Chat Model).",
                name
            ),
        )),
        1 if needs_fallback => issues.push(ValidationIssue::error(
            "FALLBACK_MISSING_SECOND_MODEL",
            format!(
                "AI Agent \"{}\" has needsFallback=true but only 1 language model connected. \
                 Connect a second model for fallback or disable needsFallback.",
                name
            ),
        )),
        1 => {}
        2 if !needs_fallback => issues.push(ValidationIssue::advice(
            Severity::Warning,
            format!(
                "AI Agent \"{}\" has 2 language models but needsFallback is not enabled. \
                 Set needsFallback=true or remove the second model.",
                name
            ),
        )),
        2 => {}
        n => issues.push(ValidationIssue::error(
            "TOO_MANY_LANGUAGE_MODELS",
            format!(
                "AI Agent \"{}\" has {} ai_languageModel connections. Maximum is 2 (for fallback model support).",
                name, n
            ),
        )),
    }

    // Output parser must agree with hasOutputParser.
    let parsers = ctx.index.count(name, AI_OUTPUT_PARSER);
    if node.param_is_true("hasOutputParser") {
        if parsers == 0 {
            issues.push(ValidationIssue::error(
                "MISSING_OUTPUT_PARSER",
                format!(
                    "AI Agent \"{}\" has hasOutputParser=true but no ai_outputParser connection. \
                     Connect an output parser or set hasOutputParser=false.",
                    name
                ),
            ));
        }
    } else if parsers > 0 {
        issues.push(ValidationIssue::advice(
            Severity::Warning,
            format!(
                "AI Agent \"{}\" has an output parser connected but hasOutputParser is not true. \
                 Set hasOutputParser=true to enable output parsing.",
                name
            ),
        ));
    }
    if parsers > 1 {
        issues.push(ValidationIssue::error(
            "MULTIPLE_OUTPUT_PARSERS",
            format!(
                "AI Agent \"{}\" has {} output parsers. Only 1 is allowed.",
                name, parsers
            ),
        ));
    }

    check_prompt_text(node, "AI Agent", &mut issues);
    check_system_message(node, ctx, &mut issues);

    // Streaming responses go back through the chat trigger, not main outputs.
    let streaming_target = is_streaming_target(node, ctx);
    let streams_itself = node.option("streamResponse").and_then(Value::as_bool) == Some(true);
    if (streaming_target || streams_itself) && ctx.workflow.has_main_output(name) {
        let source = if streaming_target {
            "connected from Chat Trigger with responseMode=\"streaming\""
        } else {
            "has streamResponse=true in options"
        };
        issues.push(ValidationIssue::error(
            "STREAMING_WITH_MAIN_OUTPUT",
            format!(
                "AI Agent \"{}\" is in streaming mode ({}) but has outgoing main connections. \
                 In streaming mode the AI Agent must not have main output connections; responses \
                 stream back through the Chat Trigger.",
                name, source
            ),
        ));
    }

    let memories = ctx.index.count(name, AI_MEMORY);
    if memories > 1 {
        issues.push(ValidationIssue::error(
            "MULTIPLE_MEMORY_CONNECTIONS",
            format!(
                "AI Agent \"{}\" has {} ai_memory connections. Only 1 memory is allowed.",
                name, memories
            ),
        ));
    }

    if ctx.index.count(name, AI_TOOL) == 0 {
        issues.push(ValidationIssue::info(
            "NO_TOOLS",
            format!(
                "AI Agent \"{}\" has no ai_tool connections. Consider adding tools to enhance the agent's capabilities.",
                name
            ),
        ));
    }

    check_max_iterations(node, "AI Agent", ctx, &mut issues);

    issues.into_iter().map(|i| i.for_node(node)).collect()
}

/// `promptType: "define"` needs a non-empty `text`.
pub(super) fn check_prompt_text(node: &WorkflowNode, label: &str, issues: &mut Vec<ValidationIssue>) {
    if node.param_str("promptType") == Some("define") && node.param_non_empty("text").is_none() {
        issues.push(ValidationIssue::error(
            "MISSING_PROMPT_TEXT",
            format!(
                "{} \"{}\" has promptType=\"define\" but the text field is empty. \
                 Either provide a custom prompt or switch to promptType=\"auto\".",
                label, node.name
            ),
        ));
    }
}

fn check_system_message(node: &WorkflowNode, ctx: &RuleContext<'_>, issues: &mut Vec<ValidationIssue>) {
    let message = node
        .param_str("systemMessage")
        .or_else(|| node.option("systemMessage").and_then(Value::as_str))
        .map(str::trim)
        .unwrap_or_default();

    let min = ctx.config.min_system_message_length;
    if message.is_empty() {
        issues.push(ValidationIssue::advice(
            Severity::Info,
            format!(
                "AI Agent \"{}\" has no systemMessage. Consider adding one to define the agent's role, \
                 capabilities, and constraints.",
                node.name
            ),
        ));
    } else if message.chars().count() < min {
        issues.push(ValidationIssue::advice(
            Severity::Info,
            format!(
                "AI Agent \"{}\" systemMessage is very short (minimum {} characters recommended). \
                 Provide more detail about the agent's role and capabilities.",
                node.name, min
            ),
        ));
    }
}

/// `maxIterations`, top-level or under `options`, must be a number >= 1.
pub(super) fn check_max_iterations(
    node: &WorkflowNode,
    label: &str,
    ctx: &RuleContext<'_>,
    issues: &mut Vec<ValidationIssue>,
) {
    let Some(value) = node
        .param("maxIterations")
        .or_else(|| node.option("maxIterations"))
    else {
        return;
    };

    let Some(iterations) = value.as_f64() else {
        issues.push(ValidationIssue::error(
            "INVALID_MAX_ITERATIONS_TYPE",
            format!("{} \"{}\" has invalid maxIterations type. Must be a number.", label, node.name),
        ));
        return;
    };

    let threshold = ctx.config.max_iterations_warning;
    if iterations < 1.0 {
        issues.push(ValidationIssue::error(
            "MAX_ITERATIONS_TOO_LOW",
            format!(
                "{} \"{}\" has maxIterations={}. Must be at least 1.",
                label, node.name, value
            ),
        ));
    } else if iterations > threshold {
        issues.push(ValidationIssue::advice(
            Severity::Warning,
            format!(
                "{} \"{}\" has maxIterations={}. Very high iteration counts (>{}) may cause long \
                 execution times and high costs.",
                label, node.name, value, threshold
            ),
        ));
    }
}

/// Fed by a chat trigger whose response mode is `streaming`.
pub fn is_streaming_target(node: &WorkflowNode, ctx: &RuleContext<'_>) -> bool {
    ctx.index.incoming(&node.name).iter().any(|edge| {
        edge.source_type == crate::parse::types::MAIN_PORT
            && ctx
                .workflow
                .node_by_name(&edge.source_name)
                .is_some_and(|source| {
                    !source.disabled
                        && is_type(source, CHAT_TRIGGER)
                        && super::chat_trigger::response_mode(source) == "streaming"
                })
    })
}
