//! Rules for tool sub-nodes that an AI Agent calls.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use url::Url;

use super::agent::check_max_iterations;
use super::{NodeRule, RuleContext};
use crate::error::{Severity, ValidationIssue};
use crate::graph::{AI_LANGUAGE_MODEL, AI_VECTOR_STORE};
use crate::parse::types::WorkflowNode;

pub const TOOL_HTTP_REQUEST: &str = "nodes-langchain.toolHttpRequest";
pub const TOOL_CODE: &str = "nodes-langchain.toolCode";
pub const TOOL_VECTOR_STORE: &str = "nodes-langchain.toolVectorStore";
pub const TOOL_WORKFLOW: &str = "nodes-langchain.toolWorkflow";
pub const AGENT_TOOL: &str = "nodes-langchain.agentTool";
pub const MCP_CLIENT_TOOL: &str = "nodes-langchain.mcpClientTool";
pub const TOOL_CALCULATOR: &str = "nodes-langchain.toolCalculator";
pub const TOOL_THINK: &str = "nodes-langchain.toolThink";
pub const TOOL_SERP_API: &str = "nodes-langchain.toolSerpApi";
pub const TOOL_WIKIPEDIA: &str = "nodes-langchain.toolWikipedia";
pub const TOOL_SEARXNG: &str = "nodes-langchain.toolSearXng";
pub const TOOL_WOLFRAM_ALPHA: &str = "nodes-langchain.toolWolframAlpha";

pub const TOOL_RULES: &[(&str, NodeRule)] = &[
    (TOOL_HTTP_REQUEST, validate_http_request_tool as NodeRule),
    (TOOL_CODE, validate_code_tool as NodeRule),
    (TOOL_VECTOR_STORE, validate_vector_store_tool as NodeRule),
    (TOOL_WORKFLOW, validate_workflow_tool as NodeRule),
    (AGENT_TOOL, validate_agent_tool as NodeRule),
    (MCP_CLIENT_TOOL, validate_mcp_client_tool as NodeRule),
    (TOOL_CALCULATOR, no_required_config as NodeRule),
    (TOOL_THINK, no_required_config as NodeRule),
    (TOOL_SERP_API, validate_serp_api_tool as NodeRule),
    (TOOL_WIKIPEDIA, validate_wikipedia_tool as NodeRule),
    (TOOL_SEARXNG, validate_searxng_tool as NodeRule),
    (TOOL_WOLFRAM_ALPHA, validate_wolfram_alpha_tool as NodeRule),
];

const MAX_TOP_K: f64 = 50.0;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Parameters of the HTTP tool that may contain `{placeholder}` tokens.
const PLACEHOLDER_FIELDS: &[&str] = &[
    "url",
    "jsonBody",
    "body",
    "parametersBody",
    "jsonHeaders",
    "parametersHeaders",
    "jsonQuery",
    "parametersQuery",
];

// ---------------------------------------------------------------------------
// Shared checks
// ---------------------------------------------------------------------------

fn tool_description(node: &WorkflowNode) -> Option<&str> {
    node.param_non_empty("toolDescription")
        .or_else(|| node.param_non_empty("description"))
}

fn check_description(
    node: &WorkflowNode,
    label: &str,
    ctx: &RuleContext<'_>,
    issues: &mut Vec<ValidationIssue>,
) {
    match tool_description(node) {
        None => issues.push(ValidationIssue::error(
            "MISSING_TOOL_DESCRIPTION",
            format!(
                "{} \"{}\" has no toolDescription. Add a clear description so the language model knows \
                 when to use this tool.",
                label, node.name
            ),
        )),
        Some(description) => {
            let min = ctx.config.min_tool_description_length;
            if description.trim().chars().count() < min {
                issues.push(ValidationIssue::advice(
                    Severity::Warning,
                    format!(
                        "{} \"{}\" toolDescription is too short (minimum {} characters). Explain what the \
                         tool does and when to use it.",
                        label, node.name, min
                    ),
                ));
            }
        }
    }
}

fn check_credential(
    node: &WorkflowNode,
    label: &str,
    credential: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if !node.has_credential(credential) {
        issues.push(ValidationIssue::error(
            "MISSING_CREDENTIALS",
            format!(
                "{} \"{}\" requires {} credentials. Configure them on the node.",
                label, node.name, credential
            ),
        ));
    }
}

fn is_expression(value: &str) -> bool {
    value.starts_with('=') || value.contains("{{")
}

/// Parse with `{placeholder}` tokens substituted; returns the scheme.
fn url_scheme(raw: &str) -> Option<String> {
    let substituted = PLACEHOLDER.replace_all(raw, "placeholder");
    Url::parse(&substituted).ok().map(|u| u.scheme().to_string())
}

/// `{name}` tokens in a string, ignoring `{{ ... }}` expression braces.
pub fn extract_placeholders(text: &str, out: &mut BTreeSet<String>) {
    let bytes = text.as_bytes();
    for caps in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let doubled_open = whole.start() > 0 && bytes[whole.start() - 1] == b'{';
        let doubled_close = bytes.get(whole.end()) == Some(&b'}');
        if !doubled_open && !doubled_close {
            out.insert(name.as_str().to_string());
        }
    }
}

fn collect_placeholders(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => extract_placeholders(s, out),
        Value::Array(items) => items.iter().for_each(|v| collect_placeholders(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_placeholders(v, out)),
        _ => {}
    }
}

fn defined_placeholders(node: &WorkflowNode) -> BTreeSet<String> {
    node.param("placeholderDefinitions")
        .and_then(|d| d.get("values"))
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.get("name").and_then(Value::as_str))
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn finish(node: &WorkflowNode, issues: Vec<ValidationIssue>) -> Vec<ValidationIssue> {
    issues.into_iter().map(|i| i.for_node(node)).collect()
}

// ---------------------------------------------------------------------------
// Per-tool rules
// ---------------------------------------------------------------------------

pub fn validate_http_request_tool(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    const LABEL: &str = "HTTP Request Tool";
    let mut issues = Vec::new();
    check_description(node, LABEL, ctx, &mut issues);

    match node.param_non_empty("url") {
        None => issues.push(ValidationIssue::error(
            "MISSING_URL",
            format!("{} \"{}\" has no URL. Add the API endpoint URL.", LABEL, node.name),
        )),
        Some(url) if !is_expression(url) => match url_scheme(url) {
            None => issues.push(ValidationIssue::error(
                "INVALID_URL_FORMAT",
                format!(
                    "{} \"{}\" has invalid URL format. Must be a valid http:// or https:// URL.",
                    LABEL, node.name
                ),
            )),
            Some(scheme) if scheme != "http" && scheme != "https" => {
                issues.push(ValidationIssue::error(
                    "INVALID_URL_PROTOCOL",
                    format!(
                        "{} \"{}\" uses unsupported protocol \"{}:\". Use http:// or https://",
                        LABEL, node.name, scheme
                    ),
                ))
            }
            Some(_) => {}
        },
        Some(_) => {}
    }

    let mut used = BTreeSet::new();
    for field in PLACEHOLDER_FIELDS {
        if let Some(value) = node.param(field) {
            collect_placeholders(value, &mut used);
        }
    }
    let defined = defined_placeholders(node);

    for name in used.difference(&defined) {
        issues.push(ValidationIssue::error(
            "UNDEFINED_PLACEHOLDER",
            format!(
                "{} \"{}\" uses placeholder \"{{{}}}\" but it's not defined in placeholderDefinitions.",
                LABEL, node.name, name
            ),
        ));
    }
    for name in defined.difference(&used) {
        issues.push(ValidationIssue::warning(
            "UNUSED_PLACEHOLDER",
            format!(
                "{} \"{}\" defines placeholder \"{}\" but doesn't use it.",
                LABEL, node.name, name
            ),
        ));
    }

    let credential_auth = matches!(
        node.param_str("authentication"),
        Some("predefinedCredentialType" | "genericCredentialType")
    );
    if credential_auth && !node.has_credentials() {
        issues.push(ValidationIssue::warning(
            "CREDENTIALS_NOT_CONFIGURED",
            format!(
                "{} \"{}\" uses credential authentication but no credentials are configured.",
                LABEL, node.name
            ),
        ));
    }

    finish(node, issues)
}

pub fn validate_code_tool(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    const LABEL: &str = "Code Tool";
    let mut issues = Vec::new();
    check_description(node, LABEL, ctx, &mut issues);

    let code_field = match node.param_str("language") {
        Some("python") => "pythonCode",
        _ => "jsCode",
    };
    if node.param_non_empty(code_field).is_none() && node.param_non_empty("code").is_none() {
        issues.push(ValidationIssue::error(
            "MISSING_CODE",
            format!(
                "{} \"{}\" code is empty. Add the code the tool should execute.",
                LABEL, node.name
            ),
        ));
    }

    if node.param_is_true("specifyInputSchema")
        && node.param_non_empty("jsonSchemaExample").is_none()
        && node.param_non_empty("inputSchema").is_none()
    {
        issues.push(ValidationIssue::advice(
            Severity::Warning,
            format!(
                "{} \"{}\" has specifyInputSchema=true but no schema provided.",
                LABEL, node.name
            ),
        ));
    }

    finish(node, issues)
}

pub fn validate_vector_store_tool(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    const LABEL: &str = "Vector Store Tool";
    let mut issues = Vec::new();
    check_description(node, LABEL, ctx, &mut issues);

    if ctx.index.count(&node.name, AI_VECTOR_STORE) == 0 {
        issues.push(ValidationIssue::error(
            "MISSING_VECTOR_STORE",
            format!(
                "{} \"{}\" requires an ai_vectorStore connection. Connect a vector store node.",
                LABEL, node.name
            ),
        ));
    }
    if ctx.index.count(&node.name, AI_LANGUAGE_MODEL) == 0 {
        issues.push(ValidationIssue::error(
            "MISSING_LANGUAGE_MODEL",
            format!(
                "{} \"{}\" requires an ai_languageModel connection to summarize results.",
                LABEL, node.name
            ),
        ));
    }

    if let Some(top_k) = node.param("topK") {
        match top_k.as_f64() {
            Some(k) if k >= 1.0 => {
                if k > MAX_TOP_K {
                    issues.push(ValidationIssue::advice(
                        Severity::Warning,
                        format!(
                            "{} \"{}\" has topK={}. Large values return many documents and may exceed \
                             the model's context window.",
                            LABEL, node.name, top_k
                        ),
                    ));
                }
            }
            _ => issues.push(ValidationIssue::error(
                "INVALID_TOP_K",
                format!("{} \"{}\" has invalid topK. Must be a number >= 1.", LABEL, node.name),
            )),
        }
    }

    finish(node, issues)
}

pub fn validate_workflow_tool(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    const LABEL: &str = "Workflow Tool";
    let mut issues = Vec::new();
    check_description(node, LABEL, ctx, &mut issues);

    if node.param_str("source") == Some("parameter") {
        if node.param_non_empty("workflowJson").is_none() {
            issues.push(ValidationIssue::error(
                "MISSING_WORKFLOW_JSON",
                format!(
                    "{} \"{}\" has source=\"parameter\" but no workflowJson.",
                    LABEL, node.name
                ),
            ));
        }
    } else {
        // Either a plain id or a resource locator `{ "__rl": true, "value": ... }`.
        let workflow_id = node.param("workflowId").and_then(|v| match v {
            Value::String(s) => Some(s.as_str()),
            Value::Object(o) => o.get("value").and_then(Value::as_str),
            _ => None,
        });
        if workflow_id.is_none_or(|id| id.trim().is_empty()) {
            issues.push(ValidationIssue::error(
                "MISSING_WORKFLOW_ID",
                format!(
                    "{} \"{}\" has no workflowId. Select a sub-workflow to execute.",
                    LABEL, node.name
                ),
            ));
        }
    }

    finish(node, issues)
}

pub fn validate_agent_tool(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    const LABEL: &str = "AI Agent Tool";
    let mut issues = Vec::new();
    check_description(node, LABEL, ctx, &mut issues);

    if ctx.index.count(&node.name, AI_LANGUAGE_MODEL) == 0 {
        issues.push(ValidationIssue::error(
            "MISSING_LANGUAGE_MODEL",
            format!(
                "{} \"{}\" requires an ai_languageModel connection. Connect a language model node.",
                LABEL, node.name
            ),
        ));
    }
    check_max_iterations(node, LABEL, ctx, &mut issues);

    finish(node, issues)
}

pub fn validate_mcp_client_tool(node: &WorkflowNode, _ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    const LABEL: &str = "MCP Client Tool";
    let mut issues = Vec::new();

    let endpoint = node
        .param_non_empty("sseEndpoint")
        .or_else(|| node.param_non_empty("endpointUrl"));
    match endpoint {
        None => issues.push(ValidationIssue::error(
            "MISSING_SSE_ENDPOINT",
            format!(
                "{} \"{}\" has no sseEndpoint. Add the MCP server's endpoint URL.",
                LABEL, node.name
            ),
        )),
        Some(endpoint) if !is_expression(endpoint) => {
            let valid = url_scheme(endpoint).is_some_and(|s| s == "http" || s == "https");
            if !valid {
                issues.push(ValidationIssue::error(
                    "INVALID_URL_FORMAT",
                    format!(
                        "{} \"{}\" has an invalid endpoint URL. Must be a valid http:// or https:// URL.",
                        LABEL, node.name
                    ),
                ));
            }
        }
        Some(_) => {}
    }

    finish(node, issues)
}

/// Calculator and Think tools work without configuration.
pub fn no_required_config(_node: &WorkflowNode, _ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    Vec::new()
}

pub fn validate_serp_api_tool(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    const LABEL: &str = "SerpApi Tool";
    let mut issues = Vec::new();
    check_description(node, LABEL, ctx, &mut issues);
    check_credential(node, LABEL, "serpApi", &mut issues);
    finish(node, issues)
}

pub fn validate_wikipedia_tool(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_description(node, "Wikipedia Tool", ctx, &mut issues);
    finish(node, issues)
}

pub fn validate_searxng_tool(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    const LABEL: &str = "SearXNG Tool";
    let mut issues = Vec::new();
    check_description(node, LABEL, ctx, &mut issues);
    if node.param_non_empty("baseUrl").is_none() {
        check_credential(node, LABEL, "searXngApi", &mut issues);
    }
    finish(node, issues)
}

pub fn validate_wolfram_alpha_tool(node: &WorkflowNode, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    const LABEL: &str = "WolframAlpha Tool";
    let mut issues = Vec::new();
    check_description(node, LABEL, ctx, &mut issues);
    check_credential(node, LABEL, "wolframAlphaApi", &mut issues);
    finish(node, issues)
}
