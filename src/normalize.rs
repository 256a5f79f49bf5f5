//! Node type normalization.
//!
//! First-party node types arrive in several historical spellings
//! (`n8n-nodes-base.httpRequest`, `@n8n/n8n-nodes-langchain.agent`, ...).
//! Every lookup and comparison in the crate uses the short canonical form.

use crate::parse::types::Workflow;

pub const BASE_PREFIX: &str = "nodes-base.";
pub const LANGCHAIN_PREFIX: &str = "nodes-langchain.";

/// Historical prefix → canonical prefix. Longest spellings first.
const PREFIX_ALIASES: &[(&str, &str)] = &[
    ("@n8n/n8n-nodes-langchain.", LANGCHAIN_PREFIX),
    ("@n8n/nodes-langchain.", LANGCHAIN_PREFIX),
    ("n8n-nodes-langchain.", LANGCHAIN_PREFIX),
    ("@n8n/n8n-nodes-base.", BASE_PREFIX),
    ("n8n-nodes-base.", BASE_PREFIX),
];

/// Canonicalize a node type. Unknown and community types are returned as-is.
pub fn normalize(node_type: &str) -> String {
    for (alias, canonical) in PREFIX_ALIASES {
        if let Some(rest) = node_type.strip_prefix(alias) {
            return format!("{canonical}{rest}");
        }
    }
    node_type.to_string()
}

pub fn normalize_all<S: AsRef<str>>(types: &[S]) -> Vec<String> {
    types.iter().map(|t| normalize(t.as_ref())).collect()
}

/// Copy of `workflow` with every node's `type` canonicalized.
pub fn normalize_workflow(workflow: &Workflow) -> Workflow {
    let mut normalized = workflow.clone();
    normalize_workflow_in_place(&mut normalized);
    normalized
}

pub(crate) fn normalize_workflow_in_place(workflow: &mut Workflow) {
    for node in &mut workflow.nodes {
        node.node_type = normalize(&node.node_type);
    }
}

/// Type name after the package prefix, e.g. `agent` for `nodes-langchain.agent`.
pub fn short_name(node_type: &str) -> &str {
    node_type
        .rsplit_once('.')
        .map(|(_, name)| name)
        .unwrap_or(node_type)
}

pub fn is_langchain(node_type: &str) -> bool {
    normalize(node_type).starts_with(LANGCHAIN_PREFIX)
}
