#![allow(dead_code)]

use flowguard::catalog::{NodeDescriptor, StaticCatalog};
use flowguard::config::EngineConfig;
use flowguard::parse::types::{ConnectionTarget, Workflow, WorkflowNode};
use flowguard::validate::{ValidationReport, validate_workflow};
use serde_json::{Map, Number, Value};

// =============================================================================
// Node type names as they appear in exported workflows
// =============================================================================

pub const MANUAL_TRIGGER: &str = "n8n-nodes-base.manualTrigger";
pub const WEBHOOK: &str = "n8n-nodes-base.webhook";
pub const SET: &str = "n8n-nodes-base.set";
pub const HTTP_REQUEST: &str = "n8n-nodes-base.httpRequest";
pub const IF: &str = "n8n-nodes-base.if";
pub const AGENT: &str = "@n8n/n8n-nodes-langchain.agent";
pub const CHAT_TRIGGER: &str = "@n8n/n8n-nodes-langchain.chatTrigger";
pub const CHAIN_LLM: &str = "@n8n/n8n-nodes-langchain.chainLlm";
pub const OPENAI_CHAT: &str = "@n8n/n8n-nodes-langchain.lmChatOpenAi";
pub const MEMORY: &str = "@n8n/n8n-nodes-langchain.memoryBufferWindow";
pub const CALCULATOR: &str = "@n8n/n8n-nodes-langchain.toolCalculator";
pub const HTTP_TOOL: &str = "@n8n/n8n-nodes-langchain.toolHttpRequest";
pub const CODE_TOOL: &str = "@n8n/n8n-nodes-langchain.toolCode";

// =============================================================================
// Workflow builders
// =============================================================================

pub fn node(name: &str, node_type: &str) -> WorkflowNode {
    WorkflowNode {
        id: format!("id-{}", name.to_lowercase().replace(' ', "-")),
        name: name.into(),
        node_type: node_type.into(),
        type_version: Some(Number::from(1)),
        ..Default::default()
    }
}

pub fn node_with_params(name: &str, node_type: &str, parameters: Value) -> WorkflowNode {
    let mut n = node(name, node_type);
    n.parameters = match parameters {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    n
}

pub fn workflow(nodes: Vec<WorkflowNode>) -> Workflow {
    Workflow {
        name: Some("Test Workflow".into()),
        nodes,
        ..Default::default()
    }
}

/// `source --main[0]--> target`.
pub fn connect(wf: &mut Workflow, source: &str, target: &str) {
    connect_at(wf, source, "main", 0, target);
}

/// Capability edge, e.g. `ai_languageModel` from a model into an agent.
pub fn connect_port(wf: &mut Workflow, source: &str, port: &str, target: &str) {
    connect_at(wf, source, port, 0, target);
}

pub fn connect_at(wf: &mut Workflow, source: &str, port: &str, output: usize, target: &str) {
    let buckets = wf
        .connections
        .entry(source.to_string())
        .or_default()
        .entry(port.to_string())
        .or_default();
    if buckets.len() <= output {
        buckets.resize_with(output + 1, Vec::new);
    }
    buckets[output].push(ConnectionTarget::new(target, port, 0));
}

// =============================================================================
// Catalog + validation shortcuts
// =============================================================================

fn descriptor(node_type: &str, outputs: Option<usize>, is_trigger: bool) -> NodeDescriptor {
    NodeDescriptor {
        node_type: node_type.into(),
        latest_version: Some(1.0),
        is_versioned: true,
        inputs: if is_trigger { Some(0) } else { None },
        outputs,
        is_trigger,
        ..Default::default()
    }
}

pub fn catalog() -> StaticCatalog {
    StaticCatalog::from_descriptors([
        descriptor(MANUAL_TRIGGER, Some(1), true),
        descriptor(WEBHOOK, Some(1), true),
        descriptor(SET, Some(1), false),
        descriptor(HTTP_REQUEST, Some(1), false),
        descriptor(IF, Some(2), false),
        descriptor(AGENT, Some(1), false),
        descriptor(CHAT_TRIGGER, Some(1), true),
        descriptor(CHAIN_LLM, Some(1), false),
        descriptor(OPENAI_CHAT, None, false),
        descriptor(MEMORY, None, false),
        NodeDescriptor {
            is_ai_tool: true,
            ..descriptor(CALCULATOR, None, false)
        },
        NodeDescriptor {
            is_ai_tool: true,
            ..descriptor(HTTP_TOOL, None, false)
        },
        NodeDescriptor {
            is_ai_tool: true,
            ..descriptor(CODE_TOOL, None, false)
        },
    ])
}

pub fn validate(wf: &Workflow) -> ValidationReport {
    validate_workflow(wf, &catalog(), &EngineConfig::default())
}

pub fn error_codes(report: &ValidationReport) -> Vec<&str> {
    report
        .errors
        .iter()
        .filter_map(|e| e.code.as_deref())
        .collect()
}

pub fn load_fixture(json: &str) -> Workflow {
    flowguard::parse::parse(json).expect("fixture should parse")
}
