//! AI Agent, Chat Trigger and Basic LLM Chain rules.

mod helpers;

use flowguard::error::Severity;
use flowguard::graph::{AI_LANGUAGE_MODEL, AI_MEMORY, AI_OUTPUT_PARSER, AI_TOOL};
use flowguard::parse::types::Workflow;
use helpers::*;
use serde_json::{Value, json};

fn agent_workflow(agent_params: Value, models: usize) -> Workflow {
    let mut nodes = vec![
        node("Start", MANUAL_TRIGGER),
        node_with_params("AI Agent", AGENT, agent_params),
    ];
    for i in 1..=models {
        nodes.push(node(&format!("Model {}", i), OPENAI_CHAT));
    }
    let mut wf = workflow(nodes);
    connect(&mut wf, "Start", "AI Agent");
    for i in 1..=models {
        connect_port(&mut wf, &format!("Model {}", i), AI_LANGUAGE_MODEL, "AI Agent");
    }
    wf
}

const CARDINALITY_CODES: &[&str] = &[
    "MISSING_LANGUAGE_MODEL",
    "TOO_MANY_LANGUAGE_MODELS",
    "FALLBACK_MISSING_SECOND_MODEL",
];

// ---------------------------------------------------------------------------
// Language model cardinality
// ---------------------------------------------------------------------------

#[test]
fn zero_models_yields_exactly_one_missing_model_error() {
    for params in [json!({}), json!({ "needsFallback": true }), json!({ "needsFallback": false })] {
        let report = validate(&agent_workflow(params, 0));
        assert_eq!(report.count_code("MISSING_LANGUAGE_MODEL"), 1);
    }
}

#[test]
fn one_model_never_missing() {
    for params in [json!({}), json!({ "needsFallback": true })] {
        let report = validate(&agent_workflow(params, 1));
        assert!(!report.has_code("MISSING_LANGUAGE_MODEL"));
    }
}

#[test]
fn one_model_with_fallback_needs_a_second() {
    let report = validate(&agent_workflow(json!({ "needsFallback": true }), 1));
    assert!(error_codes(&report).contains(&"FALLBACK_MISSING_SECOND_MODEL"));
}

#[test]
fn two_models_with_fallback_is_clean() {
    let report = validate(&agent_workflow(json!({ "needsFallback": true }), 2));
    let codes = error_codes(&report);
    assert!(CARDINALITY_CODES.iter().all(|c| !codes.contains(c)), "{:?}", codes);
    assert!(!report.warnings.iter().any(|w| w.message.contains("needsFallback")));
}

#[test]
fn two_models_without_fallback_is_a_warning() {
    let report = validate(&agent_workflow(json!({}), 2));
    let codes = error_codes(&report);
    assert!(CARDINALITY_CODES.iter().all(|c| !codes.contains(c)), "{:?}", codes);
    let warning = report
        .warnings
        .iter()
        .find(|w| w.message.contains("needsFallback"))
        .expect("Should warn about the second model");
    assert_eq!(warning.severity, Severity::Warning);
    assert_eq!(warning.node_name.as_deref(), Some("AI Agent"));
}

#[test]
fn three_models_is_too_many() {
    let report = validate(&agent_workflow(json!({ "needsFallback": true }), 3));
    assert!(error_codes(&report).contains(&"TOO_MANY_LANGUAGE_MODELS"));
}

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_lone_agent() {
    let wf = workflow(vec![node("AI Agent", AGENT)]);
    let report = validate(&wf);
    assert_eq!(error_codes(&report), ["MISSING_LANGUAGE_MODEL"]);
}

#[test]
fn scenario_agent_with_model() {
    let mut wf = workflow(vec![node("AI Agent", AGENT), node("OpenAI", OPENAI_CHAT)]);
    connect_port(&mut wf, "OpenAI", AI_LANGUAGE_MODEL, "AI Agent");
    let report = validate(&wf);
    assert_eq!(report.count_code("MISSING_LANGUAGE_MODEL"), 0);
}

#[test]
fn scenario_agent_with_tool_only() {
    let mut wf = workflow(vec![node("AI Agent", AGENT), node("Calculator", CALCULATOR)]);
    connect_port(&mut wf, "Calculator", AI_TOOL, "AI Agent");
    let report = validate(&wf);
    assert!(error_codes(&report).contains(&"MISSING_LANGUAGE_MODEL"));
    assert!(!report.has_code("NO_TOOLS"));
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

fn streaming_workflow(agent_has_output: bool) -> Workflow {
    let mut wf = workflow(vec![
        node_with_params(
            "Chat",
            CHAT_TRIGGER,
            json!({ "options": { "responseMode": "streaming" } }),
        ),
        node("AI Agent", AGENT),
        node("OpenAI", OPENAI_CHAT),
        node("Log", SET),
    ]);
    connect(&mut wf, "Chat", "AI Agent");
    connect_port(&mut wf, "OpenAI", AI_LANGUAGE_MODEL, "AI Agent");
    if agent_has_output {
        connect(&mut wf, "AI Agent", "Log");
    }
    wf
}

#[test]
fn streaming_agent_with_main_output() {
    let report = validate(&streaming_workflow(true));
    let codes = error_codes(&report);
    assert!(codes.contains(&"STREAMING_WITH_MAIN_OUTPUT"));
    assert!(codes.contains(&"STREAMING_AGENT_HAS_OUTPUT"));
}

#[test]
fn streaming_agent_without_main_output() {
    let mut wf = streaming_workflow(false);
    wf.nodes.retain(|n| n.name != "Log");
    let report = validate(&wf);
    assert!(report.valid, "{:?}", report.errors);
    assert!(!report.has_code("CONSIDER_STREAMING"));
}

#[test]
fn stream_response_option_also_forbids_main_output() {
    let mut wf = workflow(vec![
        node("Start", MANUAL_TRIGGER),
        node_with_params("AI Agent", AGENT, json!({ "options": { "streamResponse": true } })),
        node("OpenAI", OPENAI_CHAT),
        node("Log", SET),
    ]);
    connect(&mut wf, "Start", "AI Agent");
    connect_port(&mut wf, "OpenAI", AI_LANGUAGE_MODEL, "AI Agent");
    connect(&mut wf, "AI Agent", "Log");
    let report = validate(&wf);
    let issue = report
        .errors
        .iter()
        .find(|e| e.has_code("STREAMING_WITH_MAIN_OUTPUT"))
        .expect("Should flag streamResponse with main output");
    assert!(issue.message.contains("streamResponse"));
}

#[test]
fn streaming_trigger_into_non_agent() {
    let mut wf = workflow(vec![
        node_with_params("Chat", CHAT_TRIGGER, json!({ "responseMode": "streaming" })),
        node("Log", SET),
    ]);
    connect(&mut wf, "Chat", "Log");
    assert!(error_codes(&validate(&wf)).contains(&"STREAMING_WRONG_TARGET"));
}

#[test]
fn chat_trigger_without_connections() {
    let wf = workflow(vec![node("Chat", CHAT_TRIGGER)]);
    assert!(error_codes(&validate(&wf)).contains(&"MISSING_CONNECTIONS"));
}

#[test]
fn last_node_mode_suggests_streaming() {
    let mut wf = streaming_workflow(false);
    wf.nodes.retain(|n| n.name != "Log");
    wf.nodes[0].parameters = serde_json::Map::new();
    let report = validate(&wf);
    assert!(report.infos.iter().any(|i| i.has_code("CONSIDER_STREAMING")));
    assert!(!report.has_code("STREAMING_WITH_MAIN_OUTPUT"));
}

// ---------------------------------------------------------------------------
// Other agent rules
// ---------------------------------------------------------------------------

#[test]
fn output_parser_must_match_flag() {
    let report = validate(&agent_workflow(json!({ "hasOutputParser": true }), 1));
    assert!(error_codes(&report).contains(&"MISSING_OUTPUT_PARSER"));

    let mut wf = agent_workflow(json!({}), 1);
    wf.nodes.push(node("Parser", "@n8n/n8n-nodes-langchain.outputParserStructured"));
    connect_port(&mut wf, "Parser", AI_OUTPUT_PARSER, "AI Agent");
    let report = validate(&wf);
    assert!(report.warnings.iter().any(|w| w.message.contains("hasOutputParser")));
}

#[test]
fn define_prompt_needs_text() {
    let report = validate(&agent_workflow(json!({ "promptType": "define", "text": "  " }), 1));
    assert!(error_codes(&report).contains(&"MISSING_PROMPT_TEXT"));

    let report = validate(&agent_workflow(
        json!({ "promptType": "define", "text": "={{ $json.chatInput }}" }),
        1,
    ));
    assert!(!report.has_code("MISSING_PROMPT_TEXT"));
}

#[test]
fn max_iterations_rules() {
    let report = validate(&agent_workflow(json!({ "maxIterations": "ten" }), 1));
    assert!(error_codes(&report).contains(&"INVALID_MAX_ITERATIONS_TYPE"));

    let report = validate(&agent_workflow(json!({ "options": { "maxIterations": 0 } }), 1));
    assert!(error_codes(&report).contains(&"MAX_ITERATIONS_TOO_LOW"));

    let report = validate(&agent_workflow(json!({ "maxIterations": 100 }), 1));
    assert!(report.valid, "{:?}", report.errors);
    assert!(report.warnings.iter().any(|w| w.message.contains("maxIterations=100")));
}

#[test]
fn one_memory_only() {
    let mut wf = agent_workflow(json!({}), 1);
    wf.nodes.push(node("Memory A", MEMORY));
    wf.nodes.push(node("Memory B", MEMORY));
    connect_port(&mut wf, "Memory A", AI_MEMORY, "AI Agent");
    connect_port(&mut wf, "Memory B", AI_MEMORY, "AI Agent");
    assert!(error_codes(&validate(&wf)).contains(&"MULTIPLE_MEMORY_CONNECTIONS"));
}

#[test]
fn disabled_agent_is_not_checked() {
    let mut wf = agent_workflow(json!({}), 0);
    wf.nodes[1].disabled = true;
    assert!(!validate(&wf).has_code("MISSING_LANGUAGE_MODEL"));
}

// ---------------------------------------------------------------------------
// Basic LLM Chain
// ---------------------------------------------------------------------------

#[test]
fn chain_rules() {
    let mut wf = workflow(vec![
        node("Start", MANUAL_TRIGGER),
        node_with_params("Chain", CHAIN_LLM, json!({ "promptType": "define" })),
        node("Model 1", OPENAI_CHAT),
        node("Model 2", OPENAI_CHAT),
        node("Calculator", CALCULATOR),
    ]);
    connect(&mut wf, "Start", "Chain");
    connect_port(&mut wf, "Model 1", AI_LANGUAGE_MODEL, "Chain");
    connect_port(&mut wf, "Model 2", AI_LANGUAGE_MODEL, "Chain");
    connect_port(&mut wf, "Calculator", AI_TOOL, "Chain");

    let report = validate(&wf);
    let codes = error_codes(&report);
    assert!(codes.contains(&"MULTIPLE_LANGUAGE_MODELS"));
    assert!(codes.contains(&"TOOLS_NOT_SUPPORTED"));
    assert!(codes.contains(&"MISSING_PROMPT_TEXT"));
}

#[test]
fn chain_without_model() {
    let mut wf = workflow(vec![node("Start", MANUAL_TRIGGER), node("Chain", CHAIN_LLM)]);
    connect(&mut wf, "Start", "Chain");
    assert_eq!(error_codes(&validate(&wf)), ["MISSING_LANGUAGE_MODEL"]);
}
