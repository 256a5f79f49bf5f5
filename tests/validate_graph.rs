//! Integration tests for graph-level validation rules.

mod helpers;

use flowguard::config::EngineConfig;
use flowguard::error::Severity;
use flowguard::validate::validate_workflow;
use helpers::*;
use serde_json::json;

#[test]
fn ai_agent_workflow_passes() {
    let workflow = load_fixture(include_str!("fixtures/ai_agent_workflow.json"));
    let report = validate(&workflow);
    assert!(report.valid, "Expected no validation errors, got: {:?}", report.errors);
    insta::assert_json_snapshot!("ai_agent_report", report);
}

#[test]
fn error_output_in_success_branch_is_flagged() {
    let workflow = load_fixture(include_str!("fixtures/error_output_mixed.json"));
    let report = validate(&workflow);
    let issue = report
        .errors
        .iter()
        .find(|e| e.has_code("INCORRECT_ERROR_OUTPUT"))
        .expect("Should flag mixed error output");
    assert!(issue.message.starts_with("Incorrect error output configuration"));
    assert!(issue.message.contains("\"Error Handler\""));
    assert_eq!(issue.node_name.as_deref(), Some("Fetch Order"));
}

#[test]
fn success_branch_of_only_handlers_is_not_mixed() {
    let mut wf = workflow(vec![
        node("Start", MANUAL_TRIGGER),
        node("Fetch Order", HTTP_REQUEST),
        node("Error Handler", SET),
        node("Failure Alert", SET),
    ]);
    connect(&mut wf, "Start", "Fetch Order");
    connect(&mut wf, "Fetch Order", "Error Handler");
    connect(&mut wf, "Fetch Order", "Failure Alert");
    assert!(!validate(&wf).has_code("INCORRECT_ERROR_OUTPUT"));
}

#[test]
fn error_output_split_with_on_error_passes() {
    let workflow = load_fixture(include_str!("fixtures/error_output_split.json"));
    let report = validate(&workflow);
    assert!(!report.has_code("INCORRECT_ERROR_OUTPUT"));
    assert!(report.valid, "{:?}", report.errors);
}

#[test]
fn on_error_without_error_branch() {
    let mut workflow = load_fixture(include_str!("fixtures/error_output_split.json"));
    workflow.connections["Fetch Order"]["main"].truncate(1);
    let report = validate(&workflow);
    assert!(error_codes(&report).contains(&"ERROR_OUTPUT_NOT_CONNECTED"));
}

#[test]
fn error_branch_without_on_error() {
    let mut workflow = load_fixture(include_str!("fixtures/error_output_split.json"));
    workflow.nodes[1].on_error = None;
    let report = validate(&workflow);
    assert!(report.warnings.iter().any(|w| w.has_code("MISSING_ON_ERROR")));
    // The error bucket is now beyond the single declared output.
    assert!(error_codes(&report).contains(&"INVALID_OUTPUT_INDEX"));
}

#[test]
fn empty_workflow() {
    let report = validate(&workflow(vec![]));
    assert_eq!(error_codes(&report), ["EMPTY_WORKFLOW"]);
}

#[test]
fn duplicate_names_and_ids() {
    let mut second = node("Start", SET);
    second.id = "id-start".into();
    let wf = workflow(vec![node("Start", MANUAL_TRIGGER), second]);
    let report = validate(&wf);
    let codes = error_codes(&report);
    assert!(codes.contains(&"DUPLICATE_NODE_NAME"));
    assert!(codes.contains(&"DUPLICATE_NODE_ID"));
}

#[test]
fn no_trigger_is_a_warning() {
    let mut wf = workflow(vec![node("A", SET), node("B", SET)]);
    connect(&mut wf, "A", "B");
    let report = validate(&wf);
    assert!(report.valid);
    assert!(report.warnings.iter().any(|w| w.has_code("NO_TRIGGER")));
    assert!(report.suggestions.iter().any(|s| s.contains("trigger")));
}

#[test]
fn cycle_detection() {
    let mut wf = workflow(vec![node("Start", MANUAL_TRIGGER), node("A", SET), node("B", SET)]);
    connect(&mut wf, "Start", "A");
    connect(&mut wf, "A", "B");
    connect(&mut wf, "B", "A");
    let report = validate(&wf);
    let cycle = report
        .errors
        .iter()
        .find(|e| e.has_code("WORKFLOW_CYCLE"))
        .expect("Should detect cycle");
    assert!(cycle.message.contains("A -> B"));
}

#[test]
fn loop_node_cycles_are_allowed() {
    let mut wf = workflow(vec![
        node("Start", MANUAL_TRIGGER),
        node("Loop", "n8n-nodes-base.splitInBatches"),
        node("Work", SET),
    ]);
    connect(&mut wf, "Start", "Loop");
    connect_at(&mut wf, "Loop", "main", 1, "Work");
    connect(&mut wf, "Work", "Loop");
    assert!(!validate(&wf).has_code("WORKFLOW_CYCLE"));
}

#[test]
fn disconnected_node() {
    let mut wf = workflow(vec![node("Start", MANUAL_TRIGGER), node("A", SET), node("Lonely", SET)]);
    connect(&mut wf, "Start", "A");
    let report = validate(&wf);
    let disconnected: Vec<_> = report
        .warnings
        .iter()
        .filter(|w| w.has_code("DISCONNECTED_NODE"))
        .collect();
    assert_eq!(disconnected.len(), 1);
    assert_eq!(disconnected[0].node_name.as_deref(), Some("Lonely"));
}

#[test]
fn connections_must_use_names() {
    let workflow = load_fixture(include_str!("fixtures/malformed_connections.json"));
    let report = validate(&workflow);
    let codes = error_codes(&report);
    assert!(codes.contains(&"CONNECTION_USES_NODE_ID"));
    assert!(codes.contains(&"UNKNOWN_SOURCE_NODE"));
    assert_eq!(report.count_code("MALFORMED_CONNECTION"), 3);
    assert!(report.statistics.invalid_connections > 0);
    assert_eq!(report.statistics.valid_connections, 1);
}

#[test]
fn unknown_target_node() {
    let mut wf = workflow(vec![node("Start", MANUAL_TRIGGER), node("A", SET)]);
    connect(&mut wf, "Start", "A");
    connect(&mut wf, "A", "Nowhere");
    assert!(error_codes(&validate(&wf)).contains(&"UNKNOWN_TARGET_NODE"));
}

#[test]
fn if_node_may_use_two_outputs_but_not_three() {
    let mut wf = workflow(vec![
        node("Start", MANUAL_TRIGGER),
        node("Check", IF),
        node("Yes", SET),
        node("No", SET),
    ]);
    connect(&mut wf, "Start", "Check");
    connect_at(&mut wf, "Check", "main", 0, "Yes");
    connect_at(&mut wf, "Check", "main", 1, "No");
    assert!(validate(&wf).valid);

    connect_at(&mut wf, "Check", "main", 2, "No");
    assert!(error_codes(&validate(&wf)).contains(&"INVALID_OUTPUT_INDEX"));
}

#[test]
fn duplicate_connection_warning() {
    let mut wf = workflow(vec![node("Start", MANUAL_TRIGGER), node("A", SET)]);
    connect(&mut wf, "Start", "A");
    connect(&mut wf, "Start", "A");
    assert_eq!(validate(&wf).count_code("DUPLICATE_CONNECTION"), 1);
}

#[test]
fn type_versions_checked_against_catalog() {
    let mut missing = node("Start", MANUAL_TRIGGER);
    missing.type_version = None;
    let mut newer = node("A", SET);
    newer.type_version = Some(serde_json::Number::from(3));
    let mut wf = workflow(vec![missing, newer]);
    connect(&mut wf, "Start", "A");

    let report = validate(&wf);
    let codes = error_codes(&report);
    assert!(codes.contains(&"MISSING_TYPE_VERSION"));
    assert!(codes.contains(&"INVALID_TYPE_VERSION"));
}

#[test]
fn unknown_type_is_only_a_warning() {
    let mut wf = workflow(vec![node("Start", MANUAL_TRIGGER), node("Custom", "acme-nodes.widget")]);
    connect(&mut wf, "Start", "Custom");
    let report = validate(&wf);
    assert!(report.valid);
    assert!(report.warnings.iter().any(|w| w.has_code("UNKNOWN_NODE_TYPE")));
}

#[test]
fn disabled_nodes_skip_catalog_checks() {
    let mut custom = node("Custom", "acme-nodes.widget");
    custom.disabled = true;
    let mut wf = workflow(vec![node("Start", MANUAL_TRIGGER), custom]);
    connect(&mut wf, "Start", "Custom");
    assert!(!validate(&wf).has_code("UNKNOWN_NODE_TYPE"));
}

#[test]
fn expression_lint() {
    let mut wf = workflow(vec![
        node("Start", MANUAL_TRIGGER),
        node_with_params(
            "Set Fields",
            SET,
            json!({
                "a": "{{ $json.id }}",
                "b": "={{ $('Start').item.json.id",
                "c": "={{ $node[\"Missing\"].json.id }}"
            }),
        ),
    ]);
    connect(&mut wf, "Start", "Set Fields");

    let report = validate(&wf);
    assert!(report.warnings.iter().any(|w| w.has_code("EXPRESSION_MISSING_PREFIX")));
    let codes = error_codes(&report);
    assert!(codes.contains(&"UNBALANCED_EXPRESSION"));
    assert!(codes.contains(&"UNKNOWN_NODE_REFERENCE"));
    assert_eq!(report.statistics.expressions_validated, 3);
}

#[test]
fn config_toggles_switch_off_rule_groups() {
    let mut wf = workflow(vec![
        node("Start", MANUAL_TRIGGER),
        node_with_params("Set Fields", SET, json!({ "c": "={{ $('Missing').item }}" })),
    ]);
    connect(&mut wf, "Start", "Set Fields");
    connect(&mut wf, "Start", "Ghost");

    let config = EngineConfig {
        validate_connections: false,
        validate_expressions: false,
        ..EngineConfig::default()
    };
    let report = validate_workflow(&wf, &catalog(), &config);
    assert!(report.valid, "{:?}", report.errors);
    assert_eq!(report.statistics.expressions_validated, 0);
}

#[test]
fn report_splits_by_severity() {
    let mut wf = workflow(vec![node("Start", MANUAL_TRIGGER), node("Agent", AGENT)]);
    connect(&mut wf, "Start", "Agent");
    let report = validate(&wf);
    assert!(report.errors.iter().all(|i| i.severity == Severity::Error));
    assert!(report.warnings.iter().all(|i| i.severity == Severity::Warning));
    assert!(report.infos.iter().all(|i| i.severity == Severity::Info));
    assert!(!report.infos.is_empty());
    assert_eq!(report.statistics.total_nodes, 2);
    assert_eq!(report.statistics.trigger_nodes, 1);
}
