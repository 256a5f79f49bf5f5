//! Workflow validation: structural rules, node catalog checks, expression
//! lint and the per-node-class rule registry, accumulated into one report.

pub mod error_output;
pub mod expressions;
pub mod node_rules;
pub mod structural;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::catalog::NodeCatalog;
use crate::config::EngineConfig;
use crate::error::{Severity, ValidationIssue};
use crate::graph::ReverseIndex;
use crate::normalize::normalize_workflow;
use crate::parse::types::Workflow;

use node_rules::RuleContext;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStatistics {
    pub total_nodes: usize,
    pub enabled_nodes: usize,
    pub trigger_nodes: usize,
    pub valid_connections: usize,
    pub invalid_connections: usize,
    pub expressions_validated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub infos: Vec<ValidationIssue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    pub statistics: ValidationStatistics,
}

impl ValidationReport {
    fn from_issues(issues: Vec<ValidationIssue>, statistics: ValidationStatistics) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut infos = Vec::new();
        for issue in issues {
            match issue.severity {
                Severity::Error => errors.push(issue),
                Severity::Warning => warnings.push(issue),
                Severity::Info => infos.push(issue),
            }
        }

        let mut suggestions: Vec<String> = infos.iter().map(|i| i.message.clone()).collect();
        if warnings.iter().any(|w| w.has_code("NO_TRIGGER")) {
            suggestions.push(
                "Add a trigger node (e.g. Webhook, Schedule Trigger, Manual Trigger) to start the workflow"
                    .into(),
            );
        }
        if statistics.invalid_connections > 0 {
            suggestions.push(
                "Check node names in connections - they must match node names exactly, not node ids"
                    .into(),
            );
        }

        ValidationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
            infos,
            suggestions,
            statistics,
        }
    }

    /// Every issue regardless of severity, errors first.
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .chain(self.infos.iter())
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.issues().any(|i| i.has_code(code))
    }

    pub fn count_code(&self, code: &str) -> usize {
        self.issues().filter(|i| i.has_code(code)).count()
    }
}

/// Validate a workflow. Node types are normalized on a copy first; the
/// caller's value is never touched.
#[instrument(level = "trace", skip_all, fields(nodes = workflow.nodes.len()))]
pub fn validate_workflow(
    workflow: &Workflow,
    catalog: &dyn NodeCatalog,
    config: &EngineConfig,
) -> ValidationReport {
    let normalized = normalize_workflow(workflow);
    let (issues, statistics) = run_checks(&normalized, catalog, config);
    let report = ValidationReport::from_issues(issues, statistics);
    debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "workflow validated"
    );
    report
}

/// Flat issue list for an already-normalized workflow.
pub fn collect_issues(
    workflow: &Workflow,
    catalog: &dyn NodeCatalog,
    config: &EngineConfig,
) -> Vec<ValidationIssue> {
    run_checks(workflow, catalog, config).0
}

fn run_checks(
    workflow: &Workflow,
    catalog: &dyn NodeCatalog,
    config: &EngineConfig,
) -> (Vec<ValidationIssue>, ValidationStatistics) {
    let index = ReverseIndex::build(workflow);
    let mut issues = Vec::new();
    let mut statistics = ValidationStatistics {
        total_nodes: workflow.nodes.len(),
        enabled_nodes: workflow.nodes.iter().filter(|n| !n.disabled).count(),
        trigger_nodes: workflow
            .nodes
            .iter()
            .filter(|n| structural::is_trigger(n, catalog))
            .count(),
        ..Default::default()
    };

    issues.extend(structural::validate_nodes_structure(workflow, catalog));

    if config.validate_nodes {
        issues.extend(structural::validate_node_catalog(workflow, catalog));
    }

    if config.validate_connections {
        let counts = structural::validate_connections(workflow, catalog, &mut issues);
        statistics.valid_connections = counts.valid;
        statistics.invalid_connections = counts.invalid;
        issues.extend(error_output::validate_error_outputs(workflow, catalog));
        issues.extend(structural::validate_topology(workflow, &index, catalog));
    }

    if config.validate_expressions {
        statistics.expressions_validated =
            expressions::validate_expressions(workflow, &mut issues);
    }

    if config.validate_nodes {
        let ctx = RuleContext {
            workflow,
            index: &index,
            config,
        };
        issues.extend(node_rules::validate_all(&ctx));
    }

    (issues, statistics)
}
