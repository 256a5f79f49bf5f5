//! Diff/patch engine: applies a small batch of edit operations to a copy of
//! a workflow, re-validates the result and accepts or rejects it as a whole.
//!
//! Node operations always run before connection and metadata operations, so
//! a request may connect a node that it adds later in the same list.

pub mod apply;
pub mod operations;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::catalog::NodeCatalog;
use crate::config::EngineConfig;
use crate::error::{DiffError, Severity, ValidationIssue};
use crate::normalize::normalize_workflow;
use crate::parse::types::Workflow;
use crate::validate::collect_issues;

pub use apply::{apply_operation, derive_node_id};
pub use operations::{NodeRef, Operation};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRequest {
    pub operations: Vec<Operation>,
    /// Run everything but never hand back the mutated workflow.
    #[serde(default)]
    pub validate_only: bool,
    /// Skip failing operations instead of rejecting the whole batch.
    #[serde(default)]
    pub continue_on_error: bool,
}

impl DiffRequest {
    pub fn new(operations: Vec<Operation>) -> Self {
        DiffRequest {
            operations,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchResult {
    /// The patched workflow when accepted, otherwise the original.
    pub workflow: Workflow,
    pub accepted: bool,
    /// Whether the patched workflow passed validation. Differs from
    /// `accepted` only in validate-only mode.
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub operations_applied: usize,
    pub applied_operations: Vec<usize>,
    pub failed_operations: Vec<usize>,
}

impl PatchResult {
    fn rejected(original: &Workflow, issues: Vec<ValidationIssue>) -> Self {
        PatchResult {
            workflow: original.clone(),
            accepted: false,
            valid: false,
            issues,
            operations_applied: 0,
            applied_operations: Vec::new(),
            failed_operations: Vec::new(),
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|i| i.has_code(code))
    }
}

pub struct DiffEngine<'a> {
    catalog: &'a dyn NodeCatalog,
    config: EngineConfig,
}

impl<'a> DiffEngine<'a> {
    pub fn new(catalog: &'a dyn NodeCatalog, config: EngineConfig) -> Self {
        DiffEngine { catalog, config }
    }

    /// Apply `request` to a copy of `workflow`. The caller's workflow is never
    /// modified; on rejection the result carries an unchanged clone of it.
    #[instrument(level = "trace", skip_all, fields(operations = request.operations.len()))]
    pub fn apply(&self, workflow: &Workflow, request: &DiffRequest) -> PatchResult {
        let ops = &request.operations;
        let limit = self.config.max_operations;
        if ops.len() > limit {
            warn!(count = ops.len(), limit, "rejecting diff: too many operations");
            let issue = DiffError::TooManyOperations {
                count: ops.len(),
                limit,
            };
            return PatchResult::rejected(workflow, vec![issue.into()]);
        }

        let mut working = workflow.clone();
        let mut issues = Vec::new();
        let mut applied = Vec::new();
        let mut failed = Vec::new();

        let (node_ops, other_ops): (Vec<usize>, Vec<usize>) =
            (0..ops.len()).partition(|&i| ops[i].is_node_operation());

        for (pass, indices) in [(1, node_ops), (2, other_ops)] {
            debug!(pass, operations = indices.len(), "applying diff pass");
            for i in indices {
                let op = &ops[i];
                match apply_operation(&mut working, op) {
                    Ok(()) => applied.push(i),
                    Err(e) => {
                        debug!(index = i, code = e.code(), "operation failed");
                        failed.push(i);
                        issues.push(operation_issue(i, op, e, request.continue_on_error));
                        if !request.continue_on_error {
                            return PatchResult {
                                failed_operations: failed,
                                ..PatchResult::rejected(workflow, issues)
                            };
                        }
                    }
                }
            }
        }
        applied.sort_unstable();

        if applied.is_empty() && !failed.is_empty() {
            debug!("rejecting diff: no operation applied");
            return PatchResult {
                failed_operations: failed,
                ..PatchResult::rejected(workflow, issues)
            };
        }

        // Validate the normalized form; the returned workflow keeps the
        // caller's type spellings.
        let validation = collect_issues(&normalize_workflow(&working), self.catalog, &self.config);
        let valid = !validation.iter().any(ValidationIssue::is_error);
        issues.extend(validation);

        let accepted = valid && !request.validate_only;
        if !valid {
            debug!("rejecting diff: patched workflow has errors");
        }
        PatchResult {
            workflow: if accepted { working } else { workflow.clone() },
            accepted,
            valid,
            issues,
            operations_applied: applied.len(),
            applied_operations: applied,
            failed_operations: failed,
        }
    }
}

/// Operation failures in continue-on-error mode are reported as warnings:
/// they were skipped and only final validation decides acceptance.
fn operation_issue(index: usize, op: &Operation, error: DiffError, skipped: bool) -> ValidationIssue {
    let mut issue = ValidationIssue::from(error);
    issue.message = format!("Operation {} ({}): {}", index, op.kind(), issue.message);
    if skipped {
        issue.severity = Severity::Warning;
    }
    issue
}

/// One-shot convenience over [`DiffEngine`] with the default configuration.
pub fn apply_diff(
    workflow: &Workflow,
    operations: Vec<Operation>,
    validate_only: bool,
    catalog: &dyn NodeCatalog,
) -> PatchResult {
    let request = DiffRequest {
        operations,
        validate_only,
        continue_on_error: false,
    };
    DiffEngine::new(catalog, EngineConfig::default()).apply(workflow, &request)
}
