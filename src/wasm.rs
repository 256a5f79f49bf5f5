//! WASM entry points for browser use.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::catalog::StaticCatalog;
use crate::config::EngineConfig;
use crate::diff::{DiffEngine, DiffRequest, PatchResult};
use crate::error::ValidationIssue;
use crate::validate::ValidationReport;

/// Validate a workflow JSON against a catalog JSON (array of node descriptors).
/// Returns a `ValidationReport`, or `{ status: "errors" }` when an input fails to parse.
#[wasm_bindgen]
pub fn validate_workflow(json: &str, catalog_json: &str) -> JsValue {
    to_js(&validate_workflow_inner(json, catalog_json))
}

fn validate_workflow_inner(json: &str, catalog_json: &str) -> WasmResult<ValidationReport> {
    let catalog = match parse_catalog(catalog_json) {
        Ok(c) => c,
        Err(errors) => return WasmResult::Errors(errors),
    };
    let workflow = match crate::parse::parse(json) {
        Ok(w) => w,
        Err(errors) => return WasmResult::Errors(errors),
    };

    let report = crate::validate::validate_workflow(&workflow, &catalog, &EngineConfig::default());
    WasmResult::Success(report)
}

/// Apply a diff request JSON (`{ operations, validateOnly?, continueOnError? }`)
/// to a workflow JSON. Returns a `PatchResult`.
#[wasm_bindgen]
pub fn apply_workflow_diff(workflow_json: &str, request_json: &str, catalog_json: &str) -> JsValue {
    to_js(&apply_workflow_diff_inner(workflow_json, request_json, catalog_json))
}

fn apply_workflow_diff_inner(
    workflow_json: &str,
    request_json: &str,
    catalog_json: &str,
) -> WasmResult<PatchResult> {
    let catalog = match parse_catalog(catalog_json) {
        Ok(c) => c,
        Err(errors) => return WasmResult::Errors(errors),
    };
    let workflow = match crate::parse::parse(workflow_json) {
        Ok(w) => w,
        Err(errors) => return WasmResult::Errors(errors),
    };
    let request = match serde_json::from_str::<DiffRequest>(request_json) {
        Ok(r) => r,
        Err(e) => {
            return WasmResult::Errors(vec![ValidationIssue::error(
                "INVALID_JSON",
                format!("Failed to parse diff request JSON: {}", e),
            )]);
        }
    };

    let engine = DiffEngine::new(&catalog, EngineConfig::default());
    WasmResult::Success(engine.apply(&workflow, &request))
}

/// Canonical short form of a node type string.
#[wasm_bindgen]
pub fn normalize_node_type(node_type: &str) -> String {
    crate::normalize::normalize(node_type)
}

fn parse_catalog(catalog_json: &str) -> Result<StaticCatalog, Vec<ValidationIssue>> {
    if catalog_json.trim().is_empty() {
        return Ok(StaticCatalog::new());
    }
    StaticCatalog::from_json(catalog_json).map_err(|e| {
        vec![ValidationIssue::error(
            "INVALID_JSON",
            format!("Failed to parse node catalog JSON: {}", e),
        )]
    })
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(serde::Serialize)]
#[serde(tag = "status", content = "result")]
enum WasmResult<T> {
    #[serde(rename = "success")]
    Success(T),
    #[serde(rename = "errors")]
    Errors(Vec<ValidationIssue>),
}
