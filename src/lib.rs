pub mod catalog;
pub mod config;
pub mod diff;
pub mod error;
pub mod graph;
pub mod normalize;
pub mod parse;
pub mod validate;
pub mod wasm;

pub use catalog::{NodeCatalog, NodeDescriptor, StaticCatalog};
pub use config::EngineConfig;
pub use diff::{DiffEngine, DiffRequest, Operation, PatchResult};
pub use error::{DiffError, Severity, ValidationIssue};
pub use parse::types::Workflow;
pub use validate::{ValidationReport, validate_workflow};
