//! Workflow Definition Module
//!
//! Provides the data structures for workflow definitions, their parsed
//! steps, and the instances produced by executing them.
//!
//! # Structure
//!
//! - [`model`]: Definitions and the typed step model
//! - [`parser`]: Definition document parsing and file loading
//! - [`validator`]: Storage-time validation and step lints
//! - [`instance`]: Execution instance record and lifecycle

pub mod instance;
pub mod model;
pub mod parser;
pub mod validator;

pub use instance::{InstanceStatus, WorkflowInstance};
pub use model::{Context, DefinitionStatus, Step, StepKind, WorkflowDefinition};
pub use parser::{load_definition, parse_definition, save_definition};
pub use validator::{lint_steps, validate_definition};
