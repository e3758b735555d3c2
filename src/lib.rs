//! Stepflow - Workflow Orchestration Engine
//!
//! Executes JSON workflow definitions as an ordered list of steps. Each
//! dispatchable step is routed to a message topic and published for
//! downstream workers; the engine only tracks progress on a workflow
//! instance record and never waits for replies.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`workflow`]: Definitions, steps, instances, parsing and validation
//! - [`execution`]: Engine, step interpreter and the persisting service
//! - [`dispatch`]: Topic routing, payload building and message publishers
//! - [`store`]: Definition and instance storage
//! - [`monitoring`]: Per-instance execution timeline
//! - [`error`]: Error types shared across modules
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stepflow::dispatch::MemoryPublisher;
//! use stepflow::execution::WorkflowEngine;
//! use stepflow::load_definition;
//! use stepflow::workflow::Context;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load a definition from YAML or JSON
//!     let definition = load_definition("order-intake.yaml")?;
//!
//!     // Publish into memory instead of a real bus
//!     let publisher = Arc::new(MemoryPublisher::new());
//!     let engine = WorkflowEngine::new(publisher.clone());
//!
//!     let instance = engine.execute_workflow(&definition, &Context::new()).await?;
//!     println!("{} -> {}", instance.instance_name, instance.status);
//!     println!("{} messages published", publisher.len());
//!     Ok(())
//! }
//! ```

pub mod dispatch;
pub mod error;
pub mod execution;
pub mod monitoring;
pub mod store;
pub mod workflow;

// Re-export commonly used types
pub use error::{EngineError, PublishError, ServiceError, StoreError};
pub use execution::{WorkflowEngine, WorkflowService};
pub use workflow::model::{Step, StepKind, WorkflowDefinition};
pub use workflow::parser::{load_definition, parse_definition};
pub use workflow::{InstanceStatus, WorkflowInstance};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Stepflow";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "Stepflow");
    }

    #[test]
    fn test_module_exports_step() {
        let step = Step::service_call("lookup", "cbi-service", "/accounts");
        assert_eq!(step.name, "lookup");
        assert_eq!(step.type_tag(), "service_call");
    }

    #[test]
    fn test_module_exports_parser() {
        let steps = parse_definition(r#"{"steps": []}"#).unwrap();
        assert!(steps.is_empty());
    }
}
