//! Workflow Execution Engine
//!
//! The public entry point for running a workflow definition:
//! - Builds a RUNNING instance with a context snapshot
//! - Parses the definition and interprets its steps in order
//! - Returns the terminal instance for the caller to persist
//!
//! The engine never persists anything itself and never raises step-level
//! failures to the caller; they are recorded on the returned instance.

use std::sync::Arc;

use log::info;

use crate::dispatch::{DispatchRouter, MessagePublisher};
use crate::error::EngineError;
use crate::workflow::{Context, WorkflowDefinition, WorkflowInstance};

use super::interpreter::Interpreter;

/// Default value recorded as an instance's `started_by`.
pub const DEFAULT_STARTED_BY: &str = "system";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Recorded as `started_by` on every instance this engine creates
    pub started_by: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            started_by: DEFAULT_STARTED_BY.to_string(),
        }
    }
}

/// Workflow execution engine.
///
/// Holds no per-execution state, so one engine behind an `Arc` can run
/// any number of instances concurrently.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use stepflow::dispatch::MemoryPublisher;
/// use stepflow::execution::WorkflowEngine;
/// use stepflow::workflow::{Context, WorkflowDefinition};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = WorkflowEngine::new(Arc::new(MemoryPublisher::new()));
/// let definition = WorkflowDefinition::new("nightly", "1.0.0", r#"{"steps": []}"#);
///
/// let instance = engine.execute_workflow(&definition, &Context::new()).await?;
/// println!("{} finished as {}", instance.instance_name, instance.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    router: DispatchRouter,
    config: EngineConfig,
}

impl WorkflowEngine {
    /// Creates an engine with default configuration.
    pub fn new(publisher: Arc<dyn MessagePublisher>) -> Self {
        Self::with_config(publisher, EngineConfig::default())
    }

    pub fn with_config(publisher: Arc<dyn MessagePublisher>, config: EngineConfig) -> Self {
        Self {
            router: DispatchRouter::new(publisher),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Executes a workflow definition against a context.
    ///
    /// # Returns
    ///
    /// * `Ok(WorkflowInstance)` - A terminal instance, COMPLETED or FAILED
    /// * `Err` - The instance itself could not be created
    pub async fn execute_workflow(
        &self,
        definition: &WorkflowDefinition,
        context: &Context,
    ) -> Result<WorkflowInstance, EngineError> {
        info!("Starting workflow execution: {}", definition.name);

        let mut instance = WorkflowInstance::start(definition, context, &self.config.started_by)?;

        Interpreter::new(&self.router)
            .run(&definition.definition_json, &mut instance, context)
            .await;

        Ok(instance)
    }
}
