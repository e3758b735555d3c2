//! Workflow Service
//!
//! Resolves a stored definition, executes it with the engine, and records
//! the resulting instance.

use std::sync::Arc;

use log::{info, warn};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::store::{DefinitionStore, InstanceStore};
use crate::workflow::{Context, WorkflowDefinition, WorkflowInstance};

use super::engine::WorkflowEngine;

/// Executes stored workflow definitions and persists their instances.
#[derive(Clone)]
pub struct WorkflowService {
    engine: Arc<WorkflowEngine>,
    definitions: Arc<dyn DefinitionStore>,
    instances: Arc<dyn InstanceStore>,
}

impl WorkflowService {
    pub fn new(
        engine: Arc<WorkflowEngine>,
        definitions: Arc<dyn DefinitionStore>,
        instances: Arc<dyn InstanceStore>,
    ) -> Self {
        Self {
            engine,
            definitions,
            instances,
        }
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    pub fn definitions(&self) -> &dyn DefinitionStore {
        self.definitions.as_ref()
    }

    pub fn instances(&self) -> &dyn InstanceStore {
        self.instances.as_ref()
    }

    /// Executes the definition with the given id.
    ///
    /// # Errors
    ///
    /// Fails when the definition does not exist or the instance cannot be
    /// created or saved. A FAILED execution is still returned as `Ok`.
    pub async fn execute_by_id(
        &self,
        id: Uuid,
        context: &Context,
    ) -> Result<WorkflowInstance, ServiceError> {
        let definition = self.definitions.get_by_id(id).await?;
        self.execute(&definition, context).await
    }

    /// Executes the definition with the given name.
    pub async fn execute_by_name(
        &self,
        name: &str,
        context: &Context,
    ) -> Result<WorkflowInstance, ServiceError> {
        let definition = self.definitions.get_by_name(name).await?;
        self.execute(&definition, context).await
    }

    async fn execute(
        &self,
        definition: &WorkflowDefinition,
        context: &Context,
    ) -> Result<WorkflowInstance, ServiceError> {
        let instance = self.engine.execute_workflow(definition, context).await?;

        match &instance.error_message {
            Some(reason) => warn!("Instance {} failed: {}", instance.instance_name, reason),
            None => info!(
                "Instance {} finished as {}",
                instance.instance_name, instance.status
            ),
        }

        Ok(self.instances.save(instance).await?)
    }
}

impl std::fmt::Debug for WorkflowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowService")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
