//! Workflow Instance
//!
//! The tracked record of one workflow execution. An instance is created
//! RUNNING, advances its `current_step` as the interpreter moves through
//! the definition, and then reaches exactly one terminal state.

use std::fmt;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{Context, WorkflowDefinition};
use crate::error::EngineError;
use crate::monitoring::ExecutionTimeline;

/// Status of a workflow instance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Running,
    Completed,
    Failed,
    /// Reserved; nothing in the engine produces it.
    Paused,
    /// Reserved; nothing in the engine produces it.
    Cancelled,
}

impl InstanceStatus {
    /// Returns true for states an instance can never leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Paused => "PAUSED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

/// One execution of a workflow definition.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInstance {
    pub id: Uuid,

    /// Definition this instance was started from
    pub workflow_definition_id: Uuid,

    /// Definition name plus the start time in epoch milliseconds
    pub instance_name: String,

    pub status: InstanceStatus,

    /// Name of the step most recently entered
    pub current_step: Option<String>,

    /// Context snapshot as JSON text, captured once at start
    pub context_data: String,

    pub started_by: String,
    pub started_at: DateTime<Utc>,

    /// Set only once the instance is terminal
    pub completed_at: Option<DateTime<Utc>>,
    pub execution_time_ms: Option<i64>,

    /// Set only when the instance failed
    pub error_message: Option<String>,

    #[serde(default)]
    pub timeline: ExecutionTimeline,
}

impl WorkflowInstance {
    /// Creates a RUNNING instance for a definition.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InstanceCreation`] if the context cannot be
    /// snapshotted as JSON.
    pub fn start(
        definition: &WorkflowDefinition,
        context: &Context,
        started_by: &str,
    ) -> Result<Self, EngineError> {
        let context_data = serde_json::to_string(context)
            .map_err(|e| EngineError::InstanceCreation(format!("context is not serializable: {}", e)))?;

        let started_at = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            workflow_definition_id: definition.id,
            instance_name: format!("{}_{}", definition.name, started_at.timestamp_millis()),
            status: InstanceStatus::Running,
            current_step: None,
            context_data,
            started_by: started_by.to_string(),
            started_at,
            completed_at: None,
            execution_time_ms: None,
            error_message: None,
            timeline: ExecutionTimeline::new(),
        })
    }

    /// Records that execution has moved to the named step.
    pub fn enter_step(&mut self, step_name: &str) {
        if self.is_terminal() {
            warn!(
                "Instance '{}' is {}; ignoring step '{}'",
                self.instance_name, self.status, step_name
            );
            return;
        }
        self.current_step = Some(step_name.to_string());
    }

    /// Marks the instance COMPLETED.
    ///
    /// Returns false (and changes nothing) if it was already terminal.
    pub fn complete(&mut self) -> bool {
        self.finish(InstanceStatus::Completed, None)
    }

    /// Marks the instance FAILED with an error message.
    ///
    /// Returns false (and changes nothing) if it was already terminal.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        self.finish(InstanceStatus::Failed, Some(message.into()))
    }

    fn finish(&mut self, status: InstanceStatus, error_message: Option<String>) -> bool {
        if self.is_terminal() {
            warn!(
                "Instance '{}' already {}; refusing transition to {}",
                self.instance_name, self.status, status
            );
            return false;
        }

        let completed_at = Utc::now();
        self.status = status;
        self.completed_at = Some(completed_at);
        self.execution_time_ms = Some((completed_at - self.started_at).num_milliseconds());
        self.error_message = error_message;
        true
    }

    /// Returns true if the instance has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Parses the context snapshot back into a context map.
    pub fn context(&self) -> Result<Context, serde_json::Error> {
        serde_json::from_str(&self.context_data)
    }
}
