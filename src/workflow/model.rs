//! Workflow Data Model
//!
//! Core data structures representing workflow definitions and the
//! typed steps they contain.
//!
//! # Example Definition Document
//!
//! ```json
//! {
//!   "name": "order-intake",
//!   "version": "1.2.0",
//!   "steps": [
//!     { "name": "fetch", "type": "service_call", "service": "cbi-service", "endpoint": "/orders" },
//!     { "name": "check", "type": "condition", "condition": "priority == 1",
//!       "trueStep": "notify", "falseStep": "batch" },
//!     { "name": "batch", "type": "data_processing", "processingType": "aggregate", "batchSize": 500 },
//!     { "name": "notify", "type": "notification", "notificationType": "email", "message": "done" }
//!   ]
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Caller-supplied key/value context attached to every dispatched message.
pub type Context = Map<String, Value>;

/// Type tag for [`StepKind::ServiceCall`].
pub const SERVICE_CALL: &str = "service_call";
/// Type tag for [`StepKind::ScheduleTask`].
pub const SCHEDULE_TASK: &str = "schedule_task";
/// Type tag for [`StepKind::DataProcessing`].
pub const DATA_PROCESSING: &str = "data_processing";
/// Type tag for [`StepKind::Notification`].
pub const NOTIFICATION: &str = "notification";
/// Type tag for [`StepKind::Condition`].
pub const CONDITION: &str = "condition";

/// Lifecycle status of a workflow definition.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefinitionStatus {
    #[default]
    Draft,
    Active,
    Inactive,
    Archived,
}

impl fmt::Display for DefinitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Archived => "ARCHIVED",
        };
        f.write_str(label)
    }
}

impl FromStr for DefinitionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            "ARCHIVED" => Ok(Self::Archived),
            other => Err(format!("Unknown definition status: {}", other)),
        }
    }
}

/// A versioned, declarative workflow definition.
///
/// The definition document is kept as raw JSON text. It is only parsed
/// into [`Step`] values when an execution starts, so an updated document
/// takes effect on the next run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub id: Uuid,

    /// Display name, unique within a definition store
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Semantic version string (e.g. "1.2.0")
    pub version: String,

    #[serde(default)]
    pub status: DefinitionStatus,

    /// Definition document containing the ordered `steps` array
    pub definition_json: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Creates a new DRAFT definition with a fresh identity.
    ///
    /// # Example
    ///
    /// ```
    /// use stepflow::workflow::{DefinitionStatus, WorkflowDefinition};
    ///
    /// let definition = WorkflowDefinition::new("nightly", "1.0.0", r#"{"steps": []}"#)
    ///     .with_status(DefinitionStatus::Active);
    /// assert_eq!(definition.status, DefinitionStatus::Active);
    /// ```
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        definition_json: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            description: None,
            version: version.into().trim().to_string(),
            status: DefinitionStatus::Draft,
            definition_json: definition_json.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the lifecycle status.
    pub fn with_status(mut self, status: DefinitionStatus) -> Self {
        self.status = status;
        self
    }
}

/// A single parsed workflow step.
///
/// Steps are transient: they are rebuilt from the definition document on
/// every execution and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub kind: StepKind,
}

/// The typed body of a step, one variant per known type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    ServiceCall {
        service: String,
        endpoint: String,
    },
    ScheduleTask {
        task: String,
        cron: String,
    },
    DataProcessing {
        processing_type: String,
        batch_size: i64,
    },
    Notification {
        notification_type: String,
        message: String,
    },
    /// Evaluated locally; the branch labels are informational only.
    Condition {
        condition: String,
        true_step: String,
        false_step: String,
    },
    /// A type tag this engine does not know. Logged and skipped.
    Unrecognized {
        type_tag: String,
    },
}

impl StepKind {
    /// Returns the document type tag for this variant.
    pub fn type_tag(&self) -> &str {
        match self {
            Self::ServiceCall { .. } => SERVICE_CALL,
            Self::ScheduleTask { .. } => SCHEDULE_TASK,
            Self::DataProcessing { .. } => DATA_PROCESSING,
            Self::Notification { .. } => NOTIFICATION,
            Self::Condition { .. } => CONDITION,
            Self::Unrecognized { type_tag } => type_tag.as_str(),
        }
    }
}

impl Step {
    /// Creates a step from a name and a typed body.
    pub fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn service_call(
        name: impl Into<String>,
        service: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            StepKind::ServiceCall {
                service: service.into(),
                endpoint: endpoint.into(),
            },
        )
    }

    pub fn notification(
        name: impl Into<String>,
        notification_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            StepKind::Notification {
                notification_type: notification_type.into(),
                message: message.into(),
            },
        )
    }

    pub fn condition(
        name: impl Into<String>,
        condition: impl Into<String>,
        true_step: impl Into<String>,
        false_step: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            StepKind::Condition {
                condition: condition.into(),
                true_step: true_step.into(),
                false_step: false_step.into(),
            },
        )
    }

    /// Returns the document type tag of this step.
    pub fn type_tag(&self) -> &str {
        self.kind.type_tag()
    }

    /// Returns true if this step publishes a message when executed.
    pub fn is_dispatchable(&self) -> bool {
        !matches!(
            self.kind,
            StepKind::Condition { .. } | StepKind::Unrecognized { .. }
        )
    }
}
