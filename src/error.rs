//! Error Types
//!
//! Errors raised while parsing definitions, dispatching steps, and
//! reading or writing the definition and instance stores.
//!
//! Step-level failures ([`EngineError::MalformedDefinition`] and
//! [`EngineError::DispatchFailure`]) never escape the engine: they are
//! recorded on the instance as its FAILED state.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while executing a workflow.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The definition document does not describe a valid step sequence.
    #[error("Malformed workflow definition: {0}")]
    MalformedDefinition(String),

    /// Publishing a step's message to the bus failed.
    #[error("Failed to dispatch step '{step}' to topic '{topic}': {source}")]
    DispatchFailure {
        step: String,
        topic: &'static str,
        #[source]
        source: PublishError,
    },

    /// The workflow instance itself could not be built.
    #[error("Failed to create workflow instance: {0}")]
    InstanceCreation(String),
}

/// Errors raised by a [`MessagePublisher`](crate::dispatch::MessagePublisher).
#[derive(Debug, Error)]
pub enum PublishError {
    /// The underlying transport rejected or lost the message.
    #[error("transport error: {0}")]
    Transport(String),

    /// The payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The receiving side of the bus has gone away.
    #[error("publisher is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the definition and instance stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Workflow definition not found: {0}")]
    DefinitionNotFound(String),

    #[error("Workflow instance not found: {0}")]
    InstanceNotFound(Uuid),

    /// Definition names are unique within a store.
    #[error("Workflow definition '{0}' already exists")]
    DuplicateName(String),

    #[error("Invalid workflow definition: {0}")]
    Invalid(String),
}

/// Errors raised by [`WorkflowService`](crate::execution::WorkflowService).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
