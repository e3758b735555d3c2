//! Instance Store
//!
//! Append/update storage for workflow instances with a filtered listing.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::workflow::{InstanceStatus, WorkflowInstance};

/// Filter for listing instances. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct InstanceFilter {
    pub status: Option<InstanceStatus>,
    pub definition_id: Option<Uuid>,
    /// Inclusive lower bound on `started_at`
    pub started_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `started_at`
    pub started_before: Option<DateTime<Utc>>,
}

impl InstanceFilter {
    pub fn matches(&self, instance: &WorkflowInstance) -> bool {
        self.status.map_or(true, |s| instance.status == s)
            && self
                .definition_id
                .map_or(true, |id| instance.workflow_definition_id == id)
            && self.started_after.map_or(true, |t| instance.started_at >= t)
            && self.started_before.map_or(true, |t| instance.started_at <= t)
    }
}

/// Storage for workflow instances.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Inserts the instance, or replaces the stored one with the same id.
    async fn save(&self, instance: WorkflowInstance) -> Result<WorkflowInstance, StoreError>;

    async fn get(&self, id: Uuid) -> Result<WorkflowInstance, StoreError>;

    /// Lists matching instances ordered by start time.
    async fn list(&self, filter: &InstanceFilter) -> Result<Vec<WorkflowInstance>, StoreError>;
}

/// In-memory [`InstanceStore`].
#[derive(Debug, Default)]
pub struct InMemoryInstanceStore {
    instances: RwLock<HashMap<Uuid, WorkflowInstance>>,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn save(&self, instance: WorkflowInstance) -> Result<WorkflowInstance, StoreError> {
        debug!(
            "Saving instance '{}' ({})",
            instance.instance_name, instance.status
        );
        self.instances.write().insert(instance.id, instance.clone());
        Ok(instance)
    }

    async fn get(&self, id: Uuid) -> Result<WorkflowInstance, StoreError> {
        self.instances
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::InstanceNotFound(id))
    }

    async fn list(&self, filter: &InstanceFilter) -> Result<Vec<WorkflowInstance>, StoreError> {
        let mut matching: Vec<WorkflowInstance> = self
            .instances
            .read()
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        matching.sort_by_key(|i| i.started_at);
        Ok(matching)
    }
}
