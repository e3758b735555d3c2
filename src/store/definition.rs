//! Definition Store
//!
//! Keyed storage for workflow definitions: get by id or name, create,
//! update, status changes, and filtered listing. Stores apply no workflow
//! logic; step structure is only checked when a definition executes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use log::info;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::workflow::{validate_definition, DefinitionStatus, WorkflowDefinition};

/// Replacement values for an existing definition.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionUpdate {
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub definition_json: String,
    /// Left unchanged when `None`
    pub status: Option<DefinitionStatus>,
}

/// Filter for listing definitions. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct DefinitionFilter {
    pub status: Option<DefinitionStatus>,
    /// Case-insensitive substring of the name
    pub name_contains: Option<String>,
}

impl DefinitionFilter {
    pub fn matches(&self, definition: &WorkflowDefinition) -> bool {
        if let Some(status) = self.status {
            if definition.status != status {
                return false;
            }
        }

        if let Some(fragment) = self
            .name_contains
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
        {
            if !definition
                .name
                .to_lowercase()
                .contains(&fragment.to_lowercase())
            {
                return false;
            }
        }

        true
    }
}

/// Storage for workflow definitions.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<WorkflowDefinition, StoreError>;

    async fn get_by_name(&self, name: &str) -> Result<WorkflowDefinition, StoreError>;

    /// Stores a new definition. Names must be unique.
    async fn create(&self, definition: WorkflowDefinition) -> Result<WorkflowDefinition, StoreError>;

    async fn update(
        &self,
        id: Uuid,
        update: DefinitionUpdate,
    ) -> Result<WorkflowDefinition, StoreError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: DefinitionStatus,
    ) -> Result<WorkflowDefinition, StoreError>;

    /// Lists matching definitions ordered by name.
    async fn list(&self, filter: &DefinitionFilter) -> Result<Vec<WorkflowDefinition>, StoreError>;
}

/// In-memory [`DefinitionStore`].
#[derive(Debug, Default)]
pub struct InMemoryDefinitionStore {
    definitions: RwLock<HashMap<Uuid, WorkflowDefinition>>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }
}

fn name_taken(
    definitions: &HashMap<Uuid, WorkflowDefinition>,
    name: &str,
    except: Option<Uuid>,
) -> bool {
    definitions
        .values()
        .any(|d| d.name == name && Some(d.id) != except)
}

#[async_trait]
impl DefinitionStore for InMemoryDefinitionStore {
    async fn get_by_id(&self, id: Uuid) -> Result<WorkflowDefinition, StoreError> {
        self.definitions
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::DefinitionNotFound(id.to_string()))
    }

    async fn get_by_name(&self, name: &str) -> Result<WorkflowDefinition, StoreError> {
        self.definitions
            .read()
            .values()
            .find(|d| d.name == name)
            .cloned()
            .ok_or_else(|| StoreError::DefinitionNotFound(name.to_string()))
    }

    async fn create(&self, definition: WorkflowDefinition) -> Result<WorkflowDefinition, StoreError> {
        validate_definition(&definition).map_err(StoreError::Invalid)?;

        let mut definitions = self.definitions.write();
        if name_taken(&definitions, &definition.name, None) {
            return Err(StoreError::DuplicateName(definition.name));
        }

        info!(
            "Created definition '{}' v{} ({})",
            definition.name, definition.version, definition.status
        );
        definitions.insert(definition.id, definition.clone());
        Ok(definition)
    }

    async fn update(
        &self,
        id: Uuid,
        update: DefinitionUpdate,
    ) -> Result<WorkflowDefinition, StoreError> {
        let mut definitions = self.definitions.write();

        let mut updated = definitions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::DefinitionNotFound(id.to_string()))?;

        if name_taken(&definitions, &update.name, Some(id)) {
            return Err(StoreError::DuplicateName(update.name));
        }

        updated.name = update.name;
        updated.description = update.description;
        updated.version = update.version;
        updated.definition_json = update.definition_json;
        if let Some(status) = update.status {
            updated.status = status;
        }
        updated.updated_at = Utc::now();

        validate_definition(&updated).map_err(StoreError::Invalid)?;

        info!("Updated definition '{}' to v{}", updated.name, updated.version);
        definitions.insert(id, updated.clone());
        Ok(updated)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: DefinitionStatus,
    ) -> Result<WorkflowDefinition, StoreError> {
        let mut definitions = self.definitions.write();
        let existing = definitions
            .get_mut(&id)
            .ok_or_else(|| StoreError::DefinitionNotFound(id.to_string()))?;

        existing.status = status;
        existing.updated_at = Utc::now();

        info!("Definition '{}' is now {}", existing.name, status);
        Ok(existing.clone())
    }

    async fn list(&self, filter: &DefinitionFilter) -> Result<Vec<WorkflowDefinition>, StoreError> {
        let mut matching: Vec<WorkflowDefinition> = self
            .definitions
            .read()
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(name: &str) -> WorkflowDefinition {
        WorkflowDefinition::new(name, "1.0.0", r#"{"steps": []}"#)
    }

    fn update_for(name: &str) -> DefinitionUpdate {
        DefinitionUpdate {
            name: name.to_string(),
            description: Some("updated".to_string()),
            version: "2.0.0".to_string(),
            definition_json: r#"{"steps": [{"name": "a", "type": "x"}]}"#.to_string(),
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryDefinitionStore::new();
        let created = store.create(definition("billing")).await.unwrap();

        assert_eq!(created.status, DefinitionStatus::Draft);
        assert_eq!(store.get_by_id(created.id).await.unwrap(), created);
        assert_eq!(store.get_by_name("billing").await.unwrap().id, created.id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = InMemoryDefinitionStore::new();

        assert!(matches!(
            store.get_by_name("nope").await,
            Err(StoreError::DefinitionNotFound(name)) if name == "nope"
        ));
        assert!(matches!(
            store.get_by_id(Uuid::new_v4()).await,
            Err(StoreError::DefinitionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let store = InMemoryDefinitionStore::new();
        store.create(definition("billing")).await.unwrap();

        let result = store.create(definition("billing")).await;
        assert!(matches!(result, Err(StoreError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid() {
        let store = InMemoryDefinitionStore::new();
        let result = store
            .create(WorkflowDefinition::new("", "1.0.0", "{}"))
            .await;

        assert!(matches!(result, Err(StoreError::Invalid(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_fields_and_keeps_status() {
        let store = InMemoryDefinitionStore::new();
        let created = store
            .create(definition("billing").with_status(DefinitionStatus::Active))
            .await
            .unwrap();

        let updated = store.update(created.id, update_for("billing-v2")).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "billing-v2");
        assert_eq!(updated.version, "2.0.0");
        assert_eq!(updated.description.as_deref(), Some("updated"));
        assert_eq!(updated.status, DefinitionStatus::Active);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(store.get_by_name("billing-v2").await.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_update_with_status() {
        let store = InMemoryDefinitionStore::new();
        let created = store.create(definition("billing")).await.unwrap();

        let mut update = update_for("billing");
        update.status = Some(DefinitionStatus::Archived);
        let updated = store.update(created.id, update).await.unwrap();

        assert_eq!(updated.status, DefinitionStatus::Archived);
    }

    #[tokio::test]
    async fn test_update_rejects_taken_name() {
        let store = InMemoryDefinitionStore::new();
        store.create(definition("a")).await.unwrap();
        let b = store.create(definition("b")).await.unwrap();

        let result = store.update(b.id, update_for("a")).await;
        assert!(matches!(result, Err(StoreError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_update_missing_id_reports_not_found() {
        let store = InMemoryDefinitionStore::new();
        store.create(definition("a")).await.unwrap();

        let result = store.update(Uuid::new_v4(), update_for("a")).await;
        assert!(matches!(result, Err(StoreError::DefinitionNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_status() {
        let store = InMemoryDefinitionStore::new();
        let created = store.create(definition("billing")).await.unwrap();

        let updated = store
            .update_status(created.id, DefinitionStatus::Inactive)
            .await
            .unwrap();
        assert_eq!(updated.status, DefinitionStatus::Inactive);
        assert_eq!(updated.version, created.version);
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let store = InMemoryDefinitionStore::new();
        store
            .create(definition("order-intake").with_status(DefinitionStatus::Active))
            .await
            .unwrap();
        store
            .create(definition("order-cleanup").with_status(DefinitionStatus::Draft))
            .await
            .unwrap();
        store
            .create(definition("billing").with_status(DefinitionStatus::Active))
            .await
            .unwrap();

        let all = store.list(&DefinitionFilter::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["billing", "order-cleanup", "order-intake"]);

        let active_orders = store
            .list(&DefinitionFilter {
                status: Some(DefinitionStatus::Active),
                name_contains: Some("ORDER".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(active_orders.len(), 1);
        assert_eq!(active_orders[0].name, "order-intake");

        let blank = store
            .list(&DefinitionFilter {
                status: None,
                name_contains: Some("   ".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(blank.len(), 3);
    }
}
