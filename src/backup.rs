//! Backup and migration utilities.
//!
//! Exports the whole store as a single JSON document, restores it, and
//! pushes locally stored projects to another [`DataSource`] when a user
//! moves from local mode to a real backend. Only project data migrates;
//! accounts and teams are made fresh on the other side.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::datasource::{CreateProjectData, DataSource};
use crate::models::{now_rfc3339, Project, ProjectStatus, ResponseMap};
use crate::storage::ExtendedStorageAdapter;

const PROJECT_PREFIX: &str = "project:";

/// A full dump of the store, ready to serialize to a backup file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageExport {
    pub version: String,
    pub exported_at: String,
    pub data: BTreeMap<String, Value>,
}

/// Outcome of [`migrate_projects`]. `success` means at least one project
/// made it across; per-project failures land in `errors` without stopping
/// the rest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationResult {
    pub success: bool,
    pub projects_migrated: u32,
    pub errors: Vec<String>,
    pub timestamp: String,
}

impl MigrationResult {
    fn started() -> Self {
        Self {
            success: false,
            projects_migrated: 0,
            errors: Vec::new(),
            timestamp: now_rfc3339(),
        }
    }
}

/// Snapshots every key in the store. Keys holding null are left out, so an
/// export never resurrects tombstones.
pub async fn export_storage(storage: &dyn ExtendedStorageAdapter) -> StorageExport {
    let mut data = BTreeMap::new();
    for key in storage.keys().await {
        match storage.get(&key).await {
            None | Some(Value::Null) => continue,
            Some(value) => {
                data.insert(key, value);
            }
        }
    }
    StorageExport {
        version: "1.0".to_string(),
        exported_at: now_rfc3339(),
        data,
    }
}

/// Writes every exported key back into the store, returning how many keys
/// were restored. Existing keys are overwritten.
pub async fn import_storage(
    storage: &dyn ExtendedStorageAdapter,
    export: &StorageExport,
) -> Result<usize> {
    let mut restored = 0;
    for (key, value) in &export.data {
        storage.set(key, value).await?;
        restored += 1;
    }
    log::info!("Restored {restored} keys from backup version {}", export.version);
    Ok(restored)
}

/// Re-creates each locally stored project on `target`: create, push the
/// saved responses under the project's current step, and complete it if it
/// was completed locally.
pub async fn migrate_projects(
    storage: &dyn ExtendedStorageAdapter,
    target: &dyn DataSource,
) -> MigrationResult {
    let mut result = MigrationResult::started();

    let project_keys: Vec<String> = storage
        .keys()
        .await
        .into_iter()
        .filter(|key| key.starts_with(PROJECT_PREFIX))
        .collect();

    if project_keys.is_empty() {
        result.success = true;
        result.errors.push("No local projects found to migrate".to_string());
        return result;
    }

    log::info!("Found {} local projects to migrate", project_keys.len());

    for key in &project_keys {
        let Some(local) = storage
            .get(key)
            .await
            .and_then(|raw| serde_json::from_value::<Project>(raw).ok())
        else {
            result
                .errors
                .push(format!("Failed to read project from key: {key}"));
            continue;
        };

        let created = target
            .create_project(CreateProjectData {
                title: if local.title.is_empty() {
                    "Untitled Project".to_string()
                } else {
                    local.title.clone()
                },
                description: local.description.clone(),
            })
            .await;
        let created = match created {
            Ok(project) => project,
            Err(err) => {
                result
                    .errors
                    .push(format!("Failed to migrate project {key}: {err}"));
                continue;
            }
        };
        log::info!("Created project \"{}\" with ID: {}", created.title, created.id);

        if !local.responses.is_empty() {
            // All steps travel in one payload keyed under the current step.
            let payload: ResponseMap = local
                .responses
                .iter()
                .map(|(step, answers)| (step.clone(), Value::Object(answers.clone())))
                .collect();
            if let Err(err) = target
                .save_responses(&created.id, local.current_step.as_str(), payload)
                .await
            {
                result.errors.push(format!(
                    "Failed to migrate responses for project \"{}\": {err}",
                    local.title
                ));
            }
        }

        if local.status == ProjectStatus::Completed {
            if let Err(err) = target.complete_project(&created.id).await {
                result.errors.push(format!(
                    "Failed to complete project \"{}\": {err}",
                    local.title
                ));
            }
        }

        result.projects_migrated += 1;
    }

    result.success = result.projects_migrated > 0;
    log::info!(
        "Migration complete: {}/{} projects migrated",
        result.projects_migrated,
        project_keys.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{DataSource, LocalDataSource, DEMO_PASSWORD};
    use crate::seed::seed_demo_data;
    use crate::storage::{InMemoryAdapter, StorageAdapter, StorageHandle};
    use std::sync::Arc;

    #[tokio::test]
    async fn export_and_import_round_trip() {
        let storage = InMemoryAdapter::new();
        storage.set("user:1", &serde_json::json!({"id": "1"})).await.unwrap();
        storage
            .set("project:p1", &serde_json::json!({"title": "Story"}))
            .await
            .unwrap();
        storage.set("ghost", &Value::Null).await.unwrap();

        let export = export_storage(&storage).await;
        assert_eq!(export.version, "1.0");
        // the null-valued key is dropped
        assert_eq!(export.data.len(), 2);
        assert!(!export.data.contains_key("ghost"));

        storage.clear().await;
        let restored = import_storage(&storage, &export).await.unwrap();
        assert_eq!(restored, 2);
        assert_eq!(
            storage.get("project:p1").await,
            Some(serde_json::json!({"title": "Story"}))
        );
        assert_eq!(storage.get("ghost").await, None);

        // a second export sees the identical mapping
        assert_eq!(export_storage(&storage).await.data, export.data);
    }

    #[tokio::test]
    async fn migration_copies_projects_and_their_state() {
        let local_store = InMemoryAdapter::new();
        seed_demo_data(&local_store).await.unwrap();

        // the target is a fresh local source with a logged-in user
        let target_store: StorageHandle = Arc::new(InMemoryAdapter::new());
        seed_demo_data(&*target_store).await.unwrap();
        let target = LocalDataSource::new(target_store.clone());
        target.login("demo@example.com", DEMO_PASSWORD).await.unwrap();
        for id in ["demo-project-1", "demo-project-2"] {
            target.delete_project(id).await.unwrap();
        }

        let result = migrate_projects(&local_store, &target).await;
        assert!(result.success);
        assert_eq!(result.projects_migrated, 2);
        assert!(result.errors.is_empty());

        let migrated = target.get_projects(None).await.unwrap();
        assert_eq!(migrated.len(), 2);
        let completed = migrated
            .iter()
            .find(|p| p.title == "Completed Story Example")
            .unwrap();
        assert_eq!(completed.status, ProjectStatus::Completed);
        // the whole response map was nested under the step it was at
        assert!(completed.responses.contains_key("complete"));
    }

    #[tokio::test]
    async fn empty_stores_migrate_trivially() {
        let local_store = InMemoryAdapter::new();
        let target_store: StorageHandle = Arc::new(InMemoryAdapter::new());
        let target = LocalDataSource::new(target_store);

        let result = migrate_projects(&local_store, &target).await;
        assert!(result.success);
        assert_eq!(result.projects_migrated, 0);
        assert_eq!(result.errors, vec!["No local projects found to migrate"]);
    }

    #[tokio::test]
    async fn unreadable_projects_are_reported_not_fatal() {
        let local_store = InMemoryAdapter::new();
        local_store
            .set("project:good", &serde_json::to_value(sample_project()).unwrap())
            .await
            .unwrap();
        local_store
            .set("project:bad", &serde_json::json!({"not": "a project"}))
            .await
            .unwrap();

        let target_store: StorageHandle = Arc::new(InMemoryAdapter::new());
        seed_demo_data(&*target_store).await.unwrap();
        let target = LocalDataSource::new(target_store);
        target.login("demo@example.com", DEMO_PASSWORD).await.unwrap();

        let result = migrate_projects(&local_store, &target).await;
        assert!(result.success);
        assert_eq!(result.projects_migrated, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("project:bad"));
    }

    fn sample_project() -> Project {
        Project {
            id: "good".into(),
            user_id: "1".into(),
            team_id: None,
            title: "Readable".into(),
            description: None,
            status: ProjectStatus::InProgress,
            current_step: crate::models::StepId::Intro,
            responses: Default::default(),
            created_at: "2025-01-01T00:00:00Z".into(),
            updated_at: "2025-01-01T00:00:00Z".into(),
        }
    }
}
