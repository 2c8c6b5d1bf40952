//! Demo data for local mode.
//!
//! Seeds the storage layer with the demo account and two sample projects so
//! a fresh local session has something to show. Step keys are written in
//! the wizard's kebab-case spelling so the seeded projects resume and
//! score like user-created ones.

use std::collections::HashMap;

use anyhow::Result;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use crate::models::{
    now_rfc3339, Project, ProjectStatus, ResponseMap, StepId, Team, TeamStatus, User,
};
use crate::storage::ExtendedStorageAdapter;

/// Key whose presence marks the store as seeded.
const SEED_MARKER_KEY: &str = "user:1";

fn days_ago(days: i64) -> String {
    (OffsetDateTime::now_utc() - Duration::days(days))
        .format(&Rfc3339)
        .expect("offset time formats as RFC 3339")
}

fn step_map(entries: &[(&str, &str)]) -> ResponseMap {
    entries
        .iter()
        .map(|(field, value)| (field.to_string(), Value::from(*value)))
        .collect()
}

async fn write<T: serde::Serialize>(
    storage: &dyn ExtendedStorageAdapter,
    key: &str,
    record: &T,
) -> Result<()> {
    let value = serde_json::to_value(record)?;
    storage.set(key, &value).await
}

/// Writes the demo user, team, and two sample projects. Existing keys are
/// overwritten, so callers gate on [`is_seeded`] to keep user edits.
pub async fn seed_demo_data(storage: &dyn ExtendedStorageAdapter) -> Result<()> {
    log::info!("Seeding demo data");

    let now = now_rfc3339();

    let user = User {
        id: "1".into(),
        email: "demo@example.com".into(),
        name: "Demo User".into(),
        first_name: None,
        last_name: None,
        team_id: Some("1".into()),
        email_verified_at: Some(now.clone()),
    };
    write(storage, "user:1", &user).await?;

    let team = Team {
        id: "1".into(),
        name: "Acme Corporation".into(),
        description: None,
        status: TeamStatus::Active,
        created_at: Some(now.clone()),
        updated_at: Some(now.clone()),
    };
    write(storage, "team:1", &team).await?;

    let in_progress = Project {
        id: "demo-project-1".into(),
        user_id: "1".into(),
        team_id: Some("1".into()),
        title: "Sample Story".into(),
        description: None,
        status: ProjectStatus::InProgress,
        current_step: StepId::SectionA,
        responses: HashMap::from([(
            "intro".to_string(),
            step_map(&[("field1", "Sample intro response")]),
        )]),
        created_at: now.clone(),
        updated_at: now.clone(),
    };
    write(storage, "project:demo-project-1", &in_progress).await?;

    let completed = Project {
        id: "demo-project-2".into(),
        user_id: "1".into(),
        team_id: Some("1".into()),
        title: "Completed Story Example".into(),
        description: None,
        status: ProjectStatus::Completed,
        current_step: StepId::Complete,
        responses: HashMap::from([
            ("intro".to_string(), step_map(&[("field1", "Completed intro")])),
            (
                "section-a".to_string(),
                step_map(&[("field2", "Completed section A")]),
            ),
            (
                "section-b".to_string(),
                step_map(&[("field3", "Completed section B")]),
            ),
            (
                "section-c".to_string(),
                step_map(&[("field4", "Completed section C")]),
            ),
        ]),
        created_at: days_ago(7),
        updated_at: days_ago(2),
    };
    write(storage, "project:demo-project-2", &completed).await?;

    log::info!("Demo data seeded");
    Ok(())
}

/// Whether the demo records are already in place.
pub async fn is_seeded(storage: &dyn ExtendedStorageAdapter) -> bool {
    storage.get(SEED_MARKER_KEY).await.is_some()
}

/// Seeds only when the store has never been seeded.
pub async fn initialize_demo_data(storage: &dyn ExtendedStorageAdapter) -> Result<()> {
    if is_seeded(storage).await {
        log::debug!("Demo data already seeded, skipping");
        return Ok(());
    }
    seed_demo_data(storage).await
}

/// Drops everything in the store.
pub async fn clear_all_data(storage: &dyn ExtendedStorageAdapter) {
    storage.clear().await;
    log::info!("All data cleared");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{DataSource, LocalDataSource, DEMO_PASSWORD};
    use crate::storage::{InMemoryAdapter, StorageAdapter};
    use crate::story::calculate_progress;

    #[tokio::test]
    async fn seeding_populates_the_demo_account() {
        let storage = InMemoryAdapter::new();
        assert!(!is_seeded(&storage).await);

        seed_demo_data(&storage).await.unwrap();
        assert!(is_seeded(&storage).await);

        let user: User =
            serde_json::from_value(storage.get("user:1").await.unwrap()).unwrap();
        assert_eq!(user.email, "demo@example.com");
        assert_eq!(user.team_id.as_deref(), Some("1"));

        let sample: Project =
            serde_json::from_value(storage.get("project:demo-project-1").await.unwrap()).unwrap();
        assert_eq!(sample.status, ProjectStatus::InProgress);
        assert_eq!(sample.current_step, StepId::SectionA);

        let completed: Project =
            serde_json::from_value(storage.get("project:demo-project-2").await.unwrap()).unwrap();
        assert_eq!(completed.status, ProjectStatus::Completed);
        assert_eq!(completed.responses.len(), 4);
        assert_eq!(calculate_progress(&completed), 100);
        assert!(completed.created_at < completed.updated_at);
    }

    #[tokio::test]
    async fn seeded_credentials_log_in() {
        let storage = std::sync::Arc::new(InMemoryAdapter::new());
        seed_demo_data(&*storage).await.unwrap();

        let source = LocalDataSource::new(storage);
        let auth = source.login("demo@example.com", DEMO_PASSWORD).await.unwrap();
        assert_eq!(auth.user.id, "1");

        let projects = source.get_projects(None).await.unwrap();
        assert_eq!(projects.len(), 2);
    }

    #[tokio::test]
    async fn initialize_seeds_exactly_once() {
        let storage = InMemoryAdapter::new();
        initialize_demo_data(&storage).await.unwrap();

        // a user edit must survive re-initialization
        let mut sample: Project =
            serde_json::from_value(storage.get("project:demo-project-1").await.unwrap()).unwrap();
        sample.title = "Renamed by user".into();
        write(&storage, "project:demo-project-1", &sample).await.unwrap();

        initialize_demo_data(&storage).await.unwrap();
        let kept: Project =
            serde_json::from_value(storage.get("project:demo-project-1").await.unwrap()).unwrap();
        assert_eq!(kept.title, "Renamed by user");
    }

    #[tokio::test]
    async fn clearing_removes_the_seed() {
        let storage = InMemoryAdapter::new();
        seed_demo_data(&storage).await.unwrap();
        clear_all_data(&storage).await;
        assert!(!is_seeded(&storage).await);
        assert!(storage.keys().await.is_empty());
    }
}
