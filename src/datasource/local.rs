//! Storage-backed data source.
//!
//! Everything lives in the storage layer under prefixed keys (`user:`,
//! `team:`, `project:`), with the signed-in user mirrored at `auth:user`.
//! What a fresh user/project/team looks like, and which credentials count,
//! is delegated to a [`StoryPolicy`] so the store itself stays neutral;
//! [`DemoPolicy`] is the stock implementation.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;

use crate::errors::EngineError;
use crate::models::{
    now_rfc3339, Project, ProjectStatus, ResponseMap, StepId, Team, TeamStatus, User,
};
use crate::session::USER_KEY;
use crate::storage::{ExtendedStorageAdapter, StorageHandle};

use super::types::{
    AuthPayload, CreateProjectData, CreateTeamData, DataSource, NotificationList, ProjectFilter,
    ProjectPatch, RegisterData, TeamPatch, UserPatch,
};

const USER_PREFIX: &str = "user:";
const TEAM_PREFIX: &str = "team:";
const PROJECT_PREFIX: &str = "project:";

const TOKEN_TTL_MS: i64 = 86_400_000; // 24 hours

/// The password every stored user accepts under [`DemoPolicy`].
pub const DEMO_PASSWORD: &str = "password";

fn unix_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Short random base-36 suffix for generated ids.
fn base36_suffix() -> String {
    let mut rng = rand::rng();
    (0..7)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Unsigned base64 token carrying inspectable claims. Login tokens embed the
/// e-mail, registration tokens do not.
fn mint_token(user_id: &str, email: Option<&str>) -> String {
    let exp = unix_millis() + TOKEN_TTL_MS;
    let claims = match email {
        Some(email) => json!({ "userId": user_id, "email": email, "exp": exp }),
        None => json!({ "userId": user_id, "exp": exp }),
    };
    BASE64.encode(claims.to_string())
}

/// Application-level rules injected into [`LocalDataSource`]: which
/// credentials are valid and what freshly created records look like.
#[async_trait]
pub trait StoryPolicy: Send + Sync {
    /// Checks credentials against stored users, returning the matching user
    /// or `None` when the pair is not valid.
    async fn validate_credentials(
        &self,
        email: &str,
        password: &str,
        storage: &dyn ExtendedStorageAdapter,
    ) -> Option<User>;

    /// Builds a fresh user from registration input.
    fn new_user(&self, data: &RegisterData) -> User;

    /// Builds a fresh project owned by `user`.
    fn new_project(&self, data: &CreateProjectData, user: &User) -> Project;

    fn new_team(&self, data: &CreateTeamData) -> Team;

    /// Folds one step's answers into `project`, replacing that step's
    /// previous answers wholesale.
    fn merge_responses(&self, project: Project, step: &str, responses: ResponseMap) -> Project;

    /// The patch that marks a story finished.
    fn mark_completed(&self, project: Option<&Project>) -> ProjectPatch;
}

/// Stock policy for demo installs: any stored user signs in with the shared
/// password [`DEMO_PASSWORD`], ids carry random base-36 suffixes, and new
/// records get the conventional defaults.
#[derive(Debug, Default)]
pub struct DemoPolicy;

#[async_trait]
impl StoryPolicy for DemoPolicy {
    async fn validate_credentials(
        &self,
        email: &str,
        password: &str,
        storage: &dyn ExtendedStorageAdapter,
    ) -> Option<User> {
        if password != DEMO_PASSWORD {
            return None;
        }

        for key in storage.keys().await {
            if !key.starts_with(USER_PREFIX) {
                continue;
            }
            let Some(value) = storage.get(&key).await else {
                continue;
            };
            match serde_json::from_value::<User>(value) {
                Ok(user) if user.email == email => return Some(user),
                _ => {}
            }
        }

        None
    }

    fn new_user(&self, data: &RegisterData) -> User {
        let first = data.first_name.to_lowercase();
        let last = data.last_name.to_lowercase();
        User {
            id: format!("user-{}", base36_suffix()),
            email: format!("{first}.{last}.{}@example.com", base36_suffix()),
            name: format!("{} {}", data.first_name, data.last_name),
            first_name: Some(data.first_name.clone()),
            last_name: Some(data.last_name.clone()),
            team_id: None,
            email_verified_at: None,
        }
    }

    fn new_project(&self, data: &CreateProjectData, user: &User) -> Project {
        let now = now_rfc3339();
        let title = if data.title.is_empty() {
            "Untitled Story".to_string()
        } else {
            data.title.clone()
        };
        Project {
            id: format!("project-{}", base36_suffix()),
            user_id: user.id.clone(),
            team_id: user.team_id.clone(),
            title,
            description: data.description.clone(),
            status: ProjectStatus::Draft,
            current_step: StepId::Intro,
            responses: Default::default(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn new_team(&self, data: &CreateTeamData) -> Team {
        let now = now_rfc3339();
        Team {
            id: format!("team-{}", unix_millis()),
            name: data.name.clone(),
            description: data.description.clone(),
            status: data.status.unwrap_or(TeamStatus::Active),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        }
    }

    fn merge_responses(&self, mut project: Project, step: &str, responses: ResponseMap) -> Project {
        project.responses.insert(step.to_string(), responses);
        // Unknown step ids still store their answers; the cursor only moves
        // for steps the wizard knows.
        if let Some(id) = StepId::parse(step) {
            project.current_step = id;
        }
        project.status = ProjectStatus::InProgress;
        project.touch();
        project
    }

    fn mark_completed(&self, _project: Option<&Project>) -> ProjectPatch {
        ProjectPatch {
            status: Some(ProjectStatus::Completed),
            current_step: Some(StepId::Complete),
            ..ProjectPatch::default()
        }
    }
}

/// Data source backed entirely by the storage layer.
///
/// Follows the storage failure policy: reads degrade, so a missing or
/// unreadable record looks absent, while writes surface their errors.
pub struct LocalDataSource {
    storage: StorageHandle,
    policy: Arc<dyn StoryPolicy>,
}

impl LocalDataSource {
    pub fn new(storage: StorageHandle) -> Self {
        Self::with_policy(storage, Arc::new(DemoPolicy))
    }

    pub fn with_policy(storage: StorageHandle, policy: Arc<dyn StoryPolicy>) -> Self {
        Self { storage, policy }
    }

    /// Reads and decodes `key`, treating unreadable records as absent.
    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.storage.get(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                log::error!("Stored record {key} has an unexpected shape: {err}");
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, record: &T) -> anyhow::Result<()> {
        let value = serde_json::to_value(record)?;
        self.storage.set(key, &value).await
    }

    /// Decodes every record under `prefix`, skipping ones that do not parse.
    async fn read_all<T: DeserializeOwned>(&self, prefix: &str) -> Vec<T> {
        self.storage
            .get_all_by_prefix(prefix)
            .await
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value(value) {
                Ok(decoded) => Some(decoded),
                Err(err) => {
                    log::error!("Stored record {key} has an unexpected shape: {err}");
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl DataSource for LocalDataSource {
    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, EngineError> {
        let user = match self
            .policy
            .validate_credentials(email, password, self.storage.as_ref())
            .await
        {
            Some(user) => user,
            None => {
                let err = EngineError::InvalidCredentials;
                log::error!("Login failed: {err}");
                return Err(err);
            }
        };

        if let Err(err) = self.write(USER_KEY, &user).await {
            log::error!("Login failed: {err:#}");
            return Err(err.into());
        }

        let token = mint_token(&user.id, Some(email));
        Ok(AuthPayload { user, token })
    }

    async fn register(&self, data: RegisterData) -> Result<AuthPayload, EngineError> {
        let user = self.policy.new_user(&data);

        if let Err(err) = self.write(&format!("{USER_PREFIX}{}", user.id), &user).await {
            log::error!("Registration failed: {err:#}");
            return Err(err.into());
        }

        // Registration does not sign the user in; only login writes the
        // auth:user mirror.
        let token = mint_token(&user.id, None);
        Ok(AuthPayload { user, token })
    }

    async fn logout(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<User>, EngineError> {
        Ok(self.read(USER_KEY).await)
    }

    async fn update_user(&self, patch: UserPatch) -> Result<User, EngineError> {
        let Some(mut user) = self.read::<User>(USER_KEY).await else {
            let err = EngineError::NoUserLoggedIn;
            log::error!("Failed to update user: {err}");
            return Err(err);
        };

        patch.apply(&mut user);

        let canonical = format!("{USER_PREFIX}{}", user.id);
        for key in [USER_KEY, canonical.as_str()] {
            if let Err(err) = self.write(key, &user).await {
                log::error!("Failed to update user: {err:#}");
                return Err(err.into());
            }
        }

        Ok(user)
    }

    async fn get_projects(
        &self,
        filter: Option<ProjectFilter>,
    ) -> Result<Vec<Project>, EngineError> {
        let mut projects: Vec<Project> = self.read_all(PROJECT_PREFIX).await;
        if let Some(team) = filter.and_then(|f| f.team) {
            projects.retain(|p| p.team_id.as_deref() == Some(team.as_str()));
        }
        Ok(projects)
    }

    async fn get_project(&self, id: &str) -> Result<Option<Project>, EngineError> {
        Ok(self.read(&format!("{PROJECT_PREFIX}{id}")).await)
    }

    async fn create_project(&self, data: CreateProjectData) -> Result<Project, EngineError> {
        let Some(user) = self.read::<User>(USER_KEY).await else {
            let err = EngineError::NotAuthenticated;
            log::error!("Failed to create project: {err}");
            return Err(err);
        };

        let project = self.policy.new_project(&data, &user);
        if let Err(err) = self
            .write(&format!("{PROJECT_PREFIX}{}", project.id), &project)
            .await
        {
            log::error!("Failed to create project: {err:#}");
            return Err(err.into());
        }

        Ok(project)
    }

    async fn update_project(
        &self,
        id: &str,
        patch: ProjectPatch,
    ) -> Result<Project, EngineError> {
        let key = format!("{PROJECT_PREFIX}{id}");
        let Some(mut project) = self.read::<Project>(&key).await else {
            let err = EngineError::ProjectNotFound;
            log::error!("Failed to update project: {err}");
            return Err(err);
        };

        patch.apply(&mut project);
        project.touch();

        if let Err(err) = self.write(&key, &project).await {
            log::error!("Failed to update project: {err:#}");
            return Err(err.into());
        }

        Ok(project)
    }

    async fn delete_project(&self, id: &str) -> Result<(), EngineError> {
        self.storage.remove(&format!("{PROJECT_PREFIX}{id}")).await;
        Ok(())
    }

    async fn save_responses(
        &self,
        project_id: &str,
        step: &str,
        responses: ResponseMap,
    ) -> Result<Project, EngineError> {
        let key = format!("{PROJECT_PREFIX}{project_id}");
        let Some(project) = self.read::<Project>(&key).await else {
            let err = EngineError::ProjectNotFound;
            log::error!("Failed to save responses: {err}");
            return Err(err);
        };

        let updated = self.policy.merge_responses(project, step, responses);
        if let Err(err) = self.write(&key, &updated).await {
            log::error!("Failed to save responses: {err:#}");
            return Err(err.into());
        }

        Ok(updated)
    }

    async fn complete_project(&self, project_id: &str) -> Result<Project, EngineError> {
        let current = self
            .read::<Project>(&format!("{PROJECT_PREFIX}{project_id}"))
            .await;
        let patch = self.policy.mark_completed(current.as_ref());
        self.update_project(project_id, patch).await
    }

    async fn get_teams(&self) -> Result<Vec<Team>, EngineError> {
        Ok(self.read_all(TEAM_PREFIX).await)
    }

    async fn get_team(&self, id: &str) -> Result<Option<Team>, EngineError> {
        Ok(self.read(&format!("{TEAM_PREFIX}{id}")).await)
    }

    async fn create_team(&self, data: CreateTeamData) -> Result<Team, EngineError> {
        let team = self.policy.new_team(&data);

        if let Err(err) = self.write(&format!("{TEAM_PREFIX}{}", team.id), &team).await {
            log::error!("Failed to create team: {err:#}");
            return Err(err.into());
        }

        Ok(team)
    }

    async fn update_team(&self, id: &str, patch: TeamPatch) -> Result<Team, EngineError> {
        let key = format!("{TEAM_PREFIX}{id}");
        let Some(mut team) = self.read::<Team>(&key).await else {
            let err = EngineError::TeamNotFound;
            log::error!("Failed to update team: {err}");
            return Err(err);
        };

        patch.apply(&mut team);
        team.updated_at = Some(now_rfc3339());

        if let Err(err) = self.write(&key, &team).await {
            log::error!("Failed to update team: {err:#}");
            return Err(err.into());
        }

        Ok(team)
    }

    async fn accept_terms(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn get_notifications(&self) -> Result<NotificationList, EngineError> {
        // No local inbox; the API mode owns notifications.
        Ok(NotificationList::default())
    }

    async fn mark_notification_read(&self, _id: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn mark_all_notifications_read(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryAdapter;
    use serde_json::Value;

    fn demo_user() -> User {
        User {
            id: "1".into(),
            email: "demo@example.com".into(),
            name: "Demo User".into(),
            first_name: None,
            last_name: None,
            team_id: Some("1".into()),
            email_verified_at: None,
        }
    }

    async fn seeded_source() -> (StorageHandle, LocalDataSource) {
        let storage: StorageHandle = Arc::new(InMemoryAdapter::new());
        storage
            .set("user:1", &serde_json::to_value(demo_user()).unwrap())
            .await
            .unwrap();
        let source = LocalDataSource::new(storage.clone());
        (storage, source)
    }

    fn decode_claims(token: &str) -> Value {
        let bytes = BASE64.decode(token).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn login_checks_the_shared_demo_password() {
        let (_, source) = seeded_source().await;

        let err = source.login("demo@example.com", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");

        let err = source
            .login("ghost@example.com", DEMO_PASSWORD)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidCredentials));

        let payload = source
            .login("demo@example.com", DEMO_PASSWORD)
            .await
            .unwrap();
        assert_eq!(payload.user.id, "1");

        // the signed-in user is mirrored for later get_user calls
        let mirrored = source.get_user().await.unwrap();
        assert_eq!(mirrored.map(|u| u.id), Some("1".to_string()));
    }

    #[tokio::test]
    async fn tokens_carry_inspectable_claims() {
        let (_, source) = seeded_source().await;

        let payload = source
            .login("demo@example.com", DEMO_PASSWORD)
            .await
            .unwrap();
        let claims = decode_claims(&payload.token);
        assert_eq!(claims["userId"], "1");
        assert_eq!(claims["email"], "demo@example.com");
        assert!(claims["exp"].as_i64().unwrap() > unix_millis());

        let registered = source
            .register(RegisterData {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
            })
            .await
            .unwrap();
        let claims = decode_claims(&registered.token);
        assert_eq!(claims["userId"].as_str(), Some(registered.user.id.as_str()));
        // registration claims never include an e-mail
        assert!(claims.get("email").is_none());
    }

    #[tokio::test]
    async fn register_stores_the_user_but_does_not_sign_in() {
        let storage: StorageHandle = Arc::new(InMemoryAdapter::new());
        let source = LocalDataSource::new(storage.clone());

        let payload = source
            .register(RegisterData {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
            })
            .await
            .unwrap();

        assert!(payload.user.id.starts_with("user-"));
        assert!(payload.user.email.starts_with("ada.lovelace."));
        assert!(payload.user.email.ends_with("@example.com"));
        assert_eq!(payload.user.name, "Ada Lovelace");
        assert_eq!(payload.user.team_id, None);

        let key = format!("user:{}", payload.user.id);
        assert!(storage.get(&key).await.is_some());
        assert!(storage.get(USER_KEY).await.is_none());
    }

    #[tokio::test]
    async fn create_project_requires_a_signed_in_user() {
        let (_, source) = seeded_source().await;

        let err = source
            .create_project(CreateProjectData::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotAuthenticated));

        source
            .login("demo@example.com", DEMO_PASSWORD)
            .await
            .unwrap();
        let project = source
            .create_project(CreateProjectData::default())
            .await
            .unwrap();
        assert!(project.id.starts_with("project-"));
        assert_eq!(project.title, "Untitled Story");
        assert_eq!(project.user_id, "1");
        // ownership follows the creator's team
        assert_eq!(project.team_id.as_deref(), Some("1"));
        assert_eq!(project.status, ProjectStatus::Draft);
        assert_eq!(project.current_step, StepId::Intro);
        assert!(project.responses.is_empty());
    }

    #[tokio::test]
    async fn save_responses_replaces_one_step_and_advances() {
        let (_, source) = seeded_source().await;
        source
            .login("demo@example.com", DEMO_PASSWORD)
            .await
            .unwrap();
        let project = source
            .create_project(CreateProjectData {
                title: "Draft".into(),
                description: None,
            })
            .await
            .unwrap();

        let mut intro = ResponseMap::new();
        intro.insert("intro_1".into(), Value::from("first"));
        intro.insert("intro_2".into(), Value::from("second"));
        let saved = source
            .save_responses(&project.id, "intro", intro)
            .await
            .unwrap();
        assert_eq!(saved.status, ProjectStatus::InProgress);
        assert_eq!(saved.current_step, StepId::Intro);

        // replacing a step drops fields absent from the new answers
        let mut rewrite = ResponseMap::new();
        rewrite.insert("intro_1".into(), Value::from("rewritten"));
        let saved = source
            .save_responses(&project.id, "intro", rewrite)
            .await
            .unwrap();
        let intro = saved.step_responses("intro").unwrap();
        assert_eq!(intro.get("intro_1"), Some(&Value::from("rewritten")));
        assert!(intro.get("intro_2").is_none());

        // a later step leaves earlier steps untouched
        let mut section = ResponseMap::new();
        section.insert("section_a_1".into(), Value::from(true));
        let saved = source
            .save_responses(&project.id, "section-a", section)
            .await
            .unwrap();
        assert_eq!(saved.current_step, StepId::SectionA);
        assert!(saved.step_responses("intro").is_some());

        let err = source
            .save_responses("nope", "intro", ResponseMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Project not found");
    }

    #[tokio::test]
    async fn complete_project_stamps_status_and_step() {
        let (_, source) = seeded_source().await;
        source
            .login("demo@example.com", DEMO_PASSWORD)
            .await
            .unwrap();
        let project = source
            .create_project(CreateProjectData {
                title: "Almost done".into(),
                description: None,
            })
            .await
            .unwrap();

        let done = source.complete_project(&project.id).await.unwrap();
        assert_eq!(done.status, ProjectStatus::Completed);
        assert_eq!(done.current_step, StepId::Complete);
        assert_eq!(done.title, "Almost done");

        let err = source.complete_project("project-ghost").await.unwrap_err();
        assert!(matches!(err, EngineError::ProjectNotFound));
    }

    #[tokio::test]
    async fn project_listing_honors_the_team_filter() {
        let (_, source) = seeded_source().await;
        source
            .login("demo@example.com", DEMO_PASSWORD)
            .await
            .unwrap();

        let team_project = source
            .create_project(CreateProjectData {
                title: "Team story".into(),
                description: None,
            })
            .await
            .unwrap();

        // detach the user, then create a personal project
        source
            .update_user(UserPatch {
                team_id: Some(None),
                ..UserPatch::default()
            })
            .await
            .unwrap();
        source
            .create_project(CreateProjectData {
                title: "Personal story".into(),
                description: None,
            })
            .await
            .unwrap();

        assert_eq!(source.get_projects(None).await.unwrap().len(), 2);

        let filtered = source
            .get_projects(Some(ProjectFilter {
                team: Some("1".into()),
            }))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, team_project.id);
    }

    #[tokio::test]
    async fn teams_round_trip_with_defaults() {
        let (_, source) = seeded_source().await;

        let team = source
            .create_team(CreateTeamData {
                name: "Acme Corporation".into(),
                description: None,
                status: None,
            })
            .await
            .unwrap();
        assert!(team.id.starts_with("team-"));
        assert_eq!(team.status, TeamStatus::Active);

        let fetched = source.get_team(&team.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Acme Corporation");

        let updated = source
            .update_team(
                &team.id,
                TeamPatch {
                    status: Some(TeamStatus::Inactive),
                    ..TeamPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, TeamStatus::Inactive);

        let err = source
            .update_team("team-ghost", TeamPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Team not found");
    }

    #[tokio::test]
    async fn local_inbox_is_always_empty() {
        let (_, source) = seeded_source().await;

        let inbox = source.get_notifications().await.unwrap();
        assert!(inbox.notifications.is_empty());
        assert_eq!(inbox.unread_count, 0);

        // terms, logout and read-marks are accepted no-ops
        source.accept_terms().await.unwrap();
        source.logout().await.unwrap();
        source.mark_notification_read("n1").await.unwrap();
        source.mark_all_notifications_read().await.unwrap();
    }
}
