//! The data-source contract and its payload types.
//!
//! A `DataSource` answers the same twenty questions regardless of where the
//! data lives: `LocalDataSource` works entirely against the storage layer,
//! `ApiDataSource` forwards everything to the REST backend. Callers hold a
//! [`DataSourceHandle`] and never branch on the mode.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::models::{
    AppNotification, Project, ProjectStatus, ResponseMap, StepId, Team, TeamStatus, User,
};

/// Successful authentication: the signed-in user plus their bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
}

/// Input for `register`. Everything else about the new account (id, e-mail,
/// display name) is derived by the data source.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterData {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateProjectData {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTeamData {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TeamStatus>,
}

/// Optional constraints for `get_projects`.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Keep only projects owned by this team.
    pub team: Option<String>,
}

/// Partial update for the signed-in user. `None` fields are left untouched;
/// `team_id` is doubly optional so `Some(None)` can detach the user from
/// their team.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Option<String>>,
}

impl UserPatch {
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = self.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(team_id) = self.team_id {
            user.team_id = team_id;
        }
    }
}

/// Partial update for a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<StepId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Option<String>>,
    /// Replaces the whole responses map. Use `save_responses` to touch a
    /// single step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<HashMap<String, ResponseMap>>,
}

impl ProjectPatch {
    pub fn apply(self, project: &mut Project) {
        if let Some(title) = self.title {
            project.title = title;
        }
        if let Some(description) = self.description {
            project.description = Some(description);
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(current_step) = self.current_step {
            project.current_step = current_step;
        }
        if let Some(team_id) = self.team_id {
            project.team_id = team_id;
        }
        if let Some(responses) = self.responses {
            project.responses = responses;
        }
    }
}

/// Partial update for a team.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TeamStatus>,
}

impl TeamPatch {
    pub fn apply(self, team: &mut Team) {
        if let Some(name) = self.name {
            team.name = name;
        }
        if let Some(description) = self.description {
            team.description = Some(description);
        }
        if let Some(status) = self.status {
            team.status = status;
        }
    }
}

/// The inbox: entries plus how many are unread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationList {
    pub notifications: Vec<AppNotification>,
    pub unread_count: u32,
}

/// Uniform interface over story data, whatever its home.
///
/// Error behavior is part of the contract and deliberately asymmetric:
/// lookups of things that may legitimately be absent (`get_project`,
/// `get_team`) return `Ok(None)`, `get_user` and `get_notifications` degrade
/// to empty rather than fail, and mutations surface every error.
#[async_trait]
pub trait DataSource: Send + Sync {
    // Authentication
    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, EngineError>;
    async fn register(&self, data: RegisterData) -> Result<AuthPayload, EngineError>;
    /// Ends the server-side session, if there is one. Never fails.
    async fn logout(&self) -> Result<(), EngineError>;
    async fn get_user(&self) -> Result<Option<User>, EngineError>;
    async fn update_user(&self, patch: UserPatch) -> Result<User, EngineError>;

    // Projects
    async fn get_projects(
        &self,
        filter: Option<ProjectFilter>,
    ) -> Result<Vec<Project>, EngineError>;
    async fn get_project(&self, id: &str) -> Result<Option<Project>, EngineError>;
    async fn create_project(&self, data: CreateProjectData) -> Result<Project, EngineError>;
    async fn update_project(&self, id: &str, patch: ProjectPatch)
        -> Result<Project, EngineError>;
    async fn delete_project(&self, id: &str) -> Result<(), EngineError>;
    /// Stores one step's answers, replacing that step's previous answers
    /// wholesale, and moves the project onto `step`.
    async fn save_responses(
        &self,
        project_id: &str,
        step: &str,
        responses: ResponseMap,
    ) -> Result<Project, EngineError>;
    async fn complete_project(&self, project_id: &str) -> Result<Project, EngineError>;

    // Teams
    async fn get_teams(&self) -> Result<Vec<Team>, EngineError>;
    async fn get_team(&self, id: &str) -> Result<Option<Team>, EngineError>;
    async fn create_team(&self, data: CreateTeamData) -> Result<Team, EngineError>;
    async fn update_team(&self, id: &str, patch: TeamPatch) -> Result<Team, EngineError>;

    // Terms
    async fn accept_terms(&self) -> Result<(), EngineError>;

    // Notifications
    async fn get_notifications(&self) -> Result<NotificationList, EngineError>;
    async fn mark_notification_read(&self, id: &str) -> Result<(), EngineError>;
    async fn mark_all_notifications_read(&self) -> Result<(), EngineError>;
}

impl std::fmt::Debug for dyn DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource").finish_non_exhaustive()
    }
}

/// Shared handle to the active data source.
pub type DataSourceHandle = Arc<dyn DataSource>;
