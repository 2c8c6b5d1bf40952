//! REST-backed data source.
//!
//! A thin forwarding layer over [`HttpClient`]: one route per operation,
//! with `{data: ...}` envelopes already unwrapped by the client. What this
//! layer adds is the per-operation failure policy: id lookups translate 404
//! into absence, `get_user` and `get_notifications` degrade instead of
//! failing, and every other error is logged and surfaced.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::errors::EngineError;
use crate::models::{Project, ResponseMap, Team, User};
use crate::net::{ApiError, HttpClient};

use super::types::{
    AuthPayload, CreateProjectData, CreateTeamData, DataSource, NotificationList, ProjectFilter,
    ProjectPatch, RegisterData, TeamPatch, UserPatch,
};

/// `GET /auth/user` nests the user one level deeper than other payloads.
#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

fn surface(op: &str, err: ApiError) -> EngineError {
    log::error!("{op}: {err}");
    err.into()
}

pub struct ApiDataSource {
    api: HttpClient,
}

impl ApiDataSource {
    pub fn new(api: HttpClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for ApiDataSource {
    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, EngineError> {
        let body = json!({ "email": email, "password": password });
        self.api
            .post_json("/auth/login", &body)
            .await
            .map_err(|err| surface("Login failed", err))
    }

    async fn register(&self, data: RegisterData) -> Result<AuthPayload, EngineError> {
        self.api
            .post_json("/auth/register", &data)
            .await
            .map_err(|err| surface("Registration failed", err))
    }

    async fn logout(&self) -> Result<(), EngineError> {
        // Fire and forget; a failed server-side logout never blocks the
        // client-side one.
        if let Err(err) = self.api.post_bare("/auth/logout").await {
            log::error!("Logout failed: {err}");
        }
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<User>, EngineError> {
        match self.api.get_json::<UserEnvelope>("/auth/user", &[]).await {
            Ok(envelope) => Ok(Some(envelope.user)),
            Err(err) => {
                log::error!("Get user failed: {err}");
                Ok(None)
            }
        }
    }

    async fn update_user(&self, patch: UserPatch) -> Result<User, EngineError> {
        self.api
            .put_json("/auth/user", &patch)
            .await
            .map_err(|err| surface("Update user failed", err))
    }

    async fn get_projects(
        &self,
        filter: Option<ProjectFilter>,
    ) -> Result<Vec<Project>, EngineError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(team) = filter.and_then(|f| f.team) {
            query.push(("team", team));
        }
        self.api
            .get_json("/projects", &query)
            .await
            .map_err(|err| surface("Get projects failed", err))
    }

    async fn get_project(&self, id: &str) -> Result<Option<Project>, EngineError> {
        match self
            .api
            .get_json::<Project>(&format!("/projects/{id}"), &[])
            .await
        {
            Ok(project) => Ok(Some(project)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(surface("Get project failed", err)),
        }
    }

    async fn create_project(&self, data: CreateProjectData) -> Result<Project, EngineError> {
        self.api
            .post_json("/projects", &data)
            .await
            .map_err(|err| surface("Create project failed", err))
    }

    async fn update_project(
        &self,
        id: &str,
        patch: ProjectPatch,
    ) -> Result<Project, EngineError> {
        self.api
            .put_json(&format!("/projects/{id}"), &patch)
            .await
            .map_err(|err| surface("Update project failed", err))
    }

    async fn delete_project(&self, id: &str) -> Result<(), EngineError> {
        self.api
            .delete(&format!("/projects/{id}"))
            .await
            .map_err(|err| surface("Delete project failed", err))
    }

    async fn save_responses(
        &self,
        project_id: &str,
        step: &str,
        responses: ResponseMap,
    ) -> Result<Project, EngineError> {
        let body = json!({ "step": step, "responses": responses });
        self.api
            .post_json(&format!("/projects/{project_id}/responses"), &body)
            .await
            .map_err(|err| surface("Save responses failed", err))
    }

    async fn complete_project(&self, project_id: &str) -> Result<Project, EngineError> {
        self.api
            .post_action(&format!("/projects/{project_id}/complete"))
            .await
            .map_err(|err| surface("Complete project failed", err))
    }

    async fn get_teams(&self) -> Result<Vec<Team>, EngineError> {
        self.api
            .get_json("/teams", &[])
            .await
            .map_err(|err| surface("Get teams failed", err))
    }

    async fn get_team(&self, id: &str) -> Result<Option<Team>, EngineError> {
        match self.api.get_json::<Team>(&format!("/teams/{id}"), &[]).await {
            Ok(team) => Ok(Some(team)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(surface("Get team failed", err)),
        }
    }

    async fn create_team(&self, data: CreateTeamData) -> Result<Team, EngineError> {
        self.api
            .post_json("/teams", &data)
            .await
            .map_err(|err| surface("Create team failed", err))
    }

    async fn update_team(&self, id: &str, patch: TeamPatch) -> Result<Team, EngineError> {
        self.api
            .put_json(&format!("/teams/{id}"), &patch)
            .await
            .map_err(|err| surface("Update team failed", err))
    }

    async fn accept_terms(&self) -> Result<(), EngineError> {
        self.api
            .post_empty("/terms/accept", &json!({ "accepted": true }))
            .await
            .map_err(|err| surface("Accept terms failed", err))
    }

    async fn get_notifications(&self) -> Result<NotificationList, EngineError> {
        match self
            .api
            .get_json::<NotificationList>("/notifications", &[])
            .await
        {
            Ok(inbox) => Ok(inbox),
            Err(err) => {
                log::error!("Get notifications failed: {err}");
                Ok(NotificationList::default())
            }
        }
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), EngineError> {
        self.api
            .post_bare(&format!("/notifications/{id}/read"))
            .await
            .map_err(|err| surface("Mark notification as read failed", err))
    }

    async fn mark_all_notifications_read(&self) -> Result<(), EngineError> {
        self.api
            .post_bare("/notifications/read-all")
            .await
            .map_err(|err| surface("Mark all notifications as read failed", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// One-shot HTTP server: serves a canned response to the first request
    /// and hands the raw request head back for assertions.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let _ = tx.send(String::from_utf8_lossy(&buf[..n]).into_owned());

            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });

        (format!("http://{addr}"), rx)
    }

    fn source_for(base: &str) -> ApiDataSource {
        let config = ApiConfig {
            base_url: base.to_string(),
            ..ApiConfig::default()
        };
        ApiDataSource::new(HttpClient::new(&config, "StoryformEngine/1.0").unwrap())
    }

    #[tokio::test]
    async fn get_project_treats_404_as_absent() {
        let (base, request) = serve_once("404 Not Found", r#"{"message":"Project not found"}"#).await;
        let source = source_for(&base);

        let project = source.get_project("p1").await.unwrap();
        assert!(project.is_none());

        let head = request.await.unwrap();
        assert!(head.starts_with("GET /api/v1/projects/p1 "));
    }

    #[tokio::test]
    async fn listing_errors_surface_status_and_message() {
        let (base, _request) =
            serve_once("500 Internal Server Error", r#"{"message":"Server exploded"}"#).await;
        let source = source_for(&base);

        let err = source.get_projects(None).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "Server exploded");
    }

    #[tokio::test]
    async fn team_filter_becomes_a_query_parameter() {
        let (base, request) = serve_once("200 OK", r#"{"data":[]}"#).await;
        let source = source_for(&base);

        let projects = source
            .get_projects(Some(ProjectFilter {
                team: Some("42".into()),
            }))
            .await
            .unwrap();
        assert!(projects.is_empty());

        let head = request.await.unwrap();
        assert!(head.starts_with("GET /api/v1/projects?team=42 "));
    }

    #[tokio::test]
    async fn get_user_unwraps_the_nested_envelope() {
        let (base, _request) = serve_once(
            "200 OK",
            r#"{"data":{"user":{"id":"1","email":"demo@example.com","name":"Demo User","team_id":"1"}}}"#,
        )
        .await;
        let source = source_for(&base);

        let user = source.get_user().await.unwrap().unwrap();
        assert_eq!(user.id, "1");
        assert_eq!(user.team_id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn user_and_inbox_lookups_swallow_failures() {
        let (base, _request) = serve_once("500 Internal Server Error", r#"{"message":"boom"}"#).await;
        let source = source_for(&base);
        assert!(source.get_user().await.unwrap().is_none());

        let (base, _request) = serve_once("503 Service Unavailable", "").await;
        let source = source_for(&base);
        let inbox = source.get_notifications().await.unwrap();
        assert!(inbox.notifications.is_empty());
        assert_eq!(inbox.unread_count, 0);
    }

    #[tokio::test]
    async fn complete_project_posts_without_a_body() {
        let (base, request) = serve_once(
            "200 OK",
            r#"{"data":{"id":"p1","user_id":"1","team_id":null,"title":"T","status":"completed","current_step":"complete","responses":{},"created_at":"2025-01-01T00:00:00Z","updated_at":"2025-01-02T00:00:00Z"}}"#,
        )
        .await;
        let source = source_for(&base);

        let project = source.complete_project("p1").await.unwrap();
        assert_eq!(project.id, "p1");

        let head = request.await.unwrap();
        assert!(head.starts_with("POST /api/v1/projects/p1/complete "));
    }
}
