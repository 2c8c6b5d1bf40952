use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use http::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use url::Url;

use crate::config::ApiConfig;
use crate::errors::EngineError;
use crate::session::SessionEvent;
use crate::storage::{StorageAdapter, StorageHandle};

/// Shared slot holding the raw bearer token, if a session is active.
pub type TokenCell = Arc<RwLock<Option<String>>>;

/// Error shape the API uses for failing responses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    errors: Option<BTreeMap<String, Vec<String>>>,
}

/// `{ "data": ... }` envelope wrapping every successful response body.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Failing HTTP status; `message` comes from the error body when present.
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        /// Field-level validation errors (422 responses).
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("Network error: Unable to reach the server. Please check your connection.")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_validation(&self) -> bool {
        self.status() == Some(422)
    }

    /// Field → messages map from a validation failure, empty otherwise.
    pub fn validation_errors(&self) -> BTreeMap<String, Vec<String>> {
        match self {
            ApiError::Status { errors, .. } => errors.clone(),
            _ => BTreeMap::new(),
        }
    }
}

impl From<ApiError> for EngineError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Status { status, message, .. } => EngineError::Api { status, message },
            ApiError::Transport(e) => EngineError::Network(e.to_string()),
            ApiError::Decode(m) => EngineError::Network(m),
        }
    }
}

/// Stored tokens may be JSON-quoted (the storage layer serializes values),
/// so unwrap one level of quoting when present and fall back to the raw
/// string otherwise.
pub(crate) fn normalize_token(raw: &str) -> String {
    match serde_json::from_str::<String>(raw) {
        Ok(parsed) => parsed,
        Err(_) => raw.to_string(),
    }
}

/// JSON API client for the `/api/v1` surface.
///
/// Injects `Authorization: Bearer <token>` on every request once a session
/// is bound, and reacts to a `401` by clearing the session state before
/// surfacing the error; the session's subscribers decide where to send
/// the user next.
pub struct HttpClient {
    /// Resolved base, origin + `/api/v1`.
    base: Url,
    inner: reqwest::Client,
    token: TokenCell,
    /// Storage holding `auth:token` / `auth:user`, cleared on 401.
    auth_storage: Option<StorageHandle>,
    expired_tx: Option<broadcast::Sender<SessionEvent>>,
    debug: bool,
}

impl HttpClient {
    /// Builds a client for `config`. Fails on an unparsable base URL.
    pub fn new(config: &ApiConfig, user_agent: &str) -> Result<Self> {
        let base = Url::parse(&format!(
            "{}/api/v1",
            config.base_url.trim_end_matches('/')
        ))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let inner = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            base,
            inner,
            token: Arc::new(RwLock::new(None)),
            auth_storage: None,
            expired_tx: None,
            debug: config.debug,
        })
    }

    /// Wires the client to session state: the token slot it reads on every
    /// request, the storage it clears on 401, and the bus it notifies.
    pub fn bind_session(
        &mut self,
        token: TokenCell,
        auth_storage: StorageHandle,
        expired_tx: broadcast::Sender<SessionEvent>,
    ) {
        self.token = token;
        self.auth_storage = Some(auth_storage);
        self.expired_tx = Some(expired_tx);
    }

    pub fn token_cell(&self) -> TokenCell {
        self.token.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn bearer(&self) -> Option<String> {
        let guard = self.token.read().ok()?;
        guard.as_deref().map(normalize_token)
    }

    /// Discards all client-side session state after the server rejected the
    /// token. Subscribers observe `SessionEvent::Expired` and own the
    /// redirect to a login screen.
    async fn handle_unauthorized(&self) {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }

        if let Some(storage) = &self.auth_storage {
            storage.remove(crate::session::TOKEN_KEY).await;
            storage.remove(crate::session::USER_KEY).await;
        }

        if let Some(tx) = &self.expired_tx {
            let _ = tx.send(SessionEvent::Expired);
        }
    }

    async fn send_checked(
        &self,
        method: &str,
        path: &str,
        rb: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        if self.debug {
            log::debug!("HttpClient: {} {}", method, path);
        }

        let rb = match self.bearer() {
            Some(token) => rb.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => rb,
        };

        let resp = rb.send().await.map_err(|e| {
            log::error!("HttpClient: network error on {} {}: {}", method, path, e);
            ApiError::Transport(e)
        })?;

        let status = resp.status();
        if status.is_success() {
            if self.debug {
                log::debug!("HttpClient: {} {} -> {}", method, path, status.as_u16());
            }
            return Ok(resp);
        }

        let body_text = resp.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&body_text).unwrap_or_default();
        let message = body.message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("An unexpected error occurred")
                .to_string()
        });

        if status.as_u16() == 401 {
            self.handle_unauthorized().await;
        }

        log::error!("HttpClient: API error {} on {} {}: {}", status.as_u16(), method, path, message);

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
            errors: body.errors.unwrap_or_default(),
        })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut rb = self.inner.get(self.url(path));
        if !query.is_empty() {
            rb = rb.query(query);
        }
        let resp = self.send_checked("GET", path, rb).await?;
        Self::parse_envelope(resp).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let rb = self.inner.post(self.url(path)).json(body);
        let resp = self.send_checked("POST", path, rb).await?;
        Self::parse_envelope(resp).await
    }

    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let rb = self.inner.put(self.url(path)).json(body);
        let resp = self.send_checked("PUT", path, rb).await?;
        Self::parse_envelope(resp).await
    }

    /// POST where the caller only cares about success, not the body.
    pub async fn post_empty<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let rb = self.inner.post(self.url(path)).json(body);
        self.send_checked("POST", path, rb).await?;
        Ok(())
    }

    /// Bodyless POST for action endpoints that return a model.
    pub async fn post_action<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let rb = self.inner.post(self.url(path));
        let resp = self.send_checked("POST", path, rb).await?;
        Self::parse_envelope(resp).await
    }

    /// Bodyless POST with no meaningful response.
    pub async fn post_bare(&self, path: &str) -> Result<(), ApiError> {
        let rb = self.inner.post(self.url(path));
        self.send_checked("POST", path, rb).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let rb = self.inner.delete(self.url(path));
        self.send_checked("DELETE", path, rb).await?;
        Ok(())
    }

    async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        let envelope: Envelope<T> = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }
}
