//! Client-side session state: the signed-in user and bearer token.
//!
//! The session persists at two well-known keys (`auth:token`, `auth:user`)
//! on the local storage side, mirrors the token into a shared [`TokenCell`]
//! the HTTP client reads per request, and broadcasts lifecycle changes so a
//! shell can react (e.g. route to a login screen on [`SessionEvent::Expired`]).

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tokio::sync::broadcast;

use crate::errors::EngineError;
use crate::models::User;
use crate::net::TokenCell;
use crate::storage::{StorageAdapter, StorageHandle};

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "auth:token";
/// Storage key holding the signed-in user.
pub const USER_KEY: &str = "auth:user";

const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoggedIn { user_id: String },
    LoggedOut,
    /// The server rejected the token. Client-side state is already cleared
    /// when this fires; subscribers own the redirect to a login screen.
    Expired,
}

/// A handle for receiving session lifecycle notifications.
pub type Subscription = broadcast::Receiver<SessionEvent>;

pub struct Session {
    storage: StorageHandle,
    token: TokenCell,
    tx: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(storage: StorageHandle) -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            storage,
            token: Arc::new(RwLock::new(None)),
            tx,
        }
    }

    pub fn subscribe(&self) -> Subscription {
        self.tx.subscribe()
    }

    pub(crate) fn sender(&self) -> broadcast::Sender<SessionEvent> {
        self.tx.clone()
    }

    /// Token slot shared with the HTTP client.
    pub fn token_cell(&self) -> TokenCell {
        self.token.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok()?.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Rehydrates the session from storage at startup. Returns the restored
    /// user, or `None` when nobody was signed in.
    pub async fn restore(&self) -> Option<User> {
        let token = match self.storage.get(TOKEN_KEY).await {
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
            None => None,
        };

        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }

        self.current_user().await
    }

    /// Persists a fresh login and announces it.
    pub async fn establish(&self, token: &str, user: &User) -> Result<(), EngineError> {
        self.storage
            .set(TOKEN_KEY, &Value::String(token.to_string()))
            .await?;
        self.set_user(user).await?;

        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token.to_string());
        }

        let _ = self.tx.send(SessionEvent::LoggedIn {
            user_id: user.id.clone(),
        });
        Ok(())
    }

    /// Updates the signed-in user mirror (after a profile change).
    pub async fn set_user(&self, user: &User) -> Result<(), EngineError> {
        let value = serde_json::to_value(user).map_err(|e| EngineError::Storage(e.to_string()))?;
        self.storage.set(USER_KEY, &value).await?;
        Ok(())
    }

    pub async fn current_user(&self) -> Option<User> {
        let value = self.storage.get(USER_KEY).await?;
        serde_json::from_value(value).ok()
    }

    /// Drops all session state and announces the logout.
    pub async fn clear(&self) {
        self.storage.remove(TOKEN_KEY).await;
        self.storage.remove(USER_KEY).await;

        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }

        let _ = self.tx.send(SessionEvent::LoggedOut);
    }
}
