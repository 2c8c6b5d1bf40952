#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No user logged in")]
    NoUserLoggedIn,

    #[error("Project not found")]
    ProjectNotFound,

    #[error("Team not found")]
    TeamNotFound,

    #[error("Hybrid mode not yet implemented. Please use \"local\" or \"api\" mode.")]
    HybridModeUnavailable,

    #[error("HTTP client is required for API mode")]
    MissingHttpClient,

    #[error("storage is required for local mode")]
    MissingStorage,

    /// Failing HTTP status with the message extracted from the error body.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Status code of the underlying API failure, if this is an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(e: anyhow::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}
