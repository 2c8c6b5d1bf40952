//! Mode-based construction of the active data source.

use std::sync::Arc;

use crate::config::DataSourceMode;
use crate::errors::EngineError;
use crate::net::HttpClient;
use crate::storage::StorageHandle;

use super::api::ApiDataSource;
use super::local::{LocalDataSource, StoryPolicy};
use super::types::DataSourceHandle;

/// Everything a data source might need; which parts are required depends on
/// the mode.
#[derive(Default)]
pub struct DataSourceFactoryConfig {
    pub mode: DataSourceMode,
    /// Required in API mode.
    pub http_client: Option<HttpClient>,
    /// Required in local mode.
    pub storage: Option<StorageHandle>,
    /// Local-mode policy override; defaults to `DemoPolicy`.
    pub policy: Option<Arc<dyn StoryPolicy>>,
}

pub struct DataSourceFactory;

impl DataSourceFactory {
    /// Builds the data source for `config.mode`, failing loudly when the
    /// mode's dependencies are missing. `Hybrid` is reserved and always an
    /// error, never a silent fallback to local.
    pub fn create(config: DataSourceFactoryConfig) -> Result<DataSourceHandle, EngineError> {
        match config.mode {
            DataSourceMode::Api => {
                let api = config.http_client.ok_or(EngineError::MissingHttpClient)?;
                Ok(Arc::new(ApiDataSource::new(api)))
            }

            DataSourceMode::Hybrid => Err(EngineError::HybridModeUnavailable),

            DataSourceMode::Local => {
                let storage = config.storage.ok_or(EngineError::MissingStorage)?;
                let source = match config.policy {
                    Some(policy) => LocalDataSource::with_policy(storage, policy),
                    None => LocalDataSource::new(storage),
                };
                Ok(Arc::new(source))
            }
        }
    }
}
