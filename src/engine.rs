//! The engine: one instance wiring storage, session, and data source.
//!
//! [`StoryEngine`] is the application context. It owns the hybrid store,
//! the session over it, and whichever [`DataSource`] the configured mode
//! selects; everything a shell needs hangs off the instance, so two
//! engines with different configurations can coexist in one process.

use std::sync::Arc;

use crate::backup::{self, MigrationResult, StorageExport};
use crate::config::{DataSourceMode, EngineConfig};
use crate::datasource::{
    DataSource, DataSourceFactory, DataSourceFactoryConfig, DataSourceHandle, RegisterData,
};
use crate::errors::EngineError;
use crate::models::{Project, User};
use crate::net::HttpClient;
use crate::seed;
use crate::session::Session;
use crate::storage::{HybridStorage, StorageHandle};
use crate::story::SectionForm;

pub struct StoryEngine {
    config: EngineConfig,
    storage: StorageHandle,
    session: Session,
    source: DataSourceHandle,
}

impl std::fmt::Debug for StoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StoryEngine {
    /// Builds an engine for `config`, or the default local-mode engine for
    /// `None`. Fails when the store cannot be opened or the mode's
    /// dependencies cannot be built; hybrid mode fails here, loudly.
    pub fn new(config: Option<EngineConfig>) -> Result<Self, EngineError> {
        let config = config.unwrap_or_default();

        let storage: StorageHandle = Arc::new(HybridStorage::open(&config.storage)?);
        let session = Session::new(storage.clone());

        let http_client = match config.mode {
            DataSourceMode::Api => {
                let api_config = config.api.clone().unwrap_or_default();
                let mut client = HttpClient::new(&api_config, &config.user_agent)?;
                client.bind_session(session.token_cell(), storage.clone(), session.sender());
                Some(client)
            }
            _ => None,
        };

        let source = DataSourceFactory::create(DataSourceFactoryConfig {
            mode: config.mode,
            http_client,
            storage: Some(storage.clone()),
            policy: None,
        })?;

        log::info!("Engine started in {} mode", config.mode.as_str());

        Ok(Self {
            config,
            storage,
            session,
            source,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> StorageHandle {
        self.storage.clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn data_source(&self) -> DataSourceHandle {
        self.source.clone()
    }

    // Auth orchestration: the data source answers, the session records.

    pub async fn login(&self, email: &str, password: &str) -> Result<User, EngineError> {
        let auth = self.source.login(email, password).await?;
        self.session.establish(&auth.token, &auth.user).await?;
        Ok(auth.user)
    }

    pub async fn register(&self, data: RegisterData) -> Result<User, EngineError> {
        let auth = self.source.register(data).await?;
        self.session.establish(&auth.token, &auth.user).await?;
        Ok(auth.user)
    }

    /// Signs out. The data source call is best-effort; local session state
    /// is cleared either way.
    pub async fn logout(&self) {
        let _ = self.source.logout().await;
        self.session.clear().await;
    }

    /// Rehydrates the session from storage, then lets the data source
    /// refresh the user when it can answer. Returns the signed-in user, or
    /// `None` when nobody was signed in.
    pub async fn restore_session(&self) -> Option<User> {
        let restored = self.session.restore().await?;

        match self.source.get_user().await {
            Ok(Some(fresh)) => {
                let _ = self.session.set_user(&fresh).await;
                Some(fresh)
            }
            _ => Some(restored),
        }
    }

    /// Opens `step` of `project` at `page` for editing.
    pub fn section_form(&self, project: &Project, step: &str, page: u32) -> SectionForm {
        SectionForm::new(self.source.clone(), project, step, page)
    }

    // Demo data and backup pass-throughs.

    pub async fn seed_demo_data(&self) -> Result<(), EngineError> {
        seed::seed_demo_data(&*self.storage).await?;
        Ok(())
    }

    /// Seeds demo data only on first run.
    pub async fn initialize_demo_data(&self) -> Result<(), EngineError> {
        seed::initialize_demo_data(&*self.storage).await?;
        Ok(())
    }

    pub async fn is_seeded(&self) -> bool {
        seed::is_seeded(&*self.storage).await
    }

    pub async fn clear_all_data(&self) {
        seed::clear_all_data(&*self.storage).await;
    }

    pub async fn export_storage(&self) -> StorageExport {
        backup::export_storage(&*self.storage).await
    }

    pub async fn import_storage(&self, export: &StorageExport) -> Result<usize, EngineError> {
        let restored = backup::import_storage(&*self.storage, export).await?;
        Ok(restored)
    }

    /// Pushes locally stored projects to `target`, typically an
    /// [`ApiDataSource`](crate::datasource::ApiDataSource) after the user
    /// signed in there.
    pub async fn migrate_projects(&self, target: &dyn DataSource) -> MigrationResult {
        backup::migrate_projects(&*self.storage, target).await
    }
}
