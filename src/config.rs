use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = "StoryformEngine/1.0";
const DEFAULT_LOCAL_PREFIX: &str = "vsd:";
const DEFAULT_STORE_NAME: &str = "slide_form_demo";

/// Which data source backs the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DataSourceMode {
    /// Device-local storage, no server.
    #[default]
    Local,
    /// REST API backend.
    Api,
    /// Reserved split mode; constructing it fails loudly.
    Hybrid,
}

impl DataSourceMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataSourceMode::Local => "local",
            DataSourceMode::Api => "api",
            DataSourceMode::Hybrid => "hybrid",
        }
    }

    /// Resolves a mode name; anything unrecognized falls back to `Local`,
    /// the default mode.
    pub fn from_name(name: &str) -> DataSourceMode {
        match name {
            "api" => DataSourceMode::Api,
            "hybrid" => DataSourceMode::Hybrid,
            _ => DataSourceMode::Local,
        }
    }
}

/// One named object store of the indexed backend and the key prefixes it claims.
#[derive(Debug, Clone)]
pub struct StoreBinding {
    pub name: String,
    pub prefixes: Vec<String>,
}

impl StoreBinding {
    pub fn new(name: &str, prefixes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Configuration for the hybrid storage layer.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Namespace prefix applied to every key in the shared JSON file.
    pub local_prefix: String,
    /// Directory holding both backing files.
    pub data_dir: PathBuf,
    /// Base name for the on-disk stores (`<name>.json` / `<name>.db`).
    pub store_name: String,
    /// Named object stores for the indexed backend, in registration order.
    /// The first store is the fallback for keys no prefix claims.
    pub stores: Vec<StoreBinding>,
    /// Key prefixes routed to the indexed backend instead of the JSON file.
    pub indexed_prefixes: Vec<String>,
}

impl StorageConfig {
    pub fn json_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.store_name))
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.db", self.store_name))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_prefix: DEFAULT_LOCAL_PREFIX.to_string(),
            data_dir: PathBuf::from("."),
            store_name: DEFAULT_STORE_NAME.to_string(),
            stores: vec![
                StoreBinding::new("projects", &["project:"]),
                StoreBinding::new("responses", &["response:"]),
            ],
            indexed_prefixes: vec!["project:".to_string(), "response:".to_string()],
        }
    }
}

/// Configuration for the REST API backend. Only used in api mode.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server origin; the versioned path `/api/v1` is appended per request.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Log every request/response at debug level.
    pub debug: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(10),
            debug: false,
        }
    }
}

/// Main engine configuration. Also carries default configuration for the
/// storage and API subsystems.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Which data source the engine runs against.
    pub mode: DataSourceMode,
    /// User agent string for HTTP requests.
    pub user_agent: String,
    pub storage: StorageConfig,
    /// Required when `mode` is `Api`.
    pub api: Option<ApiConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: DataSourceMode::Local,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            storage: StorageConfig::default(),
            api: None,
        }
    }
}
