//! stratus.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::env::Environment;
use crate::error::{ConfigError, ConfigResult};

/// Environment variable that selects the blob storage root directory.
pub const STORAGE_ROOT_VAR: &str = "AZURE_SA";

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "stratus.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StratusConfig {
    pub storage: StorageConfig,
    pub dispatch: DispatchConfig,
    pub http: HttpConfig,
    pub timer: TimerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per container plus `tags.json`.
    pub root: PathBuf,
    /// JSON file mapping container name to logical queue name.
    pub queues: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Number of concurrent queue deliveries.
    pub workers: usize,
    /// Idle sleep between outbox checks.
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    /// Prefix every function route is mounted under.
    pub api_prefix: String,
    pub cors: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub tick_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("local_blob_storage"),
            queues: PathBuf::from("storage-queues.json"),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            poll_interval_ms: 100,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 7071,
            api_prefix: "/api".to_string(),
            cors: true,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self { tick_ms: 1000 }
    }
}

impl DispatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl TimerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl StratusConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the config file if one is given or the default file exists,
    /// otherwise fall back to defaults. An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply environment overrides (currently the storage root).
    pub fn apply_env(&mut self, env: &Environment) {
        if let Some(root) = env.get(STORAGE_ROOT_VAR).filter(|v| !v.is_empty()) {
            self.storage.root = PathBuf::from(root);
        }
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
