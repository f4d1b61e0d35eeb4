use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default daemon poll cadence in seconds.
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 60;

/// Minimum gap between a parent post and a dependent comment, in minutes.
/// Comments scheduled closer than this are rejected at creation.
pub const MIN_COMMENT_OFFSET_MINS: i64 = 5;

/// Top-level config (crier.toml + CRIER_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrierConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
}

impl Default for CrierConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            daemon: DaemonConfig::default(),
            publisher: PublisherConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// How often the engine polls the queue for due items.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
        }
    }
}

/// Publishing endpoint settings. When `endpoint` is absent the daemon runs
/// with a null publisher that fails every item, so scheduling and queue
/// inspection still work without credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PublisherConfig {
    /// URL the publish requests are POSTed to.
    pub endpoint: Option<String>,
    /// Optional bearer token sent with each request.
    pub token: Option<String>,
}

fn default_tick_interval() -> u64 {
    DEFAULT_TICK_INTERVAL_SECS
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.crier/crier.db", home)
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.crier/crier.toml", home)
}

impl CrierConfig {
    /// Load config from a TOML file with CRIER_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.crier/crier.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(path = %path, "loading config");

        let config: CrierConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CRIER_").split("_"))
            .extract()
            .map_err(|e| crate::error::CrierError::Config(e.to_string()))?;

        Ok(config)
    }
}
