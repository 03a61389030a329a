//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Media storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Admin statistics configuration.
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
    /// Reported in the detailed health check.
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection before failing the request.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Seconds an idle connection stays in the pool.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Log every statement at debug level.
    #[serde(default)]
    pub log_statements: bool,
}

/// Media storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory blobs are written to.
    #[serde(default = "default_storage_path")]
    pub base_path: PathBuf,
    /// URL prefix blobs are served under.
    #[serde(default = "default_storage_url")]
    pub base_url: String,
    /// Upper bound for a single uploaded video.
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: usize,
    /// Body size accepted on upload routes; covers every file in one multipart request.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            base_path: default_storage_path(),
            base_url: default_storage_url(),
            max_video_bytes: default_max_video_bytes(),
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

/// Admin statistics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    /// Seconds a computed statistic stays fresh.
    #[serde(default = "default_stats_ttl")]
    pub ttl_secs: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_stats_ttl(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

fn default_environment() -> String {
    "development".to_string()
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_acquire_timeout_secs() -> u64 {
    10
}

const fn default_idle_timeout_secs() -> u64 {
    600
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./media")
}

fn default_storage_url() -> String {
    "/api/media".to_string()
}

const fn default_max_video_bytes() -> usize {
    15 * 1024 * 1024
}

const fn default_max_request_bytes() -> usize {
    50 * 1024 * 1024
}

const fn default_stats_ttl() -> u64 {
    300
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `AGORA_ENV`)
    /// 3. Environment variables with `AGORA_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("AGORA_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("AGORA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("AGORA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = parse(
            r#"
            [server]
            url = "http://localhost:8080"

            [database]
            url = "postgres://localhost/agora"
            "#,
        );

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, "development");
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.database.acquire_timeout_secs, 10);
        assert!(!config.database.log_statements);
        assert_eq!(config.storage.max_video_bytes, 15 * 1024 * 1024);
        assert_eq!(config.storage.max_request_bytes, 50 * 1024 * 1024);
        assert_eq!(config.storage.base_url, "/api/media");
        assert_eq!(config.stats.ttl_secs, 300);
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let config = parse(
            r#"
            [server]
            url = "https://agora.example"
            port = 9000

            [database]
            url = "postgres://db/agora"

            [storage]
            max_request_bytes = 1048576

            [stats]
            ttl_secs = 10
            "#,
        );

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.max_request_bytes, 1024 * 1024);
        assert_eq!(config.storage.max_video_bytes, 15 * 1024 * 1024);
        assert_eq!(config.stats.ttl_secs, 10);
    }
}
