use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::provider::ProviderConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Store backend: "memory" (default) or "postgres".
    #[serde(default = "default_db_backend")]
    pub backend: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// The business channel templates are submitted for, plus the provider
/// credentials used to compile and submit them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub config: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    /// Templates reconciled per batch; each batch completes before the
    /// next starts.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Bound injected provider clients are expected to apply per call.
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_seconds: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_db_backend() -> String {
    "memory".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_channel() -> String {
    "WhatsApp".to_string()
}

fn default_batch_size() -> usize {
    5
}

fn default_provider_timeout() -> u64 {
    15
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8082)?
            .set_default("database.backend", "memory")?
            .set_default("reconcile.batch_size", 5)?
            .set_default("reconcile.provider_timeout_seconds", 15)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER_HOST, DATABASE_URL, PROVIDER_CONFIG_API_KEY, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_db_backend(),
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            provider_timeout_seconds: default_provider_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8082);

        let database = DatabaseConfig::default();
        assert_eq!(database.backend, "memory");

        let reconcile = ReconcileConfig::default();
        assert_eq!(reconcile.batch_size, 5);
    }
}
