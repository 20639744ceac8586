//! Server configuration
//!
//! Values come from an optional YAML file followed by `LEAVE__`-prefixed
//! environment variables, e.g. `LEAVE__PORT=9000` or
//! `LEAVE__AUDIT__RETENTION_DAYS=30`. CLI flags are applied last by the
//! binary.

use audit_engine::AuditConfig;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "LEAVE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Postgres URL for the log store. Without one, logs are kept in memory.
    #[serde(default)]
    pub database_url: Option<String>,
    /// HS256 secret used to verify bearer tokens
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub audit: AuditConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_url: None,
            jwt_secret: String::new(),
            allowed_origins: default_allowed_origins(),
            audit: AuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from `path` (optional) and the environment
    ///
    /// # Errors
    ///
    /// Returns an error when a source cannot be parsed or the merged values
    /// do not deserialize.
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Reject settings the server cannot start with
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.trim().is_empty() {
            return Err("jwt_secret must be set (LEAVE__JWT_SECRET)".to_string());
        }
        if self.audit.worker_count == 0 {
            return Err("audit.worker_count must be at least 1".to_string());
        }
        if self.audit.queue_capacity == 0 {
            return Err("audit.queue_capacity must be at least 1".to_string());
        }
        if self.database_url.as_deref().is_some_and(|url| url.trim().is_empty()) {
            return Err("database_url must not be blank".to_string());
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
