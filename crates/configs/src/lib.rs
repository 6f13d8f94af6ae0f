//! # configs
//!
//! Layered application configuration: built-in defaults, then an optional
//! `taskboard.toml`, then `TASKBOARD__SECTION__KEY` environment variables
//! (after `.env` is loaded).
//!
//! ```bash
//! TASKBOARD__SERVER__PORT=8080
//! TASKBOARD__DATABASE__BACKEND=sqlite
//! TASKBOARD__DATABASE__URL=sqlite://taskboard.db
//! TASKBOARD__AUTH__JWT_SECRET=change-me-to-32-bytes-or-more....
//! TASKBOARD__LOG__FORMAT=json
//! ```

use std::collections::HashMap;

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "TASKBOARD";
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Where unauthenticated requests are redirected.
    pub login_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: SecretString,
    pub issuer: String,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
    pub filter: String,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// Loads `.env`, `taskboard.toml` (if present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "ignoring unreadable .env file");
            }
        }
        Self::build(Environment::with_prefix(ENV_PREFIX), true)
    }

    /// Same layering, with an explicit variable map standing in for the
    /// process environment. Keys use the `TASKBOARD__SECTION__KEY` form.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::build(Environment::with_prefix(ENV_PREFIX).source(Some(vars)), false)
    }

    fn build(env: Environment, with_file: bool) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.login_url", "/login")?
            .set_default("database.backend", "memory")?
            .set_default("database.url", "sqlite://taskboard.db")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.issuer", "taskboard")?
            .set_default("auth.token_ttl_secs", 86_400)?
            .set_default("log.format", "pretty")?
            .set_default("log.filter", "info")?;
        if with_file {
            builder = builder.add_source(File::with_name("taskboard").required(false));
        }
        let config: AppConfig = builder
            .add_source(env.prefix_separator("__").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.expose_secret().len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "auth.jwt_secret must be at least {MIN_JWT_SECRET_LEN} bytes"
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be positive".into()));
        }
        if !self.server.login_url.starts_with('/') && !self.server.login_url.starts_with("http") {
            return Err(ConfigError::Invalid("server.login_url must be a path or URL".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    const SECRET: (&str, &str) = ("TASKBOARD__AUTH__JWT_SECRET", "0123456789abcdef0123456789abcdef");

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = AppConfig::from_vars(vars(&[SECRET])).unwrap();
        assert_eq!(cfg.server.bind_addr(), "127.0.0.1:8080");
        assert_eq!(cfg.database.backend, DatabaseBackend::Memory);
        assert_eq!(cfg.log.format, LogFormat::Pretty);
        assert_eq!(cfg.auth.token_ttl_secs, 86_400);
        assert_eq!(cfg.server.login_url, "/login");
    }

    #[test]
    fn environment_overrides_defaults() {
        let cfg = AppConfig::from_vars(vars(&[
            SECRET,
            ("TASKBOARD__SERVER__PORT", "9000"),
            ("TASKBOARD__DATABASE__BACKEND", "sqlite"),
            ("TASKBOARD__LOG__FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.database.backend, DatabaseBackend::Sqlite);
        assert_eq!(cfg.log.format, LogFormat::Json);
    }

    #[test]
    fn missing_or_weak_secret_is_rejected() {
        assert!(matches!(AppConfig::from_vars(HashMap::new()), Err(ConfigError::Load(_))));
        let weak = AppConfig::from_vars(vars(&[("TASKBOARD__AUTH__JWT_SECRET", "short")]));
        assert!(matches!(weak, Err(ConfigError::Invalid(_))));
    }
}
