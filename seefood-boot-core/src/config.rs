use std::path::Path;
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::models::UserRole;
use crate::probe::RetryPolicy;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub probe: ProbeConfig,
    pub bootstrap: BootstrapConfig,
    pub static_assets: StaticAssetsConfig,
    pub logging: LoggingConfig,
}

/// The server process the sequence ends in, and the address it binds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Server command line; the first element is the program.
    pub command: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            command: vec!["seefood-api".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://seefood:seefood@db:5432/seefood".to_string(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
        }
    }
}

/// Readiness probe schedule: bounded exponential backoff with a deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub factor: f32,
    pub max_attempts: usize,
    pub deadline_seconds: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 200,
            max_interval_ms: 5_000,
            factor: 2.0,
            max_attempts: 30,
            deadline_seconds: 60,
        }
    }
}

impl ProbeConfig {
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_interval: Duration::from_millis(self.initial_interval_ms),
            max_interval: Duration::from_millis(self.max_interval_ms),
            factor: self.factor,
            max_attempts: self.max_attempts,
            deadline: Duration::from_secs(self.deadline_seconds),
        }
    }
}

/// First-startup account seeding.
///
/// The admin credential set is configuration, never a literal in code. The
/// password can additionally come from a secret file (container secret mount),
/// which takes precedence over the inline value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub create_admin: bool,
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_password_file: Option<String>,
    /// Additional staff accounts to ensure exist (get-or-create semantics).
    pub users: Vec<UserFixture>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            create_admin: true,
            admin_username: "admin".to_string(),
            admin_email: "admin@seefood.com".to_string(),
            admin_password: "admin123".to_string(),
            admin_password_file: None,
            users: Vec::new(),
        }
    }
}

/// A staff account the seeder ensures exists. Existing rows are never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFixture {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticAssetsConfig {
    pub enabled: bool,
    pub source_dirs: Vec<String>,
    pub output_dir: String,
}

impl Default for StaticAssetsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_dirs: vec!["static".to_string()],
            output_dir: "staticfiles".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // Override with environment variables (SEEFOOD_DATABASE_URL, etc.)
        builder = builder.add_source(
            Environment::with_prefix("SEEFOOD")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Address the launched server binds.
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Validate configuration, collecting every problem instead of stopping
    /// at the first one.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database.url.is_empty() {
            errors.push("database.url must not be empty".to_string());
        } else if url::Url::parse(&self.database.url).is_err() {
            errors.push(format!("database.url is not a valid URL: {}", self.database.url));
        }
        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be at least 1".to_string());
        }

        if self.server.port == 0 {
            errors.push("server.port must not be 0".to_string());
        }
        if self.server.command.is_empty() || self.server.command[0].is_empty() {
            errors.push("server.command must name a program".to_string());
        }

        if self.probe.max_attempts == 0 {
            errors.push("probe.max_attempts must be at least 1".to_string());
        }
        if self.probe.factor < 1.0 {
            errors.push("probe.factor must be >= 1.0".to_string());
        }
        if self.probe.initial_interval_ms > self.probe.max_interval_ms {
            errors.push("probe.initial_interval_ms must not exceed probe.max_interval_ms".to_string());
        }
        if self.probe.deadline_seconds == 0 {
            errors.push("probe.deadline_seconds must be at least 1".to_string());
        }

        if self.bootstrap.create_admin {
            if self.bootstrap.admin_username.is_empty() {
                errors.push("bootstrap.admin_username must not be empty".to_string());
            }
            if self.bootstrap.admin_password.is_empty() && self.bootstrap.admin_password_file.is_none() {
                errors.push(
                    "bootstrap.admin_password or bootstrap.admin_password_file must be set"
                        .to_string(),
                );
            }
        }
        for fixture in &self.bootstrap.users {
            if fixture.username.is_empty() {
                errors.push("bootstrap.users entries must have a username".to_string());
            }
            if fixture.password.is_empty() {
                errors.push(format!(
                    "bootstrap.users entry '{}' must have a password",
                    fixture.username
                ));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for fixture in &self.bootstrap.users {
            if !seen.insert(fixture.username.as_str()) {
                errors.push(format!(
                    "bootstrap.users lists '{}' more than once",
                    fixture.username
                ));
            }
        }

        if self.static_assets.enabled && self.static_assets.output_dir.is_empty() {
            errors.push("static_assets.output_dir must not be empty".to_string());
        }

        match self.logging.format.as_str() {
            "json" | "pretty" => {}
            other => errors.push(format!("logging.format must be 'json' or 'pretty', got '{other}'")),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Load configuration from config file or environment variables.
///
/// Config file search order:
/// 1. `SEEFOOD_CONFIG_PATH` environment variable (explicit path)
/// 2. `./config.yaml` (current working directory)
/// 3. `/config/config.yaml` (Kubernetes mount path)
/// 4. Fall back to environment variables only
///
/// Uses eprintln for breadcrumbs since logging is not initialized yet.
pub fn load_config(explicit_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = explicit_path
        .map(str::to_string)
        .or_else(|| {
            std::env::var("SEEFOOD_CONFIG_PATH")
                .ok()
                .filter(|p| Path::new(p).exists())
        })
        .or_else(|| {
            ["config.yaml", "/config/config.yaml"]
                .into_iter()
                .find(|p| Path::new(p).exists())
                .map(str::to_string)
        });

    let config = if let Some(path) = config_path {
        eprintln!("Loading config from {path}");
        Config::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load config file {path}: {e}"))?
    } else {
        eprintln!("No config file found, using environment variables");
        Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config from env: {e}"))?
    };

    // Fail fast on misconfigurations
    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Config validation error: {error}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server_address(), "0.0.0.0:8000");
        assert!(config.database_url().contains("db:5432"));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.database.url = String::new();
        config.server.command = Vec::new();
        config.probe.max_attempts = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_validate_rejects_backoff_inversion() {
        let mut config = Config::default();
        config.probe.initial_interval_ms = 10_000;
        config.probe.max_interval_ms = 1_000;

        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("initial_interval_ms")));
    }

    #[test]
    fn test_validate_requires_admin_password_source() {
        let mut config = Config::default();
        config.bootstrap.admin_password = String::new();
        config.bootstrap.admin_password_file = None;
        assert!(config.validate().is_err());

        config.bootstrap.admin_password_file = Some("/run/secrets/admin_password".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_fixtures() {
        let mut config = Config::default();
        let fixture = UserFixture {
            username: "sale1".to_string(),
            email: None,
            password: "sale123".to_string(),
            role: UserRole::Sale,
        };
        config.bootstrap.users = vec![fixture.clone(), fixture];

        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("more than once")));
    }

    #[test]
    fn test_probe_policy_conversion() {
        let config = ProbeConfig::default();
        let policy = config.policy();
        assert_eq!(policy.initial_interval, Duration::from_millis(200));
        assert_eq!(policy.max_interval, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 30);
        assert_eq!(policy.deadline, Duration::from_secs(60));
    }
}
