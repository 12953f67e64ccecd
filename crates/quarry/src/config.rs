//! Connection profiles and configuration.
//!
//! Profiles can be built in code:
//!
//! ```ignore
//! use quarry::{ConnectionProfile, Dialect};
//!
//! let profile = ConnectionProfile::new(Dialect::MySql)
//!     .with_host("127.0.0.1")
//!     .with_username("app")
//!     .with_password("secret")
//!     .with_database("shop");
//! ```
//!
//! or loaded from a TOML file with [`DatabaseConfig::load`]:
//!
//! ```toml
//! environment = "production"
//!
//! [connections.default]
//! driver = "mysql"
//! host = "127.0.0.1"
//! username = "app"
//! password = "${DB_PASSWORD}"
//! database = "shop"
//!
//! [environments.production.connections.default]
//! driver = "mysql"
//! host = "db.internal"
//! username = "app"
//! password = "${DB_PASSWORD}"
//! database = "shop"
//!
//! [profiler]
//! enabled = true
//! slow_query_ms = 1500
//!
//! [cache]
//! directory = "storage/cache"
//! ```

use crate::dialect::Dialect;
use crate::error::{QuarryError, QuarryResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the connection used when none is selected.
pub const DEFAULT_CONNECTION: &str = "default";

fn default_charset() -> String {
    "utf8mb4".to_string()
}

/// Settings for one named logical connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionProfile {
    pub driver: Dialect,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default)]
    pub socket: Option<String>,
}

impl ConnectionProfile {
    /// Create an empty profile for a driver.
    pub fn new(driver: Dialect) -> Self {
        Self {
            driver,
            host: None,
            username: None,
            password: None,
            database: None,
            port: None,
            charset: default_charset(),
            socket: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Connect through a unix socket instead of host/port (mysql).
    pub fn with_socket(mut self, socket: impl Into<String>) -> Self {
        self.socket = Some(socket.into());
        self
    }

    /// Check that the fields the driver needs are present.
    pub fn validate(&self) -> QuarryResult<()> {
        if is_blank(&self.host) {
            return Err(QuarryError::connection(format!(
                "Missing required setting 'host' for {} connection",
                self.driver
            )));
        }
        if self.driver.requires_database() && is_blank(&self.database) {
            return Err(QuarryError::connection(format!(
                "Missing required setting 'database' for {} connection",
                self.driver
            )));
        }
        Ok(())
    }

    /// Validate the profile and derive its dialect connection string.
    pub fn connection_string(&self) -> QuarryResult<String> {
        self.validate()?;
        self.driver.connection_string(self)
    }

    fn expand_env(&mut self) -> QuarryResult<()> {
        for field in [
            &mut self.host,
            &mut self.username,
            &mut self.password,
            &mut self.database,
            &mut self.socket,
        ]
        .into_iter()
        .flatten()
        {
            *field = expand_env_vars(field)?;
        }
        self.charset = expand_env_vars(&self.charset)?;
        Ok(())
    }
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().is_none_or(|s| s.trim().is_empty())
}

/// Configuration for query profiling.
///
/// By default, profiling is disabled and must be explicitly enabled.
#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    /// Whether records are collected.
    pub enabled: bool,
    /// Queries slower than this are logged with `tracing::warn!`.
    pub slow_query_threshold: Option<Duration>,
    /// Number of finished records kept, oldest dropped first.
    pub history: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            slow_query_threshold: None,
            history: 100,
        }
    }
}

impl ProfilerConfig {
    /// Create a new configuration with defaults (profiling disabled, 100 records kept).
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable profiling.
    pub fn enable_profiling(mut self) -> Self {
        self.enabled = true;
        self
    }

    /// Disable profiling.
    pub fn disable_profiling(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Set the slow query threshold.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    /// Set how many finished records are kept.
    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history.max(1);
        self
    }
}

/// Configuration for the result cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory for cache files. `None` keeps entries in memory.
    pub directory: Option<PathBuf>,
    /// zstd compression level for stored payloads.
    pub compression_level: i32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            compression_level: 3,
        }
    }
}

impl CacheConfig {
    /// Create a new configuration (in-memory store, compression level 3).
    pub fn new() -> Self {
        Self::default()
    }

    /// Store entries as files under `directory`.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ProfilerSection {
    #[serde(default)]
    enabled: bool,
    slow_query_ms: Option<u64>,
    history: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CacheSection {
    directory: Option<String>,
    compression_level: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EnvironmentSection {
    #[serde(default)]
    connections: BTreeMap<String, ConnectionProfile>,
}

/// Database settings loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Selected environment; its connections override the base ones.
    #[serde(default)]
    pub environment: Option<String>,
    /// Connection active after startup.
    #[serde(default = "default_connection_name")]
    pub default: String,
    #[serde(default)]
    connections: BTreeMap<String, ConnectionProfile>,
    #[serde(default)]
    environments: BTreeMap<String, EnvironmentSection>,
    #[serde(default)]
    profiler: ProfilerSection,
    #[serde(default)]
    cache: CacheSection,
    #[serde(skip)]
    config_dir: Option<PathBuf>,
}

fn default_connection_name() -> String {
    DEFAULT_CONNECTION.to_string()
}

impl DatabaseConfig {
    /// Read, parse and expand a config file.
    pub fn load(config_path: impl AsRef<Path>) -> QuarryResult<Self> {
        let config_path = config_path.as_ref();
        let raw = std::fs::read_to_string(config_path).map_err(|e| {
            QuarryError::config(format!(
                "failed to read config file {}: {e}",
                config_path.display()
            ))
        })?;
        let mut config = Self::from_toml_str(&raw).map_err(|e| match e {
            QuarryError::Config(msg) => QuarryError::config(format!(
                "failed to parse config file {}: {msg}",
                config_path.display()
            )),
            other => other,
        })?;
        config.config_dir = config_path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse and expand config text.
    pub fn from_toml_str(raw: &str) -> QuarryResult<Self> {
        let mut config: DatabaseConfig = toml::from_str(raw)?;
        config.expand_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Connection profiles for the selected environment.
    pub fn profiles(&self) -> BTreeMap<String, ConnectionProfile> {
        let mut profiles = self.connections.clone();
        if let Some(env) = self.environment.as_deref().and_then(|e| self.environments.get(e)) {
            for (name, profile) in &env.connections {
                profiles.insert(name.clone(), profile.clone());
            }
        }
        profiles
    }

    pub fn profiler_config(&self) -> ProfilerConfig {
        let mut config = ProfilerConfig::new();
        config.enabled = self.profiler.enabled;
        if let Some(ms) = self.profiler.slow_query_ms {
            config = config.with_slow_query_threshold(Duration::from_millis(ms));
        }
        if let Some(history) = self.profiler.history {
            config = config.with_history(history);
        }
        config
    }

    /// Cache settings; a relative directory resolves against the config file's directory.
    pub fn cache_config(&self) -> CacheConfig {
        let mut config = CacheConfig::new();
        if let Some(dir) = &self.cache.directory {
            let dir = Path::new(dir);
            let resolved = match &self.config_dir {
                Some(base) if dir.is_relative() => base.join(dir),
                _ => dir.to_path_buf(),
            };
            config = config.with_directory(resolved);
        }
        if let Some(level) = self.cache.compression_level {
            config = config.with_compression_level(level);
        }
        config
    }

    fn expand_env(&mut self) -> QuarryResult<()> {
        if let Some(env) = &mut self.environment {
            *env = expand_env_vars(env)?;
        }
        for profile in self.connections.values_mut() {
            profile.expand_env()?;
        }
        for section in self.environments.values_mut() {
            for profile in section.connections.values_mut() {
                profile.expand_env()?;
            }
        }
        if let Some(dir) = &mut self.cache.directory {
            *dir = expand_env_vars(dir)?;
        }
        Ok(())
    }

    fn validate(&self) -> QuarryResult<()> {
        if let Some(env) = &self.environment
            && !self.environments.is_empty()
            && !self.environments.contains_key(env)
        {
            return Err(QuarryError::config(format!(
                "environment '{env}' has no [environments.{env}] section"
            )));
        }
        if !self.profiles().contains_key(&self.default) {
            return Err(QuarryError::config(format!(
                "default connection '{}' is not defined",
                self.default
            )));
        }
        Ok(())
    }
}

fn expand_env_vars(input: &str) -> QuarryResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                return Err(QuarryError::config(format!(
                    "unterminated env var reference: ${{{key}}}"
                )));
            }
            if key.is_empty() {
                return Err(QuarryError::config("invalid env var reference: ${}"));
            }

            let v = std::env::var(&key).map_err(|_| {
                QuarryError::config(format!("missing env var for config expansion: {key}"))
            })?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_aliases_parse() {
        assert_eq!("oci".parse::<Dialect>().unwrap(), Dialect::Oracle);
        assert_eq!("FDB".parse::<Dialect>().unwrap(), Dialect::Firebird);
        assert!("sqlite".parse::<Dialect>().unwrap_err().is_connection());
    }

    #[test]
    fn profile_requires_host_and_database() {
        let p = ConnectionProfile::new(Dialect::MySql).with_database("shop");
        assert!(p.validate().unwrap_err().is_connection());

        let p = ConnectionProfile::new(Dialect::Oracle).with_host("db");
        assert!(p.validate().unwrap_err().is_connection());

        let p = ConnectionProfile::new(Dialect::Firebird).with_host("db");
        assert!(p.validate().is_ok());
    }

    #[test]
    fn charset_defaults_to_utf8mb4() {
        let config = DatabaseConfig::from_toml_str(
            r#"
            [connections.default]
            driver = "mysql"
            host = "localhost"
            database = "shop"
            "#,
        )
        .unwrap();
        assert_eq!(config.profiles()["default"].charset, "utf8mb4");
    }

    #[test]
    fn environment_section_overrides_base() {
        let config = DatabaseConfig::from_toml_str(
            r#"
            environment = "production"

            [connections.default]
            driver = "mysql"
            host = "localhost"
            database = "shop"

            [connections.reports]
            driver = "mssql"
            host = "reports"
            database = "warehouse"

            [environments.production.connections.default]
            driver = "mysql"
            host = "db.internal"
            database = "shop"
            "#,
        )
        .unwrap();
        let profiles = config.profiles();
        assert_eq!(profiles["default"].host.as_deref(), Some("db.internal"));
        assert_eq!(profiles["reports"].driver, Dialect::MsSql);
    }

    #[test]
    fn unknown_driver_is_rejected_at_parse_time() {
        let err = DatabaseConfig::from_toml_str(
            r#"
            [connections.default]
            driver = "sqlite"
            host = "localhost"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, QuarryError::Config(_)));
    }

    #[test]
    fn missing_default_connection_is_an_error() {
        let err = DatabaseConfig::from_toml_str(
            r#"
            [connections.other]
            driver = "mysql"
            host = "localhost"
            database = "shop"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("default connection"));
    }

    #[test]
    fn expand_env_vars_reports_problems() {
        assert!(expand_env_vars("${").is_err());
        assert!(expand_env_vars("${}").is_err());
        assert!(expand_env_vars("${QUARRY_SURELY_UNSET_VARIABLE}").is_err());
        assert_eq!(expand_env_vars("plain $value").unwrap(), "plain $value");
    }

    #[test]
    fn profiler_and_cache_sections() {
        let config = DatabaseConfig::from_toml_str(
            r#"
            [connections.default]
            driver = "mysql"
            host = "localhost"
            database = "shop"

            [profiler]
            enabled = true
            slow_query_ms = 250
            history = 10

            [cache]
            directory = "/tmp/quarry-cache"
            compression_level = 9
            "#,
        )
        .unwrap();
        let profiler = config.profiler_config();
        assert!(profiler.enabled);
        assert_eq!(profiler.slow_query_threshold, Some(Duration::from_millis(250)));
        assert_eq!(profiler.history, 10);
        let cache = config.cache_config();
        assert_eq!(cache.directory, Some(PathBuf::from("/tmp/quarry-cache")));
        assert_eq!(cache.compression_level, 9);
    }
}
