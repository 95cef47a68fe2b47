//! Configuration management for hubdocs.
//!
//! Parses `hubdocs.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `index.url`
//! - `index.prefix`
//! - `index.username`
//! - `index.password`
//! - `auth.identity_url`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override the post-processor output directory.
    pub content_dir: Option<PathBuf>,
    /// Override the search index URL.
    pub index_url: Option<String>,
    /// Override live reload enabled flag.
    pub live_reload_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "hubdocs.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Content configuration (paths are relative strings from TOML).
    content: ContentConfigRaw,
    /// Search index connection and write behaviour.
    pub index: IndexConfig,
    /// Search aggregation settings.
    pub search: SearchConfig,
    /// Outer retry policy for whole sync runs.
    pub sync: SyncConfig,
    /// Live reload configuration.
    pub live_reload: LiveReloadConfig,
    /// Caller role resolution.
    pub auth: AuthConfig,

    /// Resolved content configuration (set after loading).
    #[serde(skip)]
    pub content_resolved: ContentConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7979,
        }
    }
}

/// Raw content configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ContentConfigRaw {
    dir: Option<String>,
}

/// Resolved content configuration with absolute paths.
#[derive(Clone, Debug, Default)]
pub struct ContentConfig {
    /// Directory holding the post-processor output (page JSON, hashes, roles).
    pub dir: PathBuf,
}

/// Search index configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Base URL of the search service.
    pub url: String,
    /// Prefix prepended to every index name (`{prefix}-pages`, ...).
    pub prefix: String,
    /// Basic auth user name.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Global HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Attempts per document write before giving up.
    pub max_retries: u32,
    /// Fixed pause between document write attempts.
    pub retry_backoff_ms: u64,
    /// Documents per bulk request.
    pub bulk_chunk_size: usize,
}

impl IndexConfig {
    /// Pause between document write attempts.
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Global HTTP timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_owned(),
            prefix: "hubdocs".to_owned(),
            username: None,
            password: None,
            timeout_secs: 30,
            max_retries: 3,
            retry_backoff_ms: 1000,
            bulk_chunk_size: 20,
        }
    }
}

/// Search configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Hits requested per index round trip.
    pub page_size: usize,
    /// Result limit used when the request does not name one.
    pub default_limit: usize,
    /// Upper bound for a requested limit.
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            default_limit: 20,
            max_limit: 100,
        }
    }
}

/// Outer retry policy applied to whole sync runs.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Sync runs attempted before the caller gives up.
    pub max_attempts: u32,
    /// Pause between sync runs.
    pub retry_backoff_ms: u64,
}

impl SyncConfig {
    /// Pause between sync runs.
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff_ms: 10_000,
        }
    }
}

/// Live reload configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LiveReloadConfig {
    /// Serve immediately and sync in the background.
    pub enabled: bool,
    /// Re-sync whenever the hash snapshot changes on disk.
    pub watch: bool,
}

impl Default for LiveReloadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            watch: true,
        }
    }
}

/// Caller role resolution.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Trusted header carrying a comma-separated role list.
    pub roles_header: String,
    /// Identity service endpoint answering `{"roles": [...]}`.
    ///
    /// When set, it takes precedence over `roles_header`.
    pub identity_url: Option<String>,
    /// Attempts per identity lookup.
    pub identity_max_retries: u32,
    /// Pause between identity lookup attempts.
    pub identity_retry_backoff_ms: u64,
    /// How long resolved roles are reused per credential; 0 disables reuse.
    pub identity_cache_ttl_secs: u64,
}

impl AuthConfig {
    /// Pause between identity lookup attempts.
    #[must_use]
    pub fn identity_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.identity_retry_backoff_ms)
    }

    /// How long resolved roles are reused per credential.
    #[must_use]
    pub fn identity_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.identity_cache_ttl_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            roles_header: "x-hubdocs-roles".to_owned(),
            identity_url: None,
            identity_max_retries: 3,
            identity_retry_backoff_ms: 500,
            identity_cache_ttl_secs: 600,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`index.password`").
        field: String,
        /// Error message (e.g., "${`INDEX_PASSWORD`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Require a numeric field to be greater than zero.
fn require_positive(value: u64, field: &str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `hubdocs.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(content_dir) = &settings.content_dir {
            self.content_resolved.dir.clone_from(content_dir);
        }
        if let Some(index_url) = &settings.index_url {
            self.index.url.clone_from(index_url);
        }
        if let Some(live_reload_enabled) = settings.live_reload_enabled {
            self.live_reload.enabled = live_reload_enabled;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            content: ContentConfigRaw::default(),
            index: IndexConfig::default(),
            search: SearchConfig::default(),
            sync: SyncConfig::default(),
            live_reload: LiveReloadConfig::default(),
            auth: AuthConfig::default(),
            content_resolved: ContentConfig {
                dir: base.join("build"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_index()?;
        self.validate_search()?;
        self.validate_sync()?;
        self.validate_auth()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 is technically valid (OS assigns a random port), but it's
        // unlikely to be intentional in a config file
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_index(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.index.url, "index.url")?;
        require_http_url(&self.index.url, "index.url")?;
        require_non_empty(&self.index.prefix, "index.prefix")?;
        require_positive(self.index.timeout_secs, "index.timeout_secs")?;
        require_positive(u64::from(self.index.max_retries), "index.max_retries")?;
        require_positive(self.index.bulk_chunk_size as u64, "index.bulk_chunk_size")?;

        if self.index.username.is_some() != self.index.password.is_some() {
            return Err(ConfigError::Validation(
                "index.username and index.password must be set together".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_search(&self) -> Result<(), ConfigError> {
        require_positive(self.search.page_size as u64, "search.page_size")?;
        require_positive(self.search.default_limit as u64, "search.default_limit")?;

        if self.search.default_limit > self.search.max_limit {
            return Err(ConfigError::Validation(format!(
                "search.default_limit cannot exceed search.max_limit ({})",
                self.search.max_limit
            )));
        }

        Ok(())
    }

    fn validate_sync(&self) -> Result<(), ConfigError> {
        require_positive(u64::from(self.sync.max_attempts), "sync.max_attempts")
    }

    fn validate_auth(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.auth.roles_header, "auth.roles_header")?;

        if let Some(ref url) = self.auth.identity_url {
            require_non_empty(url, "auth.identity_url")?;
            require_http_url(url, "auth.identity_url")?;
            require_positive(
                u64::from(self.auth.identity_max_retries),
                "auth.identity_max_retries",
            )?;
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        self.index.url = expand::expand_env(&self.index.url, "index.url")?;
        self.index.prefix = expand::expand_env(&self.index.prefix, "index.prefix")?;
        if let Some(ref username) = self.index.username {
            self.index.username = Some(expand::expand_env(username, "index.username")?);
        }
        if let Some(ref password) = self.index.password {
            self.index.password = Some(expand::expand_env(password, "index.password")?);
        }

        if let Some(ref url) = self.auth.identity_url {
            self.auth.identity_url = Some(expand::expand_env(url, "auth.identity_url")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.content_resolved = ContentConfig {
            dir: config_dir.join(self.content.dir.as_deref().unwrap_or("build")),
        };
    }
}
