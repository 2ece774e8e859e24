//! Configuration management for Beeweb.
//!
//! Parses `beeweb.toml` configuration files with serde and provides
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
//! - `sync.client_id`
//! - `sync.client_secret`
//! - `sync.groups[].api_url`
//! - `sync.groups[].raw_url`

mod expand;

use std::collections::HashSet;
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
    /// Override content root directory.
    pub content_dir: Option<PathBuf>,
    /// Override run mode.
    pub run_mode: Option<RunMode>,
    /// Override background sync flag.
    pub sync_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "beeweb.toml";

/// Project directory holding manifests and sync state.
const PROJECT_DIRNAME: &str = ".beeweb";

/// User agent sent with every sync request.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/29.0.1541.0 Safari/537.36";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Application behavior.
    pub app: AppConfig,
    /// Content configuration (paths are relative strings from TOML).
    content: ContentConfigRaw,
    /// Remote content synchronization.
    pub sync: SyncConfig,

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
#[derive(Debug, Deserialize)]
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
            port: 8090,
        }
    }
}

/// How content is served.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Re-read and re-render content on every request.
    Dev,
    /// Serve from the in-memory snapshot, refreshed by sync cycles.
    #[default]
    Prod,
}

/// Application behavior configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Run mode (`dev` or `prod`).
    pub run_mode: RunMode,
}

/// Raw content configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ContentConfigRaw {
    root_dir: Option<String>,
    locales: Option<Vec<String>>,
    default_locale: Option<String>,
    default_doc_link: Option<String>,
    pages: Option<Vec<String>>,
}

/// Resolved content configuration with absolute paths.
#[derive(Debug, Default)]
pub struct ContentConfig {
    /// Directory holding `docs/`, `blog/` and `products/`.
    pub root_dir: PathBuf,
    /// Project directory for manifests and sync state (`.beeweb/`).
    pub project_dir: PathBuf,
    /// Supported locales, e.g. `en-US`.
    pub locales: Vec<String>,
    /// Locale used when the request carries no usable preference.
    pub default_locale: String,
    /// Doc link to redirect to when a doc lookup misses.
    pub default_doc_link: String,
    /// Flat marketing pages read from `docs/<locale>/<name>.md`.
    pub pages: Vec<String>,
}

impl ContentConfig {
    /// Documentation directory (`<root>/docs`).
    #[must_use]
    pub fn docs_dir(&self) -> PathBuf {
        self.root_dir.join("docs")
    }

    /// Blog directory (`<root>/blog`).
    #[must_use]
    pub fn blog_dir(&self) -> PathBuf {
        self.root_dir.join("blog")
    }

    /// Product showcase directory (`<root>/products`).
    #[must_use]
    pub fn products_dir(&self) -> PathBuf {
        self.root_dir.join("products")
    }
}

/// Remote content synchronization configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Whether the background sync task runs.
    pub enabled: bool,
    /// Seconds between sync cycles.
    pub interval_secs: u64,
    /// Worker threads used to fetch changed files.
    pub workers: usize,
    /// Connect timeout per request.
    pub dial_timeout_secs: u64,
    /// Total round-trip timeout per request.
    pub request_timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// GitHub OAuth application id (raises the API rate limit).
    pub client_id: Option<String>,
    /// GitHub OAuth application secret.
    pub client_secret: Option<String>,
    /// Content groups to keep in sync.
    pub groups: Vec<SyncGroupConfig>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            workers: 4,
            dial_timeout_secs: 10,
            request_timeout_secs: 20,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            client_id: None,
            client_secret: None,
            groups: vec![
                SyncGroupConfig::github("docs", "beego/beedoc", "docs"),
                SyncGroupConfig::github("blog", "beego/beeblog", "blog"),
            ],
        }
    }
}

impl SyncConfig {
    /// Interval between sync cycles.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Connect timeout.
    #[must_use]
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    /// Total request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// OAuth query string (`client_id=..&client_secret=..`), if configured.
    #[must_use]
    pub fn credentials_query(&self) -> Option<String> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(format!("client_id={id}&client_secret={secret}"))
            }
            _ => None,
        }
    }
}

/// A group of files mirrored from one remote repository.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SyncGroupConfig {
    /// Group name (`docs`, `blog`). Also names the manifest file.
    pub name: String,
    /// Tree-listing endpoint.
    pub api_url: String,
    /// Base URL that raw file paths are appended to.
    pub raw_url: String,
    /// Directory under the content root that receives the files.
    pub prefix: String,
}

impl SyncGroupConfig {
    fn github(name: &str, repo: &str, prefix: &str) -> Self {
        Self {
            name: name.to_owned(),
            api_url: format!(
                "https://api.github.com/repos/{repo}/git/trees/master?recursive=1"
            ),
            raw_url: format!("https://raw.githubusercontent.com/{repo}/master/"),
            prefix: prefix.to_owned(),
        }
    }

    /// Manifest file name for this group (e.g. `docTree.json`).
    #[must_use]
    pub fn manifest_file(&self) -> String {
        let stem = self.name.strip_suffix('s').unwrap_or(&self.name);
        format!("{stem}Tree.json")
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
        /// Config field path (e.g., "`sync.client_secret`").
        field: String,
        /// Error message (e.g., "${`GITHUB_SECRET`} not set").
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

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `beeweb.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
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
        }

        Ok(config)
    }

    /// Whether content is re-read per request.
    #[must_use]
    pub fn is_dev(&self) -> bool {
        self.app.run_mode == RunMode::Dev
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
            self.content_resolved.root_dir.clone_from(content_dir);
        }
        if let Some(run_mode) = settings.run_mode {
            self.app.run_mode = run_mode;
        }
        if let Some(sync_enabled) = settings.sync_enabled {
            self.sync.enabled = sync_enabled;
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
        let raw = ContentConfigRaw::default();
        Self {
            server: ServerConfig::default(),
            app: AppConfig::default(),
            content_resolved: raw.resolve(base),
            content: raw,
            sync: SyncConfig::default(),
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
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_content()?;
        self.validate_sync()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 lets the OS pick a port, which is never intended in a config file
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_content(&self) -> Result<(), ConfigError> {
        let content = &self.content_resolved;
        if content.locales.is_empty() {
            return Err(ConfigError::Validation(
                "content.locales cannot be empty".to_owned(),
            ));
        }
        if !content.locales.contains(&content.default_locale) {
            return Err(ConfigError::Validation(format!(
                "content.default_locale {} is not listed in content.locales",
                content.default_locale
            )));
        }
        Ok(())
    }

    fn validate_sync(&self) -> Result<(), ConfigError> {
        if self.sync.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sync.interval_secs must be greater than 0".to_owned(),
            ));
        }
        if self.sync.workers == 0 {
            return Err(ConfigError::Validation(
                "sync.workers must be greater than 0".to_owned(),
            ));
        }

        let mut names = HashSet::new();
        for group in &self.sync.groups {
            require_non_empty(&group.name, "sync.groups.name")?;
            require_non_empty(&group.prefix, "sync.groups.prefix")?;
            require_http_url(&group.api_url, "sync.groups.api_url")?;
            require_http_url(&group.raw_url, "sync.groups.raw_url")?;
            if !names.insert(group.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "sync group {} is defined twice",
                    group.name
                )));
            }
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref id) = self.sync.client_id {
            self.sync.client_id = Some(expand::expand_env(id, "sync.client_id")?);
        }
        if let Some(ref secret) = self.sync.client_secret {
            self.sync.client_secret = Some(expand::expand_env(secret, "sync.client_secret")?);
        }

        for group in &mut self.sync.groups {
            group.api_url = expand::expand_env(&group.api_url, "sync.groups.api_url")?;
            group.raw_url = expand::expand_env(&group.raw_url, "sync.groups.raw_url")?;
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.content_resolved = self.content.resolve(config_dir);
    }
}

impl ContentConfigRaw {
    fn resolve(&self, base: &Path) -> ContentConfig {
        let locales = self
            .locales
            .clone()
            .unwrap_or_else(|| vec!["en-US".to_owned(), "zh-CN".to_owned()]);
        let default_locale = self
            .default_locale
            .clone()
            .or_else(|| locales.first().cloned())
            .unwrap_or_default();

        ContentConfig {
            root_dir: base.join(self.root_dir.as_deref().unwrap_or(".")),
            project_dir: base.join(PROJECT_DIRNAME),
            locales,
            default_locale,
            default_doc_link: self
                .default_doc_link
                .clone()
                .unwrap_or_else(|| "intro/".to_owned()),
            pages: self.pages.clone().unwrap_or_else(|| {
                ["home", "about", "team", "quickstart", "usecases", "donate"]
                    .into_iter()
                    .map(str::to_owned)
                    .collect()
            }),
        }
    }
}
