//! Configuration management for hotload.
//!
//! Parses `hotload.toml` configuration files with serde and provides
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
//! - `build.dist_dir`
//! - `build.plugin_json`
//! - `build.command`

mod expand;

use std::path::{Path, PathBuf};

use hotload_artifact::ArtifactSelection;
use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override bind host.
    pub host: Option<String>,
    /// Override WebSocket port.
    pub ws_port: Option<u16>,
    /// Override status page port.
    pub http_port: Option<u16>,
    /// Override build output directory.
    pub dist_dir: Option<PathBuf>,
    /// Override plugin metadata file.
    pub plugin_json: Option<PathBuf>,
    /// Override debounce delay.
    pub debounce_ms: Option<u64>,
    /// Override artifact selection rule.
    pub selection: Option<ArtifactSelection>,
    /// Override build command.
    pub build_command: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "hotload.toml";

/// Default debounce delay in milliseconds.
const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Build configuration (paths are relative strings from TOML).
    build: BuildConfigRaw,

    /// Resolved build configuration (set after loading).
    #[serde(skip)]
    pub build_resolved: BuildConfig,
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
    /// Address both listeners bind to.
    pub host: String,
    /// WebSocket port for artifact push.
    pub ws_port: u16,
    /// HTTP port for the status page.
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            ws_port: 8080,
            http_port: 3000,
        }
    }
}

/// Raw build configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BuildConfigRaw {
    dist_dir: Option<String>,
    plugin_json: Option<String>,
    debounce_ms: Option<u64>,
    selection: Option<ArtifactSelection>,
    command: Option<String>,
}

/// Resolved build configuration with absolute paths.
#[derive(Debug)]
pub struct BuildConfig {
    /// Build output directory to watch.
    pub dist_dir: PathBuf,
    /// Plugin metadata file.
    pub plugin_json: PathBuf,
    /// Quiet period before a burst of changes is dispatched.
    pub debounce_ms: u64,
    /// Rule for choosing among several `index_*.js` files.
    pub selection: ArtifactSelection,
    /// Watch-mode build command spawned alongside the server.
    pub command: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dist_dir: PathBuf::from("dist"),
            plugin_json: PathBuf::from("plugin.json"),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            selection: ArtifactSelection::default(),
            command: None,
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
        /// Config field path (e.g., "`build.dist_dir`").
        field: String,
        /// Error message (e.g., "${`OUT_DIR`} not set").
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

/// Require a port to be non-zero.
fn require_port(port: u16, field: &str) -> Result<(), ConfigError> {
    if port == 0 {
        return Err(ConfigError::Validation(format!("{field} cannot be 0")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `hotload.toml` in current directory and parents.
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
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.ws_port {
            self.server.ws_port = port;
        }
        if let Some(port) = settings.http_port {
            self.server.http_port = port;
        }
        if let Some(dist_dir) = &settings.dist_dir {
            self.build_resolved.dist_dir.clone_from(dist_dir);
        }
        if let Some(plugin_json) = &settings.plugin_json {
            self.build_resolved.plugin_json.clone_from(plugin_json);
        }
        if let Some(debounce_ms) = settings.debounce_ms {
            self.build_resolved.debounce_ms = debounce_ms;
        }
        if let Some(selection) = settings.selection {
            self.build_resolved.selection = selection;
        }
        if let Some(command) = &settings.build_command {
            self.build_resolved.command = Some(command.clone());
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_build()?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;
        require_port(self.server.ws_port, "server.ws_port")?;
        require_port(self.server.http_port, "server.http_port")?;

        if self.server.ws_port == self.server.http_port {
            return Err(ConfigError::Validation(format!(
                "server.ws_port and server.http_port must differ (both {})",
                self.server.ws_port
            )));
        }

        Ok(())
    }

    /// Validate build configuration.
    fn validate_build(&self) -> Result<(), ConfigError> {
        if self.build_resolved.debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "build.debounce_ms must be greater than 0".to_owned(),
            ));
        }
        if let Some(command) = &self.build_resolved.command {
            require_non_empty(command.trim(), "build.command")?;
        }
        Ok(())
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
            build: BuildConfigRaw::default(),
            build_resolved: BuildConfig {
                dist_dir: base.join("dist"),
                plugin_json: base.join("plugin.json"),
                ..BuildConfig::default()
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

        Ok(config)
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref dist_dir) = self.build.dist_dir {
            self.build.dist_dir = Some(expand::expand_env(dist_dir, "build.dist_dir")?);
        }
        if let Some(ref plugin_json) = self.build.plugin_json {
            self.build.plugin_json = Some(expand::expand_env(plugin_json, "build.plugin_json")?);
        }
        if let Some(ref command) = self.build.command {
            self.build.command = Some(expand::expand_env(command, "build.command")?);
        }

        Ok(())
    }

    /// Resolve relative paths against the config file directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.build_resolved = BuildConfig {
            dist_dir: resolve(self.build.dist_dir.as_deref(), "dist"),
            plugin_json: resolve(self.build.plugin_json.as_deref(), "plugin.json"),
            debounce_ms: self.build.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS),
            selection: self.build.selection.unwrap_or_default(),
            command: self.build.command.clone(),
        };
    }
}
