//! Configuration for the bridge
//!
//! Provides:
//! - Config file discovery (CLI flag, env var, standard paths)
//! - TOML parsing with serde
//! - Environment variable overrides
//! - Validation at load time

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// General bridge settings
    pub bridge: BridgeSettings,

    /// Webhook server settings
    pub server: ServerSettings,

    /// Gotify delivery settings
    pub gotify: GotifySettings,
}

/// General bridge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,

    /// Label shown as the instance line in rendered bodies. When unset,
    /// the network origin of each request is shown instead.
    pub friendly_name: Option<String>,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            friendly_name: None,
        }
    }
}

/// Webhook server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind
    pub host: String,

    /// Port to bind
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            // Use 0.0.0.0 for Docker compatibility
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Gotify delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GotifySettings {
    /// Base URL of the Gotify server (e.g. https://gotify.example.com)
    pub url: String,

    /// Application token for the bridge
    pub token: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries for transient delivery failures
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for GotifySettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

/// Configuration loader
pub struct ConfigLoader {
    /// Path to config file (if specified via CLI)
    cli_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self { cli_path: None }
    }

    /// Set the config path from CLI argument
    pub fn with_cli_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_path = path;
        self
    }

    /// Load configuration with the following precedence:
    /// 1. CLI --config flag
    /// 2. AGB_CONFIG environment variable
    /// 3. ~/.config/authentik-gotify-bridge/config.toml
    /// 4. /etc/authentik-gotify-bridge/config.toml
    /// 5. Default values
    pub fn load(&self) -> ConfigResult<BridgeConfig> {
        let config_path = self.find_config_file();

        let mut config = if let Some(path) = config_path {
            info!("Loading configuration from: {}", path.display());
            self.load_from_file(&path)?
        } else {
            debug!("No config file found, using defaults");
            BridgeConfig::default()
        };

        self.apply_env_overrides(&mut config);
        self.validate(&config)?;

        Ok(config)
    }

    /// Find the config file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        // 1. CLI --config flag
        if let Some(path) = &self.cli_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!("CLI config path does not exist: {}", path.display());
        }

        // 2. AGB_CONFIG environment variable
        if let Ok(env_path) = std::env::var("AGB_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
            warn!("AGB_CONFIG path does not exist: {}", env_path);
        }

        // 3. ~/.config/authentik-gotify-bridge/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("authentik-gotify-bridge").join("config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 4. /etc/authentik-gotify-bridge/config.toml (Unix only)
        #[cfg(unix)]
        {
            let path = PathBuf::from("/etc/authentik-gotify-bridge/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Load configuration from a TOML file
    fn load_from_file(&self, path: &Path) -> ConfigResult<BridgeConfig> {
        let content = std::fs::read_to_string(path)?;
        let config: BridgeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut BridgeConfig) {
        if let Ok(val) = std::env::var("AGB_LOG_LEVEL") {
            config.bridge.log_level = val;
        }
        if let Ok(val) = std::env::var("AGB_FRIENDLY_NAME") {
            config.bridge.friendly_name = Some(val);
        }

        if let Ok(val) = std::env::var("AGB_SERVER_HOST") {
            config.server.host = val;
        }
        if let Ok(val) = std::env::var("AGB_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                config.server.port = port;
            }
        }

        if let Ok(val) = std::env::var("AGB_GOTIFY_URL") {
            config.gotify.url = val;
        }
        if let Ok(val) = std::env::var("AGB_GOTIFY_TOKEN") {
            config.gotify.token = val;
        }
    }

    /// Validate configuration
    fn validate(&self, config: &BridgeConfig) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.bridge.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                config.bridge.log_level, valid_levels
            )));
        }

        if config.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port cannot be 0".to_string(),
            ));
        }

        // URL/token may legitimately be empty here (e.g. for the setup
        // command); the serve path requires them separately.
        if !config.gotify.url.is_empty()
            && !config.gotify.url.starts_with("http://")
            && !config.gotify.url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(format!(
                "Gotify URL must start with http:// or https://: {}",
                config.gotify.url
            )));
        }

        Ok(())
    }

    /// Get the default config file path for the current platform
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("authentik-gotify-bridge").join("config.toml"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper module for platform-specific directories
mod dirs {
    use std::path::PathBuf;

    /// Get the user's config directory
    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        }

        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }

        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.bridge.log_level, "info");
        assert!(config.bridge.friendly_name.is_none());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.gotify.max_retries, 3);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
            [bridge]
            log_level = "debug"
        "#;
        let config: BridgeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bridge.log_level, "debug");
        // Other fields should be default
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
            [bridge]
            log_level = "trace"
            friendly_name = "prod-idp"

            [server]
            host = "127.0.0.1"
            port = 9000

            [gotify]
            url = "https://gotify.example.com"
            token = "AbCdEf123456"
            timeout_secs = 10
            max_retries = 5
        "#;

        let config: BridgeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bridge.log_level, "trace");
        assert_eq!(config.bridge.friendly_name.as_deref(), Some("prod-idp"));
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.gotify.url, "https://gotify.example.com");
        assert_eq!(config.gotify.token, "AbCdEf123456");
        assert_eq!(config.gotify.timeout_secs, 10);
        assert_eq!(config.gotify.max_retries, 5);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bridge]\nfriendly_name = \"staging\"").unwrap();

        let loader = ConfigLoader::new();
        let config = loader.load_from_file(file.path()).unwrap();
        assert_eq!(config.bridge.friendly_name.as_deref(), Some("staging"));
    }

    #[test]
    fn test_env_overrides() {
        // Env vars are process-global; set and remove everything inside
        // this one test so parallel tests never observe them.
        std::env::set_var("AGB_FRIENDLY_NAME", "env-idp");
        std::env::set_var("AGB_GOTIFY_URL", "https://gotify.env.example.com");
        std::env::set_var("AGB_GOTIFY_TOKEN", "EnvToken123");
        std::env::set_var("AGB_SERVER_PORT", "not-a-port");

        let loader = ConfigLoader::new();
        let mut config = BridgeConfig::default();
        loader.apply_env_overrides(&mut config);

        assert_eq!(config.bridge.friendly_name.as_deref(), Some("env-idp"));
        assert_eq!(config.gotify.url, "https://gotify.env.example.com");
        assert_eq!(config.gotify.token, "EnvToken123");
        // An unparsable port leaves the configured value intact
        assert_eq!(config.server.port, 8080);

        std::env::set_var("AGB_SERVER_PORT", "9001");
        loader.apply_env_overrides(&mut config);
        assert_eq!(config.server.port, 9001);

        std::env::remove_var("AGB_FRIENDLY_NAME");
        std::env::remove_var("AGB_GOTIFY_URL");
        std::env::remove_var("AGB_GOTIFY_TOKEN");
        std::env::remove_var("AGB_SERVER_PORT");
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let config = BridgeConfig {
            bridge: BridgeSettings {
                log_level: "invalid".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let loader = ConfigLoader::new();
        assert!(loader.validate(&config).is_err());
    }

    #[test]
    fn test_validation_rejects_port_zero() {
        let config = BridgeConfig {
            server: ServerSettings {
                port: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let loader = ConfigLoader::new();
        assert!(loader.validate(&config).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_gotify_url() {
        let config = BridgeConfig {
            gotify: GotifySettings {
                url: "gotify.example.com".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let loader = ConfigLoader::new();
        assert!(loader.validate(&config).is_err());
    }

    #[test]
    fn test_validation_accepts_empty_gotify_url() {
        let loader = ConfigLoader::new();
        assert!(loader.validate(&BridgeConfig::default()).is_ok());
    }
}
