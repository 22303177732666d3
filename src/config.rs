use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const BASE_URL_ENV: &str = "RADSTORE_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "http://localhost:3003/api/v1";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Prefix of every endpoint path, e.g. `http://host:3003/api/v1`
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set: "error", "warn", "info", "debug", "trace"
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults when
    /// there is no file yet. The environment override is applied last.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            Self::default()
        };

        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config.api.base_url = base_url;
        }

        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("radstore").join("config.toml"))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        format!(
            r#"# radstore client configuration
# Location: ~/.config/radstore/config.toml (Linux)
#           ~/Library/Application Support/radstore/config.toml (macOS)
#           %APPDATA%\radstore\config.toml (Windows)

[api]
# Prefix of every endpoint path. {env} overrides this value.
base_url = "{url}"

[logging]
# Used when RUST_LOG is not set: "error", "warn", "info", "debug" or "trace"
level = "warn"
"#,
            env = BASE_URL_ENV,
            url = DEFAULT_BASE_URL,
        )
    }
}
