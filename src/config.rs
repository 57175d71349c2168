use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Spreadsheet holding the collections
    pub spreadsheet_id: ConfigValue<Option<String>>,
    /// OAuth client secret downloaded from the cloud console
    pub credentials_path: ConfigValue<PathBuf>,
    /// Where the OAuth token is saved after login
    pub token_path: ConfigValue<PathBuf>,
    /// Sheets API root
    pub api_base_url: ConfigValue<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    spreadsheet_id: Option<String>,
    credentials_path: Option<PathBuf>,
    token_path: Option<PathBuf>,
    api_base_url: Option<String>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], reading environment variables through `env`.
    pub fn load_with_env<F>(config_path: Option<PathBuf>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Start with defaults
        let mut spreadsheet_id = ConfigValue::new(None, ConfigSource::Default);
        let mut credentials_path = ConfigValue::new(
            Self::default_config_dir().join("credentials.json"),
            ConfigSource::Default,
        );
        let mut token_path = ConfigValue::new(
            Self::default_data_dir().join("token.json"),
            ConfigSource::Default,
        );
        let mut api_base_url =
            ConfigValue::new(DEFAULT_API_BASE_URL.to_string(), ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(id) = file_config.spreadsheet_id {
                spreadsheet_id = ConfigValue::new(Some(id), ConfigSource::File);
            }
            if let Some(p) = file_config.credentials_path {
                credentials_path = ConfigValue::new(resolve(&path, p), ConfigSource::File);
            }
            if let Some(p) = file_config.token_path {
                token_path = ConfigValue::new(resolve(&path, p), ConfigSource::File);
            }
            if let Some(url) = file_config.api_base_url {
                api_base_url = ConfigValue::new(url, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Some(id) = env("SHEETDB_SPREADSHEET_ID") {
            spreadsheet_id = ConfigValue::new(Some(id), ConfigSource::Environment);
        }
        if let Some(p) = env("SHEETDB_CREDENTIALS") {
            credentials_path = ConfigValue::new(PathBuf::from(p), ConfigSource::Environment);
        }
        if let Some(p) = env("SHEETDB_TOKEN") {
            token_path = ConfigValue::new(PathBuf::from(p), ConfigSource::Environment);
        }
        if let Some(url) = env("SHEETDB_API_URL") {
            api_base_url = ConfigValue::new(url, ConfigSource::Environment);
        }

        Ok(Self {
            spreadsheet_id,
            credentials_path,
            token_path,
            api_base_url,
            config_file,
        })
    }

    /// The spreadsheet id, or an error telling the user how to set it.
    pub fn require_spreadsheet_id(&self) -> Result<&str, ConfigError> {
        self.spreadsheet_id
            .value
            .as_deref()
            .ok_or(ConfigError::MissingSpreadsheetId)
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/sheetdb/
    /// - macOS: ~/Library/Application Support/sheetdb/
    /// - Windows: %APPDATA%/sheetdb/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetdb")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/sheetdb/
    /// - macOS: ~/Library/Application Support/sheetdb/
    /// - Windows: %APPDATA%/sheetdb/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetdb")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolve relative paths against the config file's directory
fn resolve(config_path: &Path, value: PathBuf) -> PathBuf {
    if value.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&value))
            .unwrap_or(value)
    } else {
        value
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    MissingSpreadsheetId,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::MissingSpreadsheetId => write!(
                f,
                "No spreadsheet configured. Set spreadsheet_id in config or SHEETDB_SPREADSHEET_ID."
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
