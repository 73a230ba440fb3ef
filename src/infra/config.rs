//! Configuration management infrastructure.
//!
//! Persists front-end preferences (page origin, bridge endpoint, signing
//! defaults) as TOML and supports export/import in other formats.

use crate::domain::constants::DEFAULT_LOADER_SCRIPT;
use crate::domain::types::ExecutionContext;
use crate::infra::error::{SigningError, SigningResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default origin the CLI presents to the provider.
pub const DEFAULT_PAGE_ORIGIN: &str = "http://localhost:8080";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfiguration {
    /// Origin of the page hosting the signing front-end
    pub page_origin: String,

    /// Bridge host endpoint; without it the provider is reported missing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_url: Option<String>,

    /// Location of the plugin loader script, shown in remediation hints
    pub loader_script: String,

    /// Network timeout settings
    pub network_timeout_seconds: u64,

    /// Produce detached signatures unless told otherwise
    pub default_detached: bool,

    /// Where signatures are saved when no output path is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>,

    /// Whether to show verbose output
    pub verbose: bool,
}

impl Default for SignerConfiguration {
    fn default() -> Self {
        Self {
            page_origin: DEFAULT_PAGE_ORIGIN.to_string(),
            bridge_url: None,
            loader_script: DEFAULT_LOADER_SCRIPT.to_string(),
            network_timeout_seconds: 30,
            default_detached: false,
            output_directory: None,
            verbose: false,
        }
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> SigningResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> SigningResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("cades-signer").join("config.toml"))
        } else {
            Ok(PathBuf::from("cades-signer-config.toml"))
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> SigningResult<SignerConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = SignerConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file, or defaults when there is none.
    /// Nothing is written.
    pub fn load_or_default(&self) -> SigningResult<SignerConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::debug!(
                "No configuration at {}, using defaults",
                self.config_path.display()
            );
            Ok(SignerConfiguration::default())
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> SigningResult<SignerConfiguration> {
        log::debug!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to read config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        let config: SignerConfiguration = toml::from_str(&content).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &SignerConfiguration) -> SigningResult<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SigningError::ConfigurationError(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to write config file {}: {e}",
                self.config_path.display()
            ))
        })
    }

    /// Update a specific configuration value.
    ///
    /// Optional keys (`bridge_url`, `output_directory`) are cleared by an
    /// empty value or `none`.
    pub fn update_value(&self, key: &str, value: &str) -> SigningResult<()> {
        let mut config = self.load_or_default()?;
        let cleared = value.is_empty() || value.eq_ignore_ascii_case("none");

        match key {
            "page_origin" => config.page_origin = value.to_string(),
            "bridge_url" => {
                config.bridge_url = (!cleared).then(|| value.to_string());
            }
            "loader_script" => config.loader_script = value.to_string(),
            "network_timeout_seconds" => {
                config.network_timeout_seconds = value.parse().map_err(|_| {
                    SigningError::ConfigurationError(format!("Invalid timeout value: {value}"))
                })?;
            }
            "default_detached" => config.default_detached = parse_bool(value)?,
            "output_directory" => {
                config.output_directory = (!cleared).then(|| PathBuf::from(value));
            }
            "verbose" => config.verbose = parse_bool(value)?,
            _ => {
                return Err(SigningError::ConfigurationError(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }

        validate_config(&config)?;
        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Export configuration as a portable format
    pub fn export_config(&self, format: ExportFormat) -> SigningResult<String> {
        let config = self.load_or_default()?;

        match format {
            ExportFormat::Toml => toml::to_string_pretty(&config)
                .map_err(|e| SigningError::ConfigurationError(format!("TOML export failed: {e}"))),
            ExportFormat::Json => serde_json::to_string_pretty(&config)
                .map_err(|e| SigningError::ConfigurationError(format!("JSON export failed: {e}"))),
            ExportFormat::Yaml => serde_yaml::to_string(&config)
                .map_err(|e| SigningError::ConfigurationError(format!("YAML export failed: {e}"))),
        }
    }

    /// Import configuration from a string
    pub fn import_config(&self, content: &str, format: ExportFormat) -> SigningResult<()> {
        let config: SignerConfiguration = match format {
            ExportFormat::Toml => toml::from_str(content).map_err(|e| {
                SigningError::ConfigurationError(format!("TOML import failed: {e}"))
            })?,
            ExportFormat::Json => serde_json::from_str(content).map_err(|e| {
                SigningError::ConfigurationError(format!("JSON import failed: {e}"))
            })?,
            ExportFormat::Yaml => serde_yaml::from_str(content).map_err(|e| {
                SigningError::ConfigurationError(format!("YAML import failed: {e}"))
            })?,
        };

        validate_config(&config)?;
        self.save(&config)
    }
}

/// Configuration export/import formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Toml,
    Json,
    Yaml,
}

/// Validate configuration values
pub fn validate_config(config: &SignerConfiguration) -> SigningResult<()> {
    ExecutionContext::new(&config.page_origin).map_err(|e| {
        SigningError::ConfigurationError(format!("Invalid page_origin: {e}"))
    })?;

    if let Some(url) = &config.bridge_url {
        let bridge = ExecutionContext::new(url).map_err(|e| {
            SigningError::ConfigurationError(format!("Invalid bridge_url: {e}"))
        })?;
        if !bridge.is_networked() {
            return Err(SigningError::ConfigurationError(format!(
                "bridge_url must be an http:// or https:// URL: {url}"
            )));
        }
    }

    if config.loader_script.trim().is_empty() {
        return Err(SigningError::ConfigurationError(
            "loader_script must not be empty".to_string(),
        ));
    }

    if config.network_timeout_seconds == 0 {
        return Err(SigningError::ConfigurationError(
            "Network timeout must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

fn parse_bool(value: &str) -> SigningResult<bool> {
    value
        .parse()
        .map_err(|_| SigningError::ConfigurationError(format!("Invalid boolean value: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> ConfigManager {
        ConfigManager::with_path(dir.path().join("nested").join("config.toml"))
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = SignerConfiguration::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.loader_script, DEFAULT_LOADER_SCRIPT);
        assert!(config.bridge_url.is_none());
    }

    #[test]
    fn test_load_or_create_default_writes_file() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);

        let config = manager.load_or_create_default().unwrap();
        assert_eq!(config, SignerConfiguration::default());
        assert!(manager.config_path().exists());
        assert_eq!(manager.load().unwrap(), config);
    }

    #[test]
    fn test_update_value() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);

        manager
            .update_value("bridge_url", "http://127.0.0.1:8095")
            .unwrap();
        manager.update_value("default_detached", "true").unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config.bridge_url.as_deref(), Some("http://127.0.0.1:8095"));
        assert!(config.default_detached);

        manager.update_value("bridge_url", "none").unwrap();
        assert!(manager.load().unwrap().bridge_url.is_none());
    }

    #[test]
    fn test_update_value_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);

        assert!(manager.update_value("colour", "blue").is_err());
        assert!(manager.update_value("verbose", "maybe").is_err());
        assert!(manager
            .update_value("network_timeout_seconds", "0")
            .is_err());
        assert!(manager
            .update_value("bridge_url", "file:///tmp/bridge")
            .is_err());
        assert!(!manager.config_path().exists());
    }

    #[test]
    fn test_export_import_formats() {
        let dir = TempDir::new().unwrap();
        let source = manager(&dir);
        source.update_value("page_origin", "https://sign.example.org").unwrap();

        for format in [ExportFormat::Toml, ExportFormat::Json, ExportFormat::Yaml] {
            let exported = source.export_config(format).unwrap();
            let target = ConfigManager::with_path(dir.path().join(format!("{format:?}.toml")));
            target.import_config(&exported, format).unwrap();
            assert_eq!(target.load().unwrap().page_origin, "https://sign.example.org");
        }
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let config: SignerConfiguration = toml::from_str("verbose = true").unwrap();
        assert!(config.verbose);
        assert_eq!(config.page_origin, DEFAULT_PAGE_ORIGIN);
        assert_eq!(config.network_timeout_seconds, 30);
    }

    #[test]
    fn test_import_rejects_invalid_origin() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let result = manager.import_config(r#"{"page_origin": "not a url"}"#, ExportFormat::Json);
        assert!(matches!(result, Err(SigningError::ConfigurationError(_))));
    }
}
