use crate::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use vmprune_core::{RunRequest, DEFAULT_KEEP_COUNT};
use vmprune_utils::parse_bool;

/// Configuration-specific errors that can occur during config operations
///
/// # Variants
/// * `NotFound` - The requested config file could not be found
/// * `InvalidFormat` - The config file or a key is malformed
/// * `MissingField` - One or more required settings are missing
/// * `InvalidValue` - A configuration value is invalid for its field
/// * `DirectoryCreationFailed` - Failed to create the config directory
/// * `TomlError` - Error parsing or serializing TOML data
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Config directory creation failed: {0}")]
    DirectoryCreationFailed(String),

    #[error("TOML parsing error: {0}")]
    TomlError(String),
}

/// Connection settings for vCenter
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct VcenterConfig {
    pub server: Option<String>,
    pub datacenter: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub insecure_connection: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// Retention policy inputs
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CleanupConfig {
    pub image_name_regex: Option<String>,
    pub keep_images: Option<i64>,
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ConfigData {
    pub vcenter: Option<VcenterConfig>,
    pub cleanup: Option<CleanupConfig>,
}

/// Environment variables that override the file
pub const ENV_SERVER: &str = "VMPRUNE_SERVER";
pub const ENV_DATACENTER: &str = "VMPRUNE_DATACENTER";
pub const ENV_USERNAME: &str = "VMPRUNE_USERNAME";
pub const ENV_PASSWORD: &str = "VMPRUNE_PASSWORD";
pub const ENV_INSECURE: &str = "VMPRUNE_INSECURE";

/// Policy overrides coming from the command line
#[derive(Debug, Clone, Default)]
pub struct PolicyOverrides {
    pub pattern: Option<String>,
    pub keep: Option<i64>,
    pub dry_run: bool,
    pub artifact_id: Option<String>,
}

impl vmprune_api::ApiConfig for Config {
    type Error = CliError;

    fn get_server(&self) -> std::result::Result<String, Self::Error> {
        self.vcenter()
            .server
            .clone()
            .ok_or_else(|| ConfigError::MissingField("vcenter.server".to_string()).into())
    }

    fn get_credentials(&self) -> std::result::Result<(String, String), Self::Error> {
        let vcenter = self.vcenter();
        match (vcenter.username.clone(), vcenter.password.clone()) {
            (Some(username), Some(password)) => Ok((username, password)),
            (None, _) => Err(ConfigError::MissingField("vcenter.username".to_string()).into()),
            (_, None) => Err(ConfigError::MissingField("vcenter.password".to_string()).into()),
        }
    }

    fn get_datacenter(&self) -> std::result::Result<Option<String>, Self::Error> {
        Ok(self.vcenter().datacenter.clone())
    }

    fn allow_insecure(&self) -> bool {
        self.vcenter().insecure_connection.unwrap_or(true)
    }

    fn get_timeout(&self) -> Option<Duration> {
        self.vcenter().timeout_secs.map(Duration::from_secs)
    }
}

/// Configuration manager that handles loading, saving, and accessing configuration
///
/// # Fields
/// * `config_path` - Path to the configuration file
/// * `data` - The configuration data, with environment overrides applied
#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    pub data: ConfigData,
}

impl Config {
    /// Load the config from the default location, or start empty
    ///
    /// # Errors
    /// * `ConfigError::DirectoryCreationFailed` - If config directory creation fails
    /// * `ConfigError::TomlError` - If TOML parsing fails
    pub fn new() -> Result<Self> {
        let config_dir = get_config_dir()?;
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| ConfigError::DirectoryCreationFailed(e.to_string()))?;
        }

        let config_path = config_dir.join("config.toml");
        let data = if config_path.exists() {
            read_config_file(&config_path)?
        } else {
            ConfigData::default()
        };

        Ok(Self { config_path, data }.with_env(|key| std::env::var(key).ok())?)
    }

    /// Load an explicitly named config file, which must exist
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_file(path)?.with_env(|key| std::env::var(key).ok())
    }

    /// Load a config file without applying environment overrides
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }
        let data = read_config_file(path)?;
        Ok(Self {
            config_path: path.to_path_buf(),
            data,
        })
    }

    /// Apply environment overrides through `lookup`
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let vcenter = self.data.vcenter.get_or_insert_with(VcenterConfig::default);

        if let Some(server) = non_empty(ENV_SERVER) {
            vcenter.server = Some(server);
        }
        if let Some(datacenter) = non_empty(ENV_DATACENTER) {
            vcenter.datacenter = Some(datacenter);
        }
        if let Some(username) = non_empty(ENV_USERNAME) {
            vcenter.username = Some(username);
        }
        if let Some(password) = non_empty(ENV_PASSWORD) {
            vcenter.password = Some(password);
        }
        if let Some(insecure) = non_empty(ENV_INSECURE) {
            let parsed = parse_bool(&insecure, true).map_err(|_| ConfigError::InvalidValue {
                field: ENV_INSECURE.to_string(),
                value: insecure.clone(),
            })?;
            vcenter.insecure_connection = Some(parsed);
        }

        Ok(self)
    }

    /// Save the configuration to file with an atomic write
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(&self.data)
            .map_err(|e| ConfigError::TomlError(e.to_string()))?;

        if let Some(parent) = self.config_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::DirectoryCreationFailed(e.to_string()))?;
            }
        }

        // Write to a temporary file first, then rename
        let temp_path = self.config_path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }

    pub fn vcenter(&self) -> VcenterConfig {
        self.data.vcenter.clone().unwrap_or_default()
    }

    pub fn cleanup(&self) -> CleanupConfig {
        self.data.cleanup.clone().unwrap_or_default()
    }

    /// Check every required connection setting at once
    pub fn validate_connection(&self) -> Result<()> {
        let vcenter = self.vcenter();
        let missing: Vec<&str> = [
            ("vcenter.server", vcenter.server.is_none()),
            ("vcenter.username", vcenter.username.is_none()),
            ("vcenter.password", vcenter.password.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingField(missing.join(", ")).into())
        }
    }

    /// Merge command line overrides with the `[cleanup]` section.
    ///
    /// Validation happens in the core; this only applies defaults.
    pub fn run_request(&self, overrides: &PolicyOverrides) -> RunRequest {
        let cleanup = self.cleanup();
        RunRequest {
            image_name_pattern: overrides
                .pattern
                .clone()
                .or(cleanup.image_name_regex)
                .unwrap_or_default(),
            keep_count: overrides
                .keep
                .or(cleanup.keep_images)
                .unwrap_or(DEFAULT_KEEP_COUNT),
            dry_run: overrides.dry_run || cleanup.dry_run.unwrap_or(false),
            current_artifact_id: overrides.artifact_id.clone(),
        }
    }

    /// Get a value by `section.key`
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let vcenter = self.vcenter();
        let cleanup = self.cleanup();
        let value = match key {
            "vcenter.server" => vcenter.server,
            "vcenter.datacenter" => vcenter.datacenter,
            "vcenter.username" => vcenter.username,
            "vcenter.password" => vcenter.password.map(|_| "********".to_string()),
            "vcenter.insecure_connection" => vcenter.insecure_connection.map(|v| v.to_string()),
            "vcenter.timeout_secs" => vcenter.timeout_secs.map(|v| v.to_string()),
            "cleanup.image_name_regex" => cleanup.image_name_regex,
            "cleanup.keep_images" => cleanup.keep_images.map(|v| v.to_string()),
            "cleanup.dry_run" => cleanup.dry_run.map(|v| v.to_string()),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set a value by `section.key`, parsing it for typed fields
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || ConfigError::InvalidValue {
            field: key.to_string(),
            value: value.to_string(),
        };

        if let Some(field) = key.strip_prefix("vcenter.") {
            let vcenter = self.data.vcenter.get_or_insert_with(VcenterConfig::default);
            match field {
                "server" => vcenter.server = Some(value.to_string()),
                "datacenter" => vcenter.datacenter = Some(value.to_string()),
                "username" => vcenter.username = Some(value.to_string()),
                "password" => vcenter.password = Some(value.to_string()),
                "insecure_connection" => {
                    vcenter.insecure_connection =
                        Some(parse_bool(value, true).map_err(|_| invalid())?)
                }
                "timeout_secs" => {
                    vcenter.timeout_secs = Some(value.parse().map_err(|_| invalid())?)
                }
                _ => return Err(unknown_key(key)),
            }
        } else if let Some(field) = key.strip_prefix("cleanup.") {
            let cleanup = self.data.cleanup.get_or_insert_with(CleanupConfig::default);
            match field {
                "image_name_regex" => cleanup.image_name_regex = Some(value.to_string()),
                "keep_images" => cleanup.keep_images = Some(value.parse().map_err(|_| invalid())?),
                "dry_run" => cleanup.dry_run = Some(parse_bool(value, false).map_err(|_| invalid())?),
                _ => return Err(unknown_key(key)),
            }
        } else {
            return Err(unknown_key(key));
        }

        Ok(())
    }

    /// Render the configuration as TOML with the password masked
    pub fn show_config(&self) -> String {
        let mut data = self.data.clone();
        if let Some(vcenter) = data.vcenter.as_mut() {
            if vcenter.password.is_some() {
                vcenter.password = Some("********".to_string());
            }
        }
        toml::to_string_pretty(&data).unwrap_or_else(|e| format!("Error formatting config: {}", e))
    }
}

fn unknown_key(key: &str) -> CliError {
    ConfigError::InvalidFormat(format!("unknown configuration key '{}'", key)).into()
}

fn read_config_file(path: &Path) -> Result<ConfigData> {
    let content = fs::read_to_string(path)?;
    let data = toml::from_str(&content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
    Ok(data)
}

/// Directory holding `config.toml`
///
/// # Errors
/// * `ConfigError::NotFound` - If the platform has no config directory
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("vmprune"))
        .ok_or_else(|| ConfigError::NotFound("user config directory".to_string()).into())
}
