use crate::domain::{IncreasePolicy, Version};
use crate::error::{FlowError, Result};
use crate::git::hosting::HostingCredentials;
use crate::git::FlowSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name looked up in the current directory
pub const CONFIG_FILE: &str = "releaseflow.toml";

/// Represents the complete configuration for release-flow.
///
/// Contains the backend selector, repository layout, labels, versioning
/// policy, hosting credentials and hook scripts.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub labels: LabelsConfig,

    #[serde(default)]
    pub versioning: VersioningConfig,

    #[serde(default)]
    pub credentials: Option<Credentials>,

    #[serde(default)]
    pub hooks: HooksConfig,
}

fn default_backend() -> String {
    "local".to_string()
}

fn default_master_branch() -> String {
    "master".to_string()
}

fn default_feature_prefix() -> String {
    "feature-".to_string()
}

fn default_candidate_label() -> String {
    "RELEASE-CANDIDATE".to_string()
}

fn default_stable_label() -> String {
    "RELEASE-STABLE".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_strict_patch() -> bool {
    true
}

/// Branch layout of the repository.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RepositoryConfig {
    #[serde(default = "default_master_branch")]
    pub master_branch: String,

    #[serde(default = "default_feature_prefix")]
    pub feature_prefix: String,

    /// Remote mirrored by the local backend after every mutation
    #[serde(default)]
    pub remote: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig {
            master_branch: default_master_branch(),
            feature_prefix: default_feature_prefix(),
            remote: None,
        }
    }
}

/// Labels that gate features into releases.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LabelsConfig {
    #[serde(default = "default_candidate_label")]
    pub release_candidate: String,

    #[serde(default = "default_stable_label")]
    pub release_stable: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        LabelsConfig {
            release_candidate: default_candidate_label(),
            release_stable: default_stable_label(),
        }
    }
}

/// Version computation settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VersioningConfig {
    /// Version assumed when no tag or branch parses as a version
    #[serde(default = "default_version")]
    pub default_version: String,

    /// Reject patch increases on pre-releases with a major above zero
    #[serde(default = "default_strict_patch")]
    pub strict_patch: bool,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        VersioningConfig {
            default_version: default_version(),
            strict_patch: default_strict_patch(),
        }
    }
}

/// Hosting provider credentials.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub repository: String,

    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub endpoint: String,
}

/// Scripts run around release tagging.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct HooksConfig {
    #[serde(default)]
    pub pre_release_tag: Option<String>,

    #[serde(default)]
    pub post_release_tag: Option<String>,

    #[serde(default)]
    pub post_cleanup: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: default_backend(),
            repository: RepositoryConfig::default(),
            labels: LabelsConfig::default(),
            versioning: VersioningConfig::default(),
            credentials: None,
            hooks: HooksConfig::default(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| FlowError::config(e.to_string()))
    }

    /// Validate the configuration and derive the settings shared by all backends
    pub fn settings(&self) -> Result<FlowSettings> {
        if self.repository.master_branch.trim().is_empty() {
            return Err(FlowError::config("repository.master_branch is empty"));
        }
        if self.repository.feature_prefix.is_empty() {
            return Err(FlowError::config("repository.feature_prefix is empty"));
        }
        if self.labels.release_candidate == self.labels.release_stable {
            return Err(FlowError::config(format!(
                "release candidate and stable labels must differ (both '{}')",
                self.labels.release_candidate
            )));
        }

        let default_version = Version::parse(&self.versioning.default_version).map_err(|e| {
            FlowError::config(format!("versioning.default_version: {}", e))
        })?;

        Ok(FlowSettings {
            master_branch: self.repository.master_branch.clone(),
            feature_prefix: self.repository.feature_prefix.clone(),
            candidate_label: self.labels.release_candidate.clone(),
            stable_label: self.labels.release_stable.clone(),
            default_version,
            policy: IncreasePolicy {
                strict_patch: self.versioning.strict_patch,
            },
        })
    }

    /// Credentials handed to the hosting client of a hosted backend
    pub fn hosting_credentials(&self) -> Result<HostingCredentials> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            FlowError::config(format!("backend '{}' needs [credentials]", self.backend))
        })?;
        if credentials.repository.trim().is_empty() {
            return Err(FlowError::config("credentials.repository is empty"));
        }
        Ok(HostingCredentials::from(credentials.clone()))
    }
}

impl From<Credentials> for HostingCredentials {
    fn from(credentials: Credentials) -> Self {
        HostingCredentials {
            username: credentials.username,
            repository: credentials.repository,
            token: credentials.token,
            endpoint: credentials.endpoint,
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `releaseflow.toml` in current directory
/// 3. `.releaseflow.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)
            .map_err(|e| FlowError::config(format!("cannot read {}: {}", path, e)))?
    } else if Path::new(CONFIG_FILE).exists() {
        fs::read_to_string(CONFIG_FILE)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(format!(".{}", CONFIG_FILE));
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    Config::from_toml(&config_str)
}
