//! Reset configuration: service name, cache base paths, configuration
//! roots for the remote container categories, and timing.
//!
//! Everything the procedure would otherwise look up from ambient state
//! lives here so it can be injected in tests.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::identity::Sid;

/// Default name of the profile container agent service.
pub const DEFAULT_SERVICE_NAME: &str = "frxsvc";
/// Default base directory holding the per-SID local cache folders.
pub const DEFAULT_CACHE_ROOT: &str = r"C:\ProgramData\FSLogix";
/// Default local cache categories (subfolders of the cache root).
pub const DEFAULT_CACHE_CATEGORIES: [&str; 2] = ["Cache", "Proxy"];
/// Default configuration root for profile containers.
pub const DEFAULT_PROFILE_CONFIG_KEY: &str = r"SOFTWARE\FSLogix\Profiles";
/// Default configuration root for office containers.
pub const DEFAULT_OFFICE_CONFIG_KEY: &str = r"SOFTWARE\Policies\FSLogix\ODFC";
/// Default multi-value holding the remote share locations.
pub const DEFAULT_LOCATIONS_VALUE: &str = "VHDLocations";

const DEFAULT_STOP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid service name: {0:?}")]
    InvalidServiceName(String),

    #[error("{var} must be {expected}, got {value:?}")]
    InvalidValue {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("At least one cache category is required")]
    NoCacheCategories,

    #[error("Cache category {0:?} must be a single directory name")]
    InvalidCacheCategory(String),
}

/// The two remote container categories, each with its own configuration root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerCategory {
    Profile,
    Office,
}

impl ContainerCategory {
    pub const ALL: [ContainerCategory; 2] = [ContainerCategory::Profile, ContainerCategory::Office];

    pub fn label(self) -> &'static str {
        match self {
            ContainerCategory::Profile => "profile",
            ContainerCategory::Office => "office",
        }
    }
}

/// Allowed service name characters: alphanumeric, hyphen, underscore, dot.
/// The name ends up on a subprocess command line.
pub fn is_safe_service_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Configuration for one reset run.
#[derive(Debug, Clone)]
pub struct ResetConfig {
    /// Agent service to stop and restart (default: `frxsvc`).
    pub service_name: String,
    /// Base directory of the local caches (default: `C:\ProgramData\FSLogix`).
    pub cache_root: PathBuf,
    /// Subfolders of `cache_root` holding per-SID caches (default: `Cache`, `Proxy`).
    pub cache_categories: Vec<String>,
    pub profile_config_key: String,
    pub office_config_key: String,
    /// Value under each configuration root listing the share locations.
    pub locations_value: String,
    /// Profile share locations to use instead of reading the configuration root.
    pub profile_locations: Option<Vec<String>>,
    /// Office share locations to use instead of reading the configuration root.
    pub office_locations: Option<Vec<String>>,
    /// Bounded wait for the service to reach the stopped state.
    pub stop_timeout: Duration,
    /// Delay between status polls while waiting for the service to stop.
    pub poll_interval: Duration,
    /// Upper bound on any single external command.
    pub command_timeout: Duration,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            cache_root: PathBuf::from(DEFAULT_CACHE_ROOT),
            cache_categories: DEFAULT_CACHE_CATEGORIES.map(String::from).to_vec(),
            profile_config_key: DEFAULT_PROFILE_CONFIG_KEY.to_string(),
            office_config_key: DEFAULT_OFFICE_CONFIG_KEY.to_string(),
            locations_value: DEFAULT_LOCATIONS_VALUE.to_string(),
            profile_locations: None,
            office_locations: None,
            stop_timeout: Duration::from_secs(DEFAULT_STOP_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }
}

impl ResetConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                          |
    /// |----------------------------|----------------------------------|
    /// | `FSL_SERVICE_NAME`         | `frxsvc`                         |
    /// | `FSL_CACHE_ROOT`           | `C:\ProgramData\FSLogix`         |
    /// | `FSL_CACHE_CATEGORIES`     | `Cache,Proxy`                    |
    /// | `FSL_PROFILE_CONFIG_KEY`   | `SOFTWARE\FSLogix\Profiles`      |
    /// | `FSL_OFFICE_CONFIG_KEY`    | `SOFTWARE\Policies\FSLogix\ODFC` |
    /// | `FSL_LOCATIONS_VALUE`      | `VHDLocations`                   |
    /// | `FSL_PROFILE_LOCATIONS`    | unset (read the registry)        |
    /// | `FSL_OFFICE_LOCATIONS`     | unset (read the registry)        |
    /// | `FSL_STOP_TIMEOUT_SECS`    | `15`                             |
    /// | `FSL_POLL_INTERVAL_MS`     | `500`                            |
    /// | `FSL_COMMAND_TIMEOUT_SECS` | `60`                             |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`ResetConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("FSL_SERVICE_NAME") {
            config.service_name = name.trim().to_string();
        }
        if let Some(root) = lookup("FSL_CACHE_ROOT") {
            config.cache_root = PathBuf::from(root.trim());
        }
        if let Some(categories) = lookup("FSL_CACHE_CATEGORIES") {
            config.cache_categories = categories
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(key) = lookup("FSL_PROFILE_CONFIG_KEY") {
            config.profile_config_key = key.trim().to_string();
        }
        if let Some(key) = lookup("FSL_OFFICE_CONFIG_KEY") {
            config.office_config_key = key.trim().to_string();
        }
        if let Some(value) = lookup("FSL_LOCATIONS_VALUE") {
            config.locations_value = value.trim().to_string();
        }
        if let Some(raw) = lookup("FSL_PROFILE_LOCATIONS") {
            config.profile_locations = Some(split_locations(&raw));
        }
        if let Some(raw) = lookup("FSL_OFFICE_LOCATIONS") {
            config.office_locations = Some(split_locations(&raw));
        }
        if let Some(raw) = lookup("FSL_STOP_TIMEOUT_SECS") {
            config.stop_timeout = Duration::from_secs(parse_u64("FSL_STOP_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = lookup("FSL_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(parse_u64("FSL_POLL_INTERVAL_MS", &raw)?);
        }
        if let Some(raw) = lookup("FSL_COMMAND_TIMEOUT_SECS") {
            config.command_timeout =
                Duration::from_secs(parse_u64("FSL_COMMAND_TIMEOUT_SECS", &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that the procedure relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_safe_service_name(&self.service_name) {
            return Err(ConfigError::InvalidServiceName(self.service_name.clone()));
        }
        if self.cache_categories.is_empty() {
            return Err(ConfigError::NoCacheCategories);
        }
        if let Some(bad) = self
            .cache_categories
            .iter()
            .find(|c| c.is_empty() || c.contains(['\\', '/']) || matches!(c.as_str(), "." | ".."))
        {
            return Err(ConfigError::InvalidCacheCategory(bad.clone()));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                var: "FSL_POLL_INTERVAL_MS",
                expected: "greater than zero",
                value: "0".into(),
            });
        }
        Ok(())
    }

    /// Per-SID local cache directories, one per category, in category order.
    pub fn cache_dirs(&self, sid: &Sid) -> Vec<(String, PathBuf)> {
        self.cache_categories
            .iter()
            .map(|category| {
                let dir = self.cache_root.join(category).join(sid.as_str());
                (category.clone(), dir)
            })
            .collect()
    }

    /// Configuration root holding the share locations for `category`.
    pub fn config_key(&self, category: ContainerCategory) -> &str {
        match category {
            ContainerCategory::Profile => &self.profile_config_key,
            ContainerCategory::Office => &self.office_config_key,
        }
    }

    /// Locations configured directly for `category`, bypassing the
    /// configuration root. An empty list means the category has none.
    pub fn location_override(&self, category: ContainerCategory) -> Option<&[String]> {
        match category {
            ContainerCategory::Profile => self.profile_locations.as_deref(),
            ContainerCategory::Office => self.office_locations.as_deref(),
        }
    }
}

/// Split a `;`-separated location list, dropping blanks.
pub fn split_locations(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_u64(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        expected: "a non-negative integer",
        value: raw.to_string(),
    })
}
