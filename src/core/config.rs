//! Engine configuration: one TOML file, loaded once, immutable thereafter.
//!
//! Provider tables use array-of-tables syntax so declaration order is
//! preserved; associator resolution and `known_providers` both honor it.
//!
//! ```toml
//! [common]
//! svn_executable = "/usr/bin/svn"
//! svnadmin_executable = "/usr/bin/svnadmin"
//! parent_url = "file:///var/svn"
//! authz_file = "/etc/svn/authz"
//!
//! [[providers.repository]]
//! id = "local"
//! backend = "local"
//! [providers.repository.options]
//! parent_dir = "/var/svn"
//!
//! [[providers.usergroup]]
//! id = "assoc1"
//! backend = "authz"
//! for_users = ["passwd"]
//! for_groups = ["passwd"]
//! ```

use crate::core::error::SvnHubError;
use crate::providers::{self, ProviderType};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

fn default_svn_executable() -> PathBuf {
    PathBuf::from("svn")
}

fn default_svnadmin_executable() -> PathBuf {
    PathBuf::from("svnadmin")
}

fn default_tool_timeout_secs() -> u64 {
    60
}

/// Common settings shared by all providers and adapters.
#[derive(Debug, Clone, Deserialize)]
pub struct CommonConfig {
    /// Path to the `svn` binary.
    #[serde(default = "default_svn_executable")]
    pub svn_executable: PathBuf,
    /// Path to the `svnadmin` binary.
    #[serde(default = "default_svnadmin_executable")]
    pub svnadmin_executable: PathBuf,
    /// Base URL under which repositories are served (scheme + host + path).
    pub parent_url: String,
    /// Default access-control file consulted when no explicit path is given.
    #[serde(default)]
    pub authz_file: Option<PathBuf>,
    /// Hard wall-clock bound for any single toolchain invocation.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

/// Configuration for one declared provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Provider id, unique within its type's namespace.
    pub id: String,
    /// Symbolic backend name, resolved through the compile-time factory
    /// table and validated at load.
    pub backend: String,
    /// Identity-provider ids this associator fronts for user lookups.
    #[serde(default)]
    pub for_users: Vec<String>,
    /// Identity-provider ids this associator fronts for group lookups.
    #[serde(default)]
    pub for_groups: Vec<String>,
    /// Backend-specific options.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ProviderConfig {
    /// Fetch a required backend option, failing with the id in the message.
    pub fn require_option(&self, key: &str) -> Result<&str, SvnHubError> {
        self.options
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| SvnHubError::ConfigError(format!(
                "provider '{}' is missing required option '{}'",
                self.id, key
            )))
    }
}

/// Declared providers, one ordered list per capability type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub user: Vec<ProviderConfig>,
    #[serde(default)]
    pub group: Vec<ProviderConfig>,
    #[serde(default)]
    pub usergroup: Vec<ProviderConfig>,
    #[serde(default)]
    pub repository: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub common: CommonConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, SvnHubError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, SvnHubError> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| SvnHubError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on configuration that would otherwise only blow up at
    /// first use: unknown backend names, duplicate ids, bad parent URL.
    fn validate(&self) -> Result<(), SvnHubError> {
        Url::parse(&self.common.parent_url).map_err(|e| {
            SvnHubError::ConfigError(format!(
                "invalid parent_url '{}': {}",
                self.common.parent_url, e
            ))
        })?;
        for type_name in ProviderType::ALL {
            let mut seen = Vec::new();
            for entry in self.provider_entries(type_name) {
                if !providers::factory::known_backend(type_name, &entry.backend) {
                    return Err(SvnHubError::ConfigError(format!(
                        "unknown backend '{}' for provider {}/{}",
                        entry.backend, type_name, entry.id
                    )));
                }
                if seen.contains(&entry.id.as_str()) {
                    return Err(SvnHubError::ConfigError(format!(
                        "duplicate provider id {}/{}",
                        type_name, entry.id
                    )));
                }
                seen.push(&entry.id);
            }
        }
        Ok(())
    }

    /// Parsed parent URL. Infallible after `validate`.
    pub fn parent_url(&self) -> Result<Url, SvnHubError> {
        Url::parse(&self.common.parent_url)
            .map_err(|e| SvnHubError::ConfigError(e.to_string()))
    }

    /// Declared providers of one type, in declaration order.
    pub fn provider_entries(&self, type_name: ProviderType) -> &[ProviderConfig] {
        match type_name {
            ProviderType::User => &self.providers.user,
            ProviderType::Group => &self.providers.group,
            ProviderType::UserGroupAssociation => &self.providers.usergroup,
            ProviderType::Repository => &self.providers.repository,
        }
    }

    pub fn find_provider(&self, type_name: ProviderType, id: &str) -> Option<&ProviderConfig> {
        self.provider_entries(type_name).iter().find(|p| p.id == id)
    }
}
