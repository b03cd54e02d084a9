//! Compile-time backend factory table.
//!
//! Configuration refers to backends by symbolic name; the table below maps
//! those names to constructors. Unknown names are rejected when the
//! configuration is loaded, not at first use.
//!
//! Adding a backend: implement the trait, then append one entry to the
//! matching `BACKENDS` list.

use crate::core::config::ProviderConfig;
use crate::core::error::SvnHubError;
use crate::providers::authz_group::{AuthzAssociationProvider, AuthzGroupProvider};
use crate::providers::local_repo::LocalRepositoryProvider;
use crate::providers::passwd::PasswdUserProvider;
use crate::providers::{
    AssociationProvider, GroupProvider, ProviderType, RepositoryProvider, UserProvider,
};

struct Backend<T: ?Sized> {
    name: &'static str,
    build: fn(&ProviderConfig) -> Box<T>,
}

const USER_BACKENDS: &[Backend<dyn UserProvider>] = &[Backend {
    name: "passwd",
    build: |config| Box::new(PasswdUserProvider::new(&config.id)),
}];

const GROUP_BACKENDS: &[Backend<dyn GroupProvider>] = &[Backend {
    name: "authz",
    build: |config| Box::new(AuthzGroupProvider::new(&config.id)),
}];

const ASSOCIATION_BACKENDS: &[Backend<dyn AssociationProvider>] = &[Backend {
    name: "authz",
    build: |config| Box::new(AuthzAssociationProvider::new(&config.id)),
}];

const REPOSITORY_BACKENDS: &[Backend<dyn RepositoryProvider>] = &[Backend {
    name: "local",
    build: |config| Box::new(LocalRepositoryProvider::new(&config.id)),
}];

fn backend_names(type_name: ProviderType) -> Vec<&'static str> {
    match type_name {
        ProviderType::User => USER_BACKENDS.iter().map(|b| b.name).collect(),
        ProviderType::Group => GROUP_BACKENDS.iter().map(|b| b.name).collect(),
        ProviderType::UserGroupAssociation => {
            ASSOCIATION_BACKENDS.iter().map(|b| b.name).collect()
        }
        ProviderType::Repository => REPOSITORY_BACKENDS.iter().map(|b| b.name).collect(),
    }
}

/// Whether `name` is a registered backend for `type_name`.
pub fn known_backend(type_name: ProviderType, name: &str) -> bool {
    backend_names(type_name).contains(&name)
}

fn unknown(type_name: ProviderType, config: &ProviderConfig) -> SvnHubError {
    SvnHubError::ConfigError(format!(
        "unknown backend '{}' for provider {}/{}",
        config.backend, type_name, config.id
    ))
}

pub fn build_user(config: &ProviderConfig) -> Result<Box<dyn UserProvider>, SvnHubError> {
    USER_BACKENDS
        .iter()
        .find(|b| b.name == config.backend)
        .map(|b| (b.build)(config))
        .ok_or_else(|| unknown(ProviderType::User, config))
}

pub fn build_group(config: &ProviderConfig) -> Result<Box<dyn GroupProvider>, SvnHubError> {
    GROUP_BACKENDS
        .iter()
        .find(|b| b.name == config.backend)
        .map(|b| (b.build)(config))
        .ok_or_else(|| unknown(ProviderType::Group, config))
}

pub fn build_association(
    config: &ProviderConfig,
) -> Result<Box<dyn AssociationProvider>, SvnHubError> {
    ASSOCIATION_BACKENDS
        .iter()
        .find(|b| b.name == config.backend)
        .map(|b| (b.build)(config))
        .ok_or_else(|| unknown(ProviderType::UserGroupAssociation, config))
}

pub fn build_repository(
    config: &ProviderConfig,
) -> Result<Box<dyn RepositoryProvider>, SvnHubError> {
    REPOSITORY_BACKENDS
        .iter()
        .find(|b| b.name == config.backend)
        .map(|b| (b.build)(config))
        .ok_or_else(|| unknown(ProviderType::Repository, config))
}
