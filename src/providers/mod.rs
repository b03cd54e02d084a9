//! Pluggable backend providers for the four capability types.
//!
//! Each type gets its own trait so the compiler enforces that only
//! repository-shaped operations reach a repository provider. Backends are
//! selected by the symbolic `backend` name in configuration, resolved
//! through the compile-time [`factory`] table and validated at config
//! load.
//!
//! Instances are created lazily by the engine, handed their configuration
//! subtree plus a back-reference to the engine, and cached for the engine's
//! lifetime once their `initialize` hook succeeds.

pub mod authz_group;
pub mod factory;
pub mod local_repo;
pub mod passwd;

use crate::core::authz::AuthzHandle;
use crate::core::config::ProviderConfig;
use crate::core::engine::Engine;
use crate::core::error::SvnHubError;
use crate::svn::SvnEntry;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// The four orthogonal capability types a provider can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProviderType {
    User,
    Group,
    UserGroupAssociation,
    Repository,
}

impl ProviderType {
    pub const ALL: [ProviderType; 4] = [
        ProviderType::User,
        ProviderType::Group,
        ProviderType::UserGroupAssociation,
        ProviderType::Repository,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderType::User => "user",
            ProviderType::Group => "group",
            ProviderType::UserGroupAssociation => "usergroup",
            ProviderType::Repository => "repository",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured provider, enumerated without instantiating its backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDescriptor {
    pub id: String,
    pub type_name: ProviderType,
}

/// One page of a provider listing.
#[derive(Debug, Clone, Serialize)]
pub struct ItemList<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> ItemList<T> {
    /// Page `items` by offset/num, recording whether anything follows.
    pub fn paged(items: Vec<T>, offset: usize, num: usize) -> Self {
        let has_more = items.len() > offset.saturating_add(num);
        let items = items.into_iter().skip(offset).take(num).collect();
        Self { items, has_more }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

/// Options accepted by [`RepositoryProvider::create`].
#[derive(Debug, Clone, Default)]
pub struct RepositoryCreateOptions {
    /// Filesystem type handed to `svnadmin create --fs-type`.
    pub fs_type: Option<String>,
}

/// Behavior common to every provider.
///
/// `initialize` runs exactly once per cached instance; when it fails, the
/// engine discards the instance without caching and the next lookup
/// retries from scratch.
pub trait ProviderBase: Send + Sync + std::fmt::Debug {
    fn id(&self) -> &str;
    fn type_name(&self) -> ProviderType;
    fn initialize(
        &mut self,
        engine: &Arc<Engine>,
        config: &ProviderConfig,
    ) -> Result<(), SvnHubError>;
}

pub trait UserProvider: ProviderBase {
    fn users(&self, offset: usize, num: usize) -> Result<ItemList<User>, SvnHubError>;
    fn find_user(&self, id: &str) -> Result<Option<User>, SvnHubError>;
}

pub trait GroupProvider: ProviderBase {
    fn groups(&self, offset: usize, num: usize) -> Result<ItemList<Group>, SvnHubError>;
    fn find_group(&self, id: &str) -> Result<Option<Group>, SvnHubError>;
}

/// Maps identity-provider users and groups into usergroup membership.
pub trait AssociationProvider: ProviderBase {
    /// Identity-provider ids this associator fronts for user lookups.
    fn for_users(&self) -> &[String];
    /// Identity-provider ids this associator fronts for group lookups.
    fn for_groups(&self) -> &[String];
    fn groups_of_user(&self, user: &str) -> Result<Vec<Group>, SvnHubError>;
    fn users_of_group(&self, group: &str) -> Result<Vec<User>, SvnHubError>;
}

pub trait RepositoryProvider: ProviderBase {
    /// Whether create/delete are supported.
    fn is_editable(&self) -> bool;
    fn repositories(&self, offset: usize, num: usize)
    -> Result<ItemList<Repository>, SvnHubError>;
    fn create(
        &self,
        name: &str,
        options: &RepositoryCreateOptions,
    ) -> Result<Repository, SvnHubError>;
    fn delete(&self, id: &str) -> Result<(), SvnHubError>;
    /// Check repository integrity through the management adapter.
    fn verify(&self, id: &str) -> Result<(), SvnHubError>;
    fn find(&self, id: &str) -> Result<Option<Repository>, SvnHubError>;
    /// The access-control file governing this repository.
    fn authz(&self, id: &str) -> Result<Arc<AuthzHandle>, SvnHubError>;
    /// Metadata from the read adapter (`svn info`).
    fn info(&self, id: &str) -> Result<Option<SvnEntry>, SvnHubError>;
}
