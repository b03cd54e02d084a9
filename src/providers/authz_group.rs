//! Group and association providers backed by the authz file's `[groups]`
//! section.
//!
//! Both resolve their file handle through the engine on every call, so
//! they observe mutations made by any other holder of the same handle.

use crate::core::authz::AuthzHandle;
use crate::core::config::ProviderConfig;
use crate::core::engine::Engine;
use crate::core::error::SvnHubError;
use crate::providers::{
    AssociationProvider, Group, GroupProvider, ItemList, ProviderBase, ProviderType, User,
};
use std::path::PathBuf;
use std::sync::{Arc, Weak};

fn engine_ref(engine: &Weak<Engine>) -> Result<Arc<Engine>, SvnHubError> {
    engine.upgrade().ok_or_else(|| {
        SvnHubError::ValidationError("engine dropped while provider still in use".to_string())
    })
}

fn resolve_handle(
    engine: &Weak<Engine>,
    authz_file: &Option<PathBuf>,
) -> Result<Arc<AuthzHandle>, SvnHubError> {
    engine_ref(engine)?.authz_file(authz_file.as_deref())
}

/// Read-only group provider: groups are authz group definitions.
#[derive(Debug)]
pub struct AuthzGroupProvider {
    id: String,
    engine: Weak<Engine>,
    authz_file: Option<PathBuf>,
}

impl AuthzGroupProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            engine: Weak::new(),
            authz_file: None,
        }
    }
}

impl ProviderBase for AuthzGroupProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> ProviderType {
        ProviderType::Group
    }

    fn initialize(
        &mut self,
        engine: &Arc<Engine>,
        config: &ProviderConfig,
    ) -> Result<(), SvnHubError> {
        self.engine = Arc::downgrade(engine);
        self.authz_file = config.options.get("authz_file").map(PathBuf::from);
        // Surface a missing or malformed file now rather than on first query.
        resolve_handle(&self.engine, &self.authz_file).map_err(|e| SvnHubError::ProviderInit {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

impl GroupProvider for AuthzGroupProvider {
    fn groups(&self, offset: usize, num: usize) -> Result<ItemList<Group>, SvnHubError> {
        let handle = resolve_handle(&self.engine, &self.authz_file)?;
        let groups = handle.read(|file| {
            file.groups()
                .iter()
                .map(|(name, _)| Group {
                    id: name.clone(),
                    display_name: name.clone(),
                })
                .collect()
        });
        Ok(ItemList::paged(groups, offset, num))
    }

    fn find_group(&self, id: &str) -> Result<Option<Group>, SvnHubError> {
        let handle = resolve_handle(&self.engine, &self.authz_file)?;
        Ok(handle.read(|file| {
            file.members_of(id).map(|_| Group {
                id: id.to_string(),
                display_name: id.to_string(),
            })
        }))
    }
}

/// Associator mapping identity-provider users and groups into authz group
/// membership.
#[derive(Debug)]
pub struct AuthzAssociationProvider {
    id: String,
    engine: Weak<Engine>,
    authz_file: Option<PathBuf>,
    for_users: Vec<String>,
    for_groups: Vec<String>,
}

impl AuthzAssociationProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            engine: Weak::new(),
            authz_file: None,
            for_users: Vec::new(),
            for_groups: Vec::new(),
        }
    }
}

impl ProviderBase for AuthzAssociationProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> ProviderType {
        ProviderType::UserGroupAssociation
    }

    fn initialize(
        &mut self,
        engine: &Arc<Engine>,
        config: &ProviderConfig,
    ) -> Result<(), SvnHubError> {
        self.engine = Arc::downgrade(engine);
        self.authz_file = config.options.get("authz_file").map(PathBuf::from);
        self.for_users = config.for_users.clone();
        self.for_groups = config.for_groups.clone();
        resolve_handle(&self.engine, &self.authz_file).map_err(|e| SvnHubError::ProviderInit {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

impl AssociationProvider for AuthzAssociationProvider {
    fn for_users(&self) -> &[String] {
        &self.for_users
    }

    fn for_groups(&self) -> &[String] {
        &self.for_groups
    }

    fn groups_of_user(&self, user: &str) -> Result<Vec<Group>, SvnHubError> {
        let handle = resolve_handle(&self.engine, &self.authz_file)?;
        Ok(handle.read(|file| {
            file.groups()
                .iter()
                .filter(|(_, members)| members.iter().any(|m| m == user))
                .map(|(name, _)| Group {
                    id: name.clone(),
                    display_name: name.clone(),
                })
                .collect()
        }))
    }

    fn users_of_group(&self, group: &str) -> Result<Vec<User>, SvnHubError> {
        let handle = resolve_handle(&self.engine, &self.authz_file)?;
        Ok(handle.read(|file| {
            file.members_of(group)
                .unwrap_or_default()
                .iter()
                // Nested `@group` references are memberships of groups,
                // not of users.
                .filter(|m| !m.starts_with('@'))
                .map(|m| User {
                    id: m.clone(),
                    display_name: m.clone(),
                })
                .collect()
        }))
    }
}
