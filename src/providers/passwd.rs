//! Read-only user provider backed by an htpasswd-style `name:hash` file.

use crate::core::config::ProviderConfig;
use crate::core::engine::Engine;
use crate::core::error::SvnHubError;
use crate::providers::{ItemList, ProviderBase, ProviderType, User, UserProvider};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug)]
pub struct PasswdUserProvider {
    id: String,
    file: PathBuf,
}

impl PasswdUserProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            file: PathBuf::new(),
        }
    }

    fn read_users(&self) -> Result<Vec<User>, SvnHubError> {
        let content = fs::read_to_string(&self.file)?;
        let mut users = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            // Everything after the first ':' is credential material and
            // stays out of this process.
            let name = line.split(':').next().unwrap_or(line).trim();
            if !name.is_empty() {
                users.push(User {
                    id: name.to_string(),
                    display_name: name.to_string(),
                });
            }
        }
        Ok(users)
    }
}

impl ProviderBase for PasswdUserProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> ProviderType {
        ProviderType::User
    }

    fn initialize(
        &mut self,
        _engine: &Arc<Engine>,
        config: &ProviderConfig,
    ) -> Result<(), SvnHubError> {
        let file = PathBuf::from(config.require_option("file")?);
        if !file.is_file() {
            return Err(SvnHubError::ProviderInit {
                id: self.id.clone(),
                reason: format!("passwd file {} does not exist", file.display()),
            });
        }
        self.file = file;
        Ok(())
    }
}

impl UserProvider for PasswdUserProvider {
    fn users(&self, offset: usize, num: usize) -> Result<ItemList<User>, SvnHubError> {
        Ok(ItemList::paged(self.read_users()?, offset, num))
    }

    fn find_user(&self, id: &str) -> Result<Option<User>, SvnHubError> {
        Ok(self.read_users()?.into_iter().find(|u| u.id == id))
    }
}
