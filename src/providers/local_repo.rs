//! Repository provider for repositories hosted as directories under one
//! parent directory, managed through the `svnadmin` adapter.

use crate::core::authz::AuthzHandle;
use crate::core::config::ProviderConfig;
use crate::core::engine::Engine;
use crate::core::error::SvnHubError;
use crate::providers::{
    ItemList, ProviderBase, ProviderType, Repository, RepositoryCreateOptions, RepositoryProvider,
};
use crate::svn::SvnEntry;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

#[derive(Debug)]
pub struct LocalRepositoryProvider {
    id: String,
    engine: Weak<Engine>,
    parent_dir: PathBuf,
}

impl LocalRepositoryProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            engine: Weak::new(),
            parent_dir: PathBuf::new(),
        }
    }

    fn engine(&self) -> Result<Arc<Engine>, SvnHubError> {
        self.engine.upgrade().ok_or_else(|| {
            SvnHubError::ValidationError(
                "engine dropped while provider still in use".to_string(),
            )
        })
    }

    /// Repository ids are directory names; reject anything that could
    /// escape the parent directory.
    fn checked_name(&self, name: &str) -> Result<String, SvnHubError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(SvnHubError::ValidationError(format!(
                "invalid repository name '{name}'"
            )));
        }
        Ok(name.to_string())
    }

    fn repository_names(&self) -> Result<Vec<String>, SvnHubError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.parent_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn repository_record(name: String) -> Repository {
        Repository {
            id: name.clone(),
            display_name: name.clone(),
            name,
        }
    }
}

impl ProviderBase for LocalRepositoryProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> ProviderType {
        ProviderType::Repository
    }

    fn initialize(
        &mut self,
        engine: &Arc<Engine>,
        config: &ProviderConfig,
    ) -> Result<(), SvnHubError> {
        self.engine = Arc::downgrade(engine);
        let parent_dir = PathBuf::from(config.require_option("parent_dir")?);
        if !parent_dir.is_dir() {
            return Err(SvnHubError::ProviderInit {
                id: self.id.clone(),
                reason: format!("parent_dir {} is not a directory", parent_dir.display()),
            });
        }
        self.parent_dir = parent_dir;
        Ok(())
    }
}

impl RepositoryProvider for LocalRepositoryProvider {
    fn is_editable(&self) -> bool {
        true
    }

    fn repositories(
        &self,
        offset: usize,
        num: usize,
    ) -> Result<ItemList<Repository>, SvnHubError> {
        let repos = self
            .repository_names()?
            .into_iter()
            .map(Self::repository_record)
            .collect();
        Ok(ItemList::paged(repos, offset, num))
    }

    fn create(
        &self,
        name: &str,
        options: &RepositoryCreateOptions,
    ) -> Result<Repository, SvnHubError> {
        let name = self.checked_name(name)?;
        let repo_path = self.parent_dir.join(&name);
        if repo_path.exists() {
            return Err(SvnHubError::ValidationError(format!(
                "repository '{name}' already exists"
            )));
        }
        self.engine()?
            .svn_admin()?
            .create(&repo_path, options.fs_type.as_deref())?;
        Ok(Self::repository_record(name))
    }

    fn delete(&self, id: &str) -> Result<(), SvnHubError> {
        let name = self.checked_name(id)?;
        let repo_path = self.parent_dir.join(&name);
        if !repo_path.is_dir() {
            return Err(SvnHubError::NotFound(format!("repository '{name}'")));
        }
        fs::remove_dir_all(&repo_path)?;
        Ok(())
    }

    fn verify(&self, id: &str) -> Result<(), SvnHubError> {
        let name = self.checked_name(id)?;
        let repo_path = self.parent_dir.join(&name);
        if !repo_path.is_dir() {
            return Err(SvnHubError::NotFound(format!("repository '{name}'")));
        }
        self.engine()?.svn_admin()?.verify(&repo_path)?;
        Ok(())
    }

    fn find(&self, id: &str) -> Result<Option<Repository>, SvnHubError> {
        let name = self.checked_name(id)?;
        if self.parent_dir.join(&name).is_dir() {
            Ok(Some(Self::repository_record(name)))
        } else {
            Ok(None)
        }
    }

    fn authz(&self, _id: &str) -> Result<Arc<AuthzHandle>, SvnHubError> {
        self.engine()?.authz_file(None)
    }

    fn info(&self, id: &str) -> Result<Option<SvnEntry>, SvnHubError> {
        let name = self.checked_name(id)?;
        Ok(self.engine()?.svn_client()?.info(&name)?)
    }
}
