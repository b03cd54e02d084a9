//! The provider registry and composition root.
//!
//! One [`Engine`] is constructed from configuration at startup and passed
//! explicitly (as an `Arc`) to whoever serves requests; there is no global
//! singleton. The engine owns three caches, all shared mutable state under
//! mutex guard:
//!
//! - provider instances, keyed by (type, id) — one map per type so each
//!   lookup returns the capability trait appropriate to it;
//! - the two toolchain adapters, lazy singletons;
//! - authz file handles, keyed by normalized absolute path so the whole
//!   process shares one in-memory handle per file.
//!
//! Cache population holds the map mutex across construct-and-initialize,
//! which gives the at-most-one-construction guarantee cheaply; contention
//! is administrative traffic, not a hot path. A provider whose
//! `initialize` hook fails is never cached, and neither is the failure —
//! the next lookup retries from configuration.

use crate::core::authz::{self, AuthzFile, AuthzHandle};
use crate::core::config::{EngineConfig, ProviderConfig};
use crate::core::error::SvnHubError;
use crate::providers::{
    AssociationProvider, GroupProvider, ProviderDescriptor, ProviderType, RepositoryProvider,
    UserProvider, factory,
};
use crate::svn::{SvnAdmin, SvnClient};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};
use std::time::Duration;

type ProviderCache<P> = Mutex<HashMap<String, Arc<P>>>;

pub struct Engine {
    config: EngineConfig,
    /// Back-reference handed to providers at initialization so they can
    /// call into the engine for adapters and authz handles.
    self_ref: Weak<Engine>,
    user_providers: ProviderCache<dyn UserProvider>,
    group_providers: ProviderCache<dyn GroupProvider>,
    association_providers: ProviderCache<dyn AssociationProvider>,
    repository_providers: ProviderCache<dyn RepositoryProvider>,
    authz_handles: Mutex<HashMap<PathBuf, Arc<AuthzHandle>>>,
    svn_client: OnceLock<Arc<SvnClient>>,
    svn_admin: OnceLock<Arc<SvnAdmin>>,
}

fn lock<'a, K, V>(cache: &'a Mutex<HashMap<K, V>>) -> MutexGuard<'a, HashMap<K, V>> {
    cache.lock().unwrap_or_else(|e| e.into_inner())
}

impl Engine {
    /// Build the engine from already-validated configuration.
    pub fn new(config: EngineConfig) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            config,
            self_ref: self_ref.clone(),
            user_providers: Mutex::new(HashMap::new()),
            group_providers: Mutex::new(HashMap::new()),
            association_providers: Mutex::new(HashMap::new()),
            repository_providers: Mutex::new(HashMap::new()),
            authz_handles: Mutex::new(HashMap::new()),
            svn_client: OnceLock::new(),
            svn_admin: OnceLock::new(),
        })
    }

    /// Strong reference to self, for handing to provider initialization.
    fn strong_ref(&self) -> Result<Arc<Engine>, SvnHubError> {
        self.self_ref.upgrade().ok_or_else(|| {
            SvnHubError::ValidationError("engine is being torn down".to_string())
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.config.common.tool_timeout_secs)
    }

    /// Every configured provider of `type_name`, in declaration order.
    /// Reads configuration only; instantiates nothing.
    pub fn known_providers(&self, type_name: ProviderType) -> Vec<ProviderDescriptor> {
        self.config
            .provider_entries(type_name)
            .iter()
            .map(|entry| ProviderDescriptor {
                id: entry.id.clone(),
                type_name,
            })
            .collect()
    }

    /// Shared lookup-or-create sequence for all four provider caches.
    ///
    /// The cache mutex is held across `init`, so two concurrent requests
    /// for the same id cannot both construct an instance.
    fn lookup_or_create<P: ?Sized>(
        &self,
        cache: &ProviderCache<P>,
        type_name: ProviderType,
        id: &str,
        init: impl FnOnce(&ProviderConfig) -> Result<Arc<P>, SvnHubError>,
    ) -> Result<Arc<P>, SvnHubError> {
        let mut cache = lock(cache);
        if let Some(provider) = cache.get(id) {
            return Ok(Arc::clone(provider));
        }
        let Some(entry) = self.config.find_provider(type_name, id) else {
            return Err(SvnHubError::UnknownProvider(type_name, id.to_string()));
        };
        let provider = init(entry)?;
        tracing::debug!(%type_name, id, "provider instantiated");
        cache.insert(id.to_string(), Arc::clone(&provider));
        Ok(provider)
    }

    pub fn user_provider(&self, id: &str) -> Result<Arc<dyn UserProvider>, SvnHubError> {
        self.lookup_or_create(&self.user_providers, ProviderType::User, id, |entry| {
            let engine = self.strong_ref()?;
            let mut provider = factory::build_user(entry)?;
            provider.initialize(&engine, entry)?;
            Ok(Arc::from(provider))
        })
    }

    pub fn group_provider(&self, id: &str) -> Result<Arc<dyn GroupProvider>, SvnHubError> {
        self.lookup_or_create(&self.group_providers, ProviderType::Group, id, |entry| {
            let engine = self.strong_ref()?;
            let mut provider = factory::build_group(entry)?;
            provider.initialize(&engine, entry)?;
            Ok(Arc::from(provider))
        })
    }

    pub fn association_provider(
        &self,
        id: &str,
    ) -> Result<Arc<dyn AssociationProvider>, SvnHubError> {
        self.lookup_or_create(
            &self.association_providers,
            ProviderType::UserGroupAssociation,
            id,
            |entry| {
                let engine = self.strong_ref()?;
                let mut provider = factory::build_association(entry)?;
                provider.initialize(&engine, entry)?;
                Ok(Arc::from(provider))
            },
        )
    }

    pub fn repository_provider(
        &self,
        id: &str,
    ) -> Result<Arc<dyn RepositoryProvider>, SvnHubError> {
        self.lookup_or_create(
            &self.repository_providers,
            ProviderType::Repository,
            id,
            |entry| {
                let engine = self.strong_ref()?;
                let mut provider = factory::build_repository(entry)?;
                provider.initialize(&engine, entry)?;
                Ok(Arc::from(provider))
            },
        )
    }

    /// Find the association provider whose list (selected by `pick`) names
    /// `provider_id`. First declared match wins; a second match is logged
    /// but ignored, since configuration authors own uniqueness.
    fn associater_matching(
        &self,
        provider_id: &str,
        pick: fn(&ProviderConfig) -> &[String],
    ) -> Result<Option<Arc<dyn AssociationProvider>>, SvnHubError> {
        let mut matches = self
            .config
            .provider_entries(ProviderType::UserGroupAssociation)
            .iter()
            .filter(|entry| pick(entry).iter().any(|p| p == provider_id));
        let Some(found) = matches.next() else {
            return Ok(None);
        };
        if let Some(shadowed_by) = matches.next() {
            tracing::warn!(
                provider_id,
                winner = %found.id,
                shadowed = %shadowed_by.id,
                "multiple association providers front the same identity provider"
            );
        }
        Ok(Some(self.association_provider(&found.id)?))
    }

    pub fn associater_for_users(
        &self,
        provider_id: &str,
    ) -> Result<Option<Arc<dyn AssociationProvider>>, SvnHubError> {
        self.associater_matching(provider_id, |entry| &entry.for_users)
    }

    pub fn associater_for_groups(
        &self,
        provider_id: &str,
    ) -> Result<Option<Arc<dyn AssociationProvider>>, SvnHubError> {
        self.associater_matching(provider_id, |entry| &entry.for_groups)
    }

    /// Shared handle for the authz file at `path` (default: the configured
    /// one). Loading the same normalized path twice returns the identical
    /// handle; a failed load is returned, not cached.
    pub fn authz_file(&self, path: Option<&Path>) -> Result<Arc<AuthzHandle>, SvnHubError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => self.config.common.authz_file.clone().ok_or_else(|| {
                SvnHubError::ConfigError("no authz_file configured under [common]".to_string())
            })?,
        };
        let normalized = authz::normalize_absolute_path(&path)?;

        let mut handles = lock(&self.authz_handles);
        if let Some(handle) = handles.get(&normalized) {
            return Ok(Arc::clone(handle));
        }
        let file = AuthzFile::load(&normalized)?;
        let handle = Arc::new(AuthzHandle::new(normalized.clone(), file));
        tracing::debug!(path = %normalized.display(), "authz file loaded");
        handles.insert(normalized, Arc::clone(&handle));
        Ok(handle)
    }

    /// Write a handle's current state back to disk. Failure always
    /// propagates: a swallowed commit error would mean an access-control
    /// change silently not applied.
    ///
    /// For mutations prefer [`AuthzHandle::update`], which holds the handle
    /// lock across mutate and write-back; this entry point re-commits the
    /// in-memory state as-is.
    pub fn commit_authz_file(&self, handle: &AuthzHandle) -> Result<(), SvnHubError> {
        handle.commit()
    }

    /// The read adapter, constructed on first use.
    pub fn svn_client(&self) -> Result<Arc<SvnClient>, SvnHubError> {
        let executable = &self.config.common.svn_executable;
        if executable.as_os_str().is_empty() {
            return Err(SvnHubError::ConfigError(
                "svn_executable is not configured".to_string(),
            ));
        }
        let parent_url = self.config.parent_url()?;
        Ok(Arc::clone(self.svn_client.get_or_init(|| {
            Arc::new(SvnClient::new(executable, parent_url, self.tool_timeout()))
        })))
    }

    /// The management adapter, constructed on first use.
    pub fn svn_admin(&self) -> Result<Arc<SvnAdmin>, SvnHubError> {
        let executable = &self.config.common.svnadmin_executable;
        if executable.as_os_str().is_empty() {
            return Err(SvnHubError::ConfigError(
                "svnadmin_executable is not configured".to_string(),
            ));
        }
        Ok(Arc::clone(self.svn_admin.get_or_init(|| {
            Arc::new(SvnAdmin::new(executable, self.tool_timeout()))
        })))
    }
}
