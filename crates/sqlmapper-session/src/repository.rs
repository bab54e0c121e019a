//! Named stores and repository scopes.
//!
//! A [`Registry`] maps repository names to store connections. Opening a
//! [`Repository`] from it starts a scope with its own identity map; every
//! finder runs inside a scope, and the identity map is released when the
//! scope is dropped.

use crate::identity_map::IdentityMap;
use sqlmapper_core::error::{ConnectionError, ConnectionErrorKind};
use sqlmapper_core::{Connection, Dialect, Error, ResourceRef, Result, Value};
use sqlmapper_query::DEFAULT_REPOSITORY;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Store connections by repository name.
pub struct Registry<C: Connection> {
    stores: HashMap<String, Arc<C>>,
}

impl<C: Connection> Default for Registry<C> {
    fn default() -> Self {
        Self {
            stores: HashMap::new(),
        }
    }
}

impl<C: Connection> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names();
        names.sort_unstable();
        f.debug_struct("Registry").field("stores", &names).finish()
    }
}

impl<C: Connection> Registry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` under `name`, replacing any earlier store.
    pub fn setup(mut self, name: impl Into<String>, connection: C) -> Self {
        self.register(name, connection);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, connection: C) {
        let name = name.into();
        tracing::debug!(repository = %name, "Registered store");
        self.stores.insert(name, Arc::new(connection));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stores.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.stores.keys().map(String::as_str).collect()
    }

    /// The store behind `name`.
    pub fn connection(&self, name: &str) -> Result<Arc<C>> {
        self.stores.get(name).cloned().ok_or_else(|| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::UnknownRepository,
                message: format!("No store is set up for repository '{}'", name),
                source: None,
            })
        })
    }

    /// Open a scope on the named repository.
    pub fn repository(self: &Arc<Self>, name: &str) -> Result<Repository<C>> {
        let connection = self.connection(name)?;
        tracing::debug!(repository = %name, "Opening repository scope");
        Ok(Repository {
            name: name.to_string(),
            connection,
            registry: Arc::clone(self),
            identity_map: Mutex::new(IdentityMap::new()),
        })
    }

    /// Open a scope on the default repository.
    pub fn default_repository(self: &Arc<Self>) -> Result<Repository<C>> {
        self.repository(DEFAULT_REPOSITORY)
    }
}

/// A scope on one named store.
///
/// Holds the identity map for the resources loaded through it. Finders,
/// `find_by_sql` and persistence live in sibling modules as further `impl`
/// blocks.
pub struct Repository<C: Connection> {
    pub(crate) name: String,
    pub(crate) connection: Arc<C>,
    pub(crate) registry: Arc<Registry<C>>,
    identity_map: Mutex<IdentityMap>,
}

impl<C: Connection> Repository<C> {
    /// Name of the repository this scope is on.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn dialect(&self) -> Dialect {
        self.connection.dialect()
    }

    pub fn registry(&self) -> &Arc<Registry<C>> {
        &self.registry
    }

    /// Lock the scope's identity map. A poisoned lock is recovered.
    pub fn identity_map(&self) -> MutexGuard<'_, IdentityMap> {
        self.identity_map
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The mapped resource for `key`, if this scope holds one.
    pub fn cached(&self, entity: &str, key: &Value) -> Option<ResourceRef> {
        self.identity_map().get(entity, key)
    }

    /// Open a fresh scope on another repository of the same registry.
    pub fn sibling(&self, name: &str) -> Result<Repository<C>> {
        self.registry.repository(name)
    }
}

impl<C: Connection> fmt::Debug for Repository<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("mapped", &self.identity_map().len())
            .finish_non_exhaustive()
    }
}

/// Scopes compare by repository name.
impl<C: Connection> PartialEq for Repository<C> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<C: Connection> Drop for Repository<C> {
    fn drop(&mut self) {
        let map = self
            .identity_map
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(repository = %self.name, mapped = map.len(), "Closing repository scope");
        map.clear();
    }
}
