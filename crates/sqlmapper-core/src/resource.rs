//! In-memory resources: materialized or newly built entity instances.
//!
//! Every property slot is either unloaded or holds a value. Resources read
//! from a store only have the properties that were requested loaded; the
//! rest stay unloaded until fetched explicitly.

use crate::entity::EntityType;
use crate::error::{Error, Result};
use crate::value::Value;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Persistence state of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Built in memory, never saved
    New,
    /// Backed by a row in the store
    Persisted,
    /// Its row has been deleted
    Destroyed,
}

/// An instance of an [`EntityType`].
#[derive(Debug, Clone)]
pub struct Resource {
    entity: Arc<EntityType>,
    values: Vec<Option<Value>>,
    dirty: Vec<bool>,
    state: ResourceState,
    /// Key of the backing row, independent of whether the key slot is loaded.
    identity: Option<Value>,
}

impl Resource {
    /// Create a new, unsaved resource with no properties loaded.
    pub fn new(entity: Arc<EntityType>) -> Self {
        let len = entity.properties().len();
        Self {
            entity,
            values: vec![None; len],
            dirty: vec![false; len],
            state: ResourceState::New,
            identity: None,
        }
    }

    /// Create a new resource and assign the given attributes.
    pub fn with_attributes<'a, I>(entity: Arc<EntityType>, attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut resource = Self::new(entity);
        for (name, value) in attributes {
            resource.set(name, value)?;
        }
        Ok(resource)
    }

    /// Create a persisted resource shell for the given key.
    ///
    /// Nothing is loaded, the key slot included; [`key`](Self::key) still
    /// reports the row's key.
    pub fn persisted(entity: Arc<EntityType>, key: Value) -> Self {
        let mut resource = Self::new(entity);
        resource.identity = Some(key).filter(|k| !k.is_null());
        resource.state = ResourceState::Persisted;
        resource
    }

    pub fn entity(&self) -> &Arc<EntityType> {
        &self.entity
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn is_new(&self) -> bool {
        self.state == ResourceState::New
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == ResourceState::Destroyed
    }

    /// Has any property been assigned since the last save or load?
    pub fn is_dirty(&self) -> bool {
        self.dirty.iter().any(|d| *d)
    }

    /// Assign a property value, marking it loaded and dirty.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let index = self.index_of(name)?;
        let value = value.into();
        if self.values[index].as_ref() != Some(&value) {
            self.dirty[index] = true;
        }
        self.values[index] = Some(value);
        Ok(())
    }

    /// Get a loaded property value.
    ///
    /// Returns `None` when the property is unknown or not loaded.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let index = self.entity.properties().index_of(name)?;
        self.values[index].as_ref()
    }

    /// Get a loaded property value converted to `T`.
    pub fn get_as<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: TryFrom<Value, Error = Error>,
    {
        match self.get(name) {
            Some(Value::Null) | None => Ok(None),
            Some(value) => T::try_from(value.clone()).map(Some),
        }
    }

    /// Is the named property loaded?
    pub fn is_loaded(&self, name: &str) -> bool {
        self.entity
            .properties()
            .index_of(name)
            .is_some_and(|i| self.values[i].is_some())
    }

    /// Logical names of loaded properties, in declaration order.
    pub fn loaded_properties(&self) -> Vec<&str> {
        self.entity
            .properties()
            .iter()
            .zip(&self.values)
            .filter(|(_, v)| v.is_some())
            .map(|(p, _)| p.name())
            .collect()
    }

    /// Logical names of properties assigned since the last save.
    pub fn dirty_properties(&self) -> Vec<&str> {
        self.entity
            .properties()
            .iter()
            .zip(&self.dirty)
            .filter(|(_, d)| **d)
            .map(|(p, _)| p.name())
            .collect()
    }

    /// The key of the backing row, or the assigned key of an unsaved
    /// resource. `None` while neither is known.
    pub fn key(&self) -> Option<&Value> {
        self.identity.as_ref().or_else(|| {
            self.values[self.entity.key_index()]
                .as_ref()
                .filter(|v| !v.is_null())
        })
    }

    /// Loaded (name, value) pairs in declaration order.
    pub fn attributes(&self) -> Vec<(&str, &Value)> {
        self.entity
            .properties()
            .iter()
            .zip(&self.values)
            .filter_map(|(p, v)| v.as_ref().map(|v| (p.name(), v)))
            .collect()
    }

    /// Render loaded attributes as a JSON object keyed by logical name.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .attributes()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    /// Store a value read from the store at a property position.
    ///
    /// The property becomes loaded and clean.
    pub fn load_value(&mut self, index: usize, value: Value) {
        if index < self.values.len() {
            self.values[index] = Some(value);
            self.dirty[index] = false;
        }
    }

    /// Raw slot access by property position.
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Positions and values of dirty properties.
    pub fn dirty_values(&self) -> Vec<(usize, &Value)> {
        self.values
            .iter()
            .zip(&self.dirty)
            .enumerate()
            .filter_map(|(i, (v, d))| match (v, d) {
                (Some(v), true) => Some((i, v)),
                _ => None,
            })
            .collect()
    }

    /// Record a successful INSERT or UPDATE.
    pub fn mark_saved(&mut self) {
        if self.identity.is_none() {
            self.identity = self.values[self.entity.key_index()]
                .clone()
                .filter(|v| !v.is_null());
        }
        self.state = ResourceState::Persisted;
        self.dirty.iter_mut().for_each(|d| *d = false);
    }

    pub fn mark_destroyed(&mut self) {
        self.state = ResourceState::Destroyed;
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.entity.properties().index_of(name).ok_or_else(|| {
            Error::argument(format!(
                "unknown property '{}' for entity {}",
                name,
                self.entity.name()
            ))
        })
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.entity.name() == other.entity.name()
            && self.key().is_some()
            && self.key() == other.key()
            && self.attributes() == other.attributes()
    }
}

/// A shared handle to a resource.
///
/// Clones point at the same instance; this is the unit the identity map
/// hands out.
#[derive(Debug, Clone)]
pub struct ResourceRef(Arc<RwLock<Resource>>);

impl ResourceRef {
    pub fn new(resource: Resource) -> Self {
        Self(Arc::new(RwLock::new(resource)))
    }

    /// Lock for reading. A poisoned lock is recovered.
    pub fn read(&self) -> RwLockReadGuard<'_, Resource> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock for writing. A poisoned lock is recovered.
    pub fn write(&self) -> RwLockWriteGuard<'_, Resource> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Do both handles point at the same instance?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn entity(&self) -> Arc<EntityType> {
        Arc::clone(self.read().entity())
    }

    /// Cloned value of a loaded property.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.read().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.write().set(name, value)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.read().is_loaded(name)
    }

    pub fn key(&self) -> Option<Value> {
        self.read().key().cloned()
    }

    pub fn is_new(&self) -> bool {
        self.read().is_new()
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.read().to_json()
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        *self.read() == *other.read()
    }
}

impl From<Resource> for ResourceRef {
    fn from(resource: Resource) -> Self {
        Self::new(resource)
    }
}
