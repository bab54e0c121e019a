//! Identity Map: one live resource per (entity, key) within a repository scope.
//!
//! The map hands out [`ResourceRef`] clones, so two finders that hit the same
//! row within one scope return the same instance, and changes made through
//! one handle are visible through the other.
//!
//! Entries live as long as the scope. They are replaced only through
//! [`IdentityMap::put`] or dropped through [`IdentityMap::remove`] and
//! [`IdentityMap::clear`]; destroying a resource leaves its entry in place.
//!
//! # Example
//!
//! ```ignore
//! let mut map = IdentityMap::new();
//! let smoothie = map.get_or_insert(resource)?;
//! let again = map.get("GreenSmoothie", &Value::BigInt(1)).unwrap();
//! assert!(smoothie.ptr_eq(&again));
//! ```

use sqlmapper_core::{Error, ResourceRef, Result, Value};
use std::collections::HashMap;

/// Hash a key value.
///
/// Integers hash by their `i64` value whatever width the store reported them at.
fn hash_key(value: &Value) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hasher;

    let mut hasher = DefaultHasher::new();
    hash_single_value(value, &mut hasher);
    hasher.finish()
}

fn hash_single_value(v: &Value, hasher: &mut impl std::hash::Hasher) {
    use std::hash::Hash;

    match v {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Int(i) => {
            2u8.hash(hasher);
            i64::from(*i).hash(hasher);
        }
        Value::BigInt(i) => {
            2u8.hash(hasher);
            i.hash(hasher);
        }
        Value::Double(f) => {
            3u8.hash(hasher);
            f.to_bits().hash(hasher);
        }
        Value::Decimal(s) => {
            4u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Text(s) => {
            5u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Bytes(b) => {
            6u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Json(j) => {
            7u8.hash(hasher);
            j.to_string().hash(hasher);
        }
    }
}

/// Key equality with the same integer folding as [`hash_key`].
fn same_key(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::BigInt(_), Value::Int(_) | Value::BigInt(_)) => {
            a.as_i64() == b.as_i64()
        }
        _ => a == b,
    }
}

#[derive(Debug)]
struct IdentityEntry {
    key: Value,
    resource: ResourceRef,
}

/// Identity map keyed by entity name and key value.
#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: HashMap<(String, u64), Vec<IdentityEntry>>,
}

impl IdentityMap {
    /// Create a new empty identity map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Look up the resource for `key`.
    pub fn get(&self, entity: &str, key: &Value) -> Option<ResourceRef> {
        self.entries
            .get(&(entity.to_string(), hash_key(key)))?
            .iter()
            .find(|entry| same_key(&entry.key, key))
            .map(|entry| entry.resource.clone())
    }

    /// Check if a resource with the given key exists in the map.
    pub fn contains(&self, entity: &str, key: &Value) -> bool {
        self.get(entity, key).is_some()
    }

    /// Register `resource` under `key`, replacing any previous entry.
    ///
    /// Returns the replaced resource.
    pub fn put(&mut self, entity: &str, key: Value, resource: ResourceRef) -> Option<ResourceRef> {
        let bucket = self
            .entries
            .entry((entity.to_string(), hash_key(&key)))
            .or_default();
        if let Some(entry) = bucket.iter_mut().find(|entry| same_key(&entry.key, &key)) {
            return Some(std::mem::replace(&mut entry.resource, resource));
        }
        bucket.push(IdentityEntry { key, resource });
        None
    }

    /// Return the mapped resource for `resource`'s key, registering
    /// `resource` first when there is none.
    ///
    /// The resource must have a key.
    pub fn get_or_insert(&mut self, resource: ResourceRef) -> Result<ResourceRef> {
        let entity = resource.entity();
        let key = resource.key().ok_or_else(|| {
            Error::argument(format!(
                "cannot map a {} without a key",
                entity.name()
            ))
        })?;

        if let Some(existing) = self.get(entity.name(), &key) {
            return Ok(existing);
        }
        self.put(entity.name(), key, resource.clone());
        Ok(resource)
    }

    /// Every mapped resource of `entity`, in no particular order.
    pub fn resources_of(&self, entity: &str) -> Vec<ResourceRef> {
        self.entries
            .iter()
            .filter(|((name, _), _)| name == entity)
            .flat_map(|(_, bucket)| bucket.iter().map(|entry| entry.resource.clone()))
            .collect()
    }

    /// Remove the resource for `key`.
    ///
    /// # Returns
    ///
    /// `true` if a resource was removed, `false` if it wasn't in the map.
    pub fn remove(&mut self, entity: &str, key: &Value) -> bool {
        let slot = (entity.to_string(), hash_key(key));
        let Some(bucket) = self.entries.get_mut(&slot) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|entry| !same_key(&entry.key, key));
        let removed = bucket.len() != before;
        if bucket.is_empty() {
            self.entries.remove(&slot);
        }
        removed
    }

    /// Clear all entries from the identity map.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Get the number of entries in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Check if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
