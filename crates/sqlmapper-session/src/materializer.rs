//! Turning rows into resources.
//!
//! Every row is resolved against the identity map by its key:
//!
//! - a hit without reload returns the cached resource untouched;
//! - a hit with reload overwrites the requested properties from the row;
//! - a miss builds a persisted resource with the requested properties loaded
//!   and registers it.
//!
//! Properties are read by their physical field name. A requested property
//! whose field is not among the row's columns falls back to the column at its
//! position in the requested set, and to NULL when the row is narrower.
//! The row's key identifies the resource even when the key property itself
//! was not requested; in that case the key slot stays unloaded.

use crate::identity_map::IdentityMap;
use sqlmapper_core::error::TypeError;
use sqlmapper_core::{Error, Property, Resource, ResourceRef, Result, Row, Value};
use sqlmapper_query::Query;
use std::sync::Arc;

/// Materializes the rows of one query.
#[derive(Debug)]
pub struct Materializer<'q> {
    query: &'q Query,
}

impl<'q> Materializer<'q> {
    pub fn new(query: &'q Query) -> Self {
        Self { query }
    }

    /// Materialize `rows` in order.
    pub fn materialize(&self, rows: &[Row], map: &mut IdentityMap) -> Result<Vec<ResourceRef>> {
        rows.iter().map(|row| self.materialize_row(row, map)).collect()
    }

    /// Materialize one row through the identity map.
    pub fn materialize_row(&self, row: &Row, map: &mut IdentityMap) -> Result<ResourceRef> {
        let entity = self.query.entity();
        let key = self.key_value(row)?;

        if let Some(cached) = map.get(entity.name(), &key) {
            if self.query.is_reload() {
                tracing::debug!(entity = %entity.name(), key = ?key, "Reloading mapped resource");
                self.apply(row, &cached)?;
            } else {
                tracing::debug!(entity = %entity.name(), key = ?key, "Identity map hit");
            }
            return Ok(cached);
        }

        let mut resource = Resource::persisted(Arc::clone(entity), key.clone());
        self.load_into(row, &mut resource)?;
        let resource = ResourceRef::new(resource);
        map.put(entity.name(), key, resource.clone());
        Ok(resource)
    }

    /// Overwrite the requested properties of `resource` from `row`.
    pub fn apply(&self, row: &Row, resource: &ResourceRef) -> Result<()> {
        let mut guard = resource.write();
        self.load_into(row, &mut guard)
    }

    fn load_into(&self, row: &Row, resource: &mut Resource) -> Result<()> {
        let properties = self.query.entity().properties();
        for (position, &index) in self.query.fields().iter().enumerate() {
            let Some(property) = properties.at(index) else {
                continue;
            };
            let raw = column_value(row, property, position).unwrap_or(Value::Null);
            resource.load_value(index, typecast(property, raw)?);
        }
        Ok(())
    }

    fn key_value(&self, row: &Row) -> Result<Value> {
        let entity = self.query.entity();
        let key = entity.key();

        let position = self
            .query
            .fields()
            .iter()
            .position(|&index| index == entity.key_index());
        let raw = match row.get_by_name(key.field_name()) {
            Some(value) => Some(value.clone()),
            None => position.and_then(|p| row.get(p).cloned()),
        };

        let Some(raw) = raw.filter(|v| !v.is_null()) else {
            tracing::warn!(
                entity = %entity.name(),
                column = %key.field_name(),
                "Row has no key value"
            );
            return Err(Error::Type(TypeError {
                expected: "key",
                actual: "missing".to_string(),
                column: Some(key.field_name().to_string()),
            }));
        };
        typecast(key, raw)
    }
}

fn column_value(row: &Row, property: &Property, position: usize) -> Option<Value> {
    if let Some(value) = row.get_by_name(property.field_name()) {
        return Some(value.clone());
    }
    row.get(position).cloned()
}

fn typecast(property: &Property, value: Value) -> Result<Value> {
    property.kind().typecast(value).map_err(|e| match e {
        Error::Type(mut err) => {
            err.column = Some(property.field_name().to_string());
            Error::Type(err)
        }
        other => other,
    })
}
