//! Writing resources: create, save, destroy, and lazy property loading.

use crate::materializer::Materializer;
use crate::repository::Repository;
use asupersync::{Cx, Outcome};
use sqlmapper_core::error::{QueryError, QueryErrorKind};
use sqlmapper_core::{
    Connection, EntityType, Error, Resource, ResourceRef, Value, try_outcome, try_result,
};
use sqlmapper_query::{
    DeleteBuilder, InsertBuilder, PropertySelection, Query, QueryKind, SelectBuilder,
    UpdateBuilder,
};
use std::sync::Arc;

impl<C: Connection> Repository<C> {
    /// Build a resource from `attributes`, save it and return it.
    pub async fn create(
        &self,
        cx: &Cx,
        entity: &Arc<EntityType>,
        attributes: &[(&str, Value)],
    ) -> Outcome<ResourceRef, Error> {
        let resource = try_result!(Resource::with_attributes(
            Arc::clone(entity),
            attributes.iter().map(|(name, value)| (*name, value.clone()))
        ));
        let resource = ResourceRef::new(resource);
        try_outcome!(self.save(cx, &resource).await);
        Outcome::Ok(resource)
    }

    /// INSERT a new resource, or UPDATE the dirty properties of a persisted one.
    ///
    /// A newly inserted resource gets its key and joins the identity map.
    #[tracing::instrument(level = "debug", skip_all, fields(repository = %self.name))]
    pub async fn save(&self, cx: &Cx, resource: &ResourceRef) -> Outcome<(), Error> {
        let (entity, is_new, is_destroyed) = {
            let guard = resource.read();
            (
                Arc::clone(guard.entity()),
                guard.is_new(),
                guard.is_destroyed(),
            )
        };
        if is_destroyed {
            return Outcome::Err(Error::argument(format!(
                "cannot save a destroyed {}",
                entity.name()
            )));
        }

        if !is_new {
            let statement = {
                let guard = resource.read();
                try_result!(UpdateBuilder::new(&guard).build_with_dialect(self.dialect()))
            };
            if let Some((sql, params)) = statement {
                tracing::trace!(sql = %sql, "Updating");
                try_outcome!(self.connection.execute(cx, &sql, &params).await);
            }
            resource.write().mark_saved();
            return Outcome::Ok(());
        }

        let (sql, params) = {
            let guard = resource.read();
            InsertBuilder::new(&guard).build_with_dialect(self.dialect())
        };
        tracing::trace!(sql = %sql, "Inserting");

        let assigned = resource.key();
        let key = match assigned {
            Some(key) => {
                try_outcome!(self.connection.execute(cx, &sql, &params).await);
                key
            }
            None if entity.key().is_serial() => {
                Value::BigInt(try_outcome!(self.connection.insert(cx, &sql, &params).await))
            }
            None => {
                return Outcome::Err(Error::argument(format!(
                    "{} needs a value for key '{}' before it can be saved",
                    entity.name(),
                    entity.key().name()
                )));
            }
        };

        {
            let mut guard = resource.write();
            guard.load_value(entity.key_index(), key.clone());
            guard.mark_saved();
        }
        tracing::debug!(entity = %entity.name(), key = ?key, "Created");
        self.identity_map()
            .put(entity.name(), key, resource.clone());
        Outcome::Ok(())
    }

    /// DELETE a persisted resource.
    ///
    /// Returns whether a row was removed. The identity map entry stays.
    #[tracing::instrument(level = "debug", skip_all, fields(repository = %self.name))]
    pub async fn destroy(&self, cx: &Cx, resource: &ResourceRef) -> Outcome<bool, Error> {
        let (sql, params) = {
            let guard = resource.read();
            if guard.is_new() || guard.is_destroyed() {
                return Outcome::Ok(false);
            }
            try_result!(DeleteBuilder::Resource(&*guard).build_with_dialect(self.dialect()))
        };
        let deleted = try_outcome!(self.connection.execute(cx, &sql, &params).await);
        resource.write().mark_destroyed();
        Outcome::Ok(deleted > 0)
    }

    /// DELETE every row of `entity`, returning the number removed.
    ///
    /// Mapped resources of `entity` are marked destroyed and stay mapped.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = %entity.name(), repository = %self.name))]
    pub async fn destroy_all(&self, cx: &Cx, entity: &Arc<EntityType>) -> Outcome<u64, Error> {
        let (sql, params) =
            try_result!(DeleteBuilder::All(entity.as_ref()).build_with_dialect(self.dialect()));
        let deleted = try_outcome!(self.connection.execute(cx, &sql, &params).await);
        let mapped = self.identity_map().resources_of(entity.name());
        for resource in &mapped {
            resource.write().mark_destroyed();
        }
        tracing::debug!(deleted, mapped = mapped.len(), "Destroyed all");
        Outcome::Ok(deleted)
    }

    /// Fetch the named properties of a persisted resource and mark them loaded.
    #[tracing::instrument(level = "debug", skip(self, cx, resource), fields(repository = %self.name))]
    pub async fn load_properties(
        &self,
        cx: &Cx,
        resource: &ResourceRef,
        names: &[&str],
    ) -> Outcome<(), Error> {
        let (entity, key) = {
            let guard = resource.read();
            let entity = Arc::clone(guard.entity());
            match guard.key() {
                Some(key) if !guard.is_new() => (entity, key.clone()),
                _ => {
                    return Outcome::Err(Error::argument(format!(
                        "cannot load properties of an unsaved {}",
                        entity.name()
                    )));
                }
            }
        };

        let fields = try_result!(PropertySelection::from(names.to_vec()).resolve(&entity));
        let query = Query::new(Arc::clone(&entity), QueryKind::PrimaryKey(key.clone()))
            .with_fields(fields)
            .with_repository(self.name.clone());
        let (sql, params) =
            try_result!(SelectBuilder::new(&query).build_with_dialect(self.dialect()));

        let row = try_outcome!(self.connection.query_one(cx, &sql, &params).await);
        let Some(row) = row else {
            return Outcome::Err(Error::Query(QueryError {
                kind: QueryErrorKind::NotFound,
                sql: Some(sql),
                message: format!("{} with key {:?} no longer exists", entity.name(), key),
                source: None,
            }));
        };
        try_result!(Materializer::new(&query).apply(&row, resource));
        Outcome::Ok(())
    }
}
