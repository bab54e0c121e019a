//! Finder dispatch: `find`, dynamic `find_by_*` / `find_all_by_*` finders
//! and `find_or_create`.

use crate::collection::{Collection, FindResult};
use crate::repository::Repository;
use asupersync::{Cx, Outcome};
use sqlmapper_core::{
    Connection, EntityType, Error, ResourceRef, ResourceState, Result, Value, try_outcome,
    try_result,
};
use sqlmapper_query::{Condition, DynamicFinder, Query, QueryKind, Selection, Selector};
use std::sync::Arc;

impl<C: Connection> Repository<C> {
    /// Resolve a selector.
    ///
    /// `All` yields a collection ordered by key; `First`, `Last` and key
    /// lookups yield at most one resource. An unknown key is `None`, a
    /// missing selector is an argument error. Key lookups are answered from
    /// the identity map when the scope holds the resource and it is still
    /// persisted; anything else goes to the store.
    #[tracing::instrument(level = "debug", skip(self, cx, entity), fields(entity = %entity.name(), repository = %self.name))]
    pub async fn find(
        &self,
        cx: &Cx,
        entity: &Arc<EntityType>,
        selector: Option<Selector>,
    ) -> Outcome<FindResult, Error> {
        let query = try_result!(Query::from_selector(Arc::clone(entity), selector))
            .with_repository(self.name.clone());

        if let QueryKind::PrimaryKey(key) = query.kind() {
            let cached = entity
                .key()
                .kind()
                .typecast(key.clone())
                .ok()
                .and_then(|key| self.cached(entity.name(), &key))
                .filter(|resource| resource.read().state() == ResourceState::Persisted);
            if let Some(resource) = cached {
                tracing::debug!("Key lookup answered by identity map");
                return Outcome::Ok(FindResult::One(Some(resource)));
            }
        }

        self.fetch(cx, query).await
    }

    /// Every resource of `entity`, ordered by key.
    pub async fn all(&self, cx: &Cx, entity: &Arc<EntityType>) -> Outcome<Collection, Error> {
        let query = Query::new(Arc::clone(entity), QueryKind::Symbolic(Selection::All))
            .with_repository(self.name.clone());
        self.execute_query(cx, query).await
    }

    /// The resource with the lowest key.
    pub async fn first(
        &self,
        cx: &Cx,
        entity: &Arc<EntityType>,
    ) -> Outcome<Option<ResourceRef>, Error> {
        self.find(cx, entity, Some(Selector::First))
            .await
            .map(FindResult::into_one)
    }

    /// The resource with the highest key.
    pub async fn last(
        &self,
        cx: &Cx,
        entity: &Arc<EntityType>,
    ) -> Outcome<Option<ResourceRef>, Error> {
        self.find(cx, entity, Some(Selector::Last))
            .await
            .map(FindResult::into_one)
    }

    /// The resource with the given key.
    pub async fn get(
        &self,
        cx: &Cx,
        entity: &Arc<EntityType>,
        key: impl Into<Value>,
    ) -> Outcome<Option<ResourceRef>, Error> {
        self.find(cx, entity, Some(Selector::Key(key.into())))
            .await
            .map(FindResult::into_one)
    }

    /// Dispatch a dynamic finder by method name.
    ///
    /// `find_by_<attrs>` returns the first match, `find_all_by_<attrs>` a
    /// collection; attributes are joined with `_and_` and paired with
    /// `values` in order. Names that do not resolve are no-method errors.
    #[tracing::instrument(level = "debug", skip(self, cx, entity, values), fields(entity = %entity.name(), repository = %self.name))]
    pub async fn find_dynamic(
        &self,
        cx: &Cx,
        entity: &Arc<EntityType>,
        method: &str,
        values: Vec<Value>,
    ) -> Outcome<FindResult, Error> {
        let query = try_result!(self.dynamic_query(entity, method, values));
        self.fetch(cx, query).await
    }

    /// `find_by_<attribute>` with one value.
    pub async fn find_by(
        &self,
        cx: &Cx,
        entity: &Arc<EntityType>,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Outcome<Option<ResourceRef>, Error> {
        let method = format!("find_by_{attribute}");
        let query = try_result!(self.dynamic_query(entity, &method, vec![value.into()]));
        self.execute_query(cx, query)
            .await
            .map(|collection| collection.into_iter().next())
    }

    /// `find_all_by_<attribute>` with one value.
    pub async fn find_all_by(
        &self,
        cx: &Cx,
        entity: &Arc<EntityType>,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Outcome<Collection, Error> {
        let method = format!("find_all_by_{attribute}");
        let query = try_result!(self.dynamic_query(entity, &method, vec![value.into()]));
        self.execute_query(cx, query).await
    }

    /// Return the first resource matching `conditions`, creating one with
    /// exactly those attributes when none exists.
    ///
    /// Lookup and creation are separate round trips; a concurrent writer can
    /// create the same row in between.
    pub async fn find_or_create(
        &self,
        cx: &Cx,
        entity: &Arc<EntityType>,
        conditions: &[(&str, Value)],
    ) -> Outcome<ResourceRef, Error> {
        self.find_or_create_with(cx, entity, conditions, &[]).await
    }

    /// Like [`find_or_create`](Self::find_or_create), adding `extra`
    /// attributes when creating.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = %entity.name(), repository = %self.name))]
    pub async fn find_or_create_with(
        &self,
        cx: &Cx,
        entity: &Arc<EntityType>,
        conditions: &[(&str, Value)],
        extra: &[(&str, Value)],
    ) -> Outcome<ResourceRef, Error> {
        let matches = conditions
            .iter()
            .map(|(name, value)| Condition::new(*name, value.clone()))
            .collect();
        let query = try_result!(Query::attribute_match(
            Arc::clone(entity),
            matches,
            Selection::First
        ))
        .with_repository(self.name.clone());

        let found = try_outcome!(self.execute_query(cx, query).await);
        if let Some(resource) = found.first() {
            return Outcome::Ok(resource.clone());
        }

        tracing::debug!("No match, creating");
        let attributes: Vec<(&str, Value)> = conditions
            .iter()
            .chain(extra)
            .map(|(name, value)| (*name, value.clone()))
            .collect();
        self.create(cx, entity, &attributes).await
    }

    fn dynamic_query(
        &self,
        entity: &Arc<EntityType>,
        method: &str,
        values: Vec<Value>,
    ) -> Result<Query> {
        let finder = DynamicFinder::parse(entity, method)?;
        Ok(finder
            .to_query(Arc::clone(entity), values)?
            .with_repository(self.name.clone()))
    }

    async fn fetch(&self, cx: &Cx, query: Query) -> Outcome<FindResult, Error> {
        let single = query.is_single();
        let collection = try_outcome!(self.execute_query(cx, query).await);
        if single {
            Outcome::Ok(FindResult::One(collection.into_iter().next()))
        } else {
            Outcome::Ok(FindResult::Many(collection))
        }
    }
}
