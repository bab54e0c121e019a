//! Query execution: `find_by_sql` and the shared load path every finder ends in.

use crate::collection::Collection;
use crate::materializer::Materializer;
use crate::repository::Repository;
use asupersync::{Cx, Outcome};
use sqlmapper_core::{Connection, EntityType, Error, try_outcome, try_result};
use sqlmapper_query::{Query, SelectBuilder, SqlArgument, SqlOptions};
use std::sync::Arc;

impl<C: Connection> Repository<C> {
    /// Run literal SQL and materialize its rows as `entity` resources.
    ///
    /// `argument` is SQL text, a `[sql, bind...]` sequence or a raw query
    /// taken from an earlier collection; `None` is an argument error saying a
    /// query is required. `?` placeholders bind positionally. The result is
    /// always a collection, empty when nothing matched.
    ///
    /// Without a `repository` option the query runs in this scope (a passed
    /// query keeps the repository it carries). Naming another repository
    /// runs it in a fresh scope on that store.
    #[tracing::instrument(level = "debug", skip(self, cx, entity, argument, options), fields(entity = %entity.name(), repository = %self.name))]
    pub async fn find_by_sql(
        &self,
        cx: &Cx,
        entity: &Arc<EntityType>,
        argument: Option<SqlArgument>,
        options: SqlOptions,
    ) -> Outcome<Collection, Error> {
        let carries_repository = matches!(argument, Some(SqlArgument::Query(_)));
        let options = if options.repository.is_none() && !carries_repository {
            options.repository(self.name.clone())
        } else {
            options
        };

        let query = try_result!(Query::from_sql(Arc::clone(entity), argument, options));
        self.execute_query(cx, query).await
    }

    /// Execute a query in the scope its repository names.
    pub async fn execute_query(&self, cx: &Cx, query: Query) -> Outcome<Collection, Error> {
        if query.repository() == self.name {
            return self.load(cx, query).await;
        }
        let scope = try_result!(self.sibling(query.repository()));
        scope.load(cx, query).await
    }

    async fn load(&self, cx: &Cx, query: Query) -> Outcome<Collection, Error> {
        let (sql, params) =
            try_result!(SelectBuilder::new(&query).build_with_dialect(self.dialect()));
        tracing::trace!(sql = %sql, params = ?params, "Executing query");

        let rows = try_outcome!(self.connection.query(cx, &sql, &params).await);

        let resources = {
            let mut map = self.identity_map();
            try_result!(Materializer::new(&query).materialize(&rows, &mut map))
        };
        tracing::debug!(rows = rows.len(), reload = query.is_reload(), "Materialized");
        Outcome::Ok(Collection::new(resources, query, self.name.clone()))
    }
}
