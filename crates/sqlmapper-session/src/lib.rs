//! Repositories, identity map and finders for SQLMapper Rust.
//!
//! `sqlmapper-session` is the **query-to-object layer**. It resolves finder
//! calls into queries, runs them against a named store and materializes the
//! rows into resources that are unique per key within a repository scope.
//!
//! # Role In The Architecture
//!
//! - **Registry / Repository**: named stores and the scopes opened on them.
//! - **Identity map**: one live resource per (entity, key) inside a scope.
//! - **Finders**: `find`, `find_by_*` / `find_all_by_*`, `find_or_create`.
//! - **Raw SQL**: `find_by_sql` with `repository`, `reload` and `properties` options.
//! - **Materializer**: rows to resources, honoring partial loads and reload.
//! - **Persistence**: `create`, `save`, `destroy`, `destroy_all`, lazy property loads.
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(Registry::new().setup("default", conn));
//! let repo = registry.default_repository()?;
//!
//! let banana = repo.find_or_create(&cx, &smoothie, &[("name", "Banana".into())]).await?;
//! let found = repo.find_by(&cx, &smoothie, "name", "Banana").await?;
//! assert!(found.is_some_and(|r| r.ptr_eq(&banana)));
//! ```

pub mod collection;
pub mod executor;
pub mod finder;
pub mod identity_map;
pub mod materializer;
pub mod persistence;
pub mod repository;

pub use collection::{Collection, FindResult};
pub use identity_map::IdentityMap;
pub use materializer::Materializer;
pub use repository::{Registry, Repository};

#[cfg(test)]
#[allow(clippy::manual_async_fn)] // Mock trait impls must match trait signatures
mod tests {
    use super::*;
    use asupersync::runtime::RuntimeBuilder;
    use asupersync::{Cx, Outcome};
    use sqlmapper_core::{
        Connection, Dialect, EntityType, Error, Property, Row, Value, error::ConnectionErrorKind,
    };
    use sqlmapper_query::{PropertySelection, Selector, SqlArgument, SqlOptions};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct MockState {
        query_calls: usize,
        queries: Vec<(String, Vec<Value>)>,
        executed: Vec<(String, Vec<Value>)>,
        scripted_rows: VecDeque<Vec<Row>>,
        next_id: i64,
    }

    #[derive(Debug, Clone)]
    struct MockConnection {
        state: Arc<Mutex<MockState>>,
    }

    impl MockConnection {
        fn new(state: Arc<Mutex<MockState>>) -> Self {
            Self { state }
        }
    }

    impl Connection for MockConnection {
        fn dialect(&self) -> Dialect {
            Dialect::Sqlite
        }

        fn query(
            &self,
            _cx: &Cx,
            sql: &str,
            params: &[Value],
        ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
            let mut guard = self.state.lock().expect("lock poisoned");
            guard.query_calls += 1;
            guard.queries.push((sql.to_string(), params.to_vec()));
            let rows = guard.scripted_rows.pop_front().unwrap_or_default();
            async move { Outcome::Ok(rows) }
        }

        fn query_one(
            &self,
            cx: &Cx,
            sql: &str,
            params: &[Value],
        ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
            let rows = self.query(cx, sql, params);
            async move { rows.await.map(|rows| rows.into_iter().next()) }
        }

        fn execute(
            &self,
            _cx: &Cx,
            sql: &str,
            params: &[Value],
        ) -> impl Future<Output = Outcome<u64, Error>> + Send {
            let mut guard = self.state.lock().expect("lock poisoned");
            guard.executed.push((sql.to_string(), params.to_vec()));
            async { Outcome::Ok(1) }
        }

        fn insert(
            &self,
            _cx: &Cx,
            sql: &str,
            params: &[Value],
        ) -> impl Future<Output = Outcome<i64, Error>> + Send {
            let mut guard = self.state.lock().expect("lock poisoned");
            guard.executed.push((sql.to_string(), params.to_vec()));
            guard.next_id += 1;
            let id = guard.next_id;
            async move { Outcome::Ok(id) }
        }

        fn ping(&self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
            async { Outcome::Ok(()) }
        }
    }

    fn unwrap_outcome<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> T {
        match outcome {
            Outcome::Ok(v) => v,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    fn expect_err<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> Error {
        match outcome {
            Outcome::Err(e) => e,
            other => panic!("expected an error, got {other:?}"),
        }
    }

    fn smoothie() -> Arc<EntityType> {
        EntityType::builder("GreenSmoothie")
            .serial("id")
            .property(Property::string("name"))
            .build()
            .unwrap()
    }

    fn smoothie_row(id: i32, name: &str) -> Row {
        Row::new(
            vec!["id".into(), "name".into()],
            vec![Value::Int(id), Value::from(name)],
        )
    }

    struct Fixture {
        state: Arc<Mutex<MockState>>,
        registry: Arc<Registry<MockConnection>>,
    }

    fn fixture() -> Fixture {
        let state = Arc::new(Mutex::new(MockState::default()));
        let alternate = Arc::new(Mutex::new(MockState::default()));
        let registry = Registry::new()
            .setup("default", MockConnection::new(Arc::clone(&state)))
            .setup("alternate", MockConnection::new(alternate));
        Fixture {
            state,
            registry: Arc::new(registry),
        }
    }

    impl Fixture {
        fn script(&self, rows: Vec<Row>) {
            self.state
                .lock()
                .expect("lock poisoned")
                .scripted_rows
                .push_back(rows);
        }

        fn query_calls(&self) -> usize {
            self.state.lock().expect("lock poisoned").query_calls
        }

        fn last_query(&self) -> (String, Vec<Value>) {
            self.state
                .lock()
                .expect("lock poisoned")
                .queries
                .last()
                .cloned()
                .expect("a query ran")
        }
    }

    #[test]
    fn test_unknown_repository() {
        let fx = fixture();
        let err = fx.registry.repository("archive").unwrap_err();
        match err {
            Error::Connection(e) => assert_eq!(e.kind, ConnectionErrorKind::UnknownRepository),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(fx.registry.contains("alternate"));
    }

    #[test]
    fn test_find_without_selector_fails_before_the_store() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let fx = fixture();
        let repo = fx.registry.default_repository().unwrap();

        rt.block_on(async {
            let err = expect_err(repo.find(&cx, &smoothie(), None).await);
            assert!(err.is_argument_error());
        });
        assert_eq!(fx.query_calls(), 0);
    }

    #[test]
    fn test_find_selectors_build_ordered_queries() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let fx = fixture();
        let repo = fx.registry.default_repository().unwrap();
        let entity = smoothie();

        rt.block_on(async {
            fx.script(vec![smoothie_row(1, "Banana"), smoothie_row(2, "Kiwi")]);
            let all = unwrap_outcome(repo.find(&cx, &entity, Some(Selector::All)).await)
                .into_collection()
                .expect("a collection");
            assert_eq!(all.len(), 2);
            assert_eq!(
                fx.last_query().0,
                "SELECT \"id\", \"name\" FROM \"green_smoothies\" ORDER BY \"id\" ASC"
            );

            fx.script(vec![smoothie_row(2, "Kiwi")]);
            let last = unwrap_outcome(repo.last(&cx, &entity).await).expect("a resource");
            assert!(last.ptr_eq(all.get(1).expect("second")));
            assert!(fx.last_query().0.ends_with("ORDER BY \"id\" DESC LIMIT 1"));

            let missing = unwrap_outcome(repo.get(&cx, &entity, 0).await);
            assert!(missing.is_none());
            assert_eq!(fx.last_query().1, vec![Value::Int(0)]);
        });
    }

    #[test]
    fn test_key_lookup_uses_identity_map() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let fx = fixture();
        let repo = fx.registry.default_repository().unwrap();
        let entity = smoothie();

        rt.block_on(async {
            let banana = unwrap_outcome(
                repo.create(&cx, &entity, &[("name", Value::from("Banana"))])
                    .await,
            );
            assert_eq!(banana.key(), Some(Value::BigInt(1)));

            let found = unwrap_outcome(repo.get(&cx, &entity, 1_i64).await).expect("cached");
            assert!(found.ptr_eq(&banana));
        });
        assert_eq!(fx.query_calls(), 0);
    }

    #[test]
    fn test_dynamic_finders() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let fx = fixture();
        let repo = fx.registry.default_repository().unwrap();
        let entity = smoothie();

        rt.block_on(async {
            fx.script(vec![smoothie_row(1, "Banana")]);
            let found = unwrap_outcome(repo.find_by(&cx, &entity, "name", "Banana").await);
            assert_eq!(found.and_then(|r| r.get("name")), Some(Value::from("Banana")));
            let (sql, params) = fx.last_query();
            assert_eq!(
                sql,
                "SELECT \"id\", \"name\" FROM \"green_smoothies\" WHERE \"name\" = ?1 ORDER BY \"id\" ASC LIMIT 1"
            );
            assert_eq!(params, vec![Value::from("Banana")]);

            let none = unwrap_outcome(repo.find_all_by(&cx, &entity, "name", "Mango").await);
            assert!(none.is_empty());

            let err = expect_err(repo.find_by(&cx, &entity, "colour", "green").await);
            assert!(err.is_no_method());

            let err = expect_err(
                repo.find_dynamic(&cx, &entity, "find_by_name", Vec::new())
                    .await,
            );
            assert!(err.is_argument_error());
        });
    }

    #[test]
    fn test_find_or_create() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let fx = fixture();
        let repo = fx.registry.default_repository().unwrap();
        let entity = smoothie();

        rt.block_on(async {
            fx.script(vec![smoothie_row(1, "Banana")]);
            let banana = unwrap_outcome(
                repo.find_or_create(&cx, &entity, &[("name", Value::from("Banana"))])
                    .await,
            );
            assert_eq!(banana.key(), Some(Value::BigInt(1)));

            let strawberry = unwrap_outcome(
                repo.find_or_create(&cx, &entity, &[("name", Value::from("Strawberry"))])
                    .await,
            );
            assert!(!strawberry.is_new());
            assert_eq!(strawberry.key(), Some(Value::BigInt(1)));
        });

        let state = fx.state.lock().expect("lock poisoned");
        assert_eq!(state.executed.len(), 1);
        assert_eq!(
            state.executed[0],
            (
                "INSERT INTO \"green_smoothies\" (\"name\") VALUES (?1)".to_string(),
                vec![Value::from("Strawberry")]
            )
        );
    }

    #[test]
    fn test_find_by_sql_options() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let fx = fixture();
        let repo = fx.registry.default_repository().unwrap();
        let entity = smoothie();

        rt.block_on(async {
            fx.script(vec![smoothie_row(1, "Banana")]);
            let found = unwrap_outcome(
                repo.find_by_sql(
                    &cx,
                    &entity,
                    Some(SqlArgument::from((
                        "SELECT id, name FROM green_smoothies WHERE id = ?",
                        vec![Value::BigInt(1)],
                    ))),
                    SqlOptions::new().properties(PropertySelection::from("id")),
                )
                .await,
            );
            assert_eq!(
                fx.last_query(),
                (
                    "SELECT id, name FROM green_smoothies WHERE id = ?1".to_string(),
                    vec![Value::BigInt(1)]
                )
            );
            assert_eq!(found.repository(), "default");
            assert!(!found.query().is_reload());
            let resource = found.first().expect("a resource");
            assert!(resource.is_loaded("id"));
            assert!(!resource.is_loaded("name"));

            let alternate = unwrap_outcome(
                repo.find_by_sql(
                    &cx,
                    &entity,
                    Some(SqlArgument::from("SELECT id, name FROM green_smoothies")),
                    SqlOptions::new().repository("alternate").reload(true),
                )
                .await,
            );
            assert_eq!(alternate.repository(), "alternate");
            assert!(alternate.query().is_reload());
            assert!(alternate.is_empty());
        });
        assert_eq!(fx.query_calls(), 1);
    }

    #[test]
    fn test_find_by_sql_argument_errors() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let fx = fixture();
        let repo = fx.registry.default_repository().unwrap();
        let entity = smoothie();

        rt.block_on(async {
            let err = expect_err(
                repo.find_by_sql(&cx, &entity, None, SqlOptions::new())
                    .await,
            );
            assert!(err.is_argument_error());
            assert!(err.to_string().contains("requires a query"));

            let err = expect_err(
                repo.find_by_sql(
                    &cx,
                    &entity,
                    Some(SqlArgument::Symbol("go".to_string())),
                    SqlOptions::new(),
                )
                .await,
            );
            assert!(err.is_argument_error());

            let err = expect_err(
                repo.find_by_sql(
                    &cx,
                    &entity,
                    Some(SqlArgument::from("SELECT id FROM green_smoothies")),
                    SqlOptions::new().repository("archive"),
                )
                .await,
            );
            assert!(matches!(
                err,
                Error::Connection(ref e) if e.kind == ConnectionErrorKind::UnknownRepository
            ));
        });
        assert_eq!(fx.query_calls(), 0);
    }

    #[test]
    fn test_save_update_destroy_and_lazy_load() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let fx = fixture();
        let repo = fx.registry.default_repository().unwrap();
        let entity = smoothie();

        rt.block_on(async {
            fx.script(vec![Row::new(vec!["id".into()], vec![Value::Int(4)])]);
            let shell = unwrap_outcome(
                repo.find_by_sql(
                    &cx,
                    &entity,
                    Some(SqlArgument::from("SELECT id FROM green_smoothies")),
                    SqlOptions::new().properties(PropertySelection::from("id")),
                )
                .await,
            )
            .into_resources()
            .remove(0);
            assert!(!shell.is_loaded("name"));

            fx.script(vec![smoothie_row(4, "Mango")]);
            unwrap_outcome(repo.load_properties(&cx, &shell, &["name"]).await);
            assert_eq!(shell.get("name"), Some(Value::from("Mango")));

            shell.set("name", "Papaya").unwrap();
            unwrap_outcome(repo.save(&cx, &shell).await);
            assert!(!shell.read().is_dirty());

            assert!(unwrap_outcome(repo.destroy(&cx, &shell).await));
            assert!(shell.read().is_destroyed());
            assert!(repo.cached("GreenSmoothie", &Value::BigInt(4)).is_some());

            let calls = fx.query_calls();
            let gone = unwrap_outcome(repo.get(&cx, &entity, 4_i64).await);
            assert!(gone.is_none());
            assert_eq!(fx.query_calls(), calls + 1);

            let err = expect_err(repo.save(&cx, &shell).await);
            assert!(err.is_argument_error());
        });

        let state = fx.state.lock().expect("lock poisoned");
        assert_eq!(
            state.executed,
            vec![
                (
                    "UPDATE \"green_smoothies\" SET \"name\" = ?1 WHERE \"id\" = ?2".to_string(),
                    vec![Value::from("Papaya"), Value::BigInt(4)]
                ),
                (
                    "DELETE FROM \"green_smoothies\" WHERE \"id\" = ?1".to_string(),
                    vec![Value::BigInt(4)]
                ),
            ]
        );
    }

    #[test]
    fn test_scope_drop_releases_identity_map() {
        let fx = fixture();
        let entity = smoothie();
        let shake = {
            let repo = fx.registry.default_repository().unwrap();
            let resource = sqlmapper_core::ResourceRef::new(sqlmapper_core::Resource::persisted(
                Arc::clone(&entity),
                Value::BigInt(9),
            ));
            repo.identity_map()
                .get_or_insert(resource.clone())
                .unwrap();
            assert_eq!(repo.identity_map().len(), 1);
            resource
        };

        let fresh = fx.registry.default_repository().unwrap();
        assert!(fresh.cached("GreenSmoothie", &Value::BigInt(9)).is_none());
        assert_eq!(shake.key(), Some(Value::BigInt(9)));
    }
}
