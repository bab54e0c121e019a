//! SQLMapper Rust - data-mapper finders over SQL stores.
//!
//! SQLMapper maps rows of a relational store onto resources described at
//! runtime by an [`EntityType`], providing:
//!
//! - `find(:all | :first | :last | key)` with identity-map short circuits
//! - Dynamic finders: `find_by_<attr>[_and_<attr>...]` and `find_all_by_*`
//! - `find_or_create`
//! - `find_by_sql` with `repository`, `reload` and `properties` options
//! - Partial loads with lazy property fetching
//! - Per-scope identity map: one live resource per key
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlmapper::prelude::*;
//!
//! let smoothie = EntityType::builder("GreenSmoothie")
//!     .serial("id")
//!     .property(Property::string("name"))
//!     .build()?;
//!
//! let conn = SqliteConnection::open_memory()?;
//! auto_migrate(&cx, &conn, &[&smoothie]).await;
//!
//! let registry = Arc::new(Registry::new().setup("default", conn));
//! let repo = registry.default_repository()?;
//!
//! let banana = repo
//!     .find_or_create(&cx, &smoothie, &[("name", "Banana".into())])
//!     .await;
//! let everything = repo.find_by_sql(
//!     &cx,
//!     &smoothie,
//!     Some("SELECT id, name FROM green_smoothies".into()),
//!     SqlOptions::new().reload(true),
//! ).await;
//! ```
//!
//! # Crates
//!
//! - [`sqlmapper_core`]: values, rows, entity types, resources, the `Connection` trait
//! - [`sqlmapper_query`]: query descriptors, SQL builders, dynamic finder parsing
//! - [`sqlmapper_schema`]: table creation and `auto_migrate`
//! - [`sqlmapper_session`]: registry, repository scopes, finders, identity map
//! - [`sqlmapper_sqlite`]: the SQLite store

pub use sqlmapper_core::{
    // asupersync re-exports
    Budget,
    Connection,
    Cx,
    Dialect,
    EntityType,
    Error,
    Outcome,
    Property,
    PropertySet,
    PropertyType,
    RegionId,
    Resource,
    ResourceRef,
    Result,
    Row,
    TaskId,
    Value,
};

pub use sqlmapper_query::{
    Condition, DEFAULT_REPOSITORY, DynamicFinder, PropertySelection, Query, QueryKind, Selection,
    Selector, SqlArgument, SqlOptions,
};

pub use sqlmapper_schema::{auto_migrate, auto_upgrade, create_table, drop_table};

pub use sqlmapper_session::{
    Collection, FindResult, IdentityMap, Materializer, Registry, Repository,
};

pub use sqlmapper_sqlite::{SqliteConfig, SqliteConnection};

/// Everything needed to declare entities and run finders.
pub mod prelude {
    pub use crate::{
        Collection, Connection, Cx, EntityType, Error, FindResult, Outcome, Property,
        PropertySelection, Registry, Repository, ResourceRef, Result, Selector, SqlArgument,
        SqlOptions, SqliteConnection, Value, auto_migrate,
    };
    pub use std::sync::Arc;
}
