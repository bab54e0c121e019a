//! Query descriptors and SQL generation for SQLMapper.
//!
//! `sqlmapper-query` is the **query construction layer**. Every finder call is
//! normalized into a [`Query`] here, and turned into dialect-specific SQL plus
//! parameters by the builders.
//!
//! # Role In The Architecture
//!
//! - **Descriptors**: `Query`, `QueryKind`, `Selection` and `Selector`.
//! - **Raw SQL**: `SqlArgument` / `SqlOptions` normalization and `?` placeholder binding.
//! - **Dynamic finders**: parsing `find_by_*` / `find_all_by_*` names.
//! - **Statements**: SELECT, INSERT, UPDATE and DELETE generation per `Dialect`.
//!
//! Execution happens in `sqlmapper-session` through the `Connection` trait from
//! `sqlmapper-core`.

pub mod builder;
pub mod dynamic;
pub mod options;
pub mod placeholder;
pub mod query;

pub use builder::{DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder};
pub use dynamic::DynamicFinder;
pub use options::{PropertySelection, SqlArgument, SqlOptions};
pub use placeholder::{bind_placeholders, count_placeholders};
pub use query::{Condition, DEFAULT_REPOSITORY, Query, QueryKind, Selection, Selector};
pub use sqlmapper_core::Dialect;
