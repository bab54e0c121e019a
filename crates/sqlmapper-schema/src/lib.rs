//! Table creation support for SQLMapper entities.
//!
//! This crate provides:
//! - CREATE TABLE / DROP TABLE generation for SQLite, MySQL, PostgreSQL
//! - `auto_migrate`: drop and recreate the tables of a set of entities
//! - `auto_upgrade`: create whichever of those tables are missing

pub mod create;

pub use create::{CreateTable, DropTable};

use asupersync::{Cx, Outcome};
use sqlmapper_core::{Connection, EntityType, try_outcome};

/// Create the table for an entity.
pub async fn create_table<C: Connection>(
    cx: &Cx,
    conn: &C,
    entity: &EntityType,
    if_not_exists: bool,
) -> Outcome<(), sqlmapper_core::Error> {
    let mut builder = CreateTable::new(entity);
    if if_not_exists {
        builder = builder.if_not_exists();
    }
    let sql = builder.build(conn.dialect());
    tracing::debug!(entity = %entity.name(), sql = %sql, "Creating table");
    conn.execute(cx, &sql, &[]).await.map(|_| ())
}

/// Drop the table for an entity.
pub async fn drop_table<C: Connection>(
    cx: &Cx,
    conn: &C,
    entity: &EntityType,
    if_exists: bool,
) -> Outcome<(), sqlmapper_core::Error> {
    let mut builder = DropTable::new(entity);
    if if_exists {
        builder = builder.if_exists();
    }
    let sql = builder.build(conn.dialect());
    tracing::debug!(entity = %entity.name(), sql = %sql, "Dropping table");
    conn.execute(cx, &sql, &[]).await.map(|_| ())
}

/// Drop and recreate the tables of `entities`, discarding their rows.
pub async fn auto_migrate<C: Connection>(
    cx: &Cx,
    conn: &C,
    entities: &[&EntityType],
) -> Outcome<(), sqlmapper_core::Error> {
    for entity in entities {
        try_outcome!(drop_table(cx, conn, entity, true).await);
        try_outcome!(create_table(cx, conn, entity, false).await);
    }
    tracing::info!(tables = entities.len(), "Auto-migrated");
    Outcome::Ok(())
}

/// Create the tables of `entities` that do not exist yet.
///
/// Existing tables are left as they are, rows included.
pub async fn auto_upgrade<C: Connection>(
    cx: &Cx,
    conn: &C,
    entities: &[&EntityType],
) -> Outcome<(), sqlmapper_core::Error> {
    for entity in entities {
        try_outcome!(create_table(cx, conn, entity, true).await);
    }
    tracing::info!(tables = entities.len(), "Auto-upgraded");
    Outcome::Ok(())
}
