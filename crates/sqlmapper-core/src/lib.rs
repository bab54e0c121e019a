//! Core types and traits for SQLMapper.
//!
//! This crate provides the foundational abstractions the finder layers build on:
//!
//! - `EntityType`, `Property` and `PropertySet` describing mapped entities
//! - `Resource` / `ResourceRef` for in-memory instances with per-property loading
//! - `Connection` trait and `Dialect` for store access
//! - `Outcome` re-export from asupersync for cancel-correct operations
//! - `Cx` context for structured concurrency

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Budget, Cx, Outcome, RegionId, TaskId};

pub mod connection;
pub mod entity;
pub mod error;
pub mod identifiers;
pub mod property;
pub mod resource;
pub mod row;
pub mod types;
pub mod value;

pub use connection::{Connection, Dialect};
pub use entity::{EntityType, EntityTypeBuilder, default_storage_name};
pub use error::{Error, Result};
pub use identifiers::{quote_ident, quote_ident_mysql};
pub use property::{Property, PropertySet};
pub use resource::{Resource, ResourceRef, ResourceState};
pub use row::{ColumnInfo, Row};
pub use types::PropertyType;
pub use value::Value;

/// Unwrap an `Outcome::Ok` or return any other outcome from the enclosing
/// function.
#[macro_export]
macro_rules! try_outcome {
    ($expr:expr) => {
        match $expr {
            $crate::Outcome::Ok(value) => value,
            $crate::Outcome::Err(e) => return $crate::Outcome::Err(e),
            $crate::Outcome::Cancelled(r) => return $crate::Outcome::Cancelled(r),
            $crate::Outcome::Panicked(p) => return $crate::Outcome::Panicked(p),
        }
    };
}

/// Unwrap a `Result::Ok` or return `Outcome::Err` from the enclosing function.
#[macro_export]
macro_rules! try_result {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(e) => return $crate::Outcome::Err(::core::convert::From::from(e)),
        }
    };
}
