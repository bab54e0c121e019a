//! SQLite driver for SQLMapper Rust.
//!
// FFI bindings require unsafe code
#![allow(unsafe_code)]
//!
//! This crate implements the `Connection` trait from sqlmapper-core on top of
//! libsqlite3, compiled from the bundled amalgamation.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlmapper_sqlite::SqliteConnection;
//!
//! let conn = SqliteConnection::open_uri("sqlite::memory:")?;
//! conn.execute_raw("CREATE TABLE green_smoothies (id INTEGER PRIMARY KEY, name TEXT)")?;
//! ```
//!
//! # Type Mapping
//!
//! | Value | SQLite storage class |
//! |-------|----------------------|
//! | `Bool` | INTEGER (0/1) |
//! | `Int`, `BigInt` | INTEGER |
//! | `Double` | REAL |
//! | `Decimal`, `Text`, `Json` | TEXT |
//! | `Bytes` | BLOB |
//! | `Null` | NULL |
//!
//! # Thread Safety
//!
//! `SqliteConnection` is both `Send` and `Sync`; the database handle sits
//! behind a mutex.

pub mod connection;
pub mod ffi;
pub mod types;

pub use connection::{OpenFlags, SqliteConfig, SqliteConnection};

/// The linked SQLite library version.
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

/// The linked SQLite library version number.
pub fn sqlite_version_number() -> i32 {
    ffi::version_number()
}
