//! SQLite connection implementation.
//!
//! Safe wrappers around SQLite's C API, plus the `Connection` trait
//! implementation the finder layer drives.

// FFI code casts to and from C types
#![allow(clippy::cast_lossless)]
#![allow(clippy::borrow_as_ptr)]
#![allow(clippy::if_not_else)]

use crate::ffi;
use crate::types;
use sqlmapper_core::{
    Connection, Cx, Dialect, Error, Outcome, Row, Value,
    error::{ConnectionError, ConnectionErrorKind, QueryError, QueryErrorKind},
    row::ColumnInfo,
};
use std::ffi::{CStr, CString, c_int};
use std::future::Future;
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const MEMORY_PATH: &str = ":memory:";

/// Configuration for opening SQLite connections.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file, or ":memory:" for an in-memory database.
    pub path: String,
    /// Open flags (read-only, read-write, create, etc.)
    pub flags: OpenFlags,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

/// Flags controlling how the database is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Open for reading and writing.
    pub read_write: bool,
    /// Create the database if it doesn't exist.
    pub create: bool,
    /// Enable URI filename interpretation.
    pub uri: bool,
    /// Open in multi-thread mode.
    pub no_mutex: bool,
    /// Open in serialized mode.
    pub full_mutex: bool,
    /// Enable shared cache mode.
    pub shared_cache: bool,
    /// Disable shared cache mode.
    pub private_cache: bool,
}

impl OpenFlags {
    /// Create flags for read-only access.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access (database must exist).
    pub fn read_write() -> Self {
        Self {
            read_write: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access with creation if needed.
    pub fn create_read_write() -> Self {
        Self {
            read_write: true,
            create: true,
            ..Default::default()
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        let mut flags = 0;

        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        }
        if self.read_write {
            flags |= ffi::SQLITE_OPEN_READWRITE;
        }
        if self.create {
            flags |= ffi::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }
        if self.no_mutex {
            flags |= ffi::SQLITE_OPEN_NOMUTEX;
        }
        if self.full_mutex {
            flags |= ffi::SQLITE_OPEN_FULLMUTEX;
        }
        if self.shared_cache {
            flags |= ffi::SQLITE_OPEN_SHAREDCACHE;
        }
        if self.private_cache {
            flags |= ffi::SQLITE_OPEN_PRIVATECACHE;
        }

        // Default to read-write if no mode specified
        if flags & (ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_READWRITE) == 0 {
            flags |= ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        }

        flags
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: MEMORY_PATH.to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    /// Create a new config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create a new config for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Parse a repository URI.
    ///
    /// Accepted forms are `sqlite::memory:`, `sqlite://<path>` and
    /// `sqlite:<path>`, with `sqlite3` as an alternative scheme.
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        let rest = uri
            .strip_prefix("sqlite3:")
            .or_else(|| uri.strip_prefix("sqlite:"))
            .ok_or_else(|| Error::config(format!("Unsupported repository URI: {uri}")))?;

        let path = rest.strip_prefix("//").unwrap_or(rest);
        if path.is_empty() {
            return Err(Error::config(format!(
                "Repository URI has no database path: {uri}"
            )));
        }
        if path == MEMORY_PATH {
            return Ok(Self::memory());
        }
        Ok(Self::file(path))
    }

    /// Set open flags.
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// Raw database handle, only touched while the connection mutex is held.
struct SqliteInner {
    db: *mut ffi::sqlite3,
}

// SAFETY: every use of the handle goes through the Mutex in SqliteConnection
unsafe impl Send for SqliteInner {}

/// A connection to a SQLite database.
///
/// This is a thread-safe wrapper around a SQLite database handle.
pub struct SqliteConnection {
    inner: Mutex<SqliteInner>,
    path: String,
}

// SqliteConnection is Send + Sync because all access goes through the Mutex
unsafe impl Send for SqliteConnection {}
unsafe impl Sync for SqliteConnection {}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self, Error> {
        let c_path = CString::new(config.path.as_str()).map_err(|_| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: "Invalid path: contains null byte".to_string(),
                source: None,
            })
        })?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let msg = if !db.is_null() {
                // SAFETY: db is valid, errmsg returns a valid C string
                unsafe {
                    let msg = CStr::from_ptr(ffi::sqlite3_errmsg(db))
                        .to_string_lossy()
                        .into_owned();
                    ffi::sqlite3_close(db);
                    msg
                }
            } else {
                ffi::error_string(rc).to_string()
            };

            tracing::warn!(path = %config.path, error = %msg, "Failed to open SQLite database");
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: format!("Failed to open database: {}", msg),
                source: None,
            }));
        }

        if config.busy_timeout_ms > 0 {
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, config.busy_timeout_ms as c_int);
            }
        }

        tracing::debug!(path = %config.path, "Opened SQLite database");
        Ok(Self {
            inner: Mutex::new(SqliteInner { db }),
            path: config.path.clone(),
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, Error> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open a file-based database.
    pub fn open_file(path: impl Into<String>) -> Result<Self, Error> {
        Self::open(&SqliteConfig::file(path))
    }

    /// Open the database a repository URI points at.
    pub fn open_uri(uri: &str) -> Result<Self, Error> {
        Self::open(&SqliteConfig::from_uri(uri)?)
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, SqliteInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute SQL directly without preparing (DDL, multi-statement scripts).
    pub fn execute_raw(&self, sql: &str) -> Result<(), Error> {
        let inner = self.lock();
        let c_sql = CString::new(sql).map_err(|_| null_byte_error(sql))?;

        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_exec(inner.db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg)
        };

        if rc != ffi::SQLITE_OK {
            let msg = if !errmsg.is_null() {
                // SAFETY: errmsg is valid and owned by us until freed
                unsafe {
                    let msg = CStr::from_ptr(errmsg).to_string_lossy().into_owned();
                    ffi::sqlite3_free(errmsg.cast());
                    msg
                }
            } else {
                ffi::error_string(rc).to_string()
            };

            return Err(Error::Query(QueryError {
                kind: error_code_to_kind(rc),
                sql: Some(sql.to_string()),
                message: msg,
                source: None,
            }));
        }

        Ok(())
    }

    /// Get the last insert rowid.
    pub fn last_insert_rowid(&self) -> i64 {
        let inner = self.lock();
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_last_insert_rowid(inner.db) }
    }

    /// Get the number of rows changed by the last statement.
    pub fn changes(&self) -> i32 {
        let inner = self.lock();
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_changes(inner.db) }
    }

    /// Prepare and execute a query, returning all rows.
    pub fn query_sync(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        let inner = self.lock();
        tracing::trace!(sql, params = params.len(), "SQLite query");

        let stmt = prepare_stmt(inner.db, sql)?;
        let result = collect_rows(inner.db, stmt, sql, params);

        // SAFETY: stmt is valid and not used after this point
        unsafe { ffi::sqlite3_finalize(stmt) };
        result
    }

    /// Prepare and execute a statement, returning the number of changed rows.
    pub fn execute_sync(&self, sql: &str, params: &[Value]) -> Result<u64, Error> {
        let inner = self.lock();
        tracing::trace!(sql, params = params.len(), "SQLite execute");

        let stmt = prepare_stmt(inner.db, sql)?;
        let result = bind_params(inner.db, stmt, sql, params).and_then(|()| {
            // SAFETY: stmt is valid
            let rc = unsafe { ffi::sqlite3_step(stmt) };
            match rc {
                ffi::SQLITE_DONE | ffi::SQLITE_ROW => {
                    // SAFETY: db is valid
                    let changes = unsafe { ffi::sqlite3_changes(inner.db) };
                    Ok(u64::try_from(changes).unwrap_or(0))
                }
                _ => Err(step_error(inner.db, sql)),
            }
        });

        // SAFETY: stmt is valid and not used after this point
        unsafe { ffi::sqlite3_finalize(stmt) };
        result
    }

    /// Execute an INSERT and return the generated rowid.
    pub fn insert_sync(&self, sql: &str, params: &[Value]) -> Result<i64, Error> {
        let inner = self.lock();
        tracing::trace!(sql, params = params.len(), "SQLite insert");

        let stmt = prepare_stmt(inner.db, sql)?;
        let result = bind_params(inner.db, stmt, sql, params).and_then(|()| {
            // SAFETY: stmt is valid
            let rc = unsafe { ffi::sqlite3_step(stmt) };
            match rc {
                // SAFETY: db is valid
                ffi::SQLITE_DONE | ffi::SQLITE_ROW => {
                    Ok(unsafe { ffi::sqlite3_last_insert_rowid(inner.db) })
                }
                _ => Err(step_error(inner.db, sql)),
            }
        });

        // SAFETY: stmt is valid and not used after this point
        unsafe { ffi::sqlite3_finalize(stmt) };
        result
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        let inner = self.lock();
        if !inner.db.is_null() {
            // SAFETY: db is valid and never used again
            unsafe {
                ffi::sqlite3_close_v2(inner.db);
            }
        }
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn query(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let result = self.query_sync(sql, params);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn query_one(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        let result = self
            .query_sync(sql, params)
            .map(|rows| rows.into_iter().next());
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let result = self.execute_sync(sql, params);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn insert(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<i64, Error>> + Send {
        let result = self.insert_sync(sql, params);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn ping(&self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        let result = self.query_sync("SELECT 1", &[]).map(|_| ());
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }
}

fn collect_rows(
    db: *mut ffi::sqlite3,
    stmt: *mut ffi::sqlite3_stmt,
    sql: &str,
    params: &[Value],
) -> Result<Vec<Row>, Error> {
    bind_params(db, stmt, sql, params)?;

    // SAFETY: stmt is valid
    let col_count = unsafe { ffi::sqlite3_column_count(stmt) };
    let names: Vec<String> = (0..col_count)
        .map(|i| {
            // SAFETY: i is a valid column index
            unsafe { types::column_name(stmt, i) }.unwrap_or_else(|| format!("col{}", i))
        })
        .collect();
    let columns = Arc::new(ColumnInfo::new(names));

    let mut rows = Vec::new();
    loop {
        // SAFETY: stmt is valid
        let rc = unsafe { ffi::sqlite3_step(stmt) };
        match rc {
            ffi::SQLITE_ROW => {
                let values = (0..col_count)
                    // SAFETY: the statement just returned SQLITE_ROW
                    .map(|i| unsafe { types::read_column(stmt, i) })
                    .collect();
                rows.push(Row::with_columns(Arc::clone(&columns), values));
            }
            ffi::SQLITE_DONE => break,
            _ => return Err(step_error(db, sql)),
        }
    }

    Ok(rows)
}

fn bind_params(
    db: *mut ffi::sqlite3,
    stmt: *mut ffi::sqlite3_stmt,
    sql: &str,
    params: &[Value],
) -> Result<(), Error> {
    for (i, param) in params.iter().enumerate() {
        // SAFETY: stmt is valid and indexes are 1-based
        let rc = unsafe { types::bind_value(stmt, (i + 1) as c_int, param) };
        if rc != ffi::SQLITE_OK {
            return Err(bind_error(db, sql, i + 1));
        }
    }
    Ok(())
}

fn prepare_stmt(db: *mut ffi::sqlite3, sql: &str) -> Result<*mut ffi::sqlite3_stmt, Error> {
    let c_sql = CString::new(sql).map_err(|_| null_byte_error(sql))?;

    let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
    // SAFETY: all pointers are valid
    let rc = unsafe {
        ffi::sqlite3_prepare_v2(
            db,
            c_sql.as_ptr(),
            c_sql.as_bytes().len() as c_int,
            &mut stmt,
            ptr::null_mut(),
        )
    };

    if rc != ffi::SQLITE_OK {
        return Err(prepare_error(db, sql));
    }
    Ok(stmt)
}

fn errmsg(db: *mut ffi::sqlite3) -> String {
    // SAFETY: db is valid and errmsg returns a valid C string
    unsafe {
        CStr::from_ptr(ffi::sqlite3_errmsg(db))
            .to_string_lossy()
            .into_owned()
    }
}

fn null_byte_error(sql: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Syntax,
        sql: Some(sql.to_string()),
        message: "SQL contains null byte".to_string(),
        source: None,
    })
}

fn prepare_error(db: *mut ffi::sqlite3, sql: &str) -> Error {
    // SAFETY: db is valid
    let code = unsafe { ffi::sqlite3_errcode(db) };
    Error::Query(QueryError {
        kind: match code {
            ffi::SQLITE_ERROR => QueryErrorKind::Syntax,
            other => error_code_to_kind(other),
        },
        sql: Some(sql.to_string()),
        message: errmsg(db),
        source: None,
    })
}

fn bind_error(db: *mut ffi::sqlite3, sql: &str, index: usize) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Database,
        sql: Some(sql.to_string()),
        message: format!("Failed to bind parameter {}: {}", index, errmsg(db)),
        source: None,
    })
}

fn step_error(db: *mut ffi::sqlite3, sql: &str) -> Error {
    // SAFETY: db is valid
    let code = unsafe { ffi::sqlite3_errcode(db) };
    let message = errmsg(db);
    tracing::debug!(sql, code, error = %message, "SQLite statement failed");
    Error::Query(QueryError {
        kind: error_code_to_kind(code),
        sql: Some(sql.to_string()),
        message,
        source: None,
    })
}

fn error_code_to_kind(code: c_int) -> QueryErrorKind {
    // Extended codes carry the primary code in the low byte
    match code & 0xff {
        ffi::SQLITE_CONSTRAINT => QueryErrorKind::Constraint,
        ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => QueryErrorKind::Busy,
        ffi::SQLITE_PERM | ffi::SQLITE_READONLY | ffi::SQLITE_AUTH => QueryErrorKind::Permission,
        ffi::SQLITE_TOOBIG => QueryErrorKind::DataTruncation,
        ffi::SQLITE_INTERRUPT | ffi::SQLITE_ABORT => QueryErrorKind::Cancelled,
        ffi::SQLITE_CANTOPEN => QueryErrorKind::NotFound,
        _ => QueryErrorKind::Database,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asupersync::runtime::RuntimeBuilder;

    fn unwrap_outcome<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> T {
        match outcome {
            Outcome::Ok(v) => v,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    fn smoothies() -> SqliteConnection {
        let conn = SqliteConnection::open_memory().unwrap();
        conn.execute_raw(
            "CREATE TABLE green_smoothies (id INTEGER PRIMARY KEY AUTOINCREMENT, name VARCHAR(50))",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_from_uri() {
        assert_eq!(SqliteConfig::from_uri("sqlite::memory:").unwrap().path, ":memory:");
        assert_eq!(SqliteConfig::from_uri("sqlite3::memory:").unwrap().path, ":memory:");
        assert_eq!(
            SqliteConfig::from_uri("sqlite:///tmp/finders.db").unwrap().path,
            "/tmp/finders.db"
        );
        assert_eq!(
            SqliteConfig::from_uri("sqlite3://finders.db").unwrap().path,
            "finders.db"
        );
        assert_eq!(SqliteConfig::from_uri("sqlite:finders.db").unwrap().path, "finders.db");

        assert!(matches!(
            SqliteConfig::from_uri("postgres://localhost/db"),
            Err(Error::Config(_))
        ));
        assert!(matches!(SqliteConfig::from_uri("sqlite:"), Err(Error::Config(_))));
    }

    #[test]
    fn test_open_flags_default_to_read_write_create() {
        let flags = OpenFlags::default().to_sqlite_flags();
        assert_eq!(
            flags,
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
        );
        let ro = OpenFlags::read_only().to_sqlite_flags();
        assert_eq!(ro, ffi::SQLITE_OPEN_READONLY);
    }

    #[test]
    fn test_insert_and_query_sync() {
        let conn = smoothies();
        let id = conn
            .insert_sync(
                "INSERT INTO green_smoothies (name) VALUES (?1)",
                &[Value::from("Banana")],
            )
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(conn.last_insert_rowid(), 1);

        let rows = conn
            .query_sync("SELECT id, name FROM green_smoothies", &[])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_by_name("id"), Some(&Value::Int(1)));
        assert_eq!(
            rows[0].get_by_name("name"),
            Some(&Value::Text("Banana".to_string()))
        );
    }

    #[test]
    fn test_value_classes() {
        let conn = SqliteConnection::open_memory().unwrap();
        let rows = conn
            .query_sync(
                "SELECT ?1 AS b, ?2 AS big, ?3 AS d, ?4 AS blob, ?5 AS nothing, ?6 AS doc",
                &[
                    Value::Bool(true),
                    Value::BigInt(1 << 40),
                    Value::Double(1.5),
                    Value::Bytes(vec![1, 2, 3]),
                    Value::Null,
                    Value::Json(serde_json::json!({"a": 1})),
                ],
            )
            .unwrap();
        let row = &rows[0];
        assert_eq!(row.get_by_name("b"), Some(&Value::Int(1)));
        assert_eq!(row.get_by_name("big"), Some(&Value::BigInt(1 << 40)));
        assert_eq!(row.get_by_name("d"), Some(&Value::Double(1.5)));
        assert_eq!(row.get_by_name("blob"), Some(&Value::Bytes(vec![1, 2, 3])));
        assert_eq!(row.get_by_name("nothing"), Some(&Value::Null));
        assert_eq!(
            row.get_by_name("doc"),
            Some(&Value::Text("{\"a\":1}".to_string()))
        );
    }

    #[test]
    fn test_execute_reports_changes() {
        let conn = smoothies();
        conn.execute_raw("INSERT INTO green_smoothies (name) VALUES ('a'), ('b')")
            .unwrap();
        let changed = conn
            .execute_sync(
                "UPDATE green_smoothies SET name = ?1",
                &[Value::from("c")],
            )
            .unwrap();
        assert_eq!(changed, 2);
        assert_eq!(conn.changes(), 2);
    }

    #[test]
    fn test_errors_carry_kind_and_sql() {
        let conn = smoothies();

        let err = conn.query_sync("SELEC nonsense", &[]).unwrap_err();
        assert!(matches!(
            &err,
            Error::Query(QueryError { kind: QueryErrorKind::Syntax, .. })
        ));
        assert_eq!(err.sql(), Some("SELEC nonsense"));

        conn.execute_raw("CREATE TABLE codes (code TEXT PRIMARY KEY)")
            .unwrap();
        conn.execute_raw("INSERT INTO codes VALUES ('nl')").unwrap();
        let err = conn
            .execute_sync("INSERT INTO codes VALUES (?1)", &[Value::from("nl")])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Query(QueryError { kind: QueryErrorKind::Constraint, .. })
        ));
    }

    #[test]
    fn test_connection_trait() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = smoothies();

        rt.block_on(async {
            assert_eq!(conn.dialect(), Dialect::Sqlite);
            unwrap_outcome(conn.ping(&cx).await);
            assert!(conn.is_valid(&cx).await);

            let id = unwrap_outcome(
                conn.insert(
                    &cx,
                    "INSERT INTO green_smoothies (name) VALUES (?1)",
                    &[Value::from("Kiwi")],
                )
                .await,
            );
            assert_eq!(id, 1);

            let row = unwrap_outcome(
                conn.query_one(
                    &cx,
                    "SELECT name FROM green_smoothies WHERE id = ?1",
                    &[Value::BigInt(id)],
                )
                .await,
            );
            assert_eq!(
                row.and_then(|r| r.get(0).cloned()),
                Some(Value::Text("Kiwi".to_string()))
            );

            let missing = unwrap_outcome(
                conn.query_one(
                    &cx,
                    "SELECT name FROM green_smoothies WHERE id = ?1",
                    &[Value::BigInt(99)],
                )
                .await,
            );
            assert!(missing.is_none());
        });
    }
}
