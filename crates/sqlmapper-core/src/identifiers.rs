//! SQL identifier quoting.

/// Quote a SQL identifier using ANSI double-quoting.
///
/// Embedded double-quotes are escaped by doubling them (`"` → `""`).
///
/// # Examples
///
/// ```
/// use sqlmapper_core::quote_ident;
///
/// assert_eq!(quote_ident("milkshakes"), "\"milkshakes\"");
/// assert_eq!(quote_ident("ml\"name"), "\"ml\"\"name\"");
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a SQL identifier using MySQL backtick quoting.
///
/// ```
/// use sqlmapper_core::quote_ident_mysql;
///
/// assert_eq!(quote_ident_mysql("milkshakes"), "`milkshakes`");
/// assert_eq!(quote_ident_mysql("ml`name"), "`ml``name`");
/// ```
#[inline]
pub fn quote_ident_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
