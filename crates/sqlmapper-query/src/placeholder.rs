//! Positional bind placeholders in literal SQL.
//!
//! Raw SQL is written with `?` placeholders. Before execution each one is
//! rendered in the target dialect's syntax. Placeholders inside string
//! literals, quoted identifiers and comments are left alone.

use sqlmapper_core::{Dialect, Error, Result};

/// Count the positional placeholders in `sql`.
pub fn count_placeholders(sql: &str) -> usize {
    scan(sql, Dialect::Mysql).highest
}

/// Rewrite `?` and `?N` placeholders for `dialect`, checking the number of
/// bind values.
///
/// MySQL only binds by order of appearance, so `?N` is rejected there.
pub fn bind_placeholders(sql: &str, dialect: Dialect, binds: usize) -> Result<String> {
    let Scan {
        sql: rewritten,
        highest: count,
        numbered,
    } = scan(sql, dialect);
    if numbered && dialect == Dialect::Mysql {
        return Err(Error::argument(
            "numbered placeholders (?N) are not supported by MySQL",
        ));
    }
    if count != binds {
        return Err(Error::argument(format!(
            "wrong number of bind values: query has {} placeholder(s), {} given",
            count, binds
        )));
    }
    tracing::trace!(sql = %rewritten, binds, "Bound raw SQL placeholders");
    Ok(rewritten)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

struct Scan {
    sql: String,
    /// Highest position used.
    highest: usize,
    /// Whether any `?N` placeholder was seen.
    numbered: bool,
}

fn scan(sql: &str, dialect: Dialect) -> Scan {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut chars = sql.chars().peekable();
    let mut state = State::Code;
    let mut next_position = 0usize;
    let mut highest = 0usize;
    let mut numbered = false;

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '\'' | '"' | '`' => {
                    state = State::Quoted(c);
                    out.push(c);
                }
                '-' if chars.peek() == Some(&'-') => {
                    state = State::LineComment;
                    out.push(c);
                }
                '/' if chars.peek() == Some(&'*') => {
                    state = State::BlockComment;
                    out.push(c);
                }
                '?' => {
                    let mut digits = String::new();
                    while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                        digits.push(d);
                        chars.next();
                    }
                    let position = match digits.parse::<usize>() {
                        Ok(n) if n > 0 => {
                            numbered = true;
                            n
                        }
                        _ => {
                            next_position += 1;
                            next_position
                        }
                    };
                    highest = highest.max(position);
                    out.push_str(&dialect.placeholder(position));
                }
                _ => out.push(c),
            },
            // A doubled quote closes and immediately reopens, which keeps us inside.
            State::Quoted(quote) => {
                if c == quote {
                    state = State::Code;
                }
                out.push(c);
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                }
                out.push(c);
            }
            State::BlockComment => {
                out.push(c);
                if c == '*' && chars.peek() == Some(&'/') {
                    out.push('/');
                    chars.next();
                    state = State::Code;
                }
            }
        }
    }

    Scan {
        sql: out,
        highest,
        numbered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_per_dialect() {
        let sql = "SELECT id, name FROM green_smoothies WHERE id = ? AND name = ?";
        assert_eq!(
            bind_placeholders(sql, Dialect::Postgres, 2).unwrap(),
            "SELECT id, name FROM green_smoothies WHERE id = $1 AND name = $2"
        );
        assert_eq!(
            bind_placeholders(sql, Dialect::Sqlite, 2).unwrap(),
            "SELECT id, name FROM green_smoothies WHERE id = ?1 AND name = ?2"
        );
        assert_eq!(bind_placeholders(sql, Dialect::Mysql, 2).unwrap(), sql);
    }

    #[test]
    fn test_quoted_question_marks_ignored() {
        let sql = "SELECT * FROM t WHERE a = '?' AND \"b?\" = ? -- why?\n AND c = 'it''s ?'";
        assert_eq!(count_placeholders(sql), 1);
        assert_eq!(
            bind_placeholders(sql, Dialect::Postgres, 1).unwrap(),
            "SELECT * FROM t WHERE a = '?' AND \"b?\" = $1 -- why?\n AND c = 'it''s ?'"
        );
    }

    #[test]
    fn test_block_comment_ignored() {
        assert_eq!(count_placeholders("SELECT /* ? */ 1 WHERE x = ?"), 1);
    }

    #[test]
    fn test_numbered_placeholders() {
        let sql = "SELECT * FROM t WHERE a = ?2 OR b = ?1";
        assert_eq!(count_placeholders(sql), 2);
        assert_eq!(
            bind_placeholders(sql, Dialect::Postgres, 2).unwrap(),
            "SELECT * FROM t WHERE a = $2 OR b = $1"
        );
        let err = bind_placeholders(sql, Dialect::Mysql, 2).unwrap_err();
        assert!(err.is_argument_error());
        assert!(bind_placeholders("SELECT * FROM t WHERE a = ?", Dialect::Mysql, 1).is_ok());
    }

    #[test]
    fn test_bind_count_mismatch() {
        let err = bind_placeholders("SELECT * FROM t WHERE id = ?", Dialect::Sqlite, 0).unwrap_err();
        assert!(err.is_argument_error());
        let err = bind_placeholders("SELECT * FROM t", Dialect::Sqlite, 1).unwrap_err();
        assert!(err.is_argument_error());
    }
}
