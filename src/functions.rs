//! # User-Defined SQL Functions
//!
//! Three scalar functions registered on every connection at open:
//!
//! - `new_entity_id()` - mints a v7 UUID as a 16-byte BLOB; the default for
//!   `_entity.external_id`.
//! - `encode_predicate(name, arg0, ...)` - builds the canonical formula
//!   encoding of a ground fact from SQL values, as text. INSTEAD-OF-INSERT
//!   triggers use it to turn row inserts into fact assertions.
//! - `sql_exec(sql)` - executes the given SQL on the same connection and
//!   returns 1; the rule-store trigger uses it to drop a stale session view
//!   from inside trigger context.

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::Connection;
use std::ffi::CString;

use crate::ast::{Formula, Predicate, Term};
use crate::codec;
use crate::entity::EntityId;
use crate::value::SqlValue;

type SqlResult<T> = rusqlite::Result<T>;

/// Register all engine functions on the connection. Installing twice is
/// harmless; later registrations replace earlier ones.
pub fn install(conn: &Connection) -> SqlResult<()> {
    let utf8 = FunctionFlags::SQLITE_UTF8;

    conn.create_scalar_function("new_entity_id", 0, utf8, |_ctx| {
        Ok(EntityId::generate().as_bytes().to_vec())
    })?;

    conn.create_scalar_function(
        "encode_predicate",
        -1,
        utf8 | FunctionFlags::SQLITE_DETERMINISTIC,
        encode_predicate,
    )?;

    // The handle outlives the function: rusqlite drops registered functions
    // when the connection closes.
    let handle = unsafe { conn.handle() } as usize;
    conn.create_scalar_function("sql_exec", 1, utf8, move |ctx| sql_exec(handle, ctx))?;

    Ok(())
}

fn user_error(err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::UserFunctionError(Box::new(err))
}

fn encode_predicate(ctx: &Context) -> SqlResult<String> {
    if ctx.len() == 0 {
        return Err(rusqlite::Error::InvalidParameterCount(0, 1));
    }
    let name = ctx
        .get_raw(0)
        .as_str()
        .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;

    let mut args = Vec::with_capacity(ctx.len() - 1);
    for index in 1..ctx.len() {
        let value = SqlValue::from(ctx.get_raw(index));
        let term: Term = value.to_term().map_err(user_error)?;
        args.push(term);
    }

    let fact = Formula::fact(Predicate::new(name, args));
    codec::encode_to_string(&fact).map_err(user_error)
}

fn sql_exec(handle: usize, ctx: &Context) -> SqlResult<i64> {
    let sql = ctx
        .get_raw(0)
        .as_str()
        .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;
    let sql = CString::new(sql).map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;

    let rc = unsafe {
        rusqlite::ffi::sqlite3_exec(
            handle as *mut rusqlite::ffi::sqlite3,
            sql.as_ptr(),
            None,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
        )
    };
    if rc == rusqlite::ffi::SQLITE_OK {
        Ok(1)
    } else {
        Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rc),
            Some("sql_exec failed".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        install(&conn).unwrap();
        conn
    }

    #[test]
    fn test_new_entity_id_is_16_byte_blob() {
        let conn = connection();
        let (kind, length): (String, i64) = conn
            .query_row(
                "SELECT typeof(new_entity_id()), length(new_entity_id())",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(kind, "blob");
        assert_eq!(length, 16);
    }

    #[test]
    fn test_encode_predicate_builds_fact_encoding() {
        let conn = connection();
        let encoded: String = conn
            .query_row(
                "SELECT encode_predicate('Human', 'Socrates')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(encoded, r#"["@human",{"":"Socrates"}]"#);
    }

    #[test]
    fn test_encode_predicate_promotes_integers() {
        let conn = connection();
        let encoded: String = conn
            .query_row("SELECT encode_predicate('edge', 1, 2)", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(encoded, r#"["@edge",{"":1.0},{"":2.0}]"#);
    }

    #[test]
    fn test_encode_predicate_rejects_null_and_blob() {
        let conn = connection();
        assert!(conn
            .query_row("SELECT encode_predicate('p', NULL)", [], |row| row
                .get::<_, String>(0))
            .is_err());
        assert!(conn
            .query_row("SELECT encode_predicate('p', x'00ff')", [], |row| row
                .get::<_, String>(0))
            .is_err());
    }

    #[test]
    fn test_sql_exec_runs_on_same_connection() {
        let conn = connection();
        let ok: i64 = conn
            .query_row(
                "SELECT sql_exec('CREATE TEMP VIEW probe AS SELECT 1 AS one')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(ok, 1);

        let one: i64 = conn
            .query_row("SELECT one FROM probe", [], |row| row.get(0))
            .unwrap();
        assert_eq!(one, 1);
    }

    #[test]
    fn test_sql_exec_propagates_failure() {
        let conn = connection();
        assert!(conn
            .query_row("SELECT sql_exec('THIS IS NOT SQL')", [], |row| row
                .get::<_, i64>(0))
            .is_err());
    }

    #[test]
    fn test_install_twice() {
        let conn = Connection::open_in_memory().unwrap();
        install(&conn).unwrap();
        install(&conn).unwrap();
    }
}
