//! # Session
//!
//! One open connection to the engine, with the rule store installed and the
//! engine functions registered. The session is the client surface: declare
//! predicates through SQL (`CREATE TABLE` is intercepted), assert facts and
//! rules through [`Session::assert`], and read derived knowledge back with
//! [`Session::query`] (SQL) or [`Session::query_formula`] (bindings for a
//! question pattern).
//!
//! All operations serialize on the one connection; rescue - rebuilding a
//! predicate's session view when a statement trips over its absence - is
//! driven from the cursor and lands here.

use std::path::Path;

use rusqlite::Connection;

use crate::ast::{Formula, Term};
use crate::compiler;
use crate::config::Config;
use crate::cursor::Cursor;
use crate::ddl::TableDecl;
use crate::error::{Error, Result};
use crate::functions;
use crate::store::{self, CatalogLookup};
use crate::validator;
use crate::value::SqlValue;
use crate::views;

/// An open deductive database session.
#[derive(Debug)]
pub struct Session {
    conn: Connection,
}

impl Session {
    /// Open (creating if needed) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open the database named by a [`Config`], applying its connection
    /// settings.
    pub fn open_with_config(config: &Config) -> Result<Self> {
        let conn = Connection::open(&config.database.path)?;
        conn.busy_timeout(std::time::Duration::from_millis(
            config.database.busy_timeout_ms,
        ))?;
        if config.database.foreign_keys {
            conn.pragma_update(None, "foreign_keys", true)?;
        }
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        functions::install(&conn)?;
        store::install(&conn)?;
        tracing::debug!("session opened");
        Ok(Session { conn })
    }

    /// Assert a fact or rule.
    ///
    /// The formula is canonicalized, validated for safety, encoded, and
    /// stored transactionally. Re-asserting an identical canonical form is
    /// [`DuplicateAssertion`]; an undeclared head predicate is
    /// [`UnknownPredicate`]. Asserting a non-fact rule drops the head
    /// predicate's session view (via the rule-store trigger) so the next
    /// read rebuilds it with the new rule included.
    ///
    /// [`DuplicateAssertion`]: crate::Error::DuplicateAssertion
    /// [`UnknownPredicate`]: crate::Error::UnknownPredicate
    pub fn assert(&self, formula: &Formula) -> Result<()> {
        let canonical = formula.canonicalize()?;
        validator::validate(&canonical)?;
        store::insert_formula(&self.conn, &canonical)?;
        tracing::debug!(formula = %canonical, "asserted");
        Ok(())
    }

    /// Query with a formula pattern: a bodyless formula whose variables
    /// become result columns (named `A`, `B`, ...) and whose constants
    /// filter. A fully ground pattern yields a single `sat = 1` row when
    /// the tuple is derivable, and no rows otherwise.
    ///
    /// Non-finite numeric constants are rejected here, as the codec rejects
    /// them on the assert path: formulas never carry them, so no stored
    /// tuple could match.
    pub fn query_formula(&self, formula: &Formula) -> Result<Cursor<'_>> {
        let canonical = formula.canonicalize()?;
        for term in canonical.head().args() {
            if let Term::Number(n) = term {
                if !n.is_finite() {
                    return Err(Error::Encoding(format!("non-finite number {n}")));
                }
            }
        }
        let lookup = CatalogLookup(&self.conn);
        let sql = compiler::compile_query(&canonical, &lookup)?;
        Cursor::new(self, sql, Vec::new())
    }

    /// Run (possibly multi-statement) SQL with positional arguments.
    ///
    /// `CREATE TABLE` statements declare predicates instead of creating
    /// tables; reads against a predicate whose session view is missing are
    /// rescued transparently.
    pub fn query(&self, sql: impl Into<String>, args: Vec<SqlValue>) -> Result<Cursor<'_>> {
        Cursor::new(self, sql, args)
    }

    /// Declared predicates with their column lists, name-ordered.
    pub fn predicates(&self) -> Result<Vec<(String, Vec<String>)>> {
        store::predicates(&self.conn)
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Declare a predicate parsed from intercepted DDL: record it in the
    /// catalog and materialize its view and trigger eagerly.
    pub(crate) fn declare(&self, declaration: &TableDecl) -> Result<()> {
        store::declare_predicate(
            &self.conn,
            &declaration.name,
            &declaration.columns,
            declaration.if_not_exists,
        )?;
        views::materialize(&self.conn, &declaration.name)?;
        Ok(())
    }

    /// Rescue a missing relation: when the catalog knows the predicate,
    /// materialize its view and trigger and report recovery.
    pub(crate) fn rescue(&self, name: &str) -> Result<bool> {
        views::materialize(&self.conn, name)
    }
}
