//! # SQL Value System
//!
//! Rows coming back from the engine are dynamically typed; a tagged sum is
//! the honest interface. [`SqlValue`] mirrors the engine's storage classes
//! (null, integer, real, text, blob) and [`Row`] maps column names to
//! values. Conversions to and from [`Term`] implement the boundary rules:
//! integers promote to numbers, booleans ride 0/1, and NULL and BLOB have no
//! term counterpart.

use std::fmt;
use std::sync::Arc;

use rusqlite::types::{ToSqlOutput, Value as EngineValue, ValueRef};
use rusqlite::ToSql;

use crate::ast::Term;
use crate::error::{Error, Result};

/// A single dynamically-typed SQL value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// The storage-class name, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "NULL",
            SqlValue::Integer(_) => "INTEGER",
            SqlValue::Real(_) => "REAL",
            SqlValue::Text(_) => "TEXT",
            SqlValue::Blob(_) => "BLOB",
        }
    }

    /// Convert to a constant term. NULL and BLOB are rejected; NaN reals are
    /// rejected because formulas never carry them.
    pub fn to_term(&self) -> Result<Term> {
        match self {
            SqlValue::Text(s) => Ok(Term::Text(s.clone())),
            SqlValue::Integer(i) => Ok(Term::Number(*i as f64)),
            SqlValue::Real(f) if f.is_finite() => Ok(Term::Number(*f)),
            SqlValue::Real(_) => Err(Error::UnsupportedTermType("non-finite REAL")),
            SqlValue::Null | SqlValue::Blob(_) => {
                Err(Error::UnsupportedTermType(self.type_name()))
            }
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(i) => write!(f, "{i}"),
            SqlValue::Real(r) => write!(f, "{r}"),
            SqlValue::Text(s) => write!(f, "{s}"),
            SqlValue::Blob(b) => write!(f, "x'{}'", hex(b)),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(s) => SqlValue::Text(String::from_utf8_lossy(s).into_owned()),
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(EngineValue::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(EngineValue::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(EngineValue::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<&Term> for SqlValue {
    /// Constants map onto engine values; variables have no SQL counterpart
    /// and must not reach this conversion (bindings are resolved earlier).
    fn from(term: &Term) -> Self {
        match term {
            Term::Text(s) => SqlValue::Text(s.clone()),
            Term::Number(n) => SqlValue::Real(*n),
            Term::Boolean(b) => SqlValue::Integer(i64::from(*b)),
            Term::Variable(_) => SqlValue::Null,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        SqlValue::Real(f)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Integer(i64::from(b))
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(b: Vec<u8>) -> Self {
        SqlValue::Blob(b)
    }
}

// ============================================================================
// Rows
// ============================================================================

/// One result row: column names shared across the cursor, values owned.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub(crate) fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Row { columns, values }
    }

    /// The column names, in select-list order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Look a value up by column name
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|name| name == column)
            .map(|index| &self.values[index])
    }

    /// Look a value up by position
    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Iterate `(column, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// The number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the row has no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
