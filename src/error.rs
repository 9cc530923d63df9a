//! Error Types
//!
//! One taxonomy for everything the engine surfaces: symbol-algebra failures,
//! codec failures, catalog misses, cursor parameter mismatches, and errors
//! passed through from the SQL engine.

use thiserror::Error;

/// Errors surfaced by the deductive engine
#[derive(Error, Debug)]
pub enum Error {
    /// Rule head uses variables that never appear in the body
    #[error("unsafe rule: head variables {} are not bound by any body predicate", .0.join(", "))]
    UnsafeVariables(Vec<String>),

    /// Canonicalization overflow: more than 256 distinct variables
    #[error("a formula may use at most 256 distinct variables")]
    TooManyVariables,

    /// Formula cannot be encoded (non-canonical input, non-finite number)
    #[error("cannot encode formula: {0}")]
    Encoding(String),

    /// Stored encoding cannot be decoded back into a formula
    #[error("malformed formula encoding: {0}")]
    Decoding(String),

    /// Assertion or query references a predicate missing from the catalog
    #[error("unknown predicate: {0}")]
    UnknownPredicate(String),

    /// Identical canonical formula already stored
    #[error("assertion already exists in the rule store")]
    DuplicateAssertion,

    /// Formula queries must not carry body predicates
    #[error("only formulas without body predicates can be queried")]
    UnsupportedQuery,

    /// Predicate used with a different arity than it was declared with
    #[error("predicate {predicate} declared with {declared} columns, used with {used} arguments")]
    ArityMismatch {
        predicate: String,
        declared: usize,
        used: usize,
    },

    /// SQL value with no Term counterpart (NULL, BLOB)
    #[error("SQL value of type {0} cannot be used as a term")]
    UnsupportedTermType(&'static str),

    /// DDL used quoted column names
    #[error("quoted column names are not supported in predicate declarations")]
    QuotedColumnNotSupported,

    /// CREATE TABLE form the interceptor cannot express as a predicate
    #[error("unsupported CREATE TABLE statement: {0}")]
    UnsupportedDdl(String),

    /// Cursor was given the wrong number of arguments for its placeholders
    #[error("statement expects {expected} parameters, got {got}")]
    WrongParameterCount { expected: usize, got: usize },

    /// Entity id bytes or text did not parse as a UUID
    #[error("malformed entity id: {0}")]
    MalformedEntityId(String),

    /// SQL engine error
    #[error("SQL engine error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The relation name carried by a missing-relation engine error, if this
    /// is one. SQLite reports an absent view or table during prepare and
    /// execute as `no such table: <name>`.
    pub(crate) fn missing_relation(&self) -> Option<&str> {
        let message = match self {
            Error::Sqlite(rusqlite::Error::SqliteFailure(_, Some(message))) => message,
            _ => return None,
        };
        message.strip_prefix("no such table: ").map(str::trim)
    }
}
