//! # Rule Store
//!
//! The persistent catalog: `_entity` mints identities, `_predicate` records
//! declared predicates with their column lists, `_rule` holds every asserted
//! formula in canonical JSONB encoding. Generated columns project the head
//! tag and the first two head constants out of the encoding so the compiled
//! SQL's lookups are indexable; `negative_literal_count` separates facts
//! (NULL) from rules (positive).
//!
//! The schema is installed at session open, together with a session-scoped
//! trigger that drops a predicate's view whenever a non-fact rule for it
//! arrives, forcing the next read to rebuild the view with the new rule
//! incorporated.

use rusqlite::{Connection, OptionalExtension};

use crate::ast::Formula;
use crate::codec;
use crate::compiler::ColumnLookup;
use crate::error::{Error, Result};

/// Persistent tables, installed once per database file.
const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS _entity (
        id          INTEGER PRIMARY KEY,
        external_id BLOB NOT NULL DEFAULT (new_entity_id())
    );

    CREATE TABLE IF NOT EXISTS _predicate (
        id           INTEGER PRIMARY KEY REFERENCES _entity(id),
        name         TEXT NOT NULL UNIQUE,
        column_names BLOB
    );

    CREATE TABLE IF NOT EXISTS _rule (
        id      INTEGER PRIMARY KEY REFERENCES _entity(id),
        formula BLOB NOT NULL UNIQUE,
        output_type TEXT COLLATE NOCASE
            GENERATED ALWAYS AS (json_extract(formula, '$[0]')) VIRTUAL,
        arg1_constant
            GENERATED ALWAYS AS (json_extract(formula, '$[1].""')) VIRTUAL,
        arg2_constant
            GENERATED ALWAYS AS (json_extract(formula, '$[2].""')) VIRTUAL,
        negative_literal_count INTEGER
            GENERATED ALWAYS AS (
                CASE WHEN json_type(formula, '$[#-1]') = 'array'
                     THEN json_array_length(formula) - 2
                END
            ) VIRTUAL
    );

    CREATE INDEX IF NOT EXISTS _rule_by_args ON _rule
        (output_type COLLATE NOCASE, negative_literal_count, arg1_constant, arg2_constant);
    CREATE INDEX IF NOT EXISTS _rule_by_args_flipped ON _rule
        (output_type COLLATE NOCASE, negative_literal_count, arg2_constant, arg1_constant);
"#;

/// Session-scoped trigger: a non-fact rule insert invalidates the head
/// predicate's view on this connection.
const SESSION_SCHEMA: &str = r#"
    CREATE TEMP TRIGGER IF NOT EXISTS "_rule$invalidate"
    AFTER INSERT ON _rule
    WHEN NEW.negative_literal_count > 0
    BEGIN
        SELECT sql_exec(
            'DROP VIEW IF EXISTS "'
            || replace(substr(NEW.output_type, 2), '"', '""')
            || '"'
        );
    END;
"#;

/// Install the persistent schema and the session trigger. Idempotent.
pub fn install(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    conn.execute_batch(SESSION_SCHEMA)?;
    tracing::debug!("rule store schema installed");
    Ok(())
}

// ============================================================================
// Catalog queries
// ============================================================================

/// The declared column names of a predicate, or None when undeclared.
pub fn predicate_columns(conn: &Connection, name: &str) -> Result<Option<Vec<String>>> {
    let row: Option<String> = conn
        .query_row(
            "SELECT json(column_names) FROM _predicate WHERE name = ?",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    match row {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// All declared predicates with their column lists, name-ordered.
pub fn predicates(conn: &Connection) -> Result<Vec<(String, Vec<String>)>> {
    let mut stmt =
        conn.prepare("SELECT name, json(column_names) FROM _predicate ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (name, columns) = row?;
        out.push((name, serde_json::from_str(&columns)?));
    }
    Ok(out)
}

/// Declare a predicate: mint an entity and record the catalog row, in one
/// transaction. With `if_not_exists`, an already-declared name is a no-op
/// (the transaction rolls back so no entity leaks); without it, a duplicate
/// raises. Returns whether a new catalog row was created.
pub fn declare_predicate(
    conn: &Connection,
    name: &str,
    columns: &[String],
    if_not_exists: bool,
) -> Result<bool> {
    let column_json = serde_json::to_string(columns)?;
    let tx = conn.unchecked_transaction()?;

    tx.execute("INSERT INTO _entity DEFAULT VALUES", [])?;
    let entity = tx.last_insert_rowid();

    let sql = if if_not_exists {
        "INSERT OR IGNORE INTO _predicate (id, name, column_names) VALUES (?, ?, jsonb(?))"
    } else {
        "INSERT INTO _predicate (id, name, column_names) VALUES (?, ?, jsonb(?))"
    };
    let inserted = tx.execute(sql, rusqlite::params![entity, name, column_json])?;

    if inserted == 0 {
        // Duplicate under IF NOT EXISTS: drop the minted entity with the
        // rest of the transaction.
        drop(tx);
        return Ok(false);
    }
    tx.commit()?;
    Ok(true)
}

/// Store a canonical formula: mint an entity, insert the encoding. The unique
/// constraint on `_rule.formula` maps to [`Error::DuplicateAssertion`].
pub fn insert_formula(conn: &Connection, formula: &Formula) -> Result<()> {
    let encoded = codec::encode_to_string(formula)?;
    let tx = conn.unchecked_transaction()?;

    if predicate_columns(&tx, formula.head().name())?.is_none() {
        return Err(Error::UnknownPredicate(formula.head().name().to_string()));
    }

    tx.execute("INSERT INTO _entity DEFAULT VALUES", [])?;
    let entity = tx.last_insert_rowid();

    let inserted = tx.execute(
        "INSERT INTO _rule (id, formula) VALUES (?, jsonb(?))",
        rusqlite::params![entity, encoded],
    );
    match inserted {
        Ok(_) => {
            tx.commit()?;
            Ok(())
        }
        Err(err) if is_formula_conflict(&err) => Err(Error::DuplicateAssertion),
        Err(err) => Err(err.into()),
    }
}

fn is_formula_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
                && message.contains("_rule.formula")
    )
}

/// The stored non-fact rules whose head is `name`, decoded.
pub fn rules_for(conn: &Connection, name: &str) -> Result<Vec<Formula>> {
    let mut stmt = conn.prepare(
        "SELECT json(formula) FROM _rule \
         WHERE output_type = ? AND negative_literal_count IS NOT NULL \
         ORDER BY id",
    )?;
    let rows = stmt.query_map([codec::output_type(name)], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(codec::decode_str(&row?)?);
    }
    Ok(out)
}

/// [`ColumnLookup`] backed by the `_predicate` catalog.
pub struct CatalogLookup<'conn>(pub &'conn Connection);

impl ColumnLookup for CatalogLookup<'_> {
    fn columns(&self, predicate: &str) -> Result<Vec<String>> {
        predicate_columns(self.0, predicate)?
            .ok_or_else(|| Error::UnknownPredicate(predicate.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::FormulaBuilder;
    use crate::functions;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        functions::install(&conn).unwrap();
        install(&conn).unwrap();
        conn
    }

    fn entity_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM _entity", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_install_is_idempotent() {
        let conn = connection();
        install(&conn).unwrap();
    }

    #[test]
    fn test_declare_and_look_up() {
        let conn = connection();
        let created =
            declare_predicate(&conn, "human", &["name".to_string()], false).unwrap();
        assert!(created);

        assert_eq!(
            predicate_columns(&conn, "human").unwrap(),
            Some(vec!["name".to_string()])
        );
        assert_eq!(predicate_columns(&conn, "martian").unwrap(), None);
        assert_eq!(entity_count(&conn), 1);
    }

    #[test]
    fn test_duplicate_declaration_raises() {
        let conn = connection();
        declare_predicate(&conn, "human", &["name".to_string()], false).unwrap();
        assert!(declare_predicate(&conn, "human", &["name".to_string()], false).is_err());
    }

    #[test]
    fn test_if_not_exists_leaks_no_entity() {
        let conn = connection();
        declare_predicate(&conn, "human", &["name".to_string()], false).unwrap();
        let before = entity_count(&conn);

        let created =
            declare_predicate(&conn, "human", &["name".to_string()], true).unwrap();
        assert!(!created);
        assert_eq!(entity_count(&conn), before);
    }

    #[test]
    fn test_fact_generated_columns() {
        let conn = connection();
        declare_predicate(&conn, "human", &["name".to_string()], false).unwrap();
        let fact = FormulaBuilder::head("human").text("Socrates").build();
        insert_formula(&conn, &fact).unwrap();

        let (output_type, arg1, count): (String, String, Option<i64>) = conn
            .query_row(
                "SELECT output_type, arg1_constant, negative_literal_count FROM _rule",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(output_type, "@human");
        assert_eq!(arg1, "Socrates");
        assert_eq!(count, None);
    }

    #[test]
    fn test_rule_generated_columns_and_listing() {
        let conn = connection();
        declare_predicate(&conn, "human", &["name".to_string()], false).unwrap();
        declare_predicate(&conn, "mortal", &["name".to_string()], false).unwrap();

        let x = crate::ast::Variable::fresh();
        let rule = FormulaBuilder::head("mortal")
            .var(x)
            .body("human", |p| p.var(x))
            .build()
            .canonicalize()
            .unwrap();
        insert_formula(&conn, &rule).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT negative_literal_count FROM _rule WHERE output_type = '@mortal'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(count > 0);

        let rules = rules_for(&conn, "mortal").unwrap();
        assert_eq!(rules, vec![rule]);
        assert!(rules_for(&conn, "human").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_assertion() {
        let conn = connection();
        declare_predicate(&conn, "human", &["name".to_string()], false).unwrap();
        let fact = FormulaBuilder::head("human").text("Socrates").build();

        insert_formula(&conn, &fact).unwrap();
        assert!(matches!(
            insert_formula(&conn, &fact),
            Err(Error::DuplicateAssertion)
        ));
    }

    #[test]
    fn test_unknown_predicate_on_insert() {
        let conn = connection();
        let fact = FormulaBuilder::head("ghost").text("Boo").build();
        assert!(matches!(
            insert_formula(&conn, &fact),
            Err(Error::UnknownPredicate(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_external_ids_are_parseable() {
        let conn = connection();
        declare_predicate(&conn, "human", &["name".to_string()], false).unwrap();

        let blob: Vec<u8> = conn
            .query_row("SELECT external_id FROM _entity", [], |row| row.get(0))
            .unwrap();
        let bytes: [u8; 16] = blob.try_into().expect("16-byte external id");
        let id = crate::entity::EntityId::from_bytes(bytes);
        assert!(id.timestamp_ms() > 0);
    }
}
