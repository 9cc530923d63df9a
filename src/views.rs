//! # View and Trigger Materializer
//!
//! A predicate is visible to SQL as a session-scoped view over the rule
//! store, paired with an INSTEAD-OF-INSERT trigger that turns row inserts
//! into fact assertions. The view's first arm projects stored facts:
//!
//! ```sql
//! SELECT json_extract(formula, '$[1].""') AS "c0", ...
//! FROM _rule WHERE output_type = '@name' AND negative_literal_count IS NULL
//! ```
//!
//! When the predicate has rules, the view wraps a `WITH RECURSIVE` common
//! table expression unioning the facts arm with each rule's compiled SELECT,
//! non-recursive arms first; body references to the predicate itself read
//! the CTE, so SQLite's recursive CTE evaluation supplies termination.
//!
//! Materialization is idempotent (`IF NOT EXISTS` throughout) and pulls in
//! the body predicates a rule mentions, so a single rescue repairs a whole
//! chain of missing views.

use std::collections::HashSet;

use rusqlite::Connection;

use crate::codec;
use crate::compiler::{self, quote_ident};
use crate::error::Result;
use crate::store::{self, CatalogLookup};

/// Does a view with this name exist in the session's temp schema?
pub fn view_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_temp_master WHERE type = 'view' AND name = ?",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Drop a predicate's session view (its trigger goes with it).
pub fn drop_view(conn: &Connection, name: &str) -> Result<()> {
    conn.execute_batch(&format!("DROP VIEW IF EXISTS {}", quote_ident(name)))?;
    Ok(())
}

/// Materialize the session view and trigger for `name`. Returns false when
/// the predicate is not in the catalog.
pub fn materialize(conn: &Connection, name: &str) -> Result<bool> {
    let mut visiting = HashSet::new();
    ensure(conn, name, &mut visiting)
}

fn ensure(conn: &Connection, name: &str, visiting: &mut HashSet<String>) -> Result<bool> {
    if !visiting.insert(name.to_string()) {
        return Ok(true);
    }

    let Some(columns) = store::predicate_columns(conn, name)? else {
        return Ok(false);
    };
    let rules = store::rules_for(conn, name)?;

    let view_sql = view_definition(conn, name, &columns, &rules)?;
    conn.execute_batch(&view_sql)?;
    conn.execute_batch(&insert_trigger(name, &columns))?;
    tracing::debug!(predicate = name, rules = rules.len(), "materialized session view");

    // A rule's compiled SELECT reads its body predicates' views; make sure
    // they exist so one rescue repairs the whole chain.
    for rule in &rules {
        for predicate in rule.body() {
            if predicate.name() != name && !view_exists(conn, predicate.name())? {
                ensure(conn, predicate.name(), visiting)?;
            }
        }
    }
    Ok(true)
}

/// The `CREATE TEMP VIEW` statement for a predicate.
fn view_definition(
    conn: &Connection,
    name: &str,
    columns: &[String],
    rules: &[crate::ast::Formula],
) -> Result<String> {
    let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let column_list = column_list.join(", ");

    let select = if rules.is_empty() {
        facts_arm(name, columns)
    } else {
        let recursive_name = format!("{name}$rec");
        let mut arms = vec![facts_arm(name, columns)];

        // Non-recursive arms must precede recursive ones in the compound.
        let (plain, recursive): (Vec<_>, Vec<_>) = rules.iter().partition(|rule| {
            rule.body().iter().all(|predicate| predicate.name() != name)
        });
        for rule in plain.into_iter().chain(recursive) {
            let lookup = CatalogLookup(conn);
            arms.push(compiler::compile_rule(rule, &lookup, Some(&recursive_name))?);
        }

        format!(
            "WITH RECURSIVE {rec}({column_list}) AS ({arms}) SELECT {column_list} FROM {rec}",
            rec = quote_ident(&recursive_name),
            arms = arms.join(" UNION "),
        )
    };

    Ok(format!(
        "CREATE TEMP VIEW IF NOT EXISTS {view} ({column_list}) AS {select}",
        view = quote_ident(name),
    ))
}

/// The facts projection: ground head arguments extracted by constant key.
fn facts_arm(name: &str, columns: &[String]) -> String {
    let projections: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(position, column)| {
            format!(
                "json_extract(formula, '$[{}].\"\"') AS {}",
                position + 1,
                quote_ident(column)
            )
        })
        .collect();
    format!(
        "SELECT {} FROM _rule WHERE output_type = {} AND negative_literal_count IS NULL",
        projections.join(", "),
        string_literal(&codec::output_type(name)),
    )
}

/// The INSTEAD-OF-INSERT trigger converting row inserts into fact
/// assertions: mint an entity, store the canonical encoding of the new row.
fn insert_trigger(name: &str, columns: &[String]) -> String {
    let mut arguments = vec![string_literal(name)];
    arguments.extend(columns.iter().map(|column| format!("NEW.{}", quote_ident(column))));

    format!(
        "CREATE TEMP TRIGGER IF NOT EXISTS {trigger} INSTEAD OF INSERT ON {view} BEGIN \
         INSERT INTO _entity DEFAULT VALUES; \
         INSERT INTO _rule (id, formula) VALUES (last_insert_rowid(), jsonb(encode_predicate({arguments}))); \
         END",
        trigger = quote_ident(&format!("{name}$insert")),
        view = quote_ident(name),
        arguments = arguments.join(", "),
    )
}

fn string_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
