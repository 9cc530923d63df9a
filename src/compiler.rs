//! # Rule-to-SQL Compiler
//!
//! Translates a validated, canonical Horn clause into a `SELECT` that
//! computes the derived relation from the body relations, and a formula
//! query into a `SELECT` returning variable bindings (or a single `sat` row
//! for ground questions).
//!
//! Compilation walks the body left to right. The first occurrence of a
//! variable records where it is bound; later occurrences become equi-joins
//! tied to the source that introduces them. Constants become equality
//! conditions on their source. Conditions on the first FROM source land in
//! WHERE, conditions introduced by later sources land in that source's ON
//! clause - syntactically different, semantically the same conjunction.

use std::collections::HashMap;

use crate::ast::{Formula, Term, Variable};
use crate::error::{Error, Result};

/// Resolves a predicate name to its declared column names.
pub trait ColumnLookup {
    /// The declared columns of `predicate`, or [`Error::UnknownPredicate`].
    fn columns(&self, predicate: &str) -> Result<Vec<String>>;
}

impl ColumnLookup for HashMap<String, Vec<String>> {
    fn columns(&self, predicate: &str) -> Result<Vec<String>> {
        self.get(predicate)
            .cloned()
            .ok_or_else(|| Error::UnknownPredicate(predicate.to_string()))
    }
}

/// Double-quote an identifier for SQL, doubling embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a constant term as a SQL literal. Booleans render as the engine's
/// 0/1 so they compare equal to extracted JSON booleans.
fn literal(term: &Term) -> String {
    match term {
        Term::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Term::Number(n) => format!("{n}"),
        Term::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
        Term::Variable(_) => unreachable!("variables are bound, not rendered"),
    }
}

fn declared_columns(
    lookup: &dyn ColumnLookup,
    predicate: &str,
    used: usize,
) -> Result<Vec<String>> {
    let columns = lookup.columns(predicate)?;
    if columns.len() != used {
        return Err(Error::ArityMismatch {
            predicate: predicate.to_string(),
            declared: columns.len(),
            used,
        });
    }
    Ok(columns)
}

// ============================================================================
// Rules
// ============================================================================

/// One FROM source of a compiled rule body.
struct Source {
    /// SQL relation the source reads (view name, or the recursive CTE name)
    relation: String,
    /// Alias qualifying column references; equals `relation` unless the same
    /// relation appears several times in the body
    alias: String,
    /// Conditions attached to this source's ON clause
    conditions: Vec<String>,
}

/// Compile a canonical, validated rule into a SELECT over its body
/// relations.
///
/// `recursive_name`, when given, substitutes for body references to the
/// rule's own head so recursive rules can read the enclosing CTE instead of
/// the (circular) view name.
pub fn compile_rule(
    formula: &Formula,
    lookup: &dyn ColumnLookup,
    recursive_name: Option<&str>,
) -> Result<String> {
    debug_assert!(!formula.body().is_empty(), "facts are not compiled");

    let head = formula.head();
    let head_columns = declared_columns(lookup, head.name(), head.arity())?;

    let mut sources: Vec<Source> = Vec::with_capacity(formula.body().len());
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    let mut bindings: HashMap<Variable, String> = HashMap::new();
    let mut where_conditions: Vec<String> = Vec::new();

    for predicate in formula.body() {
        let columns = declared_columns(lookup, predicate.name(), predicate.arity())?;

        let occurrence = occurrences.entry(predicate.name()).or_insert(0);
        *occurrence += 1;
        let alias = if *occurrence == 1 {
            predicate.name().to_string()
        } else {
            format!("{}{}", predicate.name(), occurrence)
        };
        let relation = match recursive_name {
            Some(name) if predicate.name() == head.name() => name.to_string(),
            _ => predicate.name().to_string(),
        };

        let index = sources.len();
        sources.push(Source {
            relation,
            alias,
            conditions: Vec::new(),
        });

        for (term, column) in predicate.args().iter().zip(&columns) {
            let reference = format!("{}.{}", quote_ident(&sources[index].alias), quote_ident(column));
            let condition = match term.as_variable() {
                Some(v) => match bindings.get(&v) {
                    Some(first_reference) => Some(format!("{reference} = {first_reference}")),
                    None => {
                        bindings.insert(v, reference);
                        None
                    }
                },
                None => Some(format!("{reference} = {}", literal(term))),
            };

            if let Some(condition) = condition {
                if index == 0 {
                    where_conditions.push(condition);
                } else {
                    sources[index].conditions.push(condition);
                }
            }
        }
    }

    let mut projections = Vec::with_capacity(head.arity());
    for (term, column) in head.args().iter().zip(&head_columns) {
        let expression = match term.as_variable() {
            Some(v) => match bindings.get(&v) {
                Some(reference) => reference.clone(),
                None => {
                    return Err(Error::UnsafeVariables(vec![match v {
                        Variable::Indexed(index) => Variable::display_name(index),
                        Variable::Fresh(_) => v.to_string(),
                    }]));
                }
            },
            None => literal(term),
        };
        projections.push(format!("{expression} AS {}", quote_ident(column)));
    }

    let mut sql = format!("SELECT {}", projections.join(", "));
    for (index, source) in sources.iter().enumerate() {
        let relation = quote_ident(&source.relation);
        let aliased = if source.alias == source.relation {
            relation
        } else {
            format!("{relation} AS {}", quote_ident(&source.alias))
        };
        if index == 0 {
            sql.push_str(&format!(" FROM {aliased}"));
        } else {
            sql.push_str(&format!(" JOIN {aliased}"));
            if !source.conditions.is_empty() {
                sql.push_str(&format!(" ON {}", source.conditions.join(" AND ")));
            }
        }
    }
    if !where_conditions.is_empty() {
        sql.push_str(&format!(" WHERE {}", where_conditions.join(" AND ")));
    }
    Ok(sql)
}

// ============================================================================
// Formula queries
// ============================================================================

/// Compile a formula query - a bodyless formula used as a question pattern -
/// into a SELECT over the head predicate's view.
///
/// Variable arguments project as columns named by the variable's display
/// name; constant arguments filter. A fully ground pattern degenerates to a
/// single `sat` column that yields one row when the tuple exists.
pub fn compile_query(formula: &Formula, lookup: &dyn ColumnLookup) -> Result<String> {
    if !formula.body().is_empty() {
        return Err(Error::UnsupportedQuery);
    }

    let head = formula.head();
    let columns = declared_columns(lookup, head.name(), head.arity())?;
    let relation = quote_ident(head.name());

    let mut projections: Vec<String> = Vec::new();
    let mut conditions: Vec<String> = Vec::new();
    let mut first_seen: HashMap<Variable, String> = HashMap::new();

    for (term, column) in head.args().iter().zip(&columns) {
        let reference = format!("{relation}.{}", quote_ident(column));
        match term.as_variable() {
            Some(v) => match first_seen.get(&v) {
                Some(first_reference) => {
                    conditions.push(format!("{reference} = {first_reference}"));
                }
                None => {
                    let display = match v {
                        Variable::Indexed(index) => Variable::display_name(index),
                        Variable::Fresh(_) => v.to_string(),
                    };
                    projections.push(format!("{reference} AS {}", quote_ident(&display)));
                    first_seen.insert(v, reference);
                }
            },
            None => conditions.push(format!("{reference} = {}", literal(term))),
        }
    }

    if projections.is_empty() {
        projections.push("1 AS \"sat\"".to_string());
    }

    let mut sql = format!("SELECT {} FROM {relation}", projections.join(", "));
    if !conditions.is_empty() {
        sql.push_str(&format!(" WHERE {}", conditions.join(" AND ")));
    }
    Ok(sql)
}
