//! # DDL Interceptor
//!
//! `CREATE TABLE` is the declaration syntax for predicates. Before a
//! statement reaches the engine, its leading keywords are inspected; if and
//! only if it begins with `CREATE TABLE`, it is parsed into a [`TableDecl`]
//! and diverted into the catalog - the physical table is never created. Any
//! other statement passes through unchanged.
//!
//! The parser handles the declaration subset that maps onto predicates:
//! optional `IF NOT EXISTS`, a (possibly bracketed or quoted) table name, and
//! a parenthesized column list. Table-level constraint clauses are
//! discarded; quoted column names are rejected.

use crate::error::{Error, Result};

/// A parsed predicate declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDecl {
    /// Lowercased predicate name
    pub name: String,
    /// Column names in declaration order
    pub columns: Vec<String>,
    /// Whether the statement carried `IF NOT EXISTS`
    pub if_not_exists: bool,
}

// ============================================================================
// SQL text scanning
// ============================================================================

/// Skip leading whitespace and `--` / `/* */` comments.
pub(crate) fn skip_trivia(mut text: &str) -> &str {
    loop {
        let trimmed = text.trim_start();
        if let Some(rest) = trimmed.strip_prefix("--") {
            text = match rest.find('\n') {
                Some(end) => &rest[end + 1..],
                None => "",
            };
        } else if let Some(rest) = trimmed.strip_prefix("/*") {
            text = match rest.find("*/") {
                Some(end) => &rest[end + 2..],
                None => "",
            };
        } else {
            return trimmed;
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Match a case-insensitive keyword at the start of `text`, returning the
/// remainder. The keyword must end at a non-identifier character.
fn keyword<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    if text.len() < word.len() || !text.is_char_boundary(word.len()) {
        return None;
    }
    let (head, rest) = text.split_at(word.len());
    if !head.eq_ignore_ascii_case(word) {
        return None;
    }
    if rest.chars().next().is_some_and(is_ident_char) {
        return None;
    }
    Some(rest)
}

/// Read an identifier token, stripping `[...]`, `"..."`, `` `...` `` or
/// `'...'` wrappers. Returns (identifier, remainder, was_quoted).
fn identifier(text: &str) -> Result<(String, &str, bool)> {
    let mut chars = text.chars();
    match chars.next() {
        Some('[') => match text[1..].find(']') {
            Some(end) => Ok((text[1..=end].to_string(), &text[end + 2..], true)),
            None => Err(Error::UnsupportedDdl("unterminated [identifier]".into())),
        },
        Some(open @ ('"' | '`' | '\'')) => {
            // Doubled quote characters escape themselves.
            let mut name = String::new();
            let mut rest = &text[1..];
            loop {
                match rest.find(open) {
                    Some(end) => {
                        name.push_str(&rest[..end]);
                        rest = &rest[end + 1..];
                        if rest.starts_with(open) {
                            name.push(open);
                            rest = &rest[1..];
                        } else {
                            return Ok((name, rest, true));
                        }
                    }
                    None => {
                        return Err(Error::UnsupportedDdl("unterminated quoted identifier".into()))
                    }
                }
            }
        }
        Some(c) if is_ident_char(c) => {
            let end = text
                .find(|c: char| !is_ident_char(c))
                .unwrap_or(text.len());
            Ok((text[..end].to_string(), &text[end..], false))
        }
        _ => Err(Error::UnsupportedDdl(format!(
            "expected an identifier at: {text}"
        ))),
    }
}

// ============================================================================
// CREATE TABLE recognition
// ============================================================================

/// Recognize a `CREATE TABLE` statement; other statements return `None`.
pub fn recognize_create_table(sql: &str) -> Result<Option<TableDecl>> {
    let text = skip_trivia(sql);
    let Some(text) = keyword(text, "CREATE") else {
        return Ok(None);
    };
    let Some(text) = keyword(skip_trivia(text), "TABLE") else {
        return Ok(None);
    };
    parse_declaration(skip_trivia(text)).map(Some)
}

fn parse_declaration(text: &str) -> Result<TableDecl> {
    let (text, if_not_exists) = match keyword(text, "IF") {
        Some(rest) => {
            let rest = keyword(skip_trivia(rest), "NOT")
                .ok_or_else(|| Error::UnsupportedDdl("expected NOT after IF".into()))?;
            let rest = keyword(skip_trivia(rest), "EXISTS")
                .ok_or_else(|| Error::UnsupportedDdl("expected EXISTS after IF NOT".into()))?;
            (skip_trivia(rest), true)
        }
        None => (text, false),
    };

    let (name, text, _) = identifier(text)?;
    let text = skip_trivia(text);
    if text.starts_with('.') {
        return Err(Error::UnsupportedDdl(
            "schema-qualified table names are not supported".into(),
        ));
    }
    let Some(text) = text.strip_prefix('(') else {
        return Err(Error::UnsupportedDdl(
            "expected a parenthesized column list".into(),
        ));
    };

    let (body, _rest) = split_at_matching_paren(text)?;
    let mut columns = Vec::new();
    for element in split_top_level_commas(body) {
        let element = skip_trivia(element);
        if element.is_empty() {
            continue;
        }
        if let Some(column) = column_name(element)? {
            columns.push(column);
        }
    }

    Ok(TableDecl {
        name: name.to_lowercase(),
        columns,
        if_not_exists,
    })
}

/// Split off the contents up to the parenthesis matching an already-consumed
/// `(`, respecting nesting and string/identifier quotes.
fn split_at_matching_paren(text: &str) -> Result<(&str, &str)> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (index, c) in text.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '[' => quote = Some(']'),
                '(' => depth += 1,
                ')' => {
                    if depth == 0 {
                        return Ok((&text[..index], &text[index + 1..]));
                    }
                    depth -= 1;
                }
                _ => {}
            },
        }
    }
    Err(Error::UnsupportedDdl("unbalanced parentheses".into()))
}

/// Split a column-list body on commas at nesting depth zero.
fn split_top_level_commas(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '[' => quote = Some(']'),
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    pieces.push(&text[start..index]);
                    start = index + 1;
                }
                _ => {}
            },
        }
    }
    pieces.push(&text[start..]);
    pieces
}

const TABLE_CONSTRAINTS: &[&str] = &["UNIQUE", "PRIMARY", "FOREIGN", "CHECK", "CONSTRAINT"];

/// The column name of one column-list element, or `None` for a table-level
/// constraint clause. Quoted column names are rejected.
fn column_name(element: &str) -> Result<Option<String>> {
    if element.starts_with(['"', '`', '[', '\'']) {
        return Err(Error::QuotedColumnNotSupported);
    }
    let (token, _, _) = identifier(element)?;
    if TABLE_CONSTRAINTS
        .iter()
        .any(|constraint| token.eq_ignore_ascii_case(constraint))
    {
        return Ok(None);
    }
    Ok(Some(token))
}
