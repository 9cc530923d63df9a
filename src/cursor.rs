//! # SQL Cursor with Retry
//!
//! Executes possibly multi-statement SQL with positional `?` arguments
//! distributed across statements by placeholder count. Non-final statements
//! are stepped to completion in order (later statements may depend on their
//! side effects); the final statement's rows are drained into the cursor's
//! buffer so engine errors surface synchronously, then handed out by
//! [`Cursor::next`].
//!
//! Every statement records its byte offset and first-argument index at
//! split time. When the engine reports a missing relation, the session's
//! rescue materializes the view and execution resumes from the failing
//! statement - earlier, already-executed statements are never repeated. At
//! most one rescue is attempted per statement per call; a second failure at
//! the same statement propagates.

use std::collections::VecDeque;
use std::ffi::CString;
use std::sync::Arc;

use crate::ddl;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::value::{Row, SqlValue};

/// Position bookkeeping for one statement of the SQL text.
#[derive(Debug)]
struct StatementSpan {
    /// Byte offset of the statement in the SQL text
    offset: usize,
    /// Byte offset one past the statement's end
    end: usize,
    /// Index of this statement's first argument
    argument_index: usize,
    /// Number of `?` placeholders
    parameters: usize,
    /// Whether rescue has already been attempted for this statement
    rescued: bool,
}

/// A cursor over the final statement of an executed SQL text.
#[derive(Debug)]
pub struct Cursor<'conn> {
    session: &'conn Session,
    sql: String,
    args: Vec<SqlValue>,
    statements: Vec<StatementSpan>,
    total_parameters: usize,
    columns: Arc<[String]>,
    rows: VecDeque<Row>,
}

impl<'conn> Cursor<'conn> {
    pub(crate) fn new(
        session: &'conn Session,
        sql: impl Into<String>,
        args: Vec<SqlValue>,
    ) -> Result<Self> {
        let sql = sql.into();

        let mut statements = Vec::new();
        let mut total_parameters = 0;
        for (offset, end) in split_statements(&sql)? {
            let parameters = count_placeholders(&sql[offset..end]);
            statements.push(StatementSpan {
                offset,
                end,
                argument_index: total_parameters,
                parameters,
                rescued: false,
            });
            total_parameters += parameters;
        }
        if total_parameters != args.len() {
            return Err(Error::WrongParameterCount {
                expected: total_parameters,
                got: args.len(),
            });
        }

        let mut cursor = Cursor {
            session,
            sql,
            args,
            statements,
            total_parameters,
            columns: Arc::from(Vec::<String>::new()),
            rows: VecDeque::new(),
        };
        cursor.run()?;
        Ok(cursor)
    }

    /// Pop the next buffered row, or None at the end of the result.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    /// 1 when a row is currently buffered, 0 otherwise.
    pub fn underestimated_count(&self) -> usize {
        usize::from(!self.rows.is_empty())
    }

    /// Column names of the final statement's result.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Drain the remaining rows.
    pub fn collect_rows(&mut self) -> Vec<Row> {
        std::mem::take(&mut self.rows).into()
    }

    /// Re-execute all statements, with the previous arguments or a fresh
    /// list. Statements reset, rebind, and rerun: non-final statements to
    /// completion, the final statement back into the row buffer.
    pub fn rerun(&mut self, args: Option<Vec<SqlValue>>) -> Result<()> {
        if let Some(args) = args {
            if args.len() != self.total_parameters {
                return Err(Error::WrongParameterCount {
                    expected: self.total_parameters,
                    got: args.len(),
                });
            }
            self.args = args;
        }
        for span in &mut self.statements {
            span.rescued = false;
        }
        self.run()
    }

    fn run(&mut self) -> Result<()> {
        self.rows.clear();
        self.columns = Arc::from(Vec::<String>::new());

        for index in 0..self.statements.len() {
            let is_final = index + 1 == self.statements.len();
            loop {
                let failure = match self.execute_statement(index, is_final) {
                    Ok(()) => break,
                    Err(err) => err,
                };
                let missing = failure.missing_relation().map(str::to_lowercase);
                let Some(relation) = missing else {
                    return Err(failure);
                };
                if self.statements[index].rescued {
                    return Err(failure);
                }
                self.statements[index].rescued = true;

                let span = &self.statements[index];
                tracing::debug!(
                    relation = %relation,
                    offset = span.offset,
                    argument_index = span.argument_index,
                    "missing relation, attempting rescue"
                );
                if !self.session.rescue(&relation)? {
                    return Err(Error::UnknownPredicate(relation));
                }
            }
        }
        Ok(())
    }

    fn execute_statement(&mut self, index: usize, is_final: bool) -> Result<()> {
        let span = &self.statements[index];
        let text = &self.sql[span.offset..span.end];

        // DDL is diverted into the catalog; the engine never sees it.
        if let Some(declaration) = ddl::recognize_create_table(text)? {
            tracing::debug!(predicate = %declaration.name, "intercepted CREATE TABLE");
            return self.session.declare(&declaration);
        }

        let conn = self.session.connection();
        let mut stmt = conn.prepare(text)?;
        let args = &self.args[span.argument_index..span.argument_index + span.parameters];
        for (position, value) in args.iter().enumerate() {
            stmt.raw_bind_parameter(position + 1, value)?;
        }

        if is_final {
            let column_count = stmt.column_count();
            let columns: Arc<[String]> = stmt
                .column_names()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .into();

            let mut buffered = VecDeque::new();
            let mut rows = stmt.raw_query();
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(column_count);
                for column in 0..column_count {
                    values.push(SqlValue::from(row.get_ref(column)?));
                }
                buffered.push_back(Row::new(Arc::clone(&columns), values));
            }

            self.columns = columns;
            self.rows = buffered;
        } else {
            let mut rows = stmt.raw_query();
            while let Some(_row) = rows.next()? {}
        }
        Ok(())
    }
}

// ============================================================================
// Statement splitting and placeholder counting
// ============================================================================

/// True when the text holds anything besides whitespace, comments, and bare
/// semicolons.
fn significant(text: &str) -> bool {
    let mut rest = ddl::skip_trivia(text);
    loop {
        rest = match rest.strip_prefix(';') {
            Some(tail) => ddl::skip_trivia(tail),
            None => return !rest.is_empty(),
        };
    }
}

/// Split SQL into statements at semicolons the engine considers complete,
/// tracking each statement's byte range. A trailing statement without a
/// closing semicolon is kept; comment-only pieces are dropped.
fn split_statements(sql: &str) -> Result<Vec<(usize, usize)>> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut pivot = 0;

    while start < sql.len() {
        match sql[pivot..].find(';') {
            Some(found) => {
                pivot += found + 1;
                let piece = &sql[start..pivot];
                let c_piece =
                    CString::new(piece).map_err(|e| Error::Sqlite(rusqlite::Error::NulError(e)))?;
                if unsafe { rusqlite::ffi::sqlite3_complete(c_piece.as_ptr()) } != 0 {
                    if significant(piece) {
                        spans.push((start, pivot));
                    }
                    start = pivot;
                }
            }
            None => {
                if significant(&sql[start..]) {
                    spans.push((start, sql.len()));
                }
                break;
            }
        }
    }
    Ok(spans)
}

/// Count `?` placeholders, skipping string literals, quoted identifiers, and
/// comments. Digits after `?` (numbered parameters) count as one placeholder.
fn count_placeholders(text: &str) -> usize {
    let mut count = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                // Doubled closers escape themselves inside the literal.
                while let Some((_, inner)) = chars.next() {
                    if inner == c {
                        if chars.peek().is_some_and(|(_, next)| *next == c) {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            '[' => {
                for (_, inner) in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                }
            }
            '-' if text[index + 1..].starts_with('-') => {
                chars.next();
                for (_, inner) in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '/' if text[index + 1..].starts_with('*') => {
                chars.next();
                let mut previous = ' ';
                for (_, inner) in chars.by_ref() {
                    if previous == '*' && inner == '/' {
                        break;
                    }
                    previous = inner;
                }
            }
            '?' => {
                count += 1;
                while chars.peek().is_some_and(|(_, next)| next.is_ascii_digit()) {
                    chars.next();
                }
            }
            _ => {}
        }
    }
    count
}
