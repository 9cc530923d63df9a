//! # RBDB - A Deductive Database on an Embedded SQL Engine
//!
//! RBDB layers a safe Datalog-style deductive engine on top of SQLite. A
//! client declares predicates with ordinary `CREATE TABLE` statements and
//! then freely mixes three modes of interaction: inserting ground facts via
//! `INSERT`, asserting facts or Horn-clause rules via the formula API, and
//! reading derived knowledge back either with `SELECT` over the predicate's
//! name or with a formula query returning variable bindings.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Formula surface                       SQL surface
//!     |                                     |
//! [Symbol Algebra]  canonicalize        [Cursor]  split / bind / step
//!     |                                     |
//! [Validator]       safety check        [DDL Interceptor]  CREATE TABLE
//!     |                                     |        -> catalog, no table
//! [Codec]           tagged JSON            |
//!     |                                 [Rescue]  missing view?
//! [Rule Store]      _entity/_predicate/_rule  <-  [Materializer]
//!     |                                               view + trigger
//! [Compiler]        rule -> SELECT  ------------------^
//! ```
//!
//! A predicate is visible to SQL as a session-scoped view over the rule
//! store plus an INSTEAD-OF-INSERT trigger; asserting a rule drops the view
//! so the next read rebuilds it with the rule included, and the cursor's
//! rescue protocol turns the resulting missing-relation errors into
//! transparent retries.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rbdb::{Session, FormulaBuilder, Variable};
//!
//! let session = Session::open("knowledge.db")?;
//!
//! // Declare predicates; no physical tables are created.
//! session.query("CREATE TABLE human (name TEXT)", vec![])?;
//! session.query("CREATE TABLE mortal (name TEXT)", vec![])?;
//!
//! // Facts arrive as INSERTs or assertions.
//! session.query("INSERT INTO human VALUES (?)", vec!["Socrates".into()])?;
//!
//! // mortal(X) :- human(X).
//! let x = Variable::fresh();
//! session.assert(
//!     &FormulaBuilder::head("mortal")
//!         .var(x)
//!         .body("human", |p| p.var(x))
//!         .build(),
//! )?;
//!
//! // Derived knowledge reads like a table.
//! let mut cursor = session.query("SELECT name FROM mortal", vec![])?;
//! while let Some(row) = cursor.next() {
//!     println!("{:?}", row.get("name"));
//! }
//! # Ok::<(), rbdb::Error>(())
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `ast` | Terms, predicates, Horn clauses; canonicalization; traversal traits |
//! | `codec` | Formula <-> tagged JSON encoding |
//! | `validator` | Unsafe-rule rejection |
//! | `compiler` | Horn clause -> SELECT, formula query -> SELECT |
//! | `ddl` | CREATE TABLE interception |
//! | `views` | Session view + INSTEAD-OF-INSERT trigger materialization |
//! | `cursor` | Multi-statement execution with rescue and resume |
//! | `store` | Rule store schema and catalog queries |
//! | `functions` | `new_entity_id`, `encode_predicate`, `sql_exec` UDFs |
//! | `session` | Open / assert / query coordinators |
//! | `entity` | v7 UUID entity identifiers |
//! | `value` | Dynamically-typed SQL values and rows |
//! | `config` | Figment-based configuration |

pub mod ast;
pub mod codec;
pub mod compiler;
pub mod config;
pub mod cursor;
pub mod ddl;
pub mod entity;
pub mod error;
pub mod functions;
pub mod session;
pub mod store;
pub mod validator;
pub mod value;
pub mod views;

// Re-export the client surface.
pub use ast::builders::{FormulaBuilder, PredicateBuilder};
pub use ast::{Formula, Predicate, Term, Variable};
pub use config::Config;
pub use cursor::Cursor;
pub use entity::EntityId;
pub use error::{Error, Result};
pub use session::Session;
pub use value::{Row, SqlValue};
