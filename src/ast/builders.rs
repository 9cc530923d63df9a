//! Builder Patterns for Formula Construction
//!
//! Fluent APIs for constructing predicates and Horn clauses, particularly
//! useful in tests and for clients assembling formulas programmatically.
//!
//! ## Example
//!
//! ```rust
//! use rbdb::ast::builders::FormulaBuilder;
//! use rbdb::ast::Variable;
//!
//! let x = Variable::fresh();
//! let y = Variable::fresh();
//! let z = Variable::fresh();
//!
//! // grandparent(X, Z) :- parent(X, Y), parent(Y, Z).
//! let rule = FormulaBuilder::head("grandparent")
//!     .var(x)
//!     .var(z)
//!     .body("parent", |p| p.var(x).var(y))
//!     .body("parent", |p| p.var(y).var(z))
//!     .build();
//!
//! // human("Socrates").
//! let fact = FormulaBuilder::head("human").text("Socrates").build();
//! assert!(fact.is_fact());
//! ```

use super::{Formula, Predicate, Term, Variable};

/// Builder for a single predicate
#[derive(Debug, Clone)]
pub struct PredicateBuilder {
    name: String,
    args: Vec<Term>,
}

impl PredicateBuilder {
    /// Start a predicate with the given relation name
    pub fn new(name: impl Into<String>) -> Self {
        PredicateBuilder {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append a variable argument
    pub fn var(mut self, variable: Variable) -> Self {
        self.args.push(Term::Variable(variable));
        self
    }

    /// Append a text constant
    pub fn text(mut self, value: impl Into<String>) -> Self {
        self.args.push(Term::Text(value.into()));
        self
    }

    /// Append a numeric constant
    pub fn number(mut self, value: f64) -> Self {
        self.args.push(Term::Number(value));
        self
    }

    /// Append a boolean constant
    pub fn boolean(mut self, value: bool) -> Self {
        self.args.push(Term::Boolean(value));
        self
    }

    /// Append any term
    pub fn term(mut self, term: impl Into<Term>) -> Self {
        self.args.push(term.into());
        self
    }

    /// Finish the predicate
    pub fn build(self) -> Predicate {
        Predicate::new(self.name, self.args)
    }
}

/// Builder for a Horn clause, head first, body predicates appended
#[derive(Debug, Clone)]
pub struct FormulaBuilder {
    head: PredicateBuilder,
    body: Vec<Predicate>,
}

impl FormulaBuilder {
    /// Start a formula with the given head relation name
    pub fn head(name: impl Into<String>) -> Self {
        FormulaBuilder {
            head: PredicateBuilder::new(name),
            body: Vec::new(),
        }
    }

    /// Append a variable argument to the head
    pub fn var(mut self, variable: Variable) -> Self {
        self.head = self.head.var(variable);
        self
    }

    /// Append a text constant to the head
    pub fn text(mut self, value: impl Into<String>) -> Self {
        self.head = self.head.text(value);
        self
    }

    /// Append a numeric constant to the head
    pub fn number(mut self, value: f64) -> Self {
        self.head = self.head.number(value);
        self
    }

    /// Append a boolean constant to the head
    pub fn boolean(mut self, value: bool) -> Self {
        self.head = self.head.boolean(value);
        self
    }

    /// Append any term to the head
    pub fn term(mut self, term: impl Into<Term>) -> Self {
        self.head = self.head.term(term);
        self
    }

    /// Append a body predicate built with the given closure
    pub fn body(
        mut self,
        name: impl Into<String>,
        build: impl FnOnce(PredicateBuilder) -> PredicateBuilder,
    ) -> Self {
        self.body.push(build(PredicateBuilder::new(name)).build());
        self
    }

    /// Finish the formula
    pub fn build(self) -> Formula {
        Formula::rule(self.head.build(), self.body)
    }
}
