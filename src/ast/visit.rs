//! Traversals over the symbol algebra.
//!
//! Two traits cover every pass the engine runs over formulas: [`Rewriter`]
//! maps terms to terms (and predicates/formulas along with them), and
//! [`Reducer`] folds an accumulator across a formula. Default implementations
//! recurse; concrete passes override only the level they change.

use super::{Formula, Predicate, Term, Variable};
use crate::error::Result;

/// A structure-preserving rewrite of a formula.
///
/// The default implementations rebuild each node from rewritten children, so
/// an implementation that only cares about terms overrides [`rewrite_term`]
/// alone.
///
/// [`rewrite_term`]: Rewriter::rewrite_term
pub trait Rewriter {
    fn rewrite_term(&mut self, term: &Term) -> Result<Term> {
        Ok(term.clone())
    }

    fn rewrite_predicate(&mut self, predicate: &Predicate) -> Result<Predicate> {
        let args = predicate
            .args()
            .iter()
            .map(|term| self.rewrite_term(term))
            .collect::<Result<Vec<_>>>()?;
        Ok(predicate.with_args(args))
    }

    fn rewrite_formula(&mut self, formula: &Formula) -> Result<Formula> {
        let head = self.rewrite_predicate(formula.head())?;
        let body = formula
            .body()
            .iter()
            .map(|predicate| self.rewrite_predicate(predicate))
            .collect::<Result<Vec<_>>>()?;
        Ok(Formula::rule(head, body))
    }
}

/// A fold over a formula with an accumulator.
pub trait Reducer {
    type Acc;

    fn reduce_term(&mut self, _term: &Term, acc: Self::Acc) -> Self::Acc {
        acc
    }

    fn reduce_predicate(&mut self, predicate: &Predicate, acc: Self::Acc) -> Self::Acc {
        predicate
            .args()
            .iter()
            .fold(acc, |acc, term| self.reduce_term(term, acc))
    }

    fn reduce_formula(&mut self, formula: &Formula, acc: Self::Acc) -> Self::Acc {
        let acc = self.reduce_predicate(formula.head(), acc);
        formula
            .body()
            .iter()
            .fold(acc, |acc, predicate| self.reduce_predicate(predicate, acc))
    }
}

/// Collects distinct variables in first-occurrence order.
pub struct VariableCollector;

impl Reducer for VariableCollector {
    type Acc = Vec<Variable>;

    fn reduce_term(&mut self, term: &Term, mut acc: Self::Acc) -> Self::Acc {
        if let Some(v) = term.as_variable() {
            if !acc.contains(&v) {
                acc.push(v);
            }
        }
        acc
    }
}
