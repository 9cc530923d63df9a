//! Canonicalization of terms, predicates, and formulas.
//!
//! Canonical form fixes two degrees of freedom that do not change a Horn
//! clause's meaning: variable naming and body order. Body predicates are
//! ordered by a renaming-invariant key: name first, then arguments, where a
//! head variable is identified by its position in the head (head positions
//! survive renaming), every non-head variable compares equal to every other,
//! and variables sort below constants. Variables then receive dense indices
//! 0, 1, ... in first-occurrence order over the head and the ordered body.
//! The whole pass is idempotent, and two formulas that differ only by
//! renaming or body reordering canonicalize to equal values.
//!
//! More than 256 distinct variables in one formula is an error.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::visit::{Reducer, Rewriter, VariableCollector};
use super::{Formula, Predicate, Term, Variable};
use crate::error::{Error, Result};

/// Renaming-invariant rank of a term within a body ordering: anonymous
/// (non-head) variables, then head variables by head position, then
/// constants.
fn erased_rank(term: &Term, head_positions: &HashMap<Variable, usize>) -> (u8, usize) {
    match term.as_variable() {
        Some(v) => match head_positions.get(&v) {
            Some(position) => (1, *position),
            None => (0, 0),
        },
        None => (2, 0),
    }
}

/// Compare body predicates by name, then arguments under [`erased_rank`]
/// (constants by their full order).
fn erased_cmp(a: &Predicate, b: &Predicate, head_positions: &HashMap<Variable, usize>) -> Ordering {
    a.name()
        .cmp(b.name())
        .then_with(|| {
            for (left, right) in a.args().iter().zip(b.args()) {
                let left_rank = erased_rank(left, head_positions);
                let right_rank = erased_rank(right, head_positions);
                let ord = left_rank.cmp(&right_rank).then_with(|| {
                    if left_rank.0 == 2 {
                        left.cmp(right)
                    } else {
                        Ordering::Equal
                    }
                });
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        })
        .then_with(|| a.arity().cmp(&b.arity()))
}

/// Rewrites every variable to its assigned canonical index.
struct IndexAssigner {
    indices: HashMap<Variable, u8>,
}

impl IndexAssigner {
    fn for_variables(variables: &[Variable]) -> Result<Self> {
        if variables.len() > usize::from(u8::MAX) + 1 {
            return Err(Error::TooManyVariables);
        }
        let indices = variables
            .iter()
            .enumerate()
            .map(|(index, v)| (*v, index as u8))
            .collect();
        Ok(IndexAssigner { indices })
    }
}

impl Rewriter for IndexAssigner {
    fn rewrite_term(&mut self, term: &Term) -> Result<Term> {
        match term.as_variable() {
            Some(v) => match self.indices.get(&v) {
                Some(index) => Ok(Term::Variable(Variable::Indexed(*index))),
                None => unreachable!("every variable is collected before assignment"),
            },
            None => Ok(term.clone()),
        }
    }
}

/// Canonicalize a lone term: a variable becomes index 0, constants pass
/// through.
pub fn canonicalize_term(term: &Term) -> Result<Term> {
    let variables = VariableCollector.reduce_term(term, Vec::new());
    IndexAssigner::for_variables(&variables)?.rewrite_term(term)
}

/// Canonicalize a lone predicate: variables are indexed in argument order.
pub fn canonicalize_predicate(predicate: &Predicate) -> Result<Predicate> {
    let variables = VariableCollector.reduce_predicate(predicate, Vec::new());
    IndexAssigner::for_variables(&variables)?.rewrite_predicate(predicate)
}

/// Canonicalize a Horn clause: order the body, then index the variables.
pub fn canonicalize_formula(formula: &Formula) -> Result<Formula> {
    let head_positions: HashMap<Variable, usize> = formula
        .head()
        .variables()
        .into_iter()
        .enumerate()
        .map(|(position, v)| (v, position))
        .collect();

    let mut body = formula.body().to_vec();
    body.sort_by(|a, b| erased_cmp(a, b, &head_positions));
    let ordered = Formula::rule(formula.head().clone(), body);

    let variables = VariableCollector.reduce_formula(&ordered, Vec::new());
    IndexAssigner::for_variables(&variables)?.rewrite_formula(&ordered)
}

impl Term {
    /// See [`canonicalize_term`]
    pub fn canonicalize(&self) -> Result<Term> {
        canonicalize_term(self)
    }
}

impl Predicate {
    /// See [`canonicalize_predicate`]
    pub fn canonicalize(&self) -> Result<Predicate> {
        canonicalize_predicate(self)
    }
}

impl Formula {
    /// See [`canonicalize_formula`]
    pub fn canonicalize(&self) -> Result<Formula> {
        canonicalize_formula(self)
    }

    /// True iff canonicalization would leave this formula unchanged.
    pub fn is_canonical(&self) -> bool {
        match self.canonicalize() {
            Ok(canonical) => canonical == *self,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(v: Variable) -> Term {
        Term::Variable(v)
    }

    fn indexed(i: u8) -> Term {
        Term::Variable(Variable::Indexed(i))
    }

    #[test]
    fn test_head_variables_indexed_first() {
        let x = Variable::fresh();
        let y = Variable::fresh();
        let formula = Formula::rule(
            Predicate::new("grandparent", vec![var(x), var(y)]),
            vec![Predicate::new("parent", vec![var(y), var(x)])],
        );

        let canonical = formula.canonicalize().unwrap();
        assert_eq!(canonical.head().args(), &[indexed(0), indexed(1)]);
        assert_eq!(canonical.body()[0].args(), &[indexed(1), indexed(0)]);
    }

    #[test]
    fn test_body_sorted_by_name() {
        let x = Variable::fresh();
        let formula = Formula::rule(
            Predicate::new("p", vec![var(x)]),
            vec![
                Predicate::new("zeta", vec![var(x)]),
                Predicate::new("alpha", vec![var(x)]),
            ],
        );

        let canonical = formula.canonicalize().unwrap();
        assert_eq!(canonical.body()[0].name(), "alpha");
        assert_eq!(canonical.body()[1].name(), "zeta");
    }

    #[test]
    fn test_idempotence() {
        let x = Variable::fresh();
        let y = Variable::fresh();
        let z = Variable::fresh();
        let formula = Formula::rule(
            Predicate::new("ancestor", vec![var(x), var(z)]),
            vec![
                Predicate::new("ancestor", vec![var(y), var(z)]),
                Predicate::new("parent", vec![var(x), var(y)]),
            ],
        );

        let once = formula.canonicalize().unwrap();
        let twice = once.canonicalize().unwrap();
        assert_eq!(once, twice);
        assert!(once.is_canonical());
    }

    #[test]
    fn test_renaming_and_reordering_converge() {
        let (x, y, z) = (Variable::fresh(), Variable::fresh(), Variable::fresh());
        let first = Formula::rule(
            Predicate::new("grandparent", vec![var(x), var(z)]),
            vec![
                Predicate::new("parent", vec![var(x), var(y)]),
                Predicate::new("parent", vec![var(y), var(z)]),
            ],
        );

        let (a, b, c) = (Variable::fresh(), Variable::fresh(), Variable::fresh());
        let second = Formula::rule(
            Predicate::new("grandparent", vec![var(a), var(c)]),
            vec![
                Predicate::new("parent", vec![var(b), var(c)]),
                Predicate::new("parent", vec![var(a), var(b)]),
            ],
        );

        assert_eq!(
            first.canonicalize().unwrap(),
            second.canonicalize().unwrap()
        );
    }

    #[test]
    fn test_constants_break_erased_ties() {
        let x = Variable::fresh();
        let formula = Formula::rule(
            Predicate::new("p", vec![var(x)]),
            vec![
                Predicate::new("q", vec![var(x), Term::from("zzz")]),
                Predicate::new("q", vec![var(x), Term::from("aaa")]),
            ],
        );

        let canonical = formula.canonicalize().unwrap();
        assert_eq!(canonical.body()[0].args()[1], Term::from("aaa"));
        assert_eq!(canonical.body()[1].args()[1], Term::from("zzz"));
    }

    #[test]
    fn test_sparse_indices_are_compacted() {
        let formula = Formula::rule(
            Predicate::new("p", vec![indexed(7)]),
            vec![Predicate::new("q", vec![indexed(7), indexed(3)])],
        );

        let canonical = formula.canonicalize().unwrap();
        assert_eq!(canonical.head().args(), &[indexed(0)]);
        assert_eq!(canonical.body()[0].args(), &[indexed(0), indexed(1)]);
    }

    #[test]
    fn test_lone_term_and_predicate() {
        assert_eq!(
            var(Variable::fresh()).canonicalize().unwrap(),
            indexed(0)
        );
        let p = Predicate::new("edge", vec![var(Variable::fresh()), var(Variable::fresh())]);
        assert_eq!(
            p.canonicalize().unwrap().args(),
            &[indexed(0), indexed(1)]
        );
    }
}
