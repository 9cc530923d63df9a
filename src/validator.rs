//! # Rule Safety Validation
//!
//! A rule is safe when every variable in its head also appears in at least
//! one body predicate; only safe rules have a well-defined finite derivation.
//! Validation runs after canonicalization, so the reported variables carry
//! deterministic display names.

use crate::ast::visit::{Reducer, VariableCollector};
use crate::ast::{Formula, Variable};
use crate::error::{Error, Result};

/// Reject unsafe formulas.
///
/// Facts are trivially safe (a ground head has no variables). For rules, any
/// head variable missing from the union of body variables is reported in
/// [`Error::UnsafeVariables`], in head-occurrence order.
pub fn validate(formula: &Formula) -> Result<()> {
    let head_vars = VariableCollector.reduce_predicate(formula.head(), Vec::new());
    if head_vars.is_empty() {
        return Ok(());
    }

    let body_vars = formula
        .body()
        .iter()
        .fold(Vec::new(), |acc, predicate| {
            VariableCollector.reduce_predicate(predicate, acc)
        });

    let unsafe_vars: Vec<String> = head_vars
        .into_iter()
        .filter(|v| !body_vars.contains(v))
        .map(|v| match v {
            Variable::Indexed(index) => Variable::display_name(index),
            Variable::Fresh(_) => v.to_string(),
        })
        .collect();

    if unsafe_vars.is_empty() {
        Ok(())
    } else {
        Err(Error::UnsafeVariables(unsafe_vars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::FormulaBuilder;

    #[test]
    fn test_ground_fact_is_safe() {
        let fact = FormulaBuilder::head("human").text("Socrates").build();
        assert!(validate(&fact).is_ok());
    }

    #[test]
    fn test_safe_rule_passes() {
        let x = Variable::fresh();
        let rule = FormulaBuilder::head("mortal")
            .var(x)
            .body("human", |p| p.var(x))
            .build()
            .canonicalize()
            .unwrap();
        assert!(validate(&rule).is_ok());
    }

    #[test]
    fn test_unbound_head_variable_reported() {
        let x = Variable::fresh();
        let y = Variable::fresh();
        // mortal(X, Y) :- human(X).  Y is unbound.
        let rule = FormulaBuilder::head("mortal")
            .var(x)
            .var(y)
            .body("human", |p| p.var(x))
            .build()
            .canonicalize()
            .unwrap();

        match validate(&rule) {
            Err(Error::UnsafeVariables(names)) => assert_eq!(names, vec!["B".to_string()]),
            other => panic!("expected UnsafeVariables, got {other:?}"),
        }
    }

    #[test]
    fn test_all_head_variables_unbound() {
        let x = Variable::fresh();
        let y = Variable::fresh();
        let rule = FormulaBuilder::head("orphan")
            .var(x)
            .var(y)
            .body("base", |p| p.text("c"))
            .build()
            .canonicalize()
            .unwrap();

        match validate(&rule) {
            Err(Error::UnsafeVariables(names)) => {
                assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
            }
            other => panic!("expected UnsafeVariables, got {other:?}"),
        }
    }

    #[test]
    fn test_query_pattern_head_only_is_unsafe_with_vars() {
        let z = Variable::fresh();
        let pattern = FormulaBuilder::head("grandparent")
            .text("Alice")
            .var(z)
            .build()
            .canonicalize()
            .unwrap();
        // A bodyless formula with variables is a query pattern, not an
        // assertable rule.
        assert!(validate(&pattern).is_err());
    }
}
