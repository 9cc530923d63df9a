//! Property-based canonicalization and codec tests (proptest).

use proptest::prelude::*;

use rbdb::ast::visit::Rewriter;
use rbdb::codec;
use rbdb::{Formula, Predicate, Term, Variable};

/// Terms drawn over a small pool of variable indices and simple constants.
fn term_strategy() -> impl Strategy<Value = Term> {
    prop_oneof![
        (0u8..6).prop_map(|index| Term::Variable(Variable::Indexed(index))),
        "[a-z]{1,6}".prop_map(Term::Text),
        (-1000i32..1000).prop_map(|n| Term::Number(f64::from(n) / 4.0)),
        any::<bool>().prop_map(Term::Boolean),
    ]
}

fn predicate_strategy(name: String) -> impl Strategy<Value = Predicate> {
    prop::collection::vec(term_strategy(), 1..4)
        .prop_map(move |args| Predicate::new(name.clone(), args))
}

/// A Horn clause whose body predicates carry distinct names, so the
/// canonical body order is fully determined.
fn formula_strategy() -> impl Strategy<Value = Formula> {
    let names = prop::sample::subsequence(
        vec!["alpha", "beta", "gamma", "delta", "epsilon"],
        0..4,
    );
    (predicate_strategy("head".to_string()), names)
        .prop_flat_map(|(head, names)| {
            let bodies: Vec<_> = names
                .into_iter()
                .map(|name| predicate_strategy(name.to_string()))
                .collect();
            (Just(head), bodies)
        })
        .prop_map(|(head, body)| Formula::rule(head, body))
}

/// Rename every indexed variable through a permutation of the pool.
struct Renamer {
    permutation: Vec<u8>,
}

impl Rewriter for Renamer {
    fn rewrite_term(&mut self, term: &Term) -> rbdb::Result<Term> {
        Ok(match term {
            Term::Variable(Variable::Indexed(index)) => Term::Variable(Variable::Indexed(
                self.permutation[usize::from(*index)],
            )),
            other => other.clone(),
        })
    }
}

proptest! {
    #[test]
    fn canonicalize_is_idempotent(formula in formula_strategy()) {
        let once = formula.canonicalize().unwrap();
        let twice = once.canonicalize().unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn decode_inverts_encode(formula in formula_strategy()) {
        let canonical = formula.canonicalize().unwrap();
        let encoded = codec::encode_to_string(&canonical).unwrap();
        let decoded = codec::decode_str(&encoded).unwrap();
        prop_assert_eq!(decoded, canonical);
    }

    #[test]
    fn renaming_and_reordering_share_an_encoding(
        formula in formula_strategy(),
        permutation in Just((0u8..6).collect::<Vec<u8>>()).prop_shuffle(),
        order in any::<u64>(),
    ) {
        // A renamed variant...
        let mut renamer = Renamer { permutation };
        let renamed = renamer.rewrite_formula(&formula).unwrap();

        // ...with its body rotated.
        let mut body = renamed.body().to_vec();
        if !body.is_empty() {
            let split = (order as usize) % body.len();
            body.rotate_left(split);
        }
        let variant = Formula::rule(renamed.head().clone(), body);

        let original = codec::encode_to_string(&formula.canonicalize().unwrap()).unwrap();
        let rewritten = codec::encode_to_string(&variant.canonicalize().unwrap()).unwrap();
        prop_assert_eq!(original, rewritten);
    }

    #[test]
    fn canonical_bodies_are_ordered(formula in formula_strategy()) {
        let canonical = formula.canonicalize().unwrap();
        let names: Vec<_> = canonical.body().iter().map(Predicate::name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        prop_assert_eq!(names, sorted);
    }
}
