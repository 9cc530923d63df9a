//! # Formula Codec
//!
//! Serializes canonical Horn clauses into a self-describing JSON value:
//!
//! ```text
//! [ "@head-name", head-arg-0, head-arg-1, ..., body-pred-0, body-pred-1, ... ]
//! ```
//!
//! The leading `@` sentinel marks element 0 as a Horn-clause tag; the rule
//! store's generated columns and indexes key off it. Each term is a
//! single-key map - `""` for constants (the literal value), `"v"` for
//! variables (the canonical index). Each body predicate is an array
//! `[name, arg-0, arg-1, ...]`.
//!
//! Encoding refuses non-canonical formulas and non-finite numbers. Decoding
//! tolerates unknown map keys as long as one recognized key remains, and when
//! several recognized keys appear it prefers the later-defined variant
//! (`"v"` wins over `""`).

use serde_json::{Map, Number, Value};

use crate::ast::{Formula, Predicate, Term, Variable};
use crate::error::{Error, Result};

/// Leading character of a stored formula's type tag
pub const SENTINEL: char = '@';

/// The `output_type` tag of a formula with the given head name
pub fn output_type(name: &str) -> String {
    format!("{SENTINEL}{name}")
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a canonical formula as a JSON value.
pub fn encode(formula: &Formula) -> Result<Value> {
    if !formula.is_canonical() {
        return Err(Error::Encoding(format!(
            "formula is not canonical: {formula}"
        )));
    }

    let mut elements = Vec::with_capacity(1 + formula.head().arity() + formula.body().len());
    elements.push(Value::String(output_type(formula.head().name())));
    for term in formula.head().args() {
        elements.push(encode_term(term)?);
    }
    for predicate in formula.body() {
        elements.push(encode_predicate(predicate)?);
    }
    Ok(Value::Array(elements))
}

/// Encode a canonical formula as compact JSON text, the form bound into
/// `jsonb(?)` when a formula is stored.
pub fn encode_to_string(formula: &Formula) -> Result<String> {
    Ok(serde_json::to_string(&encode(formula)?)?)
}

fn encode_predicate(predicate: &Predicate) -> Result<Value> {
    let mut elements = Vec::with_capacity(1 + predicate.arity());
    elements.push(Value::String(predicate.name().to_string()));
    for term in predicate.args() {
        elements.push(encode_term(term)?);
    }
    Ok(Value::Array(elements))
}

fn encode_term(term: &Term) -> Result<Value> {
    let mut map = Map::with_capacity(1);
    match term {
        Term::Variable(Variable::Indexed(index)) => {
            map.insert("v".to_string(), Value::Number(Number::from(*index)));
        }
        Term::Variable(Variable::Fresh(_)) => {
            return Err(Error::Encoding(
                "cannot encode a fresh variable; canonicalize first".to_string(),
            ));
        }
        Term::Text(s) => {
            map.insert(String::new(), Value::String(s.clone()));
        }
        Term::Number(n) => {
            let number = Number::from_f64(*n)
                .ok_or_else(|| Error::Encoding(format!("non-finite number {n}")))?;
            map.insert(String::new(), Value::Number(number));
        }
        Term::Boolean(b) => {
            map.insert(String::new(), Value::Bool(*b));
        }
    }
    Ok(Value::Object(map))
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a stored JSON value back into a formula.
pub fn decode(value: &Value) -> Result<Formula> {
    let elements = value
        .as_array()
        .ok_or_else(|| Error::Decoding("formula encoding must be an array".to_string()))?;
    let mut elements = elements.iter();

    let tag = elements
        .next()
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Decoding("missing type tag".to_string()))?;
    let name = tag
        .strip_prefix(SENTINEL)
        .ok_or_else(|| Error::Decoding(format!("type tag {tag:?} lacks the sentinel")))?;

    let mut head_args = Vec::new();
    let mut body = Vec::new();
    for element in elements {
        match element {
            Value::Object(map) => {
                if !body.is_empty() {
                    return Err(Error::Decoding(
                        "head argument after body predicate".to_string(),
                    ));
                }
                head_args.push(decode_term(map)?);
            }
            Value::Array(elements) => body.push(decode_predicate(elements)?),
            other => {
                return Err(Error::Decoding(format!(
                    "unexpected formula element: {other}"
                )));
            }
        }
    }

    Ok(Formula::rule(Predicate::new(name, head_args), body))
}

/// Decode JSON text produced by [`encode_to_string`] (or `json()` applied to
/// the stored JSONB).
pub fn decode_str(text: &str) -> Result<Formula> {
    decode(&serde_json::from_str(text)?)
}

fn decode_predicate(elements: &[Value]) -> Result<Predicate> {
    let (name, args) = elements
        .split_first()
        .ok_or_else(|| Error::Decoding("empty body predicate".to_string()))?;
    let name = name
        .as_str()
        .ok_or_else(|| Error::Decoding("body predicate name must be a string".to_string()))?;

    let args = args
        .iter()
        .map(|arg| match arg {
            Value::Object(map) => decode_term(map),
            other => Err(Error::Decoding(format!(
                "body predicate argument must be a term map, got {other}"
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Predicate::new(name, args))
}

fn decode_term(map: &Map<String, Value>) -> Result<Term> {
    // Later-defined variants are preferred, so a variable key shadows a
    // constant key left behind by an older writer.
    if let Some(index) = map.get("v") {
        let index = index
            .as_u64()
            .filter(|index| *index <= u64::from(u8::MAX))
            .ok_or_else(|| Error::Decoding(format!("bad variable index {index}")))?;
        return Ok(Term::Variable(Variable::Indexed(index as u8)));
    }
    if let Some(constant) = map.get("") {
        return match constant {
            Value::String(s) => Ok(Term::Text(s.clone())),
            Value::Number(n) => n
                .as_f64()
                .map(Term::Number)
                .ok_or_else(|| Error::Decoding(format!("unrepresentable number {n}"))),
            Value::Bool(b) => Ok(Term::Boolean(*b)),
            other => Err(Error::Decoding(format!("unsupported constant {other}"))),
        };
    }
    Err(Error::Decoding(format!(
        "term map has no recognized variant: {}",
        Value::Object(map.clone())
    )))
}
