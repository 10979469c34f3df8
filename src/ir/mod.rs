//! # Typed Relational IR
//!
//! The intermediate representation the planner reasons over: sorts,
//! terms, relations, atoms, rules, queries, and programs. Everything here
//! is an immutable value; operations return new instances.
//!
//! ## Pipeline position
//!
//! ```text
//! Library (kinds + rules)      Protocol (event trace + query)
//!            \                    /
//!             Program + Query   (this module)
//!                    |
//!              [emit] -> Datalog source
//!                    |
//!              [solver] -> Assignments
//! ```

mod atom;
mod program;
mod query;
mod relation;
mod rule;
mod term;

pub use atom::{Assignment, Atom, Check};
pub use program::Program;
pub use query::{Query, GOAL_RELATION};
pub use relation::Relation;
pub use rule::Rule;
pub use term::{LitValue, Sort, SortKind, Term};

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors raised by IR construction and manipulation.
#[derive(Debug, Clone, Error)]
pub enum IrError {
    /// Substitution or argument placement with a term of the wrong sort.
    #[error("sort mismatch in {context}: expected '{expected}', found '{found}'")]
    SortMismatch {
        expected: String,
        found: String,
        context: String,
    },

    /// A key that is not part of the relation's arity.
    #[error("relation '{relation}' has no argument '{key}'")]
    UnknownKey { relation: String, key: String },

    /// A key supplied (or declared) more than once.
    #[error("duplicate argument '{key}' for relation '{relation}'")]
    DuplicateKey { relation: String, key: String },

    /// Wrong number of arguments for a relation.
    #[error("relation '{relation}' expects {expected} arguments, found {found}")]
    ArityMismatch {
        relation: String,
        expected: usize,
        found: usize,
    },

    /// An infix relation that is not binary.
    #[error("infix relation '{relation}' must be binary, found {found} arguments")]
    InfixArity { relation: String, found: usize },

    /// A literal cell that does not parse under the expected sort.
    #[error("cannot parse '{value}' as a literal of sort '{sort}'")]
    ParseLiteral { sort: String, value: String },

    /// The event trace contains a variable.
    #[error("event trace atom is not ground: {atom}")]
    NonGroundEvent { atom: String },

    /// Two structurally different relations share a name.
    #[error("conflicting declarations for relation '{name}'")]
    RelationConflict { name: String },

    /// A variable occurring only under negation has no binding occurrence.
    #[error("variable '{variable}' occurs only in negated body atoms")]
    UngroundedNegation { variable: String },
}

/// Restrict a user-supplied name to the Datalog identifier alphabet.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`; a leading digit
/// (or an empty name) gains a `_` prefix.
pub fn sanitize_ident(name: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let invalid =
        INVALID.get_or_init(|| Regex::new("[^A-Za-z0-9_]").expect("static pattern is valid"));
    let cleaned = invalid.replace_all(name, "_").into_owned();
    match cleaned.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{cleaned}"),
        Some(_) => cleaned,
        None => "_".to_string(),
    }
}
