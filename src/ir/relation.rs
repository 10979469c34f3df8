//! # Relations
//!
//! A [`Relation`] is a named n-ary predicate schema: an ordered mapping
//! from argument key to [`Sort`]. Order matters for the wire form; keys
//! matter for substitution. A relation may carry an infix symbol, in which
//! case it must be binary, is serialised infix, has no declaration line,
//! and can never be an output.

use serde::{Deserialize, Serialize};

use super::{sanitize_ident, Atom, IrError, Sort};

/// A named predicate schema with an ordered key -> sort arity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    name: String,
    args: Vec<(String, Sort)>,
    infix_symbol: Option<String>,
}

impl Relation {
    /// A prefix-form relation.
    ///
    /// Keys must be distinct (after identifier sanitisation).
    pub fn new(name: &str, args: Vec<(&str, Sort)>) -> Result<Relation, IrError> {
        Relation::build(name, args, None)
    }

    /// A binary infix relation such as `lhs = rhs` or `lhs < rhs`.
    ///
    /// Both arguments share one sort and are keyed `lhs` / `rhs`.
    pub fn infix(name: &str, symbol: &str, sort: Sort) -> Result<Relation, IrError> {
        Relation::build(
            name,
            vec![("lhs", sort.clone()), ("rhs", sort)],
            Some(symbol.to_string()),
        )
    }

    fn build(
        name: &str,
        args: Vec<(&str, Sort)>,
        infix_symbol: Option<String>,
    ) -> Result<Relation, IrError> {
        let name = sanitize_ident(name);
        if infix_symbol.is_some() && args.len() != 2 {
            return Err(IrError::InfixArity {
                relation: name,
                found: args.len(),
            });
        }
        let mut seen: Vec<String> = Vec::with_capacity(args.len());
        let mut owned = Vec::with_capacity(args.len());
        for (key, sort) in args {
            let key = sanitize_ident(key);
            if seen.contains(&key) {
                return Err(IrError::DuplicateKey {
                    relation: name,
                    key,
                });
            }
            seen.push(key.clone());
            owned.push((key, sort));
        }
        Ok(Relation {
            name,
            args: owned,
            infix_symbol,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Argument keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(|(k, _)| k.as_str())
    }

    /// The ordered `(key, sort)` pairs.
    pub fn args(&self) -> &[(String, Sort)] {
        &self.args
    }

    pub fn infix_symbol(&self) -> Option<&str> {
        self.infix_symbol.as_deref()
    }

    pub fn is_infix(&self) -> bool {
        self.infix_symbol.is_some()
    }

    /// Position of a key, tolerant of unsanitised spellings.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        let key = sanitize_ident(key);
        self.args.iter().position(|(k, _)| *k == key)
    }

    /// Sort of the named argument.
    pub fn sort_of(&self, key: &str) -> Option<&Sort> {
        self.index_of(key).map(|i| &self.args[i].1)
    }

    /// An atom over this relation whose every argument is a fresh variable
    /// named `prefix + key`.
    pub fn free(&self, prefix: &str) -> Atom {
        let terms = self
            .args
            .iter()
            .map(|(key, sort)| sort.var(&format!("{prefix}{key}")))
            .collect();
        Atom::from_parts(self.clone(), terms)
    }

    /// The `.decl` line for this relation. Infix relations have none.
    pub fn decl(&self) -> Option<String> {
        if self.is_infix() {
            return None;
        }
        let cols = self
            .args
            .iter()
            .map(|(key, sort)| format!("{key}: {}", sort.kind().dl_type()))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!(".decl {}({cols})", self.name))
    }
}
