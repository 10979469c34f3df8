//! # Atoms and Checks
//!
//! An [`Atom`] applies a relation to one sort-consistent term per argument
//! key. A [`Check`] is an atom with a polarity: negated checks are the
//! Datalog-native expression of uniqueness constraints.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{IrError, Relation, Term};

/// A variable assignment: variable name to replacement term.
pub type Assignment = BTreeMap<String, Term>;

/// An application of a relation to one term per argument key.
///
/// Arguments are stored positionally, aligned with the relation's
/// declaration order. Atoms are immutable values; all update operations
/// return a new atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom {
    relation: Relation,
    terms: Vec<Term>,
}

impl Atom {
    /// Build an atom from named arguments. Every relation key must be
    /// supplied exactly once with a term of the key's sort.
    pub fn new(relation: Relation, args: Vec<(&str, Term)>) -> Result<Atom, IrError> {
        if args.len() != relation.arity() {
            return Err(IrError::ArityMismatch {
                relation: relation.name().to_string(),
                expected: relation.arity(),
                found: args.len(),
            });
        }
        let mut slots: Vec<Option<Term>> = vec![None; relation.arity()];
        for (key, term) in args {
            let index = relation
                .index_of(key)
                .ok_or_else(|| IrError::UnknownKey {
                    relation: relation.name().to_string(),
                    key: key.to_string(),
                })?;
            if slots[index].is_some() {
                return Err(IrError::DuplicateKey {
                    relation: relation.name().to_string(),
                    key: key.to_string(),
                });
            }
            let expected = &relation.args()[index].1;
            if term.sort() != expected {
                return Err(IrError::SortMismatch {
                    expected: expected.name().to_string(),
                    found: term.sort().name().to_string(),
                    context: format!("argument {key} of {}", relation.name()),
                });
            }
            slots[index] = Some(term);
        }
        // All slots filled: lengths matched and keys were distinct.
        let terms = slots.into_iter().flatten().collect();
        Ok(Atom { relation, terms })
    }

    /// Internal positional constructor; callers guarantee sort agreement.
    pub(crate) fn from_parts(relation: Relation, terms: Vec<Term>) -> Atom {
        debug_assert_eq!(relation.arity(), terms.len());
        Atom { relation, terms }
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    /// Arguments in declaration order.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// The argument at the named key.
    pub fn arg(&self, key: &str) -> Result<&Term, IrError> {
        let index = self
            .relation
            .index_of(key)
            .ok_or_else(|| IrError::UnknownKey {
                relation: self.relation.name().to_string(),
                key: key.to_string(),
            })?;
        Ok(&self.terms[index])
    }

    /// A new atom with the named argument replaced; sort-checked.
    pub fn with_arg(&self, key: &str, term: Term) -> Result<Atom, IrError> {
        let index = self
            .relation
            .index_of(key)
            .ok_or_else(|| IrError::UnknownKey {
                relation: self.relation.name().to_string(),
                key: key.to_string(),
            })?;
        let expected = &self.relation.args()[index].1;
        if term.sort() != expected {
            return Err(IrError::SortMismatch {
                expected: expected.name().to_string(),
                found: term.sort().name().to_string(),
                context: format!("argument {key} of {}", self.relation.name()),
            });
        }
        let mut terms = self.terms.clone();
        terms[index] = term;
        Ok(Atom {
            relation: self.relation.clone(),
            terms,
        })
    }

    /// Replace every occurrence of the named variable.
    pub fn substitute(&self, name: &str, replacement: &Term) -> Result<Atom, IrError> {
        let terms = self
            .terms
            .iter()
            .map(|t| t.substitute(name, replacement))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Atom {
            relation: self.relation.clone(),
            terms,
        })
    }

    /// Apply a whole assignment, one substitution per binding.
    pub fn substitute_all(&self, assignment: &Assignment) -> Result<Atom, IrError> {
        let mut atom = self.clone();
        for (name, term) in assignment {
            atom = atom.substitute(name, term)?;
        }
        Ok(atom)
    }

    /// Free variables across all arguments, deduplicated, in occurrence
    /// order.
    pub fn free_variables(&self) -> Vec<Term> {
        let mut out: Vec<Term> = Vec::new();
        for term in &self.terms {
            for v in term.free_variables() {
                if !out.contains(&v) {
                    out.push(v);
                }
            }
        }
        out
    }

    /// An atom is ground iff every argument is ground.
    pub fn is_ground(&self) -> bool {
        self.terms.iter().all(Term::is_ground)
    }
}

impl fmt::Display for Atom {
    /// `Name(a, b)` for prefix relations, `a SYMBOL b` for infix ones.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(symbol) = self.relation.infix_symbol() {
            write!(f, "{} {symbol} {}", self.terms[0], self.terms[1])
        } else {
            let args = self
                .terms
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "{}({args})", self.relation.name())
        }
    }
}

/// A body atom with polarity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Check {
    atom: Atom,
    negated: bool,
}

impl Check {
    pub fn positive(atom: Atom) -> Check {
        Check {
            atom,
            negated: false,
        }
    }

    pub fn negative(atom: Atom) -> Check {
        Check {
            atom,
            negated: true,
        }
    }

    pub fn atom(&self) -> &Atom {
        &self.atom
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn substitute(&self, name: &str, replacement: &Term) -> Result<Check, IrError> {
        Ok(Check {
            atom: self.atom.substitute(name, replacement)?,
            negated: self.negated,
        })
    }

    pub fn substitute_all(&self, assignment: &Assignment) -> Result<Check, IrError> {
        Ok(Check {
            atom: self.atom.substitute_all(assignment)?,
            negated: self.negated,
        })
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!{}", self.atom)
        } else {
            write!(f, "{}", self.atom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Sort;

    fn time() -> Sort {
        Sort::number("time")
    }

    fn condition() -> Sort {
        Sort::symbol("condition")
    }

    fn seq() -> Relation {
        Relation::new("Seq", vec![("t", time()), ("c", condition())]).unwrap()
    }

    fn seq_at(t: i64, c: &str) -> Atom {
        Atom::new(
            seq(),
            vec![
                ("t", Term::number(time(), t)),
                ("c", Term::symbol(condition(), c)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn renders_prefix_form() {
        assert_eq!(seq_at(3, "c").to_string(), "Seq(3, \"c\")");
    }

    #[test]
    fn renders_infix_form() {
        let lt = Relation::infix("TimeLt", "<", time()).unwrap();
        let atom = Atom::new(
            lt,
            vec![("lhs", time().var("a")), ("rhs", Term::number(time(), 4))],
        )
        .unwrap();
        assert_eq!(atom.to_string(), "a < 4");
        assert_eq!(Check::negative(atom).to_string(), "!a < 4");
    }

    #[test]
    fn new_rejects_unknown_key_and_wrong_sort() {
        let bad_key = Atom::new(
            seq(),
            vec![
                ("t", Term::number(time(), 3)),
                ("x", Term::symbol(condition(), "c")),
            ],
        );
        assert!(matches!(bad_key, Err(IrError::UnknownKey { .. })));

        let bad_sort = Atom::new(
            seq(),
            vec![
                ("t", Term::symbol(condition(), "oops")),
                ("c", Term::symbol(condition(), "c")),
            ],
        );
        assert!(matches!(bad_sort, Err(IrError::SortMismatch { .. })));
    }

    #[test]
    fn substitution_identity_when_absent() {
        let atom = seq_at(3, "c");
        let same = atom.substitute("t", &Term::number(time(), 9)).unwrap();
        assert_eq!(atom, same);
    }

    #[test]
    fn substitution_binds_all_occurrences() {
        let eq = Relation::infix("TimeEq", "=", time()).unwrap();
        let atom = Atom::new(
            eq,
            vec![("lhs", time().var("t")), ("rhs", time().var("t"))],
        )
        .unwrap();
        let bound = atom.substitute("t", &Term::number(time(), 2)).unwrap();
        assert!(bound.is_ground());
        assert_eq!(bound.to_string(), "2 = 2");
    }

    #[test]
    fn ground_iff_no_free_variables() {
        let ground = seq_at(3, "c");
        assert!(ground.is_ground());
        assert!(ground.free_variables().is_empty());

        let open = seq().free("g__");
        assert!(!open.is_ground());
        assert_eq!(open.free_variables().len(), 2);
    }

    #[test]
    fn with_arg_returns_new_atom() {
        let atom = seq_at(3, "c");
        let moved = atom.with_arg("t", Term::number(time(), 8)).unwrap();
        assert_eq!(atom.arg("t").unwrap().to_string(), "3");
        assert_eq!(moved.arg("t").unwrap().to_string(), "8");
    }
}
