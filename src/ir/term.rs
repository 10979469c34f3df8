//! # Sorts and Terms
//!
//! A [`Sort`] is a named semantic type mapped onto a Datalog primitive
//! (`number` or `symbol`). A [`Term`] is either a sorted variable or a
//! sorted literal value. Terms are immutable; substitution returns a new
//! term.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{sanitize_ident, IrError};

/// The Datalog primitive backing a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKind {
    /// Signed integers, rendered as decimal digits.
    Number,
    /// Interned strings, rendered double-quoted.
    Symbol,
}

impl SortKind {
    /// The type name used in `.decl` lines.
    pub fn dl_type(self) -> &'static str {
        match self {
            SortKind::Number => "number",
            SortKind::Symbol => "symbol",
        }
    }
}

/// A named semantic type for terms.
///
/// Two sorts are equal iff they have the same name and the same backing
/// primitive; distinct semantic types (say, `time` and `replicate`) stay
/// distinct even when both are numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    name: String,
    kind: SortKind,
}

impl Sort {
    /// A number-backed sort.
    pub fn number(name: &str) -> Sort {
        Sort {
            name: sanitize_ident(name),
            kind: SortKind::Number,
        }
    }

    /// A symbol-backed sort.
    pub fn symbol(name: &str) -> Sort {
        Sort {
            name: sanitize_ident(name),
            kind: SortKind::Symbol,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SortKind {
        self.kind
    }

    /// Parse one tabular-output cell into a literal term of this sort.
    pub fn parse(&self, cell: &str) -> Result<Term, IrError> {
        match self.kind {
            SortKind::Number => {
                let n = cell.trim().parse::<i64>().map_err(|_| IrError::ParseLiteral {
                    sort: self.name.clone(),
                    value: cell.to_string(),
                })?;
                Ok(Term::number(self.clone(), n))
            }
            SortKind::Symbol => Ok(Term::symbol(self.clone(), cell)),
        }
    }

    /// A fresh variable term of this sort.
    pub fn var(&self, name: &str) -> Term {
        Term::Variable {
            name: sanitize_ident(name),
            sort: self.clone(),
        }
    }
}

/// The payload of a literal term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LitValue {
    Number(i64),
    Symbol(String),
}

/// A variable or literal value of some sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    Variable { name: String, sort: Sort },
    Literal { value: LitValue, sort: Sort },
}

impl Term {
    /// A number literal.
    pub fn number(sort: Sort, value: i64) -> Term {
        debug_assert_eq!(sort.kind(), SortKind::Number);
        Term::Literal {
            value: LitValue::Number(value),
            sort,
        }
    }

    /// A symbol literal.
    pub fn symbol(sort: Sort, value: &str) -> Term {
        debug_assert_eq!(sort.kind(), SortKind::Symbol);
        Term::Literal {
            value: LitValue::Symbol(value.to_string()),
            sort,
        }
    }

    pub fn sort(&self) -> &Sort {
        match self {
            Term::Variable { sort, .. } | Term::Literal { sort, .. } => sort,
        }
    }

    /// Literals are ground; variables are not.
    pub fn is_ground(&self) -> bool {
        matches!(self, Term::Literal { .. })
    }

    /// The free variables of this term, in occurrence order.
    pub fn free_variables(&self) -> Vec<Term> {
        match self {
            Term::Variable { .. } => vec![self.clone()],
            Term::Literal { .. } => Vec::new(),
        }
    }

    /// Replace the named variable by `replacement`, returning a new term.
    ///
    /// Substituting a variable by a term of a different sort is a
    /// programming error and fails fast.
    pub fn substitute(&self, name: &str, replacement: &Term) -> Result<Term, IrError> {
        match self {
            Term::Variable { name: n, sort } if n == name => {
                if replacement.sort() != sort {
                    return Err(IrError::SortMismatch {
                        expected: sort.name().to_string(),
                        found: replacement.sort().name().to_string(),
                        context: format!("substituting variable {n}"),
                    });
                }
                Ok(replacement.clone())
            }
            _ => Ok(self.clone()),
        }
    }
}

impl fmt::Display for Term {
    /// Datalog surface rendering: variables by name, numbers as decimal
    /// digits, symbols double-quoted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable { name, .. } => write!(f, "{name}"),
            Term::Literal { value, .. } => match value {
                LitValue::Number(n) => write!(f, "{n}"),
                LitValue::Symbol(s) => {
                    write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
                }
            },
        }
    }
}
