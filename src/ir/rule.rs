//! # Rules
//!
//! A [`Rule`] derives a head atom from an ordered set of named
//! dependencies (atoms whose relations correspond to external
//! computations) and an unordered set of checks (predicate atoms). The
//! label is the name of the originating procedure.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Atom, Check};

/// A labelled inference rule: `head :- dependencies, checks.`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    label: String,
    head: Atom,
    dependencies: Vec<(String, Atom)>,
    checks: Vec<Check>,
}

impl Rule {
    pub fn new(
        label: &str,
        head: Atom,
        dependencies: Vec<(String, Atom)>,
        checks: Vec<Check>,
    ) -> Rule {
        Rule {
            label: label.to_string(),
            head,
            dependencies,
            checks,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn head(&self) -> &Atom {
        &self.head
    }

    /// Named dependencies, in declaration order.
    pub fn dependencies(&self) -> &[(String, Atom)] {
        &self.dependencies
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// The rule body: dependencies (positive) followed by checks.
    pub fn body(&self) -> Vec<Check> {
        self.dependencies
            .iter()
            .map(|(_, atom)| Check::positive(atom.clone()))
            .chain(self.checks.iter().cloned())
            .collect()
    }
}

impl fmt::Display for Rule {
    /// `HEAD :-` followed by one two-space-indented body atom per line,
    /// terminated by a period.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :-", self.head)?;
        let body = self.body();
        for (i, check) in body.iter().enumerate() {
            let sep = if i + 1 == body.len() { "." } else { "," };
            write!(f, "\n  {check}{sep}")?;
        }
        Ok(())
    }
}
