//! # Queries
//!
//! A [`Query`] is a conjunction of body atoms. Its free variables, in
//! first-occurrence order, define a synthetic `Goal` relation of matching
//! arity; answering the query yields one [`Assignment`] per satisfying
//! tuple.

use serde::{Deserialize, Serialize};

use super::{Assignment, Atom, Check, IrError, Relation, Term};

/// Name of the synthetic result relation. Always output, never declared by
/// user code.
pub const GOAL_RELATION: &str = "Goal";

/// A conjunctive query with a synthesised goal relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    body: Vec<Check>,
    goal: Relation,
    head: Atom,
}

impl Query {
    /// Build a query from a body of checks.
    ///
    /// Free variables are collected from positive body atoms in
    /// first-occurrence order. Variables occurring only under negation
    /// have no binding occurrence and are rejected.
    pub fn new(body: Vec<Check>) -> Result<Query, IrError> {
        let mut free: Vec<Term> = Vec::new();
        for check in body.iter().filter(|c| !c.is_negated()) {
            for v in check.atom().free_variables() {
                if !free.contains(&v) {
                    free.push(v);
                }
            }
        }
        for check in body.iter().filter(|c| c.is_negated()) {
            for v in check.atom().free_variables() {
                if !free.contains(&v) {
                    let Term::Variable { name, .. } = v else {
                        continue;
                    };
                    return Err(IrError::UngroundedNegation { variable: name });
                }
            }
        }

        let args = free
            .iter()
            .map(|v| match v {
                Term::Variable { name, sort } => (name.as_str(), sort.clone()),
                Term::Literal { .. } => unreachable!("free_variables returns variables"),
            })
            .collect::<Vec<_>>();
        let goal = Relation::new(GOAL_RELATION, args)?;
        let head = Atom::from_parts(goal.clone(), free);
        Ok(Query { body, goal, head })
    }

    /// Convenience: a query over positive atoms only.
    pub fn from_atoms(atoms: Vec<Atom>) -> Result<Query, IrError> {
        Query::new(atoms.into_iter().map(Check::positive).collect())
    }

    pub fn body(&self) -> &[Check] {
        &self.body
    }

    /// The synthetic goal relation; its arity equals the query's free
    /// variables.
    pub fn goal_relation(&self) -> &Relation {
        &self.goal
    }

    /// The goal head atom, `Goal(v1, ..., vk)`.
    pub fn head(&self) -> &Atom {
        &self.head
    }

    /// Interpret one tabular output row as a typed assignment, one cell
    /// per goal argument in declared order.
    pub fn parse_row(&self, cells: &[String]) -> Result<Assignment, IrError> {
        if cells.len() != self.goal.arity() {
            return Err(IrError::ArityMismatch {
                relation: self.goal.name().to_string(),
                expected: self.goal.arity(),
                found: cells.len(),
            });
        }
        let mut assignment = Assignment::new();
        for ((key, sort), cell) in self.goal.args().iter().zip(cells) {
            assignment.insert(key.clone(), sort.parse(cell)?);
        }
        Ok(assignment)
    }
}
