//! # Derivation Engine
//!
//! Given a program that already proved a query satisfiable, the
//! [`Constructor`] materialises one concrete derivation tree. At each
//! iteration it gathers open goals, lets the interaction surface pick one,
//! probes every rule whose head relation matches by running the rule's
//! specialised body as a query against the reference program (the Datalog
//! program acts as the oracle for rule applicability), and grafts the
//! chosen step into the tree. The loop ends when every branch bottoms out
//! in a trace leaf.

mod tree;

pub use tree::{Breadcrumbs, Tree};

use thiserror::Error;
use tracing::debug;

use crate::interact::{Interact, InteractError, RuleChoice};
use crate::ir::{Assignment, Atom, IrError, Program, Query, Rule, Term};
use crate::solver::{Solver, SolverError};

/// Errors raised during tree construction and navigation.
#[derive(Debug, Error)]
pub enum DerivationError {
    /// Breadcrumbs named a child that does not exist.
    #[error("invalid breadcrumbs: no child under key '{key}'")]
    InvalidPath { key: String },

    /// Breadcrumbs landed on (or passed through) a leaf.
    #[error("cannot replace a leaf of a derivation tree")]
    ReplaceLeaf,

    /// No registered rule applies to the selected goal.
    #[error("no applicable rule for goal {goal}")]
    NoApplicableRule { goal: String },

    /// The interactor returned an index outside the offered range.
    #[error("{hook} selection {index} out of range (limit {limit})")]
    SelectionOutOfRange {
        hook: &'static str,
        index: usize,
        limit: usize,
    },

    /// The interactor picked a rule whose option list is empty.
    #[error("rule '{label}' has no satisfying assignments for this goal")]
    InapplicableRule { label: String },

    /// A rule head carries a literal where a variable is required.
    #[error("rule '{label}' has a non-variable head argument")]
    RuleShape { label: String },

    #[error(transparent)]
    Ir(#[from] IrError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Interact(#[from] InteractError),
}

/// Goal-directed tree construction over a reference program.
pub struct Constructor<'a> {
    program: &'a Program,
    solver: &'a Solver,
}

impl<'a> Constructor<'a> {
    pub fn new(program: &'a Program, solver: &'a Solver) -> Constructor<'a> {
        Constructor { program, solver }
    }

    /// Expand an initial open goal into a complete derivation tree.
    ///
    /// Progress requires the interactor to pick rules with non-empty
    /// option lists; feasibility of the initial goal guarantees at least
    /// one exists at every step.
    pub fn construct(
        &self,
        initial_goal: Atom,
        interactor: &mut dyn Interact,
    ) -> Result<Tree, DerivationError> {
        let mut tree = Tree::goal(initial_goal);
        loop {
            interactor.observe_tree(&tree);

            let goals = tree.goals();
            if goals.is_empty() {
                return Ok(tree);
            }

            let goal_index = interactor.select_goal(&goals)?;
            let (goal, crumbs) =
                goals
                    .get(goal_index)
                    .ok_or(DerivationError::SelectionOutOfRange {
                        hook: "goal",
                        index: goal_index,
                        limit: goals.len(),
                    })?;

            let mut choices: Vec<RuleChoice<'_>> = Vec::new();
            for rule in self
                .program
                .rules()
                .iter()
                .filter(|r| r.head().relation() == goal.relation())
            {
                let options = self.rule_options(goal, rule)?;
                debug!(
                    rule = rule.label(),
                    options = options.len(),
                    goal = %goal,
                    "probed rule"
                );
                choices.push(RuleChoice { rule, options });
            }
            if choices.iter().all(|c| c.options.is_empty()) {
                return Err(DerivationError::NoApplicableRule {
                    goal: goal.to_string(),
                });
            }

            let rule_index = interactor.select_rule(&choices)?;
            let choice =
                choices
                    .get(rule_index)
                    .ok_or(DerivationError::SelectionOutOfRange {
                        hook: "rule",
                        index: rule_index,
                        limit: choices.len(),
                    })?;
            if choice.options.is_empty() {
                return Err(DerivationError::InapplicableRule {
                    label: choice.rule.label().to_string(),
                });
            }

            let assignment_index = interactor.select_assignment(&choice.options)?;
            let assignment = choice.options.get(assignment_index).ok_or(
                DerivationError::SelectionOutOfRange {
                    hook: "assignment",
                    index: assignment_index,
                    limit: choice.options.len(),
                },
            )?;

            let step = self.make_step(goal, choice.rule, assignment)?;
            tree = tree.replace(crumbs, step)?;
        }
    }

    /// Satisfying assignments for one rule against one goal: substitute
    /// each head variable by the goal's corresponding argument, then run
    /// the specialised body as a query over the remaining free variables.
    pub fn rule_options(
        &self,
        goal: &Atom,
        rule: &Rule,
    ) -> Result<Vec<Assignment>, DerivationError> {
        let binding = head_binding(goal, rule)?;
        let body = rule
            .body()
            .iter()
            .map(|check| check.substitute_all(&binding))
            .collect::<Result<Vec<_>, _>>()?;
        let query = Query::new(body)?;
        Ok(self.solver.answer(self.program, &query)?)
    }

    /// A step for the chosen rule: the consequent keeps the goal's own
    /// free variables; each dependency is specialised with the goal
    /// unification plus the chosen assignment, then wrapped as a leaf
    /// when it occurs in the trace and as a fresh open goal otherwise.
    fn make_step(
        &self,
        goal: &Atom,
        rule: &Rule,
        assignment: &Assignment,
    ) -> Result<Tree, DerivationError> {
        let binding = head_binding(goal, rule)?;
        let mut antecedents = Vec::with_capacity(rule.dependencies().len());
        for (key, dependency) in rule.dependencies() {
            let atom = dependency
                .substitute_all(&binding)?
                .substitute_all(assignment)?;
            let child = if self.program.contains_event(&atom) {
                Tree::leaf(atom)
            } else {
                Tree::goal(atom)
            };
            antecedents.push((key.clone(), child));
        }
        Ok(Tree::step(rule.label(), goal.clone(), antecedents))
    }
}

/// The unifying assignment from a rule's head variables to the goal's
/// arguments. Synthesised rule heads are all-variable; anything else is a
/// malformed rule.
fn head_binding(goal: &Atom, rule: &Rule) -> Result<Assignment, DerivationError> {
    let mut binding = Assignment::new();
    for (key, _) in rule.head().relation().args() {
        match rule.head().arg(key)? {
            Term::Variable { name, .. } => {
                binding.insert(name.clone(), goal.arg(key)?.clone());
            }
            Term::Literal { .. } => {
                return Err(DerivationError::RuleShape {
                    label: rule.label().to_string(),
                })
            }
        }
    }
    Ok(binding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Relation, Sort};

    fn time() -> Sort {
        Sort::number("time")
    }

    fn score() -> Relation {
        Relation::new("Score", vec![("ti", time()), ("tf", time())]).unwrap()
    }

    #[test]
    fn head_binding_maps_head_variables_to_goal_arguments() {
        let rule = Rule::new("derive", score().free("ret__"), vec![], vec![]);
        let goal = Atom::new(
            score(),
            vec![
                ("ti", Term::number(time(), 3)),
                ("tf", Term::number(time(), 8)),
            ],
        )
        .unwrap();
        let binding = head_binding(&goal, &rule).unwrap();
        assert_eq!(binding["ret__ti"], Term::number(time(), 3));
        assert_eq!(binding["ret__tf"], Term::number(time(), 8));
    }

    #[test]
    fn head_binding_rejects_literal_heads() {
        let head = Atom::new(
            score(),
            vec![
                ("ti", Term::number(time(), 1)),
                ("tf", time().var("ret__tf")),
            ],
        )
        .unwrap();
        let rule = Rule::new("derive", head, vec![], vec![]);
        let goal = score().free("g__");
        assert!(matches!(
            head_binding(&goal, &rule),
            Err(DerivationError::RuleShape { .. })
        ));
    }
}
