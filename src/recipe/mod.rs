//! # Output-Program Emitter
//!
//! Renders a completed derivation tree as an executable recipe. Leaves
//! become initialisation lines replaying the recorded event data; steps
//! become computation lines wiring procedure calls to the names of their
//! dependencies. Names derive from breadcrumb paths; the root is named
//! `output`.

use std::collections::HashMap;

use thiserror::Error;

use crate::derivation::Tree;
use crate::ir::Atom;
use crate::protocol::Recorded;

/// Errors raised while rendering a recipe.
#[derive(Debug, Clone, Error)]
pub enum RecipeError {
    /// The tree still contains an open goal.
    #[error("derivation tree is incomplete: open goal {goal}")]
    OpenGoal { goal: String },

    /// A leaf's atom has no recorded data in the trace.
    #[error("no recorded event data for {atom}")]
    MissingTraceData { atom: String },
}

/// Render the output program for a completed tree.
///
/// Walks the tree in postorder; each distinct consequent is emitted once,
/// named after the breadcrumbs of its first visit. Two sections appear in
/// order: `# Load data` (initialisations) then `# Compute` (computations).
pub fn render(tree: &Tree, trace: &[Recorded]) -> Result<String, RecipeError> {
    let mut names: HashMap<Atom, String> = HashMap::new();
    let mut initializations: Vec<String> = Vec::new();
    let mut computations: Vec<String> = Vec::new();

    for (node, crumbs) in tree.postorder() {
        let head = node.consequent();
        if names.contains_key(head) {
            continue;
        }
        let name = if crumbs.is_empty() {
            "output".to_string()
        } else {
            crumbs.join("_")
        };
        names.insert(head.clone(), name.clone());

        match node {
            Tree::Goal { goal } => {
                return Err(RecipeError::OpenGoal {
                    goal: goal.to_string(),
                })
            }
            Tree::Leaf { fact } => {
                let recorded = trace.iter().find(|r| r.meta() == fact).ok_or_else(|| {
                    RecipeError::MissingTraceData {
                        atom: fact.to_string(),
                    }
                })?;
                initializations.push(format!(
                    "{name} = Value(d={}, m={})",
                    recorded.data(),
                    metadata_literal(fact)
                ));
            }
            Tree::Step {
                label, antecedents, ..
            } => {
                let args = antecedents
                    .iter()
                    .map(|(key, child)| {
                        let child_name = names
                            .get(child.consequent())
                            .map_or("_", String::as_str);
                        format!("{key}={child_name}")
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                computations.push(format!(
                    "{name} = Value(d={label}({args}), m={})",
                    metadata_literal(head)
                ));
            }
        }
    }

    let mut blocks = Vec::new();
    blocks.push("# Load data".to_string());
    blocks.push(String::new());
    blocks.extend(initializations);
    blocks.push(String::new());
    blocks.push("# Compute".to_string());
    blocks.push(String::new());
    blocks.extend(computations);

    Ok(blocks.join("\n"))
}

/// `Kind(key=value, ...)` rendering of a metadata atom.
fn metadata_literal(atom: &Atom) -> String {
    let args = atom
        .relation()
        .args()
        .iter()
        .zip(atom.terms())
        .map(|((key, _), term)| format!("{key}={term}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({args})", atom.relation().name())
}
