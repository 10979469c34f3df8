//! # Derivation Trees
//!
//! A rooted proof tree whose nodes are open goals, rule steps, or trace
//! leaves. Trees are persistent: expansion produces a new tree with a
//! single subtree replaced. Paths through a tree (breadcrumbs) are
//! sequences of dependency keys from the root, passed by value.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::DerivationError;
use crate::ir::Atom;

/// A path from the root: one dependency key per step down.
pub type Breadcrumbs = Vec<String>;

/// A node in a derivation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tree {
    /// An atom still to be proved.
    Goal { goal: Atom },

    /// A rule application: the consequent follows from the labelled
    /// rule's dependencies, one subtree per dependency key.
    Step {
        label: String,
        consequent: Atom,
        antecedents: Vec<(String, Tree)>,
    },

    /// A ground event atom drawn from the trace. Terminal.
    Leaf { fact: Atom },
}

impl Tree {
    pub fn goal(goal: Atom) -> Tree {
        Tree::Goal { goal }
    }

    pub fn step(label: &str, consequent: Atom, antecedents: Vec<(String, Tree)>) -> Tree {
        Tree::Step {
            label: label.to_string(),
            consequent,
            antecedents,
        }
    }

    pub fn leaf(fact: Atom) -> Tree {
        Tree::Leaf { fact }
    }

    /// The atom this node stands for.
    pub fn consequent(&self) -> &Atom {
        match self {
            Tree::Goal { goal } => goal,
            Tree::Step { consequent, .. } => consequent,
            Tree::Leaf { fact } => fact,
        }
    }

    /// Child subtrees with their dependency keys.
    pub fn children(&self) -> &[(String, Tree)] {
        match self {
            Tree::Step { antecedents, .. } => antecedents,
            Tree::Goal { .. } | Tree::Leaf { .. } => &[],
        }
    }

    /// All open goals paired with their breadcrumbs, in tree order.
    pub fn goals(&self) -> Vec<(Atom, Breadcrumbs)> {
        let mut out = Vec::new();
        self.collect_goals(&mut Vec::new(), &mut out);
        out
    }

    fn collect_goals(&self, path: &mut Breadcrumbs, out: &mut Vec<(Atom, Breadcrumbs)>) {
        match self {
            Tree::Goal { goal } => out.push((goal.clone(), path.clone())),
            Tree::Leaf { .. } => {}
            Tree::Step { antecedents, .. } => {
                for (key, child) in antecedents {
                    path.push(key.clone());
                    child.collect_goals(path, out);
                    path.pop();
                }
            }
        }
    }

    /// A new tree with the subtree at `path` replaced.
    ///
    /// Descends by dependency key; a key with no matching child is a
    /// fatal navigation error, and leaves may not be replaced.
    pub fn replace(&self, path: &[String], subtree: Tree) -> Result<Tree, DerivationError> {
        if let Tree::Leaf { .. } = self {
            return Err(DerivationError::ReplaceLeaf);
        }
        let Some((key, rest)) = path.split_first() else {
            return Ok(subtree);
        };
        let Tree::Step {
            label,
            consequent,
            antecedents,
        } = self
        else {
            return Err(DerivationError::InvalidPath { key: key.clone() });
        };
        let mut replaced = false;
        let mut new_antecedents = Vec::with_capacity(antecedents.len());
        for (child_key, child) in antecedents {
            if child_key == key {
                new_antecedents.push((child_key.clone(), child.replace(rest, subtree.clone())?));
                replaced = true;
            } else {
                new_antecedents.push((child_key.clone(), child.clone()));
            }
        }
        if !replaced {
            return Err(DerivationError::InvalidPath { key: key.clone() });
        }
        Ok(Tree::Step {
            label: label.clone(),
            consequent: consequent.clone(),
            antecedents: new_antecedents,
        })
    }

    /// Subtrees depth-first, children before parents, each paired with
    /// its breadcrumbs; the root comes last.
    pub fn postorder(&self) -> Vec<(&Tree, Breadcrumbs)> {
        let mut out = Vec::new();
        self.collect_postorder(&mut Vec::new(), &mut out);
        out
    }

    fn collect_postorder<'a>(
        &'a self,
        path: &mut Breadcrumbs,
        out: &mut Vec<(&'a Tree, Breadcrumbs)>,
    ) {
        for (key, child) in self.children() {
            path.push(key.clone());
            child.collect_postorder(path, out);
            path.pop();
        }
        out.push((self, path.clone()));
    }

    fn render(&self, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "-".repeat(depth);
        let pad = if depth == 0 { "" } else { " " };
        match self {
            Tree::Goal { goal } => write!(f, "{indent}{pad}*** {goal}"),
            Tree::Leaf { fact } => write!(f, "{indent}{pad}[leaf] {fact}"),
            Tree::Step {
                label,
                consequent,
                antecedents,
            } => {
                write!(f, "{indent}{pad}[{label}] {consequent}")?;
                for (_, child) in antecedents {
                    writeln!(f)?;
                    child.render(depth + 1, f)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(0, f)
    }
}
