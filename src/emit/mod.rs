//! # Datalog Emission
//!
//! Serialises a [`Program`] and a [`Query`] to the Datalog source text the
//! external solver consumes. Blocks appear in a fixed order:
//!
//! 1. `.decl` lines, one per non-infix relation, in first-occurrence
//!    order across the program and then the query.
//! 2. Rules, each preceded by a `//` comment carrying its label.
//! 3. Ground event atoms, each terminated by `.`.
//! 4. The query block: the `Goal` declaration and `.output` marker, then
//!    the goal rule.
//!
//! Infix relations have no declaration line and can never be outputs.

use thiserror::Error;

use crate::ir::{Check, Program, Query, Relation};

/// Errors raised during emission.
#[derive(Debug, Clone, Error)]
pub enum EmitError {
    /// An infix relation was requested as an output.
    #[error("infix relation '{relation}' cannot be an output")]
    InfixOutput { relation: String },

    /// Two structurally different relations share a name across the
    /// program and query.
    #[error("conflicting declarations for relation '{name}'")]
    RelationConflict { name: String },
}

/// Render the complete source text for a program and query.
pub fn render(program: &Program, query: &Query) -> Result<String, EmitError> {
    let mut blocks: Vec<String> = Vec::new();

    let mut decls = declaration_order(program, query)?;
    blocks.append(&mut decls);
    blocks.push(String::new());

    for rule in program.rules() {
        blocks.push(format!("// {}", rule.label()));
        blocks.push(format!("{rule}"));
        blocks.push(String::new());
    }

    for event in program.events() {
        blocks.push(format!("{event}."));
    }
    blocks.push(String::new());

    blocks.push(output_decl(query)?);
    blocks.push(String::new());
    blocks.push(rule_text(&query.head().to_string(), query.body()));
    blocks.push(String::new());

    Ok(blocks.join("\n"))
}

/// `.decl` lines in first-occurrence order: program relations first, then
/// any relation the query introduces. Infix relations are skipped.
fn declaration_order(program: &Program, query: &Query) -> Result<Vec<String>, EmitError> {
    let mut seen: Vec<&Relation> = Vec::new();
    let mut lines = Vec::new();

    let query_relations = query.body().iter().map(|c| c.atom().relation());
    for relation in program.relations().iter().chain(query_relations) {
        match seen.iter().find(|r| r.name() == relation.name()) {
            Some(existing) if **existing == *relation => continue,
            Some(_) => {
                return Err(EmitError::RelationConflict {
                    name: relation.name().to_string(),
                })
            }
            None => {}
        }
        seen.push(relation);
        if let Some(decl) = relation.decl() {
            lines.push(decl);
        }
    }
    Ok(lines)
}

/// The goal declaration plus its `.output` marker.
fn output_decl(query: &Query) -> Result<String, EmitError> {
    let goal = query.goal_relation();
    let Some(decl) = goal.decl() else {
        return Err(EmitError::InfixOutput {
            relation: goal.name().to_string(),
        });
    };
    Ok(format!("{decl}\n.output {}", goal.name()))
}

/// `HEAD :-` then one indented body atom per line, period-terminated.
fn rule_text(head: &str, body: &[Check]) -> String {
    let mut out = format!("{head} :-");
    for (i, check) in body.iter().enumerate() {
        let sep = if i + 1 == body.len() { "." } else { "," };
        out.push_str(&format!("\n  {check}{sep}"));
    }
    out
}
