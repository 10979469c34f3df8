//! # Programs
//!
//! A [`Program`] pairs the ground event trace with the rule set. On
//! construction it checks groundness, collects every relation in
//! first-occurrence order, rejects structurally-conflicting relations
//! sharing a name, and drops exact duplicate rules.

use serde::{Deserialize, Serialize};

use super::{Atom, IrError, Relation, Rule};

/// An event trace plus a rule set, with a consistent relation universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    events: Vec<Atom>,
    rules: Vec<Rule>,
    relations: Vec<Relation>,
}

impl Program {
    pub fn new(events: Vec<Atom>, rules: Vec<Rule>) -> Result<Program, IrError> {
        for event in &events {
            if !event.is_ground() {
                return Err(IrError::NonGroundEvent {
                    atom: event.to_string(),
                });
            }
        }

        // Identical rules registered twice (say, by merged libraries) are
        // kept once; distinct rules sharing a label are all kept.
        let mut deduped: Vec<Rule> = Vec::with_capacity(rules.len());
        for rule in rules {
            if !deduped.contains(&rule) {
                deduped.push(rule);
            }
        }

        let mut relations: Vec<Relation> = Vec::new();
        let mut note = |relation: &Relation| -> Result<(), IrError> {
            match relations.iter().find(|r| r.name() == relation.name()) {
                Some(existing) if existing == relation => Ok(()),
                Some(_) => Err(IrError::RelationConflict {
                    name: relation.name().to_string(),
                }),
                None => {
                    relations.push(relation.clone());
                    Ok(())
                }
            }
        };

        for event in &events {
            note(event.relation())?;
        }
        for rule in &deduped {
            note(rule.head().relation())?;
            for (_, dep) in rule.dependencies() {
                note(dep.relation())?;
            }
            for check in rule.checks() {
                note(check.atom().relation())?;
            }
        }

        Ok(Program {
            events,
            rules: deduped,
            relations,
        })
    }

    /// Ground event atoms, in recording order.
    pub fn events(&self) -> &[Atom] {
        &self.events
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Every relation used by the trace or the rules, first occurrence
    /// first, each exactly once.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Whether the atom occurs in the event trace.
    pub fn contains_event(&self, atom: &Atom) -> bool {
        self.events.contains(atom)
    }
}
