//! # Library Registry
//!
//! A [`Library`] accumulates the domain content the planner reasons with:
//! sorts, check relations, event and analysis kinds, and inference rules.
//! Registration is explicit - there is no global state, and loading order
//! is whatever the caller makes it. Libraries merge by union; relations
//! sharing a name must be structurally equal.

pub mod synthesis;

pub use synthesis::{KindRef, Precondition, Procedure};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::ir::{IrError, Relation, Rule, Sort};

/// Errors raised at registration time.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Two structurally different relations share a name.
    #[error("conflicting registrations for relation '{name}'")]
    RelationConflict { name: String },

    /// Two different sorts share a name.
    #[error("conflicting registrations for sort '{name}'")]
    SortConflict { name: String },

    /// A precondition declares the wrong number of parameters.
    #[error(
        "precondition for '{procedure}' declares {found} parameters, \
         expected {expected} (one per procedure input, plus 'ret')"
    )]
    PreconditionArity {
        procedure: String,
        expected: usize,
        found: usize,
    },

    /// A precondition parameter name does not match its procedure input.
    #[error(
        "precondition parameter {index} of '{procedure}' is named \
         '{found}', expected '{expected}'"
    )]
    ParamName {
        procedure: String,
        index: usize,
        expected: String,
        found: String,
    },

    /// A precondition parameter type is not its input's metadata relation.
    #[error(
        "precondition parameter '{param}' of '{procedure}' is typed over \
         relation '{found}', expected '{expected}'"
    )]
    ParamType {
        procedure: String,
        param: String,
        expected: String,
        found: String,
    },

    /// The trailing precondition parameter is not named `ret`.
    #[error("precondition for '{procedure}' must end with a parameter named 'ret', found '{found}'")]
    RetName { procedure: String, found: String },

    /// The `ret` parameter type is not the return kind's metadata relation.
    #[error(
        "precondition 'ret' of '{procedure}' is typed over relation \
         '{found}', expected '{expected}'"
    )]
    RetType {
        procedure: String,
        expected: String,
        found: String,
    },

    /// A negated check uses a variable no positive body atom binds.
    #[error("negated check in '{procedure}' uses unbound variable '{variable}'")]
    UnboundNegation { procedure: String, variable: String },

    /// Errors propagated from IR construction.
    #[error(transparent)]
    Ir(#[from] IrError),
}

/// An event kind: a metadata relation linked to the shape of the data
/// recorded alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventKind {
    name: String,
    metadata: Relation,
    data_fields: Vec<String>,
}

impl EventKind {
    pub fn new(metadata: Relation, data_fields: Vec<&str>) -> EventKind {
        EventKind {
            name: metadata.name().to_string(),
            metadata,
            data_fields: data_fields.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &Relation {
        &self.metadata
    }

    /// Field names the recorded data object must carry.
    pub fn data_fields(&self) -> &[String] {
        &self.data_fields
    }
}

/// An analysis kind: a metadata relation describing a derivable result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisKind {
    name: String,
    metadata: Relation,
}

impl AnalysisKind {
    pub fn new(metadata: Relation) -> AnalysisKind {
        AnalysisKind {
            name: metadata.name().to_string(),
            metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &Relation {
        &self.metadata
    }
}

/// A registry of sorts, kinds, and rules.
#[derive(Debug, Clone, Default)]
pub struct Library {
    sorts: Vec<Sort>,
    check_relations: Vec<Relation>,
    events: Vec<EventKind>,
    analyses: Vec<AnalysisKind>,
    rules: Vec<Rule>,
}

impl Library {
    pub fn new() -> Library {
        Library::default()
    }

    /// Register a sort. Re-registering an identical sort is a no-op;
    /// a different sort under the same name is a conflict.
    pub fn register_sort(&mut self, sort: Sort) -> Result<(), RegistryError> {
        match self.sorts.iter().find(|s| s.name() == sort.name()) {
            Some(existing) if *existing == sort => Ok(()),
            Some(_) => Err(RegistryError::SortConflict {
                name: sort.name().to_string(),
            }),
            None => {
                debug!(sort = sort.name(), "registered sort");
                self.sorts.push(sort);
                Ok(())
            }
        }
    }

    /// Register a predicate relation used in rule checks (infix
    /// comparisons, auxiliary relations, and the like).
    pub fn register_check_relation(&mut self, relation: Relation) -> Result<(), RegistryError> {
        self.note_relation(&relation)?;
        if !self.check_relations.contains(&relation) {
            debug!(relation = relation.name(), "registered check relation");
            self.check_relations.push(relation);
        }
        Ok(())
    }

    /// Register an event kind.
    pub fn register_event(&mut self, event: EventKind) -> Result<(), RegistryError> {
        self.note_relation(event.metadata())?;
        if !self.events.contains(&event) {
            debug!(event = event.name(), "registered event kind");
            self.events.push(event);
        }
        Ok(())
    }

    /// Register an analysis kind.
    pub fn register_analysis(&mut self, analysis: AnalysisKind) -> Result<(), RegistryError> {
        self.note_relation(analysis.metadata())?;
        if !self.analyses.contains(&analysis) {
            debug!(analysis = analysis.name(), "registered analysis kind");
            self.analyses.push(analysis);
        }
        Ok(())
    }

    /// Register a hand-built rule (auxiliary predicates and tests).
    ///
    /// Duplicate labels are permitted; identical rules collapse when the
    /// program is assembled.
    pub fn register_rule(&mut self, rule: Rule) {
        debug!(label = rule.label(), "registered rule");
        self.rules.push(rule);
    }

    /// Synthesise a rule from a typed procedure and its precondition, then
    /// register it. See [`synthesis`] for the validation performed.
    pub fn declare_rule(
        &mut self,
        procedure: &Procedure,
        precondition: &Precondition,
    ) -> Result<(), RegistryError> {
        let rule = synthesis::synthesize(procedure, precondition)?;
        self.register_rule(rule);
        Ok(())
    }

    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    pub fn events(&self) -> &[EventKind] {
        &self.events
    }

    pub fn analyses(&self) -> &[AnalysisKind] {
        &self.analyses
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Every registered metadata and check relation.
    pub fn relations(&self) -> Vec<&Relation> {
        self.events
            .iter()
            .map(EventKind::metadata)
            .chain(self.analyses.iter().map(AnalysisKind::metadata))
            .chain(self.check_relations.iter())
            .collect()
    }

    /// Look up an event kind by name.
    pub fn event(&self, name: &str) -> Option<&EventKind> {
        self.events.iter().find(|e| e.name() == name)
    }

    /// Look up an analysis kind by name.
    pub fn analysis(&self, name: &str) -> Option<&AnalysisKind> {
        self.analyses.iter().find(|a| a.name() == name)
    }

    /// Union of several libraries. Relations sharing a name must agree
    /// structurally across all of them.
    pub fn merge(libraries: impl IntoIterator<Item = Library>) -> Result<Library, RegistryError> {
        let mut merged = Library::new();
        for library in libraries {
            for sort in library.sorts {
                merged.register_sort(sort)?;
            }
            for relation in library.check_relations {
                merged.register_check_relation(relation)?;
            }
            for event in library.events {
                merged.register_event(event)?;
            }
            for analysis in library.analyses {
                merged.register_analysis(analysis)?;
            }
            for rule in library.rules {
                merged.register_rule(rule);
            }
        }
        Ok(merged)
    }

    fn note_relation(&self, relation: &Relation) -> Result<(), RegistryError> {
        let clash = self
            .relations()
            .into_iter()
            .find(|r| r.name() == relation.name() && *r != relation);
        match clash {
            Some(_) => Err(RegistryError::RelationConflict {
                name: relation.name().to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time() -> Sort {
        Sort::number("time")
    }

    fn seq_kind() -> EventKind {
        let metadata = Relation::new("Seq", vec![("t", time())]).unwrap();
        EventKind::new(metadata, vec!["path"])
    }

    #[test]
    fn duplicate_registration_is_idempotent() {
        let mut lib = Library::new();
        lib.register_event(seq_kind()).unwrap();
        lib.register_event(seq_kind()).unwrap();
        assert_eq!(lib.events().len(), 1);
    }

    #[test]
    fn conflicting_relation_rejected() {
        let mut lib = Library::new();
        lib.register_event(seq_kind()).unwrap();

        let other = Relation::new("Seq", vec![("day", time())]).unwrap();
        let result = lib.register_analysis(AnalysisKind::new(other));
        assert!(matches!(
            result,
            Err(RegistryError::RelationConflict { .. })
        ));
    }

    #[test]
    fn conflicting_sort_rejected() {
        let mut lib = Library::new();
        lib.register_sort(time()).unwrap();
        lib.register_sort(time()).unwrap();
        assert_eq!(lib.sorts().len(), 1);
        assert!(matches!(
            lib.register_sort(Sort::symbol("time")),
            Err(RegistryError::SortConflict { .. })
        ));
    }

    #[test]
    fn merge_unions_content() {
        let mut a = Library::new();
        a.register_event(seq_kind()).unwrap();

        let mut b = Library::new();
        b.register_event(seq_kind()).unwrap();
        let score = Relation::new("Score", vec![("t", time())]).unwrap();
        b.register_analysis(AnalysisKind::new(score)).unwrap();

        let merged = Library::merge([a, b]).unwrap();
        assert_eq!(merged.events().len(), 1);
        assert_eq!(merged.analyses().len(), 1);
    }
}
