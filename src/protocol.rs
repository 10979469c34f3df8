//! # Protocol Surface
//!
//! The user-program interface: a [`Protocol`] owns a domain library, the
//! ordered event trace, and a solver gateway. Events are recorded with
//! their metadata coordinates (`at`) and data payload (`where`-style JSON
//! object); posing a query runs feasibility, then interactive derivation,
//! then recipe rendering.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::derivation::{Constructor, DerivationError, Tree};
use crate::interact::Interact;
use crate::ir::{Atom, IrError, Program, Query, Sort, SortKind, Term};
use crate::library::{AnalysisKind, EventKind, Library};
use crate::recipe::{self, RecipeError};
use crate::solver::{Solver, SolverError};

/// Errors raised by the protocol surface.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Recorded data is not a JSON object.
    #[error("event data for '{kind}' must be an object")]
    DataShape { kind: String },

    /// Recorded data carries a field the kind does not declare.
    #[error("event data for '{kind}' has unexpected field '{field}'")]
    UnknownDataField { kind: String, field: String },

    /// Recorded data is missing a declared field.
    #[error("event data for '{kind}' is missing field '{field}'")]
    MissingDataField { kind: String, field: String },

    /// Fresh literals can only be minted for symbol sorts.
    #[error("cannot mint a fresh literal for number sort '{sort}'")]
    FreshSortKind { sort: String },

    #[error(transparent)]
    Ir(#[from] IrError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Derivation(#[from] DerivationError),

    #[error(transparent)]
    Recipe(#[from] RecipeError),
}

/// One trace entry: a ground metadata atom and the recorded data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    meta: Atom,
    data: serde_json::Value,
}

impl Recorded {
    pub fn new(meta: Atom, data: serde_json::Value) -> Recorded {
        Recorded { meta, data }
    }

    pub fn meta(&self) -> &Atom {
        &self.meta
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }
}

/// The observable result of a query.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The analysis is derivable: the derivation tree and its rendered
    /// output program.
    Feasible { tree: Tree, recipe: String },

    /// The analysis is not derivable from the recorded trace.
    Infeasible,
}

impl Outcome {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Outcome::Feasible { .. })
    }
}

/// An experiment in progress: recorded events plus the library that will
/// judge what can be derived from them.
pub struct Protocol {
    library: Library,
    trace: Vec<Recorded>,
    solver: Solver,
    counters: HashMap<String, usize>,
}

impl Protocol {
    /// A protocol over the default solver configuration.
    pub fn new(library: Library) -> Protocol {
        Protocol::with_config(library, &Config::default())
    }

    pub fn with_config(library: Library, config: &Config) -> Protocol {
        Protocol {
            library,
            trace: Vec::new(),
            solver: Solver::new(config.solver.clone()),
            counters: HashMap::new(),
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn trace(&self) -> &[Recorded] {
        &self.trace
    }

    /// Mint a fresh literal of a symbol sort: `c0`, `c1`, ... for a sort
    /// named `condition`. Counters are per sort and per protocol.
    pub fn fresh_symbol(&mut self, sort: &Sort) -> Result<Term, ProtocolError> {
        if sort.kind() != SortKind::Symbol {
            return Err(ProtocolError::FreshSortKind {
                sort: sort.name().to_string(),
            });
        }
        let counter = self.counters.entry(sort.name().to_string()).or_insert(0);
        let prefix = sort
            .name()
            .chars()
            .next()
            .map_or('x', |c| c.to_ascii_lowercase());
        let term = Term::symbol(sort.clone(), &format!("{prefix}{counter}"));
        *counter += 1;
        Ok(term)
    }

    /// Append a ground event to the trace.
    ///
    /// `at` supplies the metadata coordinates; `data` must be a JSON
    /// object carrying exactly the kind's declared data fields.
    pub fn record(
        &mut self,
        kind: &EventKind,
        at: Vec<(&str, Term)>,
        data: serde_json::Value,
    ) -> Result<(), ProtocolError> {
        let meta = Atom::new(kind.metadata().clone(), at)?;
        if !meta.is_ground() {
            return Err(ProtocolError::Ir(IrError::NonGroundEvent {
                atom: meta.to_string(),
            }));
        }

        let Some(fields) = data.as_object() else {
            return Err(ProtocolError::DataShape {
                kind: kind.name().to_string(),
            });
        };
        for declared in kind.data_fields() {
            if !fields.contains_key(declared) {
                return Err(ProtocolError::MissingDataField {
                    kind: kind.name().to_string(),
                    field: declared.clone(),
                });
            }
        }
        for field in fields.keys() {
            if !kind.data_fields().contains(field) {
                return Err(ProtocolError::UnknownDataField {
                    kind: kind.name().to_string(),
                    field: field.clone(),
                });
            }
        }

        debug!(event = %meta, "recorded event");
        self.trace.push(Recorded::new(meta, data));
        Ok(())
    }

    /// Ask whether an analysis is derivable and, when it is, construct a
    /// derivation tree and render its recipe.
    pub fn query(
        &self,
        kind: &AnalysisKind,
        at: Vec<(&str, Term)>,
        interactor: &mut dyn Interact,
    ) -> Result<Outcome, ProtocolError> {
        let goal = Atom::new(kind.metadata().clone(), at)?;
        let program = self.program()?;

        let feasibility = Query::from_atoms(vec![goal.clone()])?;
        let answers = self.solver.answer(&program, &feasibility)?;
        if answers.is_empty() {
            info!(goal = %goal, "analysis is not derivable");
            return Ok(Outcome::Infeasible);
        }
        info!(goal = %goal, answers = answers.len(), "analysis is derivable");

        let tree = Constructor::new(&program, &self.solver).construct(goal, interactor)?;
        let recipe = recipe::render(&tree, &self.trace)?;
        Ok(Outcome::Feasible { tree, recipe })
    }

    /// The reference program: the trace's metadata atoms plus the
    /// library's rules.
    pub fn program(&self) -> Result<Program, IrError> {
        Program::new(
            self.trace.iter().map(|r| r.meta().clone()).collect(),
            self.library.rules().to_vec(),
        )
    }
}
