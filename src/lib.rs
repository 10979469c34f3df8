//! # Protoplan
//!
//! An experimental-protocol planner. Users record an ordered sequence of
//! protocol events (with domain coordinates such as time points and
//! conditions) and pose an analysis query; the planner reduces
//! feasibility to a Datalog satisfiability problem, and - when feasible -
//! interactively synthesises a concrete derivation tree and renders a
//! runnable recipe from it.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Domain library (kinds + procedures + preconditions)
//!     ↓
//! [Rule Synthesis]      → typed rules over metadata relations
//!     ↓
//! Protocol (event trace) + Query (analysis goal)
//!     ↓
//! [Emitter]             → Datalog source text
//!     ↓
//! [Solver Gateway]      → external solver, tabular facts back in
//!     ↓
//! [Derivation Engine]   → goal-directed tree, solver as oracle
//!     ↓
//! [Recipe Emitter]      → output program text
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use protoplan::interact::PolicyInteractor;
//! use protoplan::protocol::{Outcome, Protocol};
//! use protoplan::stdbio::StdBio;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bio = StdBio::new()?;
//! let mut p = Protocol::new(bio.library()?);
//!
//! let c = p.fresh_symbol(&bio.condition)?;
//! p.record(
//!     &bio.infect,
//!     vec![("t", bio.day(1)), ("c", c.clone())],
//!     json!({"library": "library1.csv"}),
//! )?;
//! for day in [3, 5, 7] {
//!     p.record(
//!         &bio.seq,
//!         vec![("t", bio.day(day)), ("c", c.clone())],
//!         json!({"path": format!("seq-day{day}.csv")}),
//!     )?;
//! }
//!
//! let mut interactor = PolicyInteractor::automatic();
//! let outcome = p.query(
//!     &bio.phenotype_score,
//!     vec![("ti", bio.day(3)), ("tf", bio.day(5)), ("c", c)],
//!     &mut interactor,
//! )?;
//! match outcome {
//!     Outcome::Feasible { recipe, .. } => println!(">>> Possible! <<<\n\n{recipe}"),
//!     Outcome::Infeasible => println!(">>> Not possible! <<<"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `ir` | Sorts, terms, relations, atoms, rules, queries, programs |
//! | `library` | Registry of kinds and rules; rule synthesis |
//! | `emit` | Program + query → Datalog source text |
//! | `solver` | Scratch dir, subprocess, tabular output parsing |
//! | `derivation` | Trees and the interactive constructor |
//! | `interact` | Manual and policy-driven selection surfaces |
//! | `recipe` | Completed tree → output program |
//! | `protocol` | User surface: record events, pose queries |
//! | `stdbio` | Bundled CRISPR-screen domain library |
//! | `config` | Layered configuration (TOML + env) |

pub mod config;
pub mod derivation;
pub mod emit;
pub mod interact;
pub mod ir;
pub mod library;
pub mod protocol;
pub mod recipe;
pub mod solver;
pub mod stdbio;

// Re-export the main surface types for convenience
pub use config::{Config, InteractionConfig, SolverConfig};
pub use derivation::{Breadcrumbs, Constructor, DerivationError, Tree};
pub use emit::EmitError;
pub use interact::{
    CliInteractor, Interact, InteractError, Mode, PathedGoal, PolicyInteractor, RuleChoice, Silent,
};
pub use ir::{
    sanitize_ident, Assignment, Atom, Check, IrError, LitValue, Program, Query, Relation, Rule,
    Sort, SortKind, Term, GOAL_RELATION,
};
pub use library::{
    AnalysisKind, EventKind, KindRef, Library, Precondition, Procedure, RegistryError,
};
pub use protocol::{Outcome, Protocol, ProtocolError, Recorded};
pub use recipe::RecipeError;
pub use solver::{Solver, SolverError, SolverOutput};
pub use stdbio::StdBio;
