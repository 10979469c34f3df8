//! # Solver Gateway
//!
//! Runs the external Datalog solver over emitted source text and parses
//! its tabular output back into typed assignments. Each call owns a
//! scratch directory whose lifetime is exactly the call: the source is
//! written to `program.dl` inside it, the solver runs with that working
//! directory, and the directory is removed on every exit path.

use std::collections::HashMap;
use std::fs;
use std::process::{Command, Stdio};
use std::time::Instant;

use thiserror::Error;
use tracing::debug;

use crate::config::SolverConfig;
use crate::emit::{self, EmitError};
use crate::ir::{Assignment, IrError, Program, Query};

/// Errors raised while consulting the oracle.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The solver binary could not be started.
    #[error("failed to launch solver '{binary}': {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The solver exited non-zero without producing any output file.
    #[error("solver exited with {status} and produced no output")]
    Oracle { status: String },

    /// Scratch directory or output file I/O failed.
    #[error("solver I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The program or query could not be serialised.
    #[error(transparent)]
    Emit(#[from] EmitError),

    /// An output row did not match the goal relation's shape.
    #[error(transparent)]
    Ir(#[from] IrError),
}

/// Raw solver output: output-relation name to rows of raw cells.
#[derive(Debug, Clone, Default)]
pub struct SolverOutput {
    facts: HashMap<String, Vec<Vec<String>>>,
}

impl SolverOutput {
    /// Rows for one output relation; empty when the relation produced no
    /// facts (or no file).
    pub fn relation(&self, name: &str) -> &[Vec<String>] {
        self.facts.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.facts.keys().map(String::as_str)
    }
}

/// The gateway to the external solver.
#[derive(Debug, Clone)]
pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Solver {
        Solver { config }
    }

    /// A gateway with the default configuration (`souffle -D .`).
    pub fn with_defaults() -> Solver {
        Solver::new(SolverConfig::default())
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Run the solver over raw source text and harvest its output files.
    pub fn run(&self, source: &str) -> Result<SolverOutput, SolverError> {
        let scratch = tempfile::tempdir()?;
        let program_path = scratch.path().join("program.dl");
        fs::write(&program_path, source)?;

        let started = Instant::now();
        let status = Command::new(&self.config.binary)
            .args(&self.config.args)
            .arg("program.dl")
            .current_dir(scratch.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| SolverError::Launch {
                binary: self.config.binary.clone(),
                source,
            })?;

        let mut facts: HashMap<String, Vec<Vec<String>>> = HashMap::new();
        for entry in fs::read_dir(scratch.path())? {
            let path = entry?.path();
            let is_output = path
                .extension()
                .is_some_and(|ext| ext == self.config.output_extension.as_str());
            if !is_output {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let rows = parse_table(&fs::read_to_string(&path)?, &self.config.column_separator);
            facts.insert(name.to_string(), rows);
        }

        debug!(
            bytes = source.len(),
            status = %status,
            relations = facts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "solver finished"
        );

        if facts.is_empty() && !status.success() {
            return Err(SolverError::Oracle {
                status: status.to_string(),
            });
        }
        Ok(SolverOutput { facts })
    }

    /// Answer a query against a program: emit, run, and type the rows of
    /// the goal relation. An empty answer list means the goal is
    /// unsatisfiable.
    pub fn answer(
        &self,
        program: &Program,
        query: &Query,
    ) -> Result<Vec<Assignment>, SolverError> {
        let source = emit::render(program, query)?;
        let output = self.run(&source)?;
        output
            .relation(query.goal_relation().name())
            .iter()
            .map(|row| query.parse_row(row).map_err(SolverError::from))
            .collect()
    }
}

/// One fact per line; cells split on the column separator; `()` encodes
/// the empty tuple.
fn parse_table(text: &str, separator: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        if line == "()" {
            rows.push(Vec::new());
        } else {
            rows.push(line.split(separator).map(str::to_string).collect());
        }
    }
    rows
}
