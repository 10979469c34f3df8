//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - protoplan.toml (default configuration)
//! - protoplan.local.toml (git-ignored local overrides)
//! - Environment variables (PROTOPLAN_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # protoplan.toml
//! [solver]
//! binary = "souffle"
//! args = ["-D", "."]
//!
//! [interaction]
//! goal_mode = "auto"
//! rule_mode = "fast_forward"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! PROTOPLAN_SOLVER__BINARY=/opt/souffle/bin/souffle
//! PROTOPLAN_INTERACTION__RULE_MODE=manual
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::interact::Mode;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub interaction: InteractionConfig,
}

/// External solver invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Solver executable name or path
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Arguments placed before the program file name
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Extension of tabular output files the gateway harvests
    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Column separator inside output files
    #[serde(default = "default_column_separator")]
    pub column_separator: String,
}

fn default_binary() -> String {
    "souffle".to_string()
}

fn default_args() -> Vec<String> {
    vec!["-D".to_string(), ".".to_string()]
}

fn default_output_extension() -> String {
    "csv".to_string()
}

fn default_column_separator() -> String {
    "\t".to_string()
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            binary: default_binary(),
            args: default_args(),
            output_extension: default_output_extension(),
            column_separator: default_column_separator(),
        }
    }
}

/// Selection modes for the derivation loop's goal and rule hooks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// How open goals are picked
    #[serde(default = "default_goal_mode")]
    pub goal_mode: Mode,

    /// How rules (and assignments) are picked
    #[serde(default = "default_rule_mode")]
    pub rule_mode: Mode,
}

fn default_goal_mode() -> Mode {
    Mode::Auto
}

fn default_rule_mode() -> Mode {
    Mode::FastForward
}

impl Default for InteractionConfig {
    fn default() -> Self {
        InteractionConfig {
            goal_mode: default_goal_mode(),
            rule_mode: default_rule_mode(),
        }
    }
}

impl Config {
    /// Load configuration with the standard layering.
    pub fn load() -> Result<Config, figment::Error> {
        Figment::new()
            .merge(Toml::file("protoplan.toml"))
            .merge(Toml::file("protoplan.local.toml"))
            .merge(Env::prefixed("PROTOPLAN_").split("__"))
            .extract()
    }
}
