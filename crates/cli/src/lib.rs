//! histcop CLI -- verify recorded transactional histories.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use histcop_core::{Check, CompositeCheck, ExternalConsistencyChecker, LinearizabilityChecker};

#[derive(Debug, Parser)]
#[command(
    name = "histcop",
    about = "Offline consistency checking for transactional key-value histories"
)]
pub struct App {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check a recorded history against a consistency model
    Verify(VerifyArgs),
    /// Parse a history log and print the event sequence as JSON
    Dump(DumpArgs),
}

#[derive(Debug, Parser)]
pub struct VerifyArgs {
    /// History log file (EDN record list)
    #[arg(long)]
    pub history: PathBuf,
    /// JSON file with the initial key -> value state
    #[arg(long)]
    pub initial_state: PathBuf,
    /// Consistency model to check
    #[arg(long, value_enum)]
    pub model: Model,
    /// Abort the linearizability search after this many states
    #[arg(long)]
    pub max_states: Option<usize>,
    /// Print witness details on PASS and full error details on FAIL
    #[arg(long)]
    pub verbose: bool,
    /// Output the result as a JSON object
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct DumpArgs {
    /// History log file (EDN record list)
    #[arg(long)]
    pub history: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Model {
    Linearizability,
    ExternalConsistency,
    /// Linearizability and external consistency together
    All,
}

impl VerifyArgs {
    /// Build the checker the arguments select.
    #[must_use]
    pub fn checker(&self) -> Box<dyn Check> {
        let linearizability = LinearizabilityChecker {
            max_states: self.max_states,
        };
        match self.model {
            Model::Linearizability => Box::new(linearizability),
            Model::ExternalConsistency => Box::new(ExternalConsistencyChecker::new()),
            Model::All => Box::new(CompositeCheck::new(vec![
                Box::new(linearizability),
                Box::new(ExternalConsistencyChecker::new()),
            ])),
        }
    }
}
