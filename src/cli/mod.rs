//! Command-line interface

pub mod commands;
pub mod output;
pub mod terminal_output;

use clap::{Parser, Subcommand};
use commands::{BatchCommand, HistoryCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Run one course through the pipeline and exit with its outcome
#[derive(Debug, Parser, Clone)]
#[command(name = "course-runner")]
#[command(author = "Course Runner Contributors")]
#[command(version)]
#[command(about = "Single-shot execution harness for the course pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to harness configuration file
    #[arg(short, long, global = true, env = "COURSE_RUNNER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress status lines (pipeline output is still shown)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the pipeline for one course
    Run(RunCommand),

    /// Run the pipeline for every course in a list, one at a time
    Batch(BatchCommand),

    /// Validate the harness configuration
    Validate(ValidateCommand),

    /// Show run history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
