//! CLI command definitions

use crate::execution::{BatchStrategy, Invocation};
use clap::Args;
use std::path::PathBuf;

/// Run the pipeline for one course
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Course identifier
    #[arg(env = "COURSE_ID")]
    pub course_id: Option<String>,

    /// Course start date (YYYY-MM-DD); overrides the course calendar
    #[arg(long, env = "COURSE_START_DATE")]
    pub start_date: Option<String>,

    /// Extra environment for the pipeline (KEY=VALUE)
    #[arg(short = 'e', long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Run even if the course-week is already marked complete
    #[arg(long)]
    pub force: bool,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Arguments passed to the pipeline unchanged (after `--`)
    #[arg(last = true)]
    pub pipeline_args: Vec<String>,
}

impl RunCommand {
    pub fn invocation(&self) -> Invocation {
        Invocation {
            course_id: self.course_id.clone(),
            start_date: self.start_date.clone(),
            env: self.env.clone(),
            args: self.pipeline_args.clone(),
            force: self.force,
        }
    }
}

/// Run the pipeline for every course in a list
#[derive(Debug, Args, Clone)]
pub struct BatchCommand {
    /// File with one course identifier per line
    #[arg(short, long)]
    pub file: PathBuf,

    /// Keep going after a course fails
    #[arg(long)]
    pub keep_going: bool,

    /// Run even if a course-week is already marked complete
    #[arg(long)]
    pub force: bool,

    /// Extra environment for the pipeline (KEY=VALUE)
    #[arg(short = 'e', long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Don't save runs to history
    #[arg(long)]
    pub no_history: bool,

    /// Print the batch report as JSON
    #[arg(long)]
    pub json: bool,
}

impl BatchCommand {
    pub fn strategy(&self) -> BatchStrategy {
        if self.keep_going {
            BatchStrategy::KeepGoing
        } else {
            BatchStrategy::FailFast
        }
    }

    /// Invocation shared by every course in the batch
    pub fn template(&self) -> Invocation {
        Invocation {
            env: self.env.clone(),
            force: self.force,
            ..Invocation::default()
        }
    }
}

/// Validate the harness configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Course to filter by
    #[arg(long)]
    pub course: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show a single run by ID
    #[arg(long)]
    pub run_id: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}
