//! Pipeline error and report types

use crate::core::FailureKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error types for pipeline invocation
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to start pipeline program '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("pipeline exited with code {code}")]
    Exited { code: i32, stderr: String },

    #[error("pipeline was terminated by a signal")]
    Signaled { stderr: String },

    #[error("pipeline timed out after {0} seconds")]
    Timeout(u64),

    #[error("I/O error while running pipeline: {0}")]
    Io(#[from] std::io::Error),

    #[error("pipeline error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// How this error is classified in the run outcome
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            PipelineError::Spawn { .. } => FailureKind::Dependency,
            _ => FailureKind::Pipeline,
        }
    }

    /// Exit status of the pipeline process, when it exited normally
    pub fn status(&self) -> Option<i32> {
        match self {
            PipelineError::Exited { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Trailing stderr captured before the failure
    pub fn stderr_tail(&self) -> Option<&str> {
        match self {
            PipelineError::Exited { stderr, .. } | PipelineError::Signaled { stderr } => {
                Some(stderr.as_str()).filter(|s| !s.is_empty())
            }
            _ => None,
        }
    }
}

/// Summary of a successful pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Exit status reported by the pipeline
    pub exit_code: i32,

    /// Number of stdout lines seen
    pub stdout_lines: usize,

    /// Number of stderr lines seen
    pub stderr_lines: usize,

    /// Wall-clock time of the invocation
    pub duration: Duration,
}

impl PipelineReport {
    pub fn new(exit_code: i32) -> Self {
        Self {
            exit_code,
            stdout_lines: 0,
            stderr_lines: 0,
            duration: Duration::ZERO,
        }
    }
}
