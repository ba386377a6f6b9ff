//! Run outcome and exit code mapping

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exit code for a successful (or already completed) run
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code when the pipeline itself failed
pub const EXIT_PIPELINE_FAILURE: u8 = 1;
/// Exit code for a bad invocation (missing or invalid course id, bad arguments)
pub const EXIT_INVOCATION_ERROR: u8 = 2;
/// Exit code when the pipeline program could not be started
pub const EXIT_DEPENDENCY_ERROR: u8 = 3;

/// Category of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Rejected before the pipeline was invoked
    Invocation,
    /// The pipeline program or its runtime could not be loaded
    Dependency,
    /// The pipeline ran and reported failure
    Pipeline,
}

impl FailureKind {
    pub fn exit_code(self) -> u8 {
        match self {
            FailureKind::Invocation => EXIT_INVOCATION_ERROR,
            FailureKind::Dependency => EXIT_DEPENDENCY_ERROR,
            FailureKind::Pipeline => EXIT_PIPELINE_FAILURE,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Invocation => "invocation error",
            FailureKind::Dependency => "dependency error",
            FailureKind::Pipeline => "pipeline error",
        };
        f.write_str(label)
    }
}

/// Result of one harness invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RunOutcome {
    Success {
        /// The success marker was already present, so nothing ran
        skipped: bool,
    },
    Failure {
        kind: FailureKind,
        /// Exit status of the pipeline process, when it got that far
        status: Option<i32>,
        message: String,
    },
}

impl RunOutcome {
    pub fn success() -> Self {
        RunOutcome::Success { skipped: false }
    }

    pub fn skipped() -> Self {
        RunOutcome::Success { skipped: true }
    }

    pub fn failure(kind: FailureKind, status: Option<i32>, message: impl Into<String>) -> Self {
        RunOutcome::Failure {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn invocation_error(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::Invocation, None, message)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RunOutcome::Success { skipped: true })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            RunOutcome::Success { .. } => None,
            RunOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Process exit code for this outcome; never zero for a failure
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Success { .. } => EXIT_SUCCESS,
            RunOutcome::Failure { kind, .. } => kind.exit_code(),
        }
    }
}
