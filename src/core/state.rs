//! Run state models

use crate::core::RunOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final status of a course run, as recorded in history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Pipeline completed successfully
    Succeeded,
    /// Pipeline (or the invocation) failed
    Failed,
    /// Course-week was already complete, nothing ran
    Skipped,
}

impl RunStatus {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        match outcome {
            RunOutcome::Success { skipped: true } => RunStatus::Skipped,
            RunOutcome::Success { skipped: false } => RunStatus::Succeeded,
            RunOutcome::Failure { .. } => RunStatus::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "Succeeded",
            RunStatus::Failed => "Failed",
            RunStatus::Skipped => "Skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Succeeded" => Some(RunStatus::Succeeded),
            "Failed" => Some(RunStatus::Failed),
            "Skipped" => Some(RunStatus::Skipped),
            _ => None,
        }
    }
}

/// Lifecycle of one harness invocation
///
/// Every exit path, including a rejected invocation, ends in `Terminated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HarnessState {
    Running {
        started_at: DateTime<Utc>,
    },
    Terminated {
        outcome: RunOutcome,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
}

impl HarnessState {
    pub fn start() -> Self {
        HarnessState::Running {
            started_at: Utc::now(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        match self {
            HarnessState::Running { started_at } => *started_at,
            HarnessState::Terminated { started_at, .. } => *started_at,
        }
    }

    /// Move to `Terminated`; terminating twice keeps the first outcome
    pub fn terminate(&mut self, outcome: RunOutcome) {
        if let HarnessState::Running { started_at } = *self {
            *self = HarnessState::Terminated {
                outcome,
                started_at,
                finished_at: Utc::now(),
            };
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, HarnessState::Terminated { .. })
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        match self {
            HarnessState::Running { .. } => None,
            HarnessState::Terminated { outcome, .. } => Some(outcome),
        }
    }
}

/// Identity of a single run, shared by events and history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight characters, for compact display
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
