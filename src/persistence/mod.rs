//! Persistence layer for course run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteHistoryStore;

pub use crate::core::RunStatus;
use crate::execution::RunReport;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Course id recorded for runs rejected before a course id was known
pub const UNKNOWN_COURSE: &str = "<none>";

/// Persisted summary of one harness run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique run ID
    pub run_id: Uuid,

    /// Course processed by the run
    pub course_id: String,

    /// Final status
    pub status: RunStatus,

    /// Exit code the harness returned
    pub exit_code: u8,

    /// Course week, when known
    pub week: Option<u32>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished
    pub finished_at: DateTime<Utc>,

    /// Failure message, if any
    pub error: Option<String>,
}

impl RunRecord {
    pub fn from_report(report: &RunReport) -> Self {
        let error = match &report.outcome {
            crate::core::RunOutcome::Failure { message, .. } => Some(message.clone()),
            crate::core::RunOutcome::Success { .. } => None,
        };
        Self {
            run_id: report.run_id.0,
            course_id: report
                .course_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| UNKNOWN_COURSE.to_string()),
            status: RunStatus::from_outcome(&report.outcome),
            exit_code: report.exit_code(),
            week: report.week,
            started_at: report.started_at,
            finished_at: report.finished_at,
            error,
        }
    }

    pub fn duration(&self) -> std::time::Duration {
        self.finished_at
            .signed_duration_since(self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}

/// Trait for run history backends
#[async_trait::async_trait]
pub trait HistoryBackend: Send + Sync {
    /// Save a run record
    async fn save_run(&self, record: &RunRecord) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunRecord>>;

    /// List runs for a course, newest first
    async fn list_runs(&self, course_id: &str) -> Result<Vec<RunRecord>>;

    /// List all course ids with recorded runs
    async fn list_courses(&self) -> Result<Vec<String>>;

    /// Most recent runs across all courses, newest first
    async fn recent_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let mut all = Vec::new();
        for course in self.list_courses().await? {
            all.extend(self.list_runs(&course).await?);
        }
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all.truncate(limit);
        Ok(all)
    }
}

/// In-memory history (for testing or ephemeral use)
pub struct InMemoryHistory {
    runs: tokio::sync::RwLock<std::collections::HashMap<Uuid, RunRecord>>,
    by_course: tokio::sync::RwLock<std::collections::HashMap<String, Vec<Uuid>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self {
            runs: tokio::sync::RwLock::new(std::collections::HashMap::new()),
            by_course: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HistoryBackend for InMemoryHistory {
    async fn save_run(&self, record: &RunRecord) -> Result<()> {
        let mut runs = self.runs.write().await;
        let existed = runs.insert(record.run_id, record.clone()).is_some();

        if !existed {
            let mut by_course = self.by_course.write().await;
            by_course
                .entry(record.course_id.clone())
                .or_insert_with(Vec::new)
                .push(record.run_id);
        }

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunRecord>> {
        let runs = self.runs.read().await;
        Ok(runs.get(&run_id).cloned())
    }

    async fn list_runs(&self, course_id: &str) -> Result<Vec<RunRecord>> {
        let runs = self.runs.read().await;
        let by_course = self.by_course.read().await;

        let mut result: Vec<RunRecord> = by_course
            .get(course_id)
            .map(|ids| ids.iter().filter_map(|id| runs.get(id).cloned()).collect())
            .unwrap_or_default();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(result)
    }

    async fn list_courses(&self) -> Result<Vec<String>> {
        let by_course = self.by_course.read().await;
        let mut courses: Vec<String> = by_course.keys().cloned().collect();
        courses.sort();
        Ok(courses)
    }
}
