//! Batch runner - runs a list of courses one after another

use crate::{
    core::DATE_FORMAT,
    execution::{write_success_marker, Harness, Invocation, RunReport},
    pipeline::PipelineInvoker,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// What to do after a course fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchStrategy {
    /// Stop at the first failure
    #[default]
    FailFast,
    /// Run every course and report all failures
    KeepGoing,
}

/// Read course identifiers from a file, one per line
pub fn read_course_ids<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read course list {}", path.display()))?;
    Ok(parse_course_ids(&content))
}

/// Parse a course list; blank lines and `#` comments are skipped
pub fn parse_course_ids(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Outcome of a batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Reports for every course that ran, in order
    pub runs: Vec<RunReport>,

    /// Courses never attempted because an earlier one failed
    pub not_run: Vec<String>,

    /// Day marker written after a fully successful batch
    pub day_marker: Option<PathBuf>,

    /// Set when the day marker could not be written
    pub completion_error: Option<String>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.runs.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.runs.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.not_run.is_empty() && self.completion_error.is_none()
    }

    /// Zero when everything succeeded, otherwise the first failure's code
    pub fn exit_code(&self) -> u8 {
        if let Some(failed) = self.runs.iter().find(|r| !r.is_success()) {
            return failed.exit_code();
        }
        if self.completion_error.is_some() {
            return crate::core::EXIT_PIPELINE_FAILURE;
        }
        crate::core::EXIT_SUCCESS
    }
}

/// Runs courses sequentially through one harness
pub struct BatchRunner<'a, P> {
    harness: &'a Harness<P>,
    strategy: BatchStrategy,
}

impl<'a, P: PipelineInvoker> BatchRunner<'a, P> {
    pub fn new(harness: &'a Harness<P>, strategy: BatchStrategy) -> Self {
        Self { harness, strategy }
    }

    /// Run every course in order, using `template` for everything but the course id
    pub async fn run(&self, course_ids: &[String], template: &Invocation) -> BatchReport {
        info!("Starting batch of {} courses ({:?})", course_ids.len(), self.strategy);
        let mut runs = Vec::with_capacity(course_ids.len());
        let mut not_run = Vec::new();

        for (index, course_id) in course_ids.iter().enumerate() {
            let invocation = Invocation {
                course_id: Some(course_id.clone()),
                ..template.clone()
            };
            let report = self.harness.run(&invocation).await;
            let failed = !report.is_success();
            runs.push(report);

            if failed && self.strategy == BatchStrategy::FailFast {
                not_run.extend(course_ids[index + 1..].iter().cloned());
                if !not_run.is_empty() {
                    warn!(
                        "Course {} failed, skipping {} remaining courses",
                        course_id,
                        not_run.len()
                    );
                }
                break;
            }
        }

        let mut report = BatchReport {
            runs,
            not_run,
            day_marker: None,
            completion_error: None,
        };

        if report.failed() == 0 && report.not_run.is_empty() && self.harness.settings().success_flags {
            let settings = self.harness.settings();
            let day = settings.today().format(DATE_FORMAT).to_string();
            let dir = Path::new(&settings.data_root).join("pipeline").join(day);
            match write_success_marker(&dir).await {
                Ok(()) => report.day_marker = Some(dir),
                Err(e) => {
                    error!("Failed to write batch marker in {}: {}", dir.display(), e);
                    report.completion_error = Some(e.to_string());
                }
            }
        }

        info!(
            "Batch finished: {} succeeded, {} failed, {} not run",
            report.succeeded(),
            report.failed(),
            report.not_run.len()
        );
        report
    }
}
