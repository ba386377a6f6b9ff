//! Test utility functions for course-runner

use async_trait::async_trait;
use course_runner::core::{parse_date, CourseCalendar, CourseRequest, FailureKind, RunOutcome};
use course_runner::execution::{Harness, HarnessSettings, RunReport};
use course_runner::pipeline::{
    OutputCallback, OutputLine, PipelineError, PipelineInvoker, PipelineReport,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Date used as "today" in every scenario
pub const TODAY: &str = "2024-01-22";

/// What the mock pipeline does when invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Print a line and exit 0
    Succeed,
    /// Print an error on stderr and exit with this code
    Exit(i32),
    /// Program could not be started
    SpawnFailure,
    /// Killed by a signal
    Signaled,
    /// Exceeded its timeout
    Timeout(u64),
}

/// Mock pipeline with per-course behavior that records every request
#[derive(Clone)]
pub struct MockPipeline {
    default: MockBehavior,
    per_course: Arc<HashMap<String, MockBehavior>>,
    calls: Arc<Mutex<Vec<CourseRequest>>>,
}

impl MockPipeline {
    pub fn new(default: MockBehavior) -> Self {
        Self {
            default,
            per_course: Arc::new(HashMap::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(MockBehavior::Succeed)
    }

    pub fn failing(code: i32) -> Self {
        Self::new(MockBehavior::Exit(code))
    }

    /// Override the behavior for one course
    pub fn with_course(mut self, course_id: &str, behavior: MockBehavior) -> Self {
        let mut per_course = (*self.per_course).clone();
        per_course.insert(course_id.to_string(), behavior);
        self.per_course = Arc::new(per_course);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<CourseRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Course ids in invocation order
    pub fn invoked_courses(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|r| r.course_id.to_string())
            .collect()
    }
}

#[async_trait]
impl PipelineInvoker for MockPipeline {
    async fn invoke(
        &self,
        request: &CourseRequest,
        callback: Option<&dyn OutputCallback>,
    ) -> Result<PipelineReport, PipelineError> {
        self.calls.lock().unwrap().push(request.clone());

        let behavior = self
            .per_course
            .get(request.course_id.as_str())
            .unwrap_or(&self.default)
            .clone();

        let emit = |line: OutputLine| {
            if let Some(cb) = callback {
                cb.on_line(&line);
            }
        };

        match behavior {
            MockBehavior::Succeed => {
                emit(OutputLine::stdout(format!("processed {}", request.course_id)));
                Ok(PipelineReport::new(0))
            }
            MockBehavior::Exit(code) => {
                emit(OutputLine::stderr("Traceback (most recent call last):"));
                emit(OutputLine::stderr("ValueError: no enrollments"));
                Err(PipelineError::Exited {
                    code,
                    stderr: "Traceback (most recent call last):\nValueError: no enrollments"
                        .to_string(),
                })
            }
            MockBehavior::SpawnFailure => Err(PipelineError::Spawn {
                program: "python".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
            }),
            MockBehavior::Signaled => Err(PipelineError::Signaled {
                stderr: String::new(),
            }),
            MockBehavior::Timeout(secs) => Err(PipelineError::Timeout(secs)),
        }
    }
}

/// Harness settings rooted in `data_root` with a fixed date
pub fn settings(data_root: &Path) -> HarnessSettings {
    HarnessSettings::default()
        .with_data_root(data_root.to_string_lossy().to_string())
        .with_today(parse_date(TODAY).unwrap())
}

/// Harness around a mock pipeline
pub fn harness(pipeline: &MockPipeline, data_root: &Path) -> Harness<MockPipeline> {
    Harness::new(pipeline.clone(), settings(data_root))
}

/// Harness with a course calendar
pub fn harness_with_calendar(
    pipeline: &MockPipeline,
    data_root: &Path,
    calendar_yaml: &str,
) -> Harness<MockPipeline> {
    let mut settings = settings(data_root);
    settings.calendar = CourseCalendar::from_yaml(calendar_yaml).unwrap();
    Harness::new(pipeline.clone(), settings)
}

/// Assert a run succeeded and actually invoked the pipeline
pub fn assert_ran_successfully(report: &RunReport) {
    assert_eq!(
        report.outcome,
        RunOutcome::success(),
        "expected a successful run, got {:?}",
        report.outcome
    );
    assert_eq!(report.exit_code(), 0);
}

/// Assert a run failed with the given kind
pub fn assert_failed_with(report: &RunReport, kind: FailureKind) {
    assert_eq!(
        report.outcome.failure_kind(),
        Some(kind),
        "expected {:?} failure, got {:?}",
        kind,
        report.outcome
    );
    assert_ne!(report.exit_code(), 0);
}

/// Failure message of a run, panicking on success
pub fn failure_message(report: &RunReport) -> String {
    match &report.outcome {
        RunOutcome::Failure { message, .. } => message.clone(),
        other => panic!("expected a failure, got {:?}", other),
    }
}
