//! Execution harness - runs one course through the pipeline and reports the outcome

use crate::{
    core::{
        config::HarnessConfig, course_week, parse_date, success_dir, CourseCalendar, CourseDates,
        CourseId, CourseIdError, CoursePattern, CourseRequest, FailureKind, HarnessState, RunId,
        RunOutcome,
    },
    pipeline::{OutputCallback, OutputLine, PipelineInvoker},
};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// File marking a course-week (or batch day) as complete
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Everything the caller supplies for one run
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Raw course identifier, `None` when nothing was supplied
    pub course_id: Option<String>,

    /// Explicit start date (`YYYY-MM-DD`), takes precedence over the calendar
    pub start_date: Option<String>,

    /// Environment passed to the pipeline unchanged
    pub env: Vec<(String, String)>,

    /// Arguments appended to the pipeline command line unchanged
    pub args: Vec<String>,

    /// Run even when the success marker already exists
    pub force: bool,
}

impl Invocation {
    pub fn for_course(course_id: impl Into<String>) -> Self {
        Self {
            course_id: Some(course_id.into()),
            ..Self::default()
        }
    }
}

/// Reasons an invocation is rejected before the pipeline runs
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error(transparent)]
    CourseId(#[from] CourseIdError),

    #[error("invalid start date '{value}' (expected YYYY-MM-DD): {source}")]
    StartDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Events that can occur during a harness run
#[derive(Debug, Clone)]
pub enum HarnessEvent {
    RunStarted {
        run_id: RunId,
        course_id: CourseId,
        week: Option<u32>,
    },
    RunSkipped {
        run_id: RunId,
        course_id: CourseId,
        success_dir: String,
    },
    PipelineOutput {
        run_id: RunId,
        course_id: CourseId,
        line: OutputLine,
    },
    RunFinished {
        run_id: RunId,
        course_id: Option<CourseId>,
        outcome: RunOutcome,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&HarnessEvent) + Send + Sync>;

/// Settings derived from the harness configuration
#[derive(Debug, Clone)]
pub struct HarnessSettings {
    pub course_id_pattern: Option<CoursePattern>,
    pub data_root: String,
    pub success_flags: bool,
    pub calendar: CourseCalendar,

    /// Fixed "today" for week computation; the current UTC date when unset
    pub today: Option<NaiveDate>,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            course_id_pattern: None,
            data_root: "data".to_string(),
            success_flags: true,
            calendar: CourseCalendar::default(),
            today: None,
        }
    }
}

impl HarnessSettings {
    /// Build settings from config, loading the course calendar if one is configured
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        let calendar = match &config.course_dates {
            Some(path) => CourseCalendar::from_file(path)?,
            None => CourseCalendar::default(),
        };
        Ok(Self {
            course_id_pattern: config.course_id_regex()?,
            data_root: config.data_root.clone(),
            success_flags: config.success_flags,
            calendar,
            today: None,
        })
    }

    pub fn with_data_root(mut self, data_root: impl Into<String>) -> Self {
        self.data_root = data_root.into();
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// Result of one harness run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub course_id: Option<CourseId>,
    pub week: Option<u32>,
    pub success_dir: Option<String>,
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn exit_code(&self) -> u8 {
        self.outcome.exit_code()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Forwards pipeline output lines to the harness event handlers
struct EventForwarder<'a> {
    handlers: &'a [EventHandler],
    run_id: RunId,
    course_id: &'a CourseId,
}

impl OutputCallback for EventForwarder<'_> {
    fn on_line(&self, line: &OutputLine) {
        let event = HarnessEvent::PipelineOutput {
            run_id: self.run_id,
            course_id: self.course_id.clone(),
            line: line.clone(),
        };
        for handler in self.handlers {
            handler(&event);
        }
    }
}

/// Single-shot execution harness
pub struct Harness<P> {
    pipeline: P,
    settings: HarnessSettings,
    event_handlers: Vec<EventHandler>,
}

impl<P: PipelineInvoker> Harness<P> {
    pub fn new(pipeline: P, settings: HarnessSettings) -> Self {
        Self {
            pipeline,
            settings,
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&HarnessEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    pub fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: HarnessEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    /// Validate the invocation and resolve everything the pipeline needs
    pub fn resolve(&self, invocation: &Invocation) -> Result<CourseRequest, InvocationError> {
        let course_id = CourseId::from_optional(
            invocation.course_id.as_deref(),
            self.settings.course_id_pattern.as_ref(),
        )?;

        let dates = match invocation.start_date.as_deref() {
            Some(value) => {
                let start = parse_date(value).map_err(|source| InvocationError::StartDate {
                    value: value.to_string(),
                    source,
                })?;
                Some(CourseDates::starting(start))
            }
            None => self.settings.calendar.dates_for(&course_id),
        };

        let week = dates.map(|d| course_week(self.settings.today(), d.start_date));
        let dir = success_dir(&self.settings.data_root, &course_id, week);

        let mut request = CourseRequest::new(course_id, dir)
            .with_env(invocation.env.clone())
            .with_args(invocation.args.clone());
        if let (Some(dates), Some(week)) = (dates, week) {
            request = request.with_dates(dates, week);
        }
        Ok(request)
    }

    /// Run one course to completion; every path ends in a terminal outcome
    pub async fn run(&self, invocation: &Invocation) -> RunReport {
        let run_id = RunId::new();
        let mut state = HarnessState::start();

        let (request, outcome) = match self.resolve(invocation) {
            Ok(request) => {
                let outcome = self.execute(run_id, &request, invocation.force).await;
                (Some(request), outcome)
            }
            Err(e) => {
                error!("Invalid invocation: {}", e);
                (None, RunOutcome::invocation_error(e.to_string()))
            }
        };

        state.terminate(outcome.clone());
        let course_id = request.as_ref().map(|r| r.course_id.clone());
        self.emit_event(HarnessEvent::RunFinished {
            run_id,
            course_id: course_id.clone(),
            outcome: outcome.clone(),
        });

        let finished_at = match &state {
            HarnessState::Terminated { finished_at, .. } => *finished_at,
            HarnessState::Running { .. } => Utc::now(),
        };
        RunReport {
            run_id,
            course_id,
            week: request.as_ref().and_then(|r| r.week),
            success_dir: request.map(|r| r.success_dir),
            outcome,
            started_at: state.started_at(),
            finished_at,
        }
    }

    async fn execute(&self, run_id: RunId, request: &CourseRequest, force: bool) -> RunOutcome {
        let course_id = &request.course_id;
        info!(
            "Running course {} (week {})",
            course_id,
            request
                .week
                .map(|w| w.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );
        self.emit_event(HarnessEvent::RunStarted {
            run_id,
            course_id: course_id.clone(),
            week: request.week,
        });

        let marker = marker_path(&request.success_dir);
        let completed = self.settings.success_flags
            && !force
            && tokio::fs::try_exists(&marker).await.unwrap_or(false);
        if completed {
            info!("Course {} already complete ({}), skipping", course_id, marker.display());
            self.emit_event(HarnessEvent::RunSkipped {
                run_id,
                course_id: course_id.clone(),
                success_dir: request.success_dir.clone(),
            });
            return RunOutcome::skipped();
        }

        let forwarder = EventForwarder {
            handlers: &self.event_handlers,
            run_id,
            course_id,
        };

        match self.pipeline.invoke(request, Some(&forwarder)).await {
            Ok(report) => {
                info!("Pipeline for {} succeeded in {:?}", course_id, report.duration);
                if self.settings.success_flags {
                    if let Err(e) = write_success_marker(Path::new(&request.success_dir)).await {
                        error!("Failed to write success marker {}: {}", marker.display(), e);
                        return RunOutcome::failure(
                            FailureKind::Pipeline,
                            Some(report.exit_code),
                            format!(
                                "pipeline succeeded but success marker {} could not be written: {}",
                                marker.display(),
                                e
                            ),
                        );
                    }
                }
                RunOutcome::success()
            }
            Err(e) => {
                let kind = e.failure_kind();
                if kind == FailureKind::Dependency {
                    error!("Pipeline for {} could not be started: {}", course_id, e);
                } else {
                    error!("Pipeline for {} failed: {}", course_id, e);
                }
                let message = match e.stderr_tail() {
                    Some(tail) => {
                        warn!("Last pipeline stderr lines:\n{}", tail);
                        format!("{}\n{}", e, tail)
                    }
                    None => e.to_string(),
                };
                RunOutcome::failure(kind, e.status(), message)
            }
        }
    }
}

fn marker_path(dir: &str) -> PathBuf {
    Path::new(dir).join(SUCCESS_MARKER)
}

/// Create `dir` if needed and write an empty success marker into it
pub async fn write_success_marker(dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(SUCCESS_MARKER), b"").await
}
