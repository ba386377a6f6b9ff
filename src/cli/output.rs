//! CLI output formatting

use crate::{
    core::{RunOutcome, RunStatus},
    execution::{BatchReport, HarnessEvent},
    persistence::RunRecord,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar for a batch of courses
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Succeeded => style("SUCCEEDED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
        RunStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format an outcome for the final status line
pub fn format_outcome(course: &str, outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Success { skipped: false } => format!(
            "{} {} completed {}",
            CHECK,
            style(course).bold(),
            style("successfully").green()
        ),
        RunOutcome::Success { skipped: true } => format!(
            "{} {} already complete, {}",
            SKIP,
            style(course).bold(),
            style("skipped").dim()
        ),
        RunOutcome::Failure { kind, status, .. } => {
            let status = status
                .map(|code| format!(" (pipeline exit code {})", code))
                .unwrap_or_default();
            format!(
                "{} {} {}: {}{} [exit {}]",
                CROSS,
                style(course).bold(),
                style("failed").red(),
                kind,
                status,
                outcome.exit_code()
            )
        }
    }
}

/// Format a harness event for display; pipeline output is handled separately
pub fn format_harness_event(event: &HarnessEvent) -> Option<String> {
    match event {
        HarnessEvent::RunStarted {
            run_id,
            course_id,
            week,
        } => {
            let week = week
                .map(|w| format!(" week {}", w))
                .unwrap_or_default();
            Some(format!(
                "{} Running {}{} ({})",
                ROCKET,
                style(course_id).bold(),
                style(week).cyan(),
                style(run_id.short()).dim()
            ))
        }
        HarnessEvent::RunSkipped {
            course_id,
            success_dir,
            ..
        } => Some(format!(
            "{} {} already has a success marker in {}",
            INFO,
            style(course_id).bold(),
            style(success_dir).dim()
        )),
        HarnessEvent::PipelineOutput { .. } => None,
        HarnessEvent::RunFinished {
            course_id, outcome, ..
        } => {
            let course = course_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "<no course>".to_string());
            Some(format_outcome(&course, outcome))
        }
    }
}

/// Format a history record as a single line
pub fn format_run_record(record: &RunRecord) -> String {
    let status_icon = match record.status {
        RunStatus::Succeeded => CHECK,
        RunStatus::Failed => CROSS,
        RunStatus::Skipped => SKIP,
    };
    let week = record
        .week
        .map(|w| format!("week {}", w))
        .unwrap_or_else(|| "week ?".to_string());

    format!(
        "{} {} - {} - {} - {} - exit {} - {}",
        status_icon,
        style(&record.run_id.to_string()[..8]).dim(),
        style(&record.course_id).bold(),
        style(week).cyan(),
        format_status(record.status),
        record.exit_code,
        style(record.started_at.format("%Y-%m-%d %H:%M:%S")).dim()
    )
}

/// Format a batch summary block
pub fn format_batch_summary(report: &BatchReport) -> String {
    let mut lines = vec![format!(
        "{} Batch: {} succeeded, {} failed, {} not run",
        if report.is_success() { CHECK } else { CROSS },
        style(report.succeeded()).green(),
        style(report.failed()).red(),
        style(report.not_run.len()).dim()
    )];
    for run in report.runs.iter().filter(|r| !r.is_success()) {
        let course = run
            .course_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "<no course>".to_string());
        lines.push(format!("  {} {}", CROSS, style(course).red()));
    }
    if let Some(err) = &report.completion_error {
        lines.push(format!("  {} day marker not written: {}", WARN, err));
    }
    lines.join("\n")
}

/// Format a duration as `1h 2m 3s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
