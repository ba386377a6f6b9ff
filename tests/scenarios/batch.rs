//! Test: Batch - courses run one at a time with fail-fast or keep-going

use crate::helpers::*;
use course_runner::core::FailureKind;
use course_runner::execution::{BatchRunner, BatchStrategy, Invocation, SUCCESS_MARKER};

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_all_courses_succeed() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding();
    let harness = harness(&pipeline, data.path());
    let runner = BatchRunner::new(&harness, BatchStrategy::FailFast);

    let report = runner
        .run(&ids(&["course-101", "course-202", "course-303"]), &Invocation::default())
        .await;

    assert!(report.is_success());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.succeeded(), 3);
    assert_eq!(
        pipeline.invoked_courses(),
        vec!["course-101", "course-202", "course-303"]
    );

    let day_marker = data.path().join("pipeline").join(TODAY);
    assert_eq!(report.day_marker.as_deref(), Some(day_marker.as_path()));
    assert!(day_marker.join(SUCCESS_MARKER).is_file());
}

#[tokio::test]
async fn test_fail_fast_stops_at_first_failure() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding().with_course("course-202", MockBehavior::Exit(9));
    let harness = harness(&pipeline, data.path());
    let runner = BatchRunner::new(&harness, BatchStrategy::FailFast);

    let report = runner
        .run(&ids(&["course-101", "course-202", "course-303"]), &Invocation::default())
        .await;

    assert_eq!(pipeline.invoked_courses(), vec!["course-101", "course-202"]);
    assert_eq!(report.not_run, vec!["course-303"]);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.exit_code(), 1);
    assert!(report.day_marker.is_none());
    assert!(!data.path().join("pipeline").exists());
}

#[tokio::test]
async fn test_keep_going_runs_everything() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding()
        .with_course("course-101", MockBehavior::SpawnFailure)
        .with_course("course-303", MockBehavior::Exit(1));
    let harness = harness(&pipeline, data.path());
    let runner = BatchRunner::new(&harness, BatchStrategy::KeepGoing);

    let report = runner
        .run(&ids(&["course-101", "course-202", "course-303"]), &Invocation::default())
        .await;

    assert_eq!(pipeline.call_count(), 3);
    assert!(report.not_run.is_empty());
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 2);
    // First failure decides the exit code
    assert_eq!(report.exit_code(), 3);
}

#[tokio::test]
async fn test_invalid_id_in_list_is_an_invocation_failure() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding();
    let harness = harness(&pipeline, data.path());
    let runner = BatchRunner::new(&harness, BatchStrategy::KeepGoing);

    let report = runner
        .run(&ids(&["course 101", "course-202"]), &Invocation::default())
        .await;

    assert_eq!(pipeline.invoked_courses(), vec!["course-202"]);
    assert_eq!(
        report.runs[0].outcome.failure_kind(),
        Some(FailureKind::Invocation)
    );
    assert_eq!(report.exit_code(), 2);
}

#[tokio::test]
async fn test_template_is_applied_to_every_course() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding();
    let harness = harness(&pipeline, data.path());
    let runner = BatchRunner::new(&harness, BatchStrategy::FailFast);

    let template = Invocation {
        env: vec![("MODE".to_string(), "weekly".to_string())],
        ..Invocation::default()
    };
    runner.run(&ids(&["course-101", "course-202"]), &template).await;

    for request in pipeline.calls() {
        assert_eq!(request.env, vec![("MODE".to_string(), "weekly".to_string())]);
    }
}
