//! Test: Failure Handling - pipeline failures always surface as non-zero exits

use crate::helpers::*;
use course_runner::core::{FailureKind, RunOutcome};
use course_runner::execution::{HarnessEvent, Invocation, SUCCESS_MARKER};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_internal_error_exits_one_with_message() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::failing(1);
    let harness = harness(&pipeline, data.path());

    let report = harness.run(&Invocation::for_course("course-101")).await;

    assert_failed_with(&report, FailureKind::Pipeline);
    assert_eq!(report.exit_code(), 1);
    let message = failure_message(&report);
    assert!(message.contains("exited with code 1"));
    assert!(message.contains("ValueError: no enrollments"));
}

#[tokio::test]
async fn test_any_non_zero_status_is_non_zero() {
    for code in [1, 2, 3, 42, 127, 255, -1] {
        let data = tempfile::tempdir().unwrap();
        let pipeline = MockPipeline::failing(code);
        let harness = harness(&pipeline, data.path());

        let report = harness.run(&Invocation::for_course("course-101")).await;
        assert_ne!(report.exit_code(), 0, "status {} must not map to 0", code);
        assert!(matches!(
            report.outcome,
            RunOutcome::Failure { status: Some(s), .. } if s == code
        ));
    }
}

#[tokio::test]
async fn test_failure_writes_no_marker() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::failing(3);
    let harness = harness(&pipeline, data.path());

    harness.run(&Invocation::for_course("course-101")).await;

    assert!(!data.path().join("course-101").join(SUCCESS_MARKER).exists());
}

#[tokio::test]
async fn test_missing_program_is_dependency_error() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::new(MockBehavior::SpawnFailure);
    let harness = harness(&pipeline, data.path());

    let report = harness.run(&Invocation::for_course("course-101")).await;

    assert_failed_with(&report, FailureKind::Dependency);
    assert_eq!(report.exit_code(), 3);
    assert!(failure_message(&report).contains("python"));
}

#[tokio::test]
async fn test_signal_and_timeout_are_pipeline_failures() {
    for behavior in [MockBehavior::Signaled, MockBehavior::Timeout(30)] {
        let data = tempfile::tempdir().unwrap();
        let pipeline = MockPipeline::new(behavior);
        let harness = harness(&pipeline, data.path());

        let report = harness.run(&Invocation::for_course("course-101")).await;
        assert_failed_with(&report, FailureKind::Pipeline);
        assert_eq!(report.exit_code(), 1);
    }
}

#[tokio::test]
async fn test_no_retry_after_failure() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::failing(2);
    let harness = harness(&pipeline, data.path());

    harness.run(&Invocation::for_course("course-101")).await;

    assert_eq!(pipeline.call_count(), 1);
}

#[tokio::test]
async fn test_finished_event_carries_failure() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::failing(4);
    let mut harness = harness(&pipeline, data.path());

    let finished = Arc::new(Mutex::new(None));
    let sink = finished.clone();
    harness.add_event_handler(move |event| {
        if let HarnessEvent::RunFinished { outcome, .. } = event {
            *sink.lock().unwrap() = Some(outcome.clone());
        }
    });

    harness.run(&Invocation::for_course("course-101")).await;

    let outcome = finished.lock().unwrap().clone().unwrap();
    assert_eq!(outcome.failure_kind(), Some(FailureKind::Pipeline));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unwritable_data_root_fails_after_success() {
    let data = tempfile::tempdir().unwrap();
    // A regular file where the data root directory should be
    let blocker = data.path().join("root");
    std::fs::write(&blocker, b"").unwrap();

    let pipeline = MockPipeline::succeeding();
    let harness = harness(&pipeline, &blocker);

    let report = harness.run(&Invocation::for_course("course-101")).await;

    assert_failed_with(&report, FailureKind::Pipeline);
    assert!(failure_message(&report).contains("success marker"));
    assert_eq!(pipeline.call_count(), 1);
}
