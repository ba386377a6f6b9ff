//! Test: Idempotence - repeated runs classify the same way

use crate::helpers::*;
use course_runner::execution::{Harness, Invocation};

#[tokio::test]
async fn test_repeated_success_stays_success() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding();
    let harness = harness(&pipeline, data.path());
    let invocation = Invocation::for_course("course-101");

    let first = harness.run(&invocation).await;
    let second = harness.run(&invocation).await;

    assert_eq!(first.outcome.is_success(), second.outcome.is_success());
    assert_eq!(first.exit_code(), second.exit_code());
    // The second run finds the success marker and does not run again
    assert!(second.outcome.is_skipped());
    assert_eq!(pipeline.call_count(), 1);
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn test_repeated_failure_stays_failure() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::failing(6);
    let harness = harness(&pipeline, data.path());
    let invocation = Invocation::for_course("course-101");

    let first = harness.run(&invocation).await;
    let second = harness.run(&invocation).await;

    assert_eq!(first.outcome, second.outcome);
    assert_eq!(pipeline.call_count(), 2);
}

#[tokio::test]
async fn test_without_markers_every_run_invokes() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding();
    let mut settings = settings(data.path());
    settings.success_flags = false;
    let harness = Harness::new(pipeline.clone(), settings);
    let invocation = Invocation::for_course("course-101");

    let first = harness.run(&invocation).await;
    let second = harness.run(&invocation).await;

    assert_eq!(first.outcome, second.outcome);
    assert_eq!(pipeline.call_count(), 2);
    assert!(!data.path().join("course-101").exists());
}

#[tokio::test]
async fn test_force_reruns_completed_course() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding();
    let harness = harness(&pipeline, data.path());

    harness.run(&Invocation::for_course("course-101")).await;
    let forced = Invocation {
        force: true,
        ..Invocation::for_course("course-101")
    };
    let report = harness.run(&forced).await;

    assert_ran_successfully(&report);
    assert_eq!(pipeline.call_count(), 2);
}
