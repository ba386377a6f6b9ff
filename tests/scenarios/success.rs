//! Test: Success - a valid course with a succeeding pipeline exits 0

use crate::helpers::*;
use course_runner::execution::{HarnessEvent, Invocation, SUCCESS_MARKER};
use course_runner::pipeline::OutputStream;
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_course_101_succeeds() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding();
    let harness = harness(&pipeline, data.path());

    let report = harness.run(&Invocation::for_course("course-101")).await;

    assert_ran_successfully(&report);
    assert_eq!(pipeline.invoked_courses(), vec!["course-101"]);
    assert_eq!(report.course_id.as_ref().map(|c| c.as_str()), Some("course-101"));
    assert!(report.finished_at >= report.started_at);
}

#[tokio::test]
async fn test_success_marks_course_complete() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding();
    let harness = harness(&pipeline, data.path());

    harness.run(&Invocation::for_course("course-101")).await;

    assert!(data.path().join("course-101").join(SUCCESS_MARKER).is_file());
}

#[tokio::test]
async fn test_calendar_dates_reach_the_pipeline() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding();
    let harness = harness_with_calendar(
        &pipeline,
        data.path(),
        r#"
course-101:
  start_date: 2024-01-01
  end_date: 2024-03-01
"#,
    );

    let report = harness.run(&Invocation::for_course("course-101")).await;
    assert_ran_successfully(&report);
    // 2024-01-01 to 2024-01-22 is 21 days
    assert_eq!(report.week, Some(4));

    let request = &pipeline.calls()[0];
    assert_eq!(request.week, Some(4));
    assert!(request.success_dir.ends_with("course-101/week_4/"));
    let vars = request.rendering_variables();
    assert_eq!(vars["start_date"], "2024-01-01");
    assert_eq!(vars["end_date"], "2024-03-01");
    assert!(data
        .path()
        .join("course-101")
        .join("week_4")
        .join(SUCCESS_MARKER)
        .is_file());
}

#[tokio::test]
async fn test_explicit_start_date_overrides_calendar() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding();
    let harness = harness_with_calendar(
        &pipeline,
        data.path(),
        "course-101:\n  start_date: 2024-01-01\n",
    );

    let invocation = Invocation {
        start_date: Some("2024-01-15".to_string()),
        ..Invocation::for_course("course-101")
    };
    let report = harness.run(&invocation).await;
    assert_ran_successfully(&report);
    assert_eq!(report.week, Some(2));
}

#[tokio::test]
async fn test_passthrough_values_are_unchanged() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding();
    let harness = harness(&pipeline, data.path());

    let invocation = Invocation {
        env: vec![("FEATURE_SET".to_string(), "v2 = on".to_string())],
        args: vec!["--limit".to_string(), "{{ course_id }}".to_string()],
        ..Invocation::for_course("course-101")
    };
    harness.run(&invocation).await;

    let request = &pipeline.calls()[0];
    assert_eq!(request.env, vec![("FEATURE_SET".to_string(), "v2 = on".to_string())]);
    assert_eq!(request.args, vec!["--limit", "{{ course_id }}"]);
}

#[tokio::test]
async fn test_pipeline_output_is_streamed_as_events() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = MockPipeline::succeeding();
    let mut harness = harness(&pipeline, data.path());

    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    harness.add_event_handler(move |event| {
        if let HarnessEvent::PipelineOutput { line, .. } = event {
            sink.lock().unwrap().push(line.clone());
        }
    });

    harness.run(&Invocation::for_course("course-101")).await;

    let lines = lines.lock().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].stream, OutputStream::Stdout);
    assert_eq!(lines[0].text, "processed course-101");
}
