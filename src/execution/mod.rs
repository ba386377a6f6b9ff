//! Course execution: the single-run harness and the sequential batch runner

pub mod batch;
pub mod harness;

pub use batch::{parse_course_ids, read_course_ids, BatchReport, BatchRunner, BatchStrategy};
pub use harness::{
    write_success_marker, EventHandler, Harness, HarnessEvent, HarnessSettings, Invocation,
    InvocationError, RunReport, SUCCESS_MARKER,
};
