//! course-runner - single-shot execution harness for the course pipeline

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod pipeline;

// Re-export commonly used types
pub use core::{CourseId, CourseRequest, FailureKind, RunOutcome, RunStatus};
pub use execution::{BatchRunner, BatchStrategy, Harness, HarnessEvent, HarnessSettings, Invocation, RunReport};
pub use pipeline::{OutputCallback, OutputLine, PipelineError, PipelineInvoker, PipelineReport, SubprocessPipeline};
