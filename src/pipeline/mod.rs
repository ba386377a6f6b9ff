//! Pipeline invocation
//!
//! The pipeline is an opaque collaborator: something that can be invoked
//! with a course request and reports success or failure. The harness only
//! depends on [`PipelineInvoker`], so tests can substitute a mock.

pub mod command;
pub mod error;
pub mod streaming;
pub mod subprocess;

use crate::core::CourseRequest;
use async_trait::async_trait;
pub use command::PipelineCommand;
pub use error::{PipelineError, PipelineReport};
pub use streaming::{NoopCallback, OutputCallback, OutputLine, OutputStream};
pub use subprocess::SubprocessPipeline;

/// Trait for pipeline invocation - allows for different implementations
#[async_trait]
pub trait PipelineInvoker: Send + Sync {
    /// Run the pipeline once for the given course
    async fn invoke(
        &self,
        request: &CourseRequest,
        callback: Option<&dyn OutputCallback>,
    ) -> Result<PipelineReport, PipelineError>;
}
