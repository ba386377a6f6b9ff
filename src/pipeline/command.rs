//! Pipeline command line configuration

use crate::core::config::PipelineCommandConfig;
use crate::core::{render_template, CourseRequest};
use std::path::PathBuf;

/// Resolved description of how to launch the pipeline process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineCommand {
    /// Program to execute
    pub program: String,

    /// Argument templates rendered against each request
    pub args: Vec<String>,

    /// Extra environment, applied after the course variables
    pub env: Vec<(String, String)>,

    /// Working directory for the child
    pub working_dir: Option<PathBuf>,

    /// Timeout in seconds; `None` waits indefinitely
    pub timeout_secs: Option<u64>,
}

impl PipelineCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: None,
            timeout_secs: None,
        }
    }

    pub fn from_config(config: &PipelineCommandConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            env: config
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            working_dir: config.working_dir.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Final argument list: rendered templates followed by passthrough args
    pub fn render_args(&self, request: &CourseRequest) -> Vec<String> {
        let vars = request.rendering_variables();
        self.args
            .iter()
            .map(|arg| render_template(arg, &vars))
            .chain(request.args.iter().cloned())
            .collect()
    }

    /// Environment for the child, in application order (later entries win)
    pub fn render_env(&self, request: &CourseRequest) -> Vec<(String, String)> {
        request
            .course_env()
            .into_iter()
            .chain(self.env.iter().cloned())
            .chain(request.env.iter().cloned())
            .collect()
    }

    /// Human-readable command line for logs
    pub fn display(&self, request: &CourseRequest) -> String {
        std::iter::once(self.program.clone())
            .chain(self.render_args(request))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
