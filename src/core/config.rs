//! Harness configuration from YAML

use crate::core::course::CoursePattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// Top-level harness configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// How to launch the pipeline
    #[serde(default)]
    pub pipeline: PipelineCommandConfig,

    /// Regex a course identifier must fully match (optional)
    #[serde(default)]
    pub course_id_pattern: Option<String>,

    /// Root directory for per-course output and success markers
    #[serde(default = "default_data_root")]
    pub data_root: String,

    /// Whether to write and honor `_SUCCESS` markers
    #[serde(default = "default_success_flags")]
    pub success_flags: bool,

    /// YAML file mapping course ids to their dates (optional)
    #[serde(default)]
    pub course_dates: Option<PathBuf>,
}

/// Pipeline launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineCommandConfig {
    /// Program to execute (looked up on PATH when not absolute)
    #[serde(default = "default_program")]
    pub program: String,

    /// Argument templates; `{{ course_id }}`, `{{ week }}`, `{{ start_date }}`,
    /// `{{ end_date }}` and `{{ success_dir }}` are substituted
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Extra environment for the pipeline process
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory for the pipeline process
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Kill the pipeline after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_program() -> String {
    "python".to_string()
}

fn default_args() -> Vec<String> {
    [
        "-m",
        "pipeline",
        "{{ course_id }}",
        "{{ week }}",
        "{{ start_date }}",
        "{{ success_dir }}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_data_root() -> String {
    "data".to_string()
}

fn default_success_flags() -> bool {
    true
}

impl Default for PipelineCommandConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            env: BTreeMap::new(),
            working_dir: None,
            timeout_secs: None,
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineCommandConfig::default(),
            course_id_pattern: None,
            data_root: default_data_root(),
            success_flags: default_success_flags(),
            course_dates: None,
        }
    }
}

impl HarnessConfig {
    /// Load harness configuration from a YAML file
    ///
    /// A relative `course_dates` path is resolved against the config file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config = Self::from_yaml(&content)?;

        if let (Some(dates), Some(parent)) = (&config.course_dates, path.parent()) {
            if dates.is_relative() {
                config.course_dates = Some(parent.join(dates));
            }
        }
        Ok(config)
    }

    /// Parse harness configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: HarnessConfig =
            serde_yaml::from_str(yaml).context("Failed to parse harness config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the harness configuration
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.program.trim().is_empty() {
            anyhow::bail!("pipeline.program must not be empty");
        }

        if self.pipeline.timeout_secs == Some(0) {
            anyhow::bail!("pipeline.timeout_secs must be greater than zero");
        }

        for key in self.pipeline.env.keys() {
            if key.is_empty() || key.contains('=') {
                anyhow::bail!("Invalid environment variable name in pipeline.env: '{}'", key);
            }
        }

        self.course_id_regex()?;
        Ok(())
    }

    /// Compiled course id pattern, if configured
    pub fn course_id_regex(&self) -> Result<Option<CoursePattern>> {
        self.course_id_pattern
            .as_deref()
            .map(|pattern| {
                CoursePattern::new(pattern)
                    .with_context(|| format!("Invalid course_id_pattern '{}'", pattern))
            })
            .transpose()
    }
}
