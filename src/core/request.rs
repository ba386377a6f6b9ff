//! Course request - everything the pipeline receives for one run

use crate::core::course::{CourseDates, CourseId, DATE_FORMAT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Resolved inputs for a single pipeline invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRequest {
    /// The course being processed
    pub course_id: CourseId,

    /// Course dates, when known
    pub dates: Option<CourseDates>,

    /// Current course week, when the start date is known
    pub week: Option<u32>,

    /// Directory where the pipeline writes its output
    pub success_dir: String,

    /// Extra environment passed to the pipeline unchanged
    pub env: Vec<(String, String)>,

    /// Extra arguments appended to the pipeline command line unchanged
    pub args: Vec<String>,
}

impl CourseRequest {
    pub fn new(course_id: CourseId, success_dir: String) -> Self {
        Self {
            course_id,
            dates: None,
            week: None,
            success_dir,
            env: Vec::new(),
            args: Vec::new(),
        }
    }

    pub fn with_dates(mut self, dates: CourseDates, week: u32) -> Self {
        self.dates = Some(dates);
        self.week = Some(week);
        self
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    fn start_date(&self) -> Option<String> {
        self.dates
            .map(|d| d.start_date.format(DATE_FORMAT).to_string())
    }

    fn end_date(&self) -> Option<String> {
        self.dates
            .and_then(|d| d.end_date)
            .map(|d| d.format(DATE_FORMAT).to_string())
    }

    /// Variables available to argument templates; unknown values are empty
    pub fn rendering_variables(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("course_id".to_string(), self.course_id.to_string());
        vars.insert(
            "week".to_string(),
            self.week.map(|w| w.to_string()).unwrap_or_default(),
        );
        vars.insert("start_date".to_string(), self.start_date().unwrap_or_default());
        vars.insert("end_date".to_string(), self.end_date().unwrap_or_default());
        vars.insert("success_dir".to_string(), self.success_dir.clone());
        vars
    }

    /// Environment variables describing the course; only known values are set
    pub fn course_env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            ("COURSE_ID".to_string(), self.course_id.to_string()),
            ("COURSE_SUCCESS_DIR".to_string(), self.success_dir.clone()),
        ];
        if let Some(week) = self.week {
            env.push(("COURSE_WEEK".to_string(), week.to_string()));
        }
        if let Some(start) = self.start_date() {
            env.push(("COURSE_START_DATE".to_string(), start));
        }
        if let Some(end) = self.end_date() {
            env.push(("COURSE_END_DATE".to_string(), end));
        }
        env
    }
}

/// Replace `{{ name }}` placeholders with values from `variables`
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in variables {
        let placeholder = format!("{{{{ {} }}}}", key);
        rendered = rendered.replace(&placeholder, value);
    }
    rendered
}
