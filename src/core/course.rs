//! Course domain model

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Date format used for course dates on the command line and in the calendar
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised while validating a course identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CourseIdError {
    #[error("no course identifier supplied (pass COURSE_ID or the positional argument)")]
    Missing,

    #[error("course identifier is empty")]
    Empty,

    #[error("course identifier '{0}' contains whitespace or control characters")]
    InvalidCharacters(String),

    #[error("course identifier '{0}' must not contain '/'")]
    PathSeparator(String),

    #[error("course identifier '{0}' does not name a directory")]
    RelativePath(String),

    #[error("course identifier '{id}' does not match pattern '{pattern}'")]
    PatternMismatch { id: String, pattern: String },
}

/// Pattern a course identifier must match in full
///
/// The regex is compiled as `^(?:pattern)$`, so alternations are matched
/// against the whole identifier rather than a prefix of it.
#[derive(Debug, Clone)]
pub struct CoursePattern {
    source: String,
    anchored: Regex,
}

impl CoursePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let anchored = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(Self {
            source: pattern.to_string(),
            anchored,
        })
    }

    /// The pattern as configured, without the anchors
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, id: &str) -> bool {
        self.anchored.is_match(id)
    }
}

/// Opaque identifier naming the course processed by one run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    /// Validate a raw identifier
    ///
    /// Surrounding whitespace is trimmed. When `pattern` is given the
    /// trimmed identifier must match it in full.
    pub fn parse(raw: &str, pattern: Option<&CoursePattern>) -> Result<Self, CourseIdError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(CourseIdError::Empty);
        }
        if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(CourseIdError::InvalidCharacters(id.to_string()));
        }
        // The identifier names a directory under the data root
        if id.contains('/') {
            return Err(CourseIdError::PathSeparator(id.to_string()));
        }
        if id == "." || id == ".." {
            return Err(CourseIdError::RelativePath(id.to_string()));
        }
        if let Some(pattern) = pattern {
            if !pattern.is_match(id) {
                return Err(CourseIdError::PatternMismatch {
                    id: id.to_string(),
                    pattern: pattern.as_str().to_string(),
                });
            }
        }
        Ok(Self(id.to_string()))
    }

    /// Validate an optional identifier, treating `None` as missing
    pub fn from_optional(
        raw: Option<&str>,
        pattern: Option<&CoursePattern>,
    ) -> Result<Self, CourseIdError> {
        match raw {
            Some(raw) => Self::parse(raw, pattern),
            None => Err(CourseIdError::Missing),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Start and end dates of a course run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDates {
    pub start_date: NaiveDate,

    /// Unknown when only a start date was supplied
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl CourseDates {
    pub fn starting(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date: None,
        }
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
}

/// Course week for `today`, counted from 1 on the start date
///
/// Days before the start date fall in week 0.
pub fn course_week(today: NaiveDate, start_date: NaiveDate) -> u32 {
    let days = today.signed_duration_since(start_date).num_days();
    if days < 0 {
        0
    } else {
        (days / 7) as u32 + 1
    }
}

/// Directory receiving the pipeline output and the success marker
pub fn success_dir(data_root: &str, course_id: &CourseId, week: Option<u32>) -> String {
    let root = data_root.trim_end_matches('/');
    let prefix = if root.is_empty() {
        String::new()
    } else {
        format!("{}/", root)
    };
    match week {
        Some(week) => format!("{}{}/week_{}/", prefix, course_id, week),
        None => format!("{}{}/", prefix, course_id),
    }
}

/// Course dates keyed by course identifier, loaded from YAML
///
/// ```yaml
/// course-101:
///   start_date: 2024-01-08
///   end_date: 2024-03-29
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseCalendar {
    courses: HashMap<String, CourseDates>,
}

impl CourseCalendar {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read course calendar {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let calendar: CourseCalendar =
            serde_yaml::from_str(yaml).context("Failed to parse course calendar")?;
        for (id, dates) in &calendar.courses {
            if let Some(end) = dates.end_date {
                if end < dates.start_date {
                    anyhow::bail!("Course '{}' ends before it starts", id);
                }
            }
        }
        Ok(calendar)
    }

    pub fn dates_for(&self, course_id: &CourseId) -> Option<CourseDates> {
        self.courses.get(course_id.as_str()).copied()
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}
