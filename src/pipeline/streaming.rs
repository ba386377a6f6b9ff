//! Streaming support for pipeline output
//!
//! The subprocess pipeline reads the child's stdout and stderr line by line
//! and hands each line to an [`OutputCallback`] as soon as it arrives, so the
//! operator sees pipeline progress live instead of after the run.
//!
//! # Example
//!
//! ```
//! use course_runner::pipeline::{OutputCallback, OutputLine, OutputStream};
//!
//! struct Printer;
//!
//! impl OutputCallback for Printer {
//!     fn on_line(&self, line: &OutputLine) {
//!         match line.stream {
//!             OutputStream::Stdout => println!("{}", line.text),
//!             OutputStream::Stderr => eprintln!("{}", line.text),
//!         }
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Which child stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of pipeline output, without its trailing newline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

impl OutputLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stderr,
            text: text.into(),
        }
    }
}

/// Callback for processing output lines as they arrive
///
/// This trait is object-safe and is passed around as `&dyn OutputCallback`.
pub trait OutputCallback: Send + Sync {
    /// Called once for every line read from the pipeline process
    fn on_line(&self, line: &OutputLine);
}

/// Callback that discards every line
#[derive(Debug, Clone, Default)]
pub struct NoopCallback;

impl OutputCallback for NoopCallback {
    fn on_line(&self, _line: &OutputLine) {}
}
