//! Terminal output callback for streaming pipeline output
//!
//! Pipeline stdout is written to our stdout and pipeline stderr to our
//! stderr, so log collectors in front of the container see the same split
//! the pipeline produced. In batch mode each line can carry a `[course]`
//! prefix so interleaved output stays attributable.
//!
//! # Example
//!
//! ```no_run
//! use course_runner::cli::terminal_output::TerminalOutputCallback;
//! use course_runner::pipeline::{OutputCallback, OutputLine};
//!
//! let callback = TerminalOutputCallback::new();
//! callback.on_line(&OutputLine::stdout("loading course data"));
//! ```

use crate::pipeline::{OutputCallback, OutputLine, OutputStream};
use console::style;
use std::io::{self, Write};

/// Callback that writes pipeline output lines to the terminal
#[derive(Debug, Default, Clone)]
pub struct TerminalOutputCallback {
    prefix: Option<String>,
    stderr_only: bool,
}

impl TerminalOutputCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every line with `[prefix]`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            stderr_only: false,
        }
    }

    /// Send pipeline stdout to stderr too, keeping stdout free for a JSON report
    pub fn stderr_only(mut self) -> Self {
        self.stderr_only = true;
        self
    }

    fn target(&self, line: &OutputLine) -> OutputStream {
        if self.stderr_only {
            OutputStream::Stderr
        } else {
            line.stream
        }
    }

    fn render(&self, line: &OutputLine) -> String {
        match &self.prefix {
            Some(prefix) => format!("{} {}", style(format!("[{}]", prefix)).dim(), line.text),
            None => line.text.clone(),
        }
    }
}

impl OutputCallback for TerminalOutputCallback {
    fn on_line(&self, line: &OutputLine) {
        let rendered = self.render(line);
        // Write errors (closed pipe) must not abort the run
        match self.target(line) {
            OutputStream::Stdout => {
                let mut out = io::stdout().lock();
                let _ = writeln!(out, "{}", rendered);
                let _ = out.flush();
            }
            OutputStream::Stderr => {
                let mut err = io::stderr().lock();
                let _ = writeln!(err, "{}", rendered);
            }
        }
    }
}

/// Print a horizontal rule spanning the terminal width
pub fn print_separator() {
    let width = term_size::dimensions_stdout()
        .map(|(w, _)| w)
        .unwrap_or(80);
    println!("{}", style("─".repeat(width)).dim());
}
