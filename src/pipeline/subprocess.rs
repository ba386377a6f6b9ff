//! Subprocess pipeline - runs the configured program once per course

use crate::core::CourseRequest;
use crate::pipeline::{
    OutputCallback, OutputLine, OutputStream, PipelineCommand, PipelineError, PipelineInvoker,
    PipelineReport,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Number of trailing stderr lines kept for error messages
const STDERR_TAIL_LINES: usize = 20;

/// Pipeline that executes an external program as a child process
#[derive(Debug, Clone)]
pub struct SubprocessPipeline {
    command: PipelineCommand,
}

struct StreamSummary {
    stdout_lines: usize,
    stderr_lines: usize,
    stderr_tail: VecDeque<String>,
}

impl StreamSummary {
    fn tail(&self) -> String {
        self.stderr_tail
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl SubprocessPipeline {
    pub fn new(command: PipelineCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &PipelineCommand {
        &self.command
    }

    fn build_command(&self, request: &CourseRequest) -> Command {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(self.command.render_args(request))
            .envs(self.command.render_env(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.command.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Forward output lines until both streams close, then reap the child
    async fn drive(
        child: &mut Child,
        callback: Option<&dyn OutputCallback>,
    ) -> Result<(ExitStatus, StreamSummary), PipelineError> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::Internal("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PipelineError::Internal("stderr was not captured".to_string()))?;

        let mut stdout = BufReader::new(stdout);
        let mut stderr = BufReader::new(stderr);
        // Partial lines stay in these buffers if the other branch wins a select round
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut summary = StreamSummary {
            stdout_lines: 0,
            stderr_lines: 0,
            stderr_tail: VecDeque::with_capacity(STDERR_TAIL_LINES),
        };

        let emit = |line: OutputLine| {
            debug!(stream = ?line.stream, "pipeline: {}", line.text);
            if let Some(cb) = callback {
                cb.on_line(&line);
            }
        };

        while stdout_open || stderr_open {
            tokio::select! {
                read = stdout.read_until(b'\n', &mut stdout_buf), if stdout_open => {
                    if read? == 0 {
                        stdout_open = false;
                        continue;
                    }
                    let text = decode_line(&stdout_buf);
                    stdout_buf.clear();
                    summary.stdout_lines += 1;
                    emit(OutputLine { stream: OutputStream::Stdout, text });
                }
                read = stderr.read_until(b'\n', &mut stderr_buf), if stderr_open => {
                    if read? == 0 {
                        stderr_open = false;
                        continue;
                    }
                    let text = decode_line(&stderr_buf);
                    stderr_buf.clear();
                    summary.stderr_lines += 1;
                    if summary.stderr_tail.len() == STDERR_TAIL_LINES {
                        summary.stderr_tail.pop_front();
                    }
                    summary.stderr_tail.push_back(text.clone());
                    emit(OutputLine { stream: OutputStream::Stderr, text });
                }
            }
        }

        let status = child.wait().await?;
        Ok((status, summary))
    }
}

/// Decode one raw output line; invalid UTF-8 is replaced, not rejected
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[async_trait]
impl PipelineInvoker for SubprocessPipeline {
    async fn invoke(
        &self,
        request: &CourseRequest,
        callback: Option<&dyn OutputCallback>,
    ) -> Result<PipelineReport, PipelineError> {
        info!(
            "Starting pipeline for {}: {}",
            request.course_id,
            self.command.display(request)
        );
        let started = Instant::now();

        let mut child = self
            .build_command(request)
            .spawn()
            .map_err(|source| PipelineError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        let result = match self.command.timeout_secs {
            Some(secs) => {
                let driven = timeout(Duration::from_secs(secs), Self::drive(&mut child, callback)).await;
                match driven {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("Pipeline for {} timed out after {}s, killing it", request.course_id, secs);
                        if let Err(e) = child.kill().await {
                            warn!("Failed to kill timed out pipeline: {}", e);
                        }
                        return Err(PipelineError::Timeout(secs));
                    }
                }
            }
            None => Self::drive(&mut child, callback).await,
        };
        let (status, summary) = result?;
        let duration = started.elapsed();

        match status.code() {
            Some(0) => {
                debug!(
                    "Pipeline for {} finished in {:?} ({} stdout / {} stderr lines)",
                    request.course_id, duration, summary.stdout_lines, summary.stderr_lines
                );
                Ok(PipelineReport {
                    exit_code: 0,
                    stdout_lines: summary.stdout_lines,
                    stderr_lines: summary.stderr_lines,
                    duration,
                })
            }
            Some(code) => {
                warn!("Pipeline for {} exited with code {}", request.course_id, code);
                Err(PipelineError::Exited {
                    code,
                    stderr: summary.tail(),
                })
            }
            None => {
                warn!("Pipeline for {} was terminated by a signal", request.course_id);
                Err(PipelineError::Signaled {
                    stderr: summary.tail(),
                })
            }
        }
    }
}
