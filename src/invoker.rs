//! External process invocation with timeouts and output capture.
//!
//! [`ProcessInvoker`] runs one external command with a working directory,
//! environment overrides, and a hard time bound. Standard output can be
//! streamed line by line to a caller-supplied callback while standard error is
//! captured in full. On timeout the child process is killed and reaped before
//! the failure is surfaced, so no orphan remains.
//!
//! This layer never retries; retry and fallback policy belongs to the
//! orchestrator.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use web_time::{Duration, Instant};

use crate::error::ProverError;

/// Exit code reported when the OS gives us none (process killed by signal).
const SIGNALED_EXIT_CODE: i32 = -1;

/// Description of one external invocation.
#[derive(Debug, Clone)]
pub struct InvokeSpec {
    /// Executable to run.
    pub command: String,
    /// Arguments, not including the executable name.
    pub args: Vec<String>,
    /// Working directory; inherits the current one when `None`.
    pub cwd: Option<PathBuf>,
    /// Environment overrides applied on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// Hard time bound. On expiry the child is killed and reaped.
    pub timeout: Duration,
}

impl InvokeSpec {
    /// Renders the command line for error messages and logs.
    #[must_use]
    pub fn display_command(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

/// Captured result of a completed invocation that exited with status 0.
#[derive(Debug, Clone)]
pub struct InvokeOutput {
    /// Exit code (always 0 for values returned from [`ProcessInvoker::run`]).
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Wall-clock time from spawn to exit.
    pub elapsed: Duration,
}

/// Failure kinds of a single invocation.
///
/// Call sites map these onto the crate error taxonomy: a failed probe becomes
/// [`ProverError::ToolchainMissing`], a failed build [`ProverError::BuildFailed`],
/// and so on. The mapping context lives with the caller because only the
/// caller knows what the invocation was for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// The OS could not start the process at all.
    Spawn {
        /// The command that failed to spawn.
        command: String,
        /// The underlying OS error, as text.
        context: String,
    },
    /// The invocation exceeded its time bound. The child has been killed and
    /// reaped before this value is returned.
    TimedOut {
        /// The command that was terminated.
        command: String,
        /// The configured time bound.
        limit: Duration,
    },
    /// The process ran to completion but exited non-zero.
    NonZeroExit {
        /// The command that failed.
        command: String,
        /// The exit code, or [`SIGNALED_EXIT_CODE`] when killed by a signal.
        exit_code: i32,
        /// Captured standard error.
        stderr: String,
    },
}

impl std::fmt::Display for InvokeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvokeError::Spawn { command, context } => {
                write!(f, "could not spawn `{}`: {}", command, context)
            }
            InvokeError::TimedOut { command, limit } => {
                write!(
                    f,
                    "`{}` timed out after {}ms",
                    command,
                    limit.as_millis()
                )
            }
            InvokeError::NonZeroExit {
                command,
                exit_code,
                stderr,
            } => {
                write!(
                    f,
                    "`{}` exited with code {}: {}",
                    command,
                    exit_code,
                    stderr.trim()
                )
            }
        }
    }
}

impl std::error::Error for InvokeError {}

impl InvokeError {
    /// Maps a failed availability probe onto the crate error taxonomy.
    #[must_use]
    pub fn into_probe_error(self) -> ProverError {
        match self {
            InvokeError::Spawn { command, context } => ProverError::ToolchainMissing {
                context: format!("`{}` not runnable: {}", command, context),
            },
            InvokeError::TimedOut { command, limit } => ProverError::Timeout { command, limit },
            InvokeError::NonZeroExit {
                command, exit_code, ..
            } => ProverError::ToolchainMissing {
                context: format!("`{}` probe exited with code {}", command, exit_code),
            },
        }
    }

    /// Maps a failed build invocation onto the crate error taxonomy.
    #[must_use]
    pub fn into_build_error(self) -> ProverError {
        match self {
            InvokeError::Spawn { command, context } => ProverError::SpawnFailed { command, context },
            InvokeError::TimedOut { command, limit } => ProverError::Timeout { command, limit },
            InvokeError::NonZeroExit { stderr, .. } => ProverError::BuildFailed { stderr },
        }
    }

    /// Maps a failed proving run onto the crate error taxonomy, attributed to
    /// the given pipeline stage.
    #[must_use]
    pub fn into_stage_error(self, stage: &'static str) -> ProverError {
        match self {
            InvokeError::Spawn { command, context } => ProverError::SpawnFailed { command, context },
            InvokeError::TimedOut { command, limit } => ProverError::Timeout { command, limit },
            InvokeError::NonZeroExit {
                exit_code, stderr, ..
            } => ProverError::StageFailed {
                stage,
                context: format!("prover exited with code {}: {}", exit_code, stderr.trim()),
            },
        }
    }
}

/// Runs external commands on behalf of the capability manager and pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessInvoker;

impl ProcessInvoker {
    /// Runs the command to completion, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Spawn`] if the process cannot start,
    /// [`InvokeError::TimedOut`] if the time bound expires (the child is
    /// killed first), and [`InvokeError::NonZeroExit`] for any non-zero exit.
    pub async fn run(spec: &InvokeSpec) -> Result<InvokeOutput, InvokeError> {
        Self::run_streaming(spec, |_| {}).await
    }

    /// Like [`run`](Self::run), but feeds each stdout line to `on_line` as it
    /// arrives. Used to surface the external toolchain's own log lines as
    /// progress messages.
    pub async fn run_streaming<F>(
        spec: &InvokeSpec,
        mut on_line: F,
    ) -> Result<InvokeOutput, InvokeError>
    where
        F: FnMut(&str),
    {
        let start = Instant::now();

        let mut command = Command::new(&spec.command);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let spawn_err = |context: String| InvokeError::Spawn {
            command: spec.command.clone(),
            context,
        };

        let mut child = command.spawn().map_err(|e| spawn_err(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_err("stdout pipe missing".to_owned()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| spawn_err("stderr pipe missing".to_owned()))?;

        // Drain stderr concurrently so a chatty child cannot deadlock on a
        // full pipe while we read stdout.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let mut reader = BufReader::new(stderr);
            let _ = reader.read_to_string(&mut buf).await;
            buf
        });

        let mut stdout_buf = String::new();
        let mut lines = BufReader::new(stdout).lines();

        let wait_result = tokio::time::timeout(spec.timeout, async {
            while let Some(line) = lines.next_line().await? {
                on_line(&line);
                stdout_buf.push_str(&line);
                stdout_buf.push('\n');
            }
            child.wait().await
        })
        .await;

        let status = match wait_result {
            Ok(Ok(status)) => status,
            Ok(Err(io_err)) => {
                // I/O failure mid-run; make sure the child does not linger.
                let _ = child.start_kill();
                let _ = child.wait().await;
                stderr_task.abort();
                return Err(spawn_err(io_err.to_string()));
            }
            Err(_elapsed) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                stderr_task.abort();
                tracing::warn!(
                    command = %spec.display_command(),
                    timeout_ms = spec.timeout.as_millis() as u64,
                    "external invocation timed out, child killed"
                );
                return Err(InvokeError::TimedOut {
                    command: spec.command.clone(),
                    limit: spec.timeout,
                });
            }
        };

        let stderr_text = stderr_task.await.unwrap_or_default();
        let exit_code = status.code().unwrap_or(SIGNALED_EXIT_CODE);

        if !status.success() {
            return Err(InvokeError::NonZeroExit {
                command: spec.command.clone(),
                exit_code,
                stderr: stderr_text,
            });
        }

        Ok(InvokeOutput {
            exit_code,
            stdout: stdout_buf,
            stderr: stderr_text,
            elapsed: start.elapsed(),
        })
    }
}
