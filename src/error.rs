//! The error taxonomy of this crate.

use std::error::Error;
use std::fmt;
use std::fmt::Display;

use web_time::Duration;

/// This enum contains all error messages this library can return. Most API functions
/// will generally return a [`Result<T, ProverError>`].
///
/// Capability-initialization failures are absorbed into fallback mode and never
/// surface through this type; a caller only sees a `ProverError` when both the
/// real and the fallback pipeline fail within the same request, or when the
/// request itself is malformed.
///
/// [`Result<T, ProverError>`]: std::result::Result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProverError {
    /// The external proving toolchain could not be found or did not answer the
    /// version probe.
    ToolchainMissing {
        /// Further details on what the probe observed.
        context: String,
    },
    /// Building the prover program via the external toolchain exited non-zero.
    BuildFailed {
        /// Captured standard error of the build invocation.
        stderr: String,
    },
    /// The operating system could not start the external process.
    SpawnFailed {
        /// The command that failed to spawn.
        command: String,
        /// The underlying OS error, as text.
        context: String,
    },
    /// An external invocation exceeded its configured time bound. The child
    /// process has been terminated before this error is returned.
    Timeout {
        /// The command that was terminated.
        command: String,
        /// The configured time bound that was exceeded.
        limit: Duration,
    },
    /// A pipeline stage failed. Carries the stage name from the active stage
    /// vocabulary.
    StageFailed {
        /// Name of the stage that failed.
        stage: &'static str,
        /// A description of the failure.
        context: String,
    },
    /// The supplied game snapshot violates a structural invariant, for example
    /// a move number of zero or identical origin and destination squares.
    InvalidSnapshot {
        /// Further specifies why the snapshot was rejected.
        info: String,
    },
}

impl Display for ProverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProverError::ToolchainMissing { context } => {
                write!(f, "Proving toolchain unavailable: {}", context)
            }
            ProverError::BuildFailed { stderr } => {
                write!(f, "Prover program build failed: {}", stderr)
            }
            ProverError::SpawnFailed { command, context } => {
                write!(f, "Could not spawn `{}`: {}", command, context)
            }
            ProverError::Timeout { command, limit } => {
                write!(
                    f,
                    "`{}` exceeded its time bound of {}ms and was terminated",
                    command,
                    limit.as_millis()
                )
            }
            ProverError::StageFailed { stage, context } => {
                write!(f, "Pipeline stage '{}' failed: {}", stage, context)
            }
            ProverError::InvalidSnapshot { info } => {
                write!(f, "Invalid game snapshot: {}", info)
            }
        }
    }
}

impl Error for ProverError {}
