//! Error types for the mediaforge-core library.
//!
//! The taxonomy follows the boundaries of the system: configuration errors
//! are raised before any external process spawns, usage errors are raised
//! synchronously from the violating call, and external process failures
//! carry the exit code plus a diagnostic snapshot of the supervised buffer.

use crate::external::exec::ExecReport;
use thiserror::Error;

/// Custom error types for mediaforge-core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, #[source] std::io::Error),

    #[error("Command '{cmd}' failed (exit code {exit_code:?}): {message}")]
    CommandFailed {
        cmd: String,
        exit_code: Option<i32>,
        message: String,
    },

    /// The engine reported failure through its boundary token. Carries the
    /// supervisor's report so callers can inspect the raw buffer.
    #[error("engine failed (exit code {exit_code:?}): {tail}")]
    EngineFailure {
        exit_code: Option<i32>,
        tail: String,
        report: Box<ExecReport>,
    },

    #[error("Invalid path: {0}")]
    PathError(String),

    #[error("Probe output parse error: {0}")]
    ProbeParse(String),

    #[error("Process state error: {0}")]
    ProcessState(String),
}

/// Result type for mediaforge-core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Creates a `CommandStart` error for a command that failed to spawn.
pub(crate) fn command_start_error(cmd: impl Into<String>, err: std::io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

/// Creates a `CommandFailed` error with the captured exit code and message.
pub(crate) fn command_failed_error(
    cmd: impl Into<String>,
    exit_code: Option<i32>,
    message: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        cmd: cmd.into(),
        exit_code,
        message: message.into(),
    }
}

/// Creates a `Usage` error from a formatted message.
pub(crate) fn usage_error(message: impl Into<String>) -> CoreError {
    CoreError::Usage(message.into())
}
