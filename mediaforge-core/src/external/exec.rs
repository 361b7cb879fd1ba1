//! Supervised execution of composed engine commands.
//!
//! Once a command's output is redirected away from the calling process, the
//! spawning call's own exit status says nothing about whether the *wrapped*
//! command succeeded. The supervisor therefore wraps every command in a
//! shell expression that appends unforgeable boundary tokens to the output:
//! one marking completion, one marking failure, and one carrying the numeric
//! exit code. Scanning the buffered output for these tokens is the sole
//! reliable completion/failure signal.
//!
//! Two execution modes exist: blocking (spawn, wait, read once, scan) and
//! polling (spawn detached with output redirected to a temp file, then
//! re-read and re-scan on a timer). Polling is cooperative: `stop()` keeps
//! the loop from re-entering but does not kill the external process;
//! `terminate()` does, using the child handle captured at spawn time.

use crate::config::CoreConfig;
use crate::error::{command_start_error, usage_error, CoreError, CoreResult};
use crate::temp_files;

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

// ============================================================================
// BOUNDARY TOKENS
// ============================================================================

/// Per-invocation boundary tokens. Derived from a random identifier rather
/// than the program name so they cannot collide with legitimate output, and
/// unique per invocation so concurrent supervisors sharing one temp
/// directory cannot confuse each other.
#[derive(Debug, Clone)]
pub(crate) struct BoundaryTokens {
    completion: String,
    failure: String,
    error_code: String,
}

impl BoundaryTokens {
    fn generate() -> Self {
        let id = temp_files::random_id(12);
        Self {
            completion: format!("<u-{id}>"),
            failure: format!("<f-{id}>"),
            error_code: format!("<e-{id}>"),
        }
    }
}

/// Outcome of scanning a buffer for boundary tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenScan {
    /// Neither token present: the command is still producing output.
    Pending,
    Completed,
    Failed(Option<i32>),
}

/// Scans a buffer for the boundary tokens. The failure token wins over the
/// completion token when both are present.
fn scan_for_tokens(buffer: &str, tokens: &BoundaryTokens) -> TokenScan {
    if buffer.contains(&tokens.failure) {
        let code = buffer
            .lines()
            .find_map(|line| line.trim().strip_prefix(tokens.error_code.as_str()))
            .and_then(|rest| rest.trim().parse::<i32>().ok());
        return TokenScan::Failed(code);
    }
    if buffer.contains(&tokens.completion) {
        return TokenScan::Completed;
    }
    TokenScan::Pending
}

// ============================================================================
// SUPERVISOR STATE
// ============================================================================

/// Lifecycle of one supervised invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Created,
    Running,
    Completed,
    Failed,
}

/// Immutable snapshot of a supervised run, carried inside
/// [`CoreError::EngineFailure`] so callers can inspect the raw buffer.
#[derive(Debug, Clone)]
pub struct ExecReport {
    pub command: String,
    pub status: ProcessStatus,
    pub raw_buffer: String,
    pub cleaned_buffer: String,
    pub error_code: Option<i32>,
    pub run_time: Option<Duration>,
}

// ============================================================================
// EXEC BUFFER
// ============================================================================

/// A composed command string plus the supervisory state of its execution.
pub struct ExecBuffer {
    command: String,
    tokens: BoundaryTokens,
    poll_interval: Duration,
    temp_dir: PathBuf,
    track_failure: bool,

    status: ProcessStatus,
    buffer: String,
    buffer_path: Option<PathBuf>,
    child: Option<Child>,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    error_code: Option<i32>,
    stopped: bool,
}

impl ExecBuffer {
    /// Creates a supervisor for the given composed command.
    ///
    /// The configuration is validated here so that an invalid temp directory
    /// or missing POSIX shell surfaces before any process spawns.
    pub fn new(command: String, config: &CoreConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            command,
            tokens: BoundaryTokens::generate(),
            poll_interval: config.poll_interval,
            temp_dir: config.temp_dir.clone(),
            track_failure: config.track_failure,
            status: ProcessStatus::Created,
            buffer: String::new(),
            buffer_path: None,
            child: None,
            started_at: None,
            finished_at: None,
            error_code: None,
            stopped: false,
        })
    }

    /// Overrides the poll interval for this invocation.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    // ---- Execution ----

    /// Executes the command synchronously to completion.
    pub fn execute(&mut self) -> CoreResult<ProcessStatus> {
        self.ensure_created()?;
        let wrapped = self.wrapped_command();
        log::debug!("Executing (blocking): {wrapped}");

        self.status = ProcessStatus::Running;
        self.started_at = Some(Instant::now());

        let output = Command::new("sh")
            .arg("-c")
            .arg(&wrapped)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| command_start_error("sh", e))?;

        self.finished_at = Some(Instant::now());
        self.buffer = String::from_utf8_lossy(&output.stdout).into_owned();
        self.apply_scan();

        if self.status == ProcessStatus::Running {
            // The shell exited without emitting either token. The outer exit
            // status is untrustworthy by design, so this is a supervision
            // failure rather than a command failure.
            return Err(CoreError::ProcessState(
                "command finished without emitting a boundary token".to_string(),
            ));
        }
        Ok(self.status)
    }

    /// Spawns the command detached for polling execution, redirecting its
    /// output to a generated temporary file.
    pub fn spawn(&mut self) -> CoreResult<()> {
        self.ensure_created()?;
        let buffer_path = temp_files::temp_file_path(&self.temp_dir, "exec_buffer", "txt");
        let redirected = format!(
            "( {} ) > {} 2>&1",
            self.wrapped_command(),
            shell_words::quote(&buffer_path.to_string_lossy())
        );
        log::debug!("Executing (polling): {redirected}");

        let child = Command::new("sh")
            .arg("-c")
            .arg(&redirected)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| command_start_error("sh", e))?;

        self.buffer_path = Some(buffer_path);
        self.child = Some(child);
        self.started_at = Some(Instant::now());
        self.status = ProcessStatus::Running;
        Ok(())
    }

    /// Re-reads the buffer file and re-scans for boundary tokens. Returns
    /// the current status without sleeping.
    pub fn poll(&mut self) -> CoreResult<ProcessStatus> {
        if self.status != ProcessStatus::Running || self.buffer_path.is_none() {
            return Ok(self.status);
        }

        if let Some(path) = &self.buffer_path {
            match std::fs::read_to_string(path) {
                Ok(contents) => self.buffer = contents,
                // The redirection target may not exist for the first few
                // instants after spawn.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.apply_scan();
        if self.status != ProcessStatus::Running {
            self.cleanup_after_terminal();
        }
        Ok(self.status)
    }

    /// Polls until a terminal state is reached or [`stop`](Self::stop) is
    /// called, sleeping for the poll interval between iterations.
    pub fn wait(&mut self) -> CoreResult<ProcessStatus> {
        self.wait_inner(None, &mut |_| {})
    }

    /// Polls for at most `max_iterations` iterations. A loop that exhausts
    /// its iterations without seeing a token reports the process as still
    /// running, never as failed.
    pub fn wait_iterations(&mut self, max_iterations: usize) -> CoreResult<ProcessStatus> {
        self.wait_inner(Some(max_iterations), &mut |_| {})
    }

    /// Like [`wait`](Self::wait), invoking the progress callback on every
    /// poll iteration with the current (possibly partial) cleaned buffer.
    pub fn wait_with_progress<F>(&mut self, mut progress: F) -> CoreResult<ProcessStatus>
    where
        F: FnMut(&str),
    {
        self.wait_inner(None, &mut progress)
    }

    fn wait_inner(
        &mut self,
        limit: Option<usize>,
        progress: &mut dyn FnMut(&str),
    ) -> CoreResult<ProcessStatus> {
        let mut iterations = 0usize;
        while self.status == ProcessStatus::Running && !self.stopped {
            if let Some(limit) = limit {
                if iterations >= limit {
                    break;
                }
            }
            iterations += 1;
            std::thread::sleep(self.poll_interval);
            self.poll()?;
            let cleaned = self.cleaned_buffer();
            progress(&cleaned);
        }
        Ok(self.status)
    }

    /// Halts the poll loop from re-entering. Does not terminate the
    /// external process.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Sends a kill signal to the tracked process and reaps it. True
    /// cancellation, as opposed to [`stop`](Self::stop).
    pub fn terminate(&mut self) -> CoreResult<()> {
        self.stopped = true;
        if let Some(child) = &mut self.child {
            child.kill()?;
            child.wait()?;
            self.child = None;
            self.finished_at = Some(Instant::now());
        }
        Ok(())
    }

    /// OS process identifier of the spawned shell, captured at spawn time.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    // ---- Results ----

    /// The unmodified output buffer, boundary tokens included.
    #[must_use]
    pub fn raw_buffer(&self) -> &str {
        &self.buffer
    }

    /// The output buffer with all boundary-token lines stripped.
    #[must_use]
    pub fn cleaned_buffer(&self) -> String {
        self.buffer
            .lines()
            .filter(|line| {
                let trimmed = line.trim();
                trimmed != self.tokens.completion
                    && trimmed != self.tokens.failure
                    && !trimmed.starts_with(self.tokens.error_code.as_str())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Last non-empty line of the cleaned buffer.
    #[must_use]
    pub fn last_line(&self) -> Option<String> {
        self.cleaned_buffer()
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .map(str::to_string)
    }

    /// Last carriage-return-delimited segment of the cleaned buffer. The
    /// engine rewrites its progress line with `\r`, so this is the most
    /// recent progress snapshot.
    #[must_use]
    pub fn last_split(&self) -> Option<String> {
        self.cleaned_buffer()
            .split('\r')
            .rev()
            .find(|s| !s.trim().is_empty())
            .map(str::to_string)
    }

    /// Tail of the cleaned buffer suitable as a diagnostic message: lines
    /// from the end until (and including) the first non-indented line.
    #[must_use]
    pub fn error_tail(&self) -> String {
        let cleaned = self.cleaned_buffer();
        let mut tail: Vec<&str> = Vec::new();
        for line in cleaned.lines().rev() {
            if line.trim().is_empty() && tail.is_empty() {
                continue;
            }
            tail.push(line);
            let indented = line.starts_with(' ') || line.starts_with('\t');
            if !indented && !line.trim().is_empty() {
                break;
            }
        }
        tail.reverse();
        tail.join("\n")
    }

    /// Elapsed run time: start to end, or start to now while running.
    #[must_use]
    pub fn run_time(&self) -> Option<Duration> {
        let started = self.started_at?;
        Some(match self.finished_at {
            Some(finished) => finished.duration_since(started),
            None => started.elapsed(),
        })
    }

    #[must_use]
    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    /// Whether the completion boundary token was observed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == ProcessStatus::Completed
    }

    /// Whether the failure boundary token was observed.
    ///
    /// When failure tracking is disabled this raises instead of answering:
    /// callers must not be able to mistake "unknown" for "succeeded."
    pub fn has_error(&self) -> CoreResult<bool> {
        if !self.track_failure {
            return Err(CoreError::ProcessState(
                "failure tracking is disabled for this supervisor; its outcome is unknown"
                    .to_string(),
            ));
        }
        Ok(self.status == ProcessStatus::Failed)
    }

    /// Exit code captured from the error-code boundary token.
    #[must_use]
    pub fn error_code(&self) -> Option<i32> {
        self.error_code
    }

    /// Snapshot of the run for error reporting.
    #[must_use]
    pub fn report(&self) -> ExecReport {
        ExecReport {
            command: self.command.clone(),
            status: self.status,
            raw_buffer: self.buffer.clone(),
            cleaned_buffer: self.cleaned_buffer(),
            error_code: self.error_code,
            run_time: self.run_time(),
        }
    }

    // ---- Internals ----

    /// Wraps the caller's command in the boundary-token shell idiom.
    fn wrapped_command(&self) -> String {
        format!(
            "( {} ) 2>&1 && printf '%s\\n' '{}' || {{ mf_status=$?; printf '%s\\n' '{}'; printf '%s%s\\n' '{}' \"$mf_status\"; }}",
            self.command, self.tokens.completion, self.tokens.failure, self.tokens.error_code
        )
    }

    fn ensure_created(&self) -> CoreResult<()> {
        if self.status != ProcessStatus::Created {
            return Err(usage_error("supervisor has already been executed"));
        }
        Ok(())
    }

    fn apply_scan(&mut self) {
        match scan_for_tokens(&self.buffer, &self.tokens) {
            TokenScan::Pending => {}
            TokenScan::Completed => {
                self.status = ProcessStatus::Completed;
                self.finished_at.get_or_insert_with(Instant::now);
            }
            TokenScan::Failed(code) => {
                self.status = ProcessStatus::Failed;
                self.error_code = code;
                self.finished_at.get_or_insert_with(Instant::now);
            }
        }
    }

    /// Deletes the backing temp file and reaps the child once a terminal
    /// state has been detected.
    fn cleanup_after_terminal(&mut self) {
        if let Some(path) = self.buffer_path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("Failed to remove exec buffer file {}: {e}", path.display());
            }
        }
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.wait() {
                log::warn!("Failed to reap supervised process: {e}");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn inject_buffer_for_test(&mut self, text: &str) {
        self.buffer = text.to_string();
        self.status = ProcessStatus::Running;
        self.apply_scan();
    }

    #[cfg(test)]
    pub(crate) fn tokens_for_test(&self) -> (String, String, String) {
        (
            self.tokens.completion.clone(),
            self.tokens.failure.clone(),
            self.tokens.error_code.clone(),
        )
    }
}

impl Drop for ExecBuffer {
    fn drop(&mut self) {
        // Best-effort cleanup of an abandoned polling run.
        if let Some(path) = self.buffer_path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> (tempfile::TempDir, CoreConfig) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CoreConfig::new(dir.path().to_path_buf());
        config.poll_interval = Duration::from_millis(10);
        (dir, config)
    }

    #[test]
    fn blocking_success_sets_completed() {
        let (_dir, config) = test_config();
        let mut exec = ExecBuffer::new("echo hello".to_string(), &config).unwrap();
        let status = exec.execute().unwrap();

        assert_eq!(status, ProcessStatus::Completed);
        assert!(exec.is_completed());
        assert!(!exec.has_error().unwrap());
        assert!(exec.raw_buffer().contains("hello"));
        assert_eq!(exec.cleaned_buffer(), "hello");
        assert_eq!(exec.last_line().as_deref(), Some("hello"));
        assert!(exec.run_time().is_some());
    }

    #[test]
    fn blocking_failure_captures_exit_code() {
        let (_dir, config) = test_config();
        let mut exec = ExecBuffer::new("echo oops; exit 7".to_string(), &config).unwrap();
        let status = exec.execute().unwrap();

        assert_eq!(status, ProcessStatus::Failed);
        assert!(exec.has_error().unwrap());
        assert!(!exec.is_completed());
        assert_eq!(exec.error_code(), Some(7));
        assert!(exec.cleaned_buffer().contains("oops"));
    }

    #[test]
    fn cleaned_buffer_strips_all_tokens() {
        let (_dir, config) = test_config();
        let mut exec = ExecBuffer::new("echo line; exit 3".to_string(), &config).unwrap();
        exec.execute().unwrap();

        let (completion, failure, error_code) = exec.tokens_for_test();
        let cleaned = exec.cleaned_buffer();
        assert!(!cleaned.contains(&completion));
        assert!(!cleaned.contains(&failure));
        assert!(!cleaned.contains(&error_code));
        assert!(exec.raw_buffer().contains(&failure));
    }

    #[test]
    fn token_round_trip_completion() {
        let (_dir, config) = test_config();
        let mut exec = ExecBuffer::new("true".to_string(), &config).unwrap();
        let (completion, _, _) = exec.tokens_for_test();
        exec.inject_buffer_for_test(&format!("some output\n{completion}\n"));

        assert!(exec.is_completed());
        assert!(!exec.has_error().unwrap());
    }

    #[test]
    fn token_round_trip_failure_wins_over_completion() {
        let (_dir, config) = test_config();
        let mut exec = ExecBuffer::new("true".to_string(), &config).unwrap();
        let (completion, failure, error_code) = exec.tokens_for_test();
        exec.inject_buffer_for_test(&format!("{completion}\n{failure}\n{error_code}42\n"));

        assert!(exec.has_error().unwrap());
        assert!(!exec.is_completed());
        assert_eq!(exec.error_code(), Some(42));
    }

    #[test]
    fn polling_run_completes_and_removes_buffer_file() {
        let (_dir, config) = test_config();
        let mut exec = ExecBuffer::new("echo polled".to_string(), &config).unwrap();
        exec.spawn().unwrap();
        let status = exec.wait().unwrap();

        assert_eq!(status, ProcessStatus::Completed);
        assert!(exec.cleaned_buffer().contains("polled"));
        assert!(exec.buffer_path.is_none());
    }

    #[test]
    fn polling_run_captures_failure_code() {
        let (_dir, config) = test_config();
        let mut exec = ExecBuffer::new("exit 5".to_string(), &config).unwrap();
        exec.spawn().unwrap();
        let status = exec.wait().unwrap();

        assert_eq!(status, ProcessStatus::Failed);
        assert_eq!(exec.error_code(), Some(5));
    }

    #[test]
    fn exhausted_poll_loop_reports_still_running() {
        let (_dir, config) = test_config();
        let mut exec = ExecBuffer::new("sleep 5".to_string(), &config).unwrap();
        exec.spawn().unwrap();
        let status = exec.wait_iterations(3).unwrap();

        assert_eq!(status, ProcessStatus::Running);
        assert!(!exec.is_completed());
        assert!(!exec.has_error().unwrap());
        exec.terminate().unwrap();
    }

    #[test]
    fn progress_callback_sees_partial_output() {
        let (_dir, config) = test_config();
        let mut exec =
            ExecBuffer::new("echo first; sleep 0.1; echo second".to_string(), &config).unwrap();
        exec.spawn().unwrap();

        let mut snapshots: Vec<String> = Vec::new();
        let status = exec
            .wait_with_progress(|partial| snapshots.push(partial.to_string()))
            .unwrap();

        assert_eq!(status, ProcessStatus::Completed);
        assert!(!snapshots.is_empty());
        assert!(snapshots.last().unwrap().contains("second"));
    }

    #[test]
    fn has_error_raises_when_failure_tracking_disabled() {
        let (_dir, mut config) = test_config();
        config.track_failure = false;
        let mut exec = ExecBuffer::new("echo hi".to_string(), &config).unwrap();
        exec.execute().unwrap();

        assert!(matches!(exec.has_error(), Err(CoreError::ProcessState(_))));
        // Completion is still observable.
        assert!(exec.is_completed());
    }

    #[test]
    fn supervisor_cannot_be_executed_twice() {
        let (_dir, config) = test_config();
        let mut exec = ExecBuffer::new("true".to_string(), &config).unwrap();
        exec.execute().unwrap();
        assert!(exec.execute().is_err());
    }

    #[test]
    fn stop_halts_the_poll_loop() {
        let (_dir, config) = test_config();
        let mut exec = ExecBuffer::new("sleep 5".to_string(), &config).unwrap();
        exec.spawn().unwrap();
        exec.stop();
        let status = exec.wait().unwrap();

        assert_eq!(status, ProcessStatus::Running);
        exec.terminate().unwrap();
    }

    #[test]
    fn last_split_returns_latest_progress_snapshot() {
        let (_dir, config) = test_config();
        let mut exec = ExecBuffer::new("true".to_string(), &config).unwrap();
        let (completion, _, _) = exec.tokens_for_test();
        // The engine rewrites its progress line in place with \r.
        exec.inject_buffer_for_test(&format!(
            "frame=  10 time=00:00:01\rframe=  20 time=00:00:02\rframe=  30 time=00:00:03\n{completion}\n"
        ));

        assert_eq!(
            exec.last_split().as_deref(),
            Some("frame=  30 time=00:00:03")
        );
    }

    #[test]
    fn error_tail_stops_at_non_indented_line() {
        let (_dir, config) = test_config();
        let mut exec = ExecBuffer::new("true".to_string(), &config).unwrap();
        let (_, failure, error_code) = exec.tokens_for_test();
        exec.inject_buffer_for_test(&format!(
            "earlier context\nOutput #0:\n  Stream mapping ok\nConversion failed!\n  reason: bad flag\n{failure}\n{error_code}1\n"
        ));

        let tail = exec.error_tail();
        assert!(tail.starts_with("Conversion failed!"));
        assert!(tail.contains("reason: bad flag"));
        assert!(!tail.contains("earlier context"));
    }

    #[test]
    fn boundary_tokens_are_unique_per_invocation() {
        let (_dir, config) = test_config();
        let a = ExecBuffer::new("true".to_string(), &config).unwrap();
        let b = ExecBuffer::new("true".to_string(), &config).unwrap();
        assert_ne!(a.tokens_for_test().0, b.tokens_for_test().0);
    }
}
