// ============================================================================
// mediaforge-core/src/config.rs
// ============================================================================
//
// CONFIGURATION: Core Configuration Structures and Constants
//
// This module defines the configuration structure and constants used
// throughout the mediaforge-core library: binary path overrides for the
// engine and prober, the shared temporary directory, and process
// supervision defaults.
//
// USAGE:
// Instances of CoreConfig are created by consumers of the library (like
// mediaforge-cli) and passed to the components that need them. validate()
// must succeed before any process supervisor is constructed.

use crate::error::{CoreError, CoreResult};
use crate::external::BinaryResolver;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// DEFAULT CONSTANTS
// ============================================================================

/// Default name of the media-processing engine binary.
pub const DEFAULT_ENGINE_BINARY: &str = "ffmpeg";

/// Default name of the media-inspection prober binary.
pub const DEFAULT_PROBER_BINARY: &str = "ffprobe";

/// Default sleep interval between buffer re-reads in the polling supervisor.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Look-back window (seconds) for the coarse-seek optimization. Seeks past
/// this threshold are split into a cheap pre-input seek that lands this many
/// seconds early, plus an exact post-input seek for the remainder.
pub const COARSE_SEEK_LOOKBACK_SECS: f64 = 15.0;

// ============================================================================
// CORE CONFIGURATION
// ============================================================================

/// Main configuration structure for the mediaforge-core library.
///
/// # Examples
///
/// ```rust,no_run
/// use mediaforge_core::CoreConfig;
/// use std::path::PathBuf;
///
/// let mut config = CoreConfig::new(PathBuf::from("/tmp"));
/// config.engine_path = Some(PathBuf::from("/usr/local/bin/ffmpeg"));
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfig {
    // ---- Binary Paths ----
    /// Absolute path to the engine binary. When `None`, the engine is
    /// resolved from the search path by name.
    pub engine_path: Option<PathBuf>,

    /// Absolute path to the prober binary. When `None`, the prober is
    /// resolved from the search path by name.
    pub prober_path: Option<PathBuf>,

    // ---- Shared Resources ----
    /// Directory for supervisor output buffers and other temporary files.
    pub temp_dir: PathBuf,

    // ---- Supervision Defaults ----
    /// Sleep interval between poll iterations for non-blocking execution.
    pub poll_interval: Duration,

    /// Whether supervisors created from this config track failure via the
    /// boundary-token protocol. Disabling this makes `has_error()` raise
    /// rather than report; it never silently reads as success.
    pub track_failure: bool,

    /// Shared binary resolution cache. Clones of this config resolve the
    /// engine and prober once between them.
    resolver: BinaryResolver,
}

impl CoreConfig {
    /// Creates a configuration with default binaries and poll interval.
    #[must_use]
    pub fn new(temp_dir: PathBuf) -> Self {
        Self {
            engine_path: None,
            prober_path: None,
            temp_dir,
            poll_interval: DEFAULT_POLL_INTERVAL,
            track_failure: true,
            resolver: BinaryResolver::new(),
        }
    }

    /// Returns the resolver used to locate the engine and prober binaries.
    #[must_use]
    pub fn resolver(&self) -> &BinaryResolver {
        &self.resolver
    }

    /// Validates the configuration before any external process is spawned.
    ///
    /// Checks that the temporary directory exists, is a directory, and is
    /// writable, and that a POSIX shell is available for the supervisor's
    /// boundary-token protocol. Configured binary paths, if any, must point
    /// at existing files.
    pub fn validate(&self) -> CoreResult<()> {
        if !cfg!(unix) {
            return Err(CoreError::Config(
                "a POSIX shell is required for process supervision".to_string(),
            ));
        }

        if !self.temp_dir.is_dir() {
            return Err(CoreError::Config(format!(
                "temp directory does not exist or is not a directory: {}",
                self.temp_dir.display()
            )));
        }

        // Probe writability by creating and removing a marker file.
        let probe = crate::temp_files::temp_file_path(&self.temp_dir, "write_probe", "tmp");
        std::fs::write(&probe, b"").map_err(|e| {
            CoreError::Config(format!(
                "temp directory is not writable: {}: {}",
                self.temp_dir.display(),
                e
            ))
        })?;
        std::fs::remove_file(&probe)?;

        for (label, path) in [
            ("engine", self.engine_path.as_ref()),
            ("prober", self.prober_path.as_ref()),
        ] {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(CoreError::Config(format!(
                        "configured {label} binary does not exist: {}",
                        path.display()
                    )));
                }
            }
        }

        if self.poll_interval.is_zero() {
            return Err(CoreError::Config(
                "poll interval must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::new(dir.path().to_path_buf());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_temp_dir() {
        let config = CoreConfig::new(PathBuf::from("/nonexistent/mediaforge/tmp"));
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn validate_rejects_missing_engine_override() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CoreConfig::new(dir.path().to_path_buf());
        config.engine_path = Some(PathBuf::from("/nonexistent/ffmpeg"));
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn config_clones_share_resolved_binaries() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CoreConfig::new(dir.path().to_path_buf());
        let echo = crate::external::resolve_binary(None, "echo").unwrap();
        config.engine_path = Some(echo.clone());

        let first = config
            .resolver()
            .engine(config.engine_path.as_deref())
            .unwrap();
        assert_eq!(first, echo);

        // A clone shares the cache, so the engine is not resolved again
        // even when the clone carries a different override.
        let mut cloned = config.clone();
        cloned.engine_path = Some(PathBuf::from("/nonexistent/ffmpeg"));
        let second = cloned
            .resolver()
            .engine(cloned.engine_path.as_deref())
            .unwrap();
        assert_eq!(second, echo);
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CoreConfig::new(dir.path().to_path_buf());
        config.poll_interval = Duration::ZERO;
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }
}
