// ============================================================================
// mediaforge-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with the Engine and Prober Binaries
//
// This module encapsulates interactions with the external media-processing
// engine (ffmpeg) and inspection prober (ffprobe): resolving the binaries,
// supervising spawned processes through the boundary-token protocol, and
// probing media files for structured information.
//
// KEY COMPONENTS:
// - BinaryResolver: locates the engine/prober on the search path or
//   validates configured absolute paths
// - ExecBuffer (exec): the supervised process with buffered output
// - Prober (prober): media inspection through the same composer/supervisor
//
// DESIGN PHILOSOPHY:
// The module follows the dependency injection pattern: metadata parsing and
// result caching sit behind traits so consumers can provide their own
// implementations for testing or specialized behavior.

use crate::config::{DEFAULT_ENGINE_BINARY, DEFAULT_PROBER_BINARY};
use crate::error::{command_failed_error, command_start_error, CoreError, CoreResult};

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, OnceLock};

// ============================================================================
// SUBMODULES
// ============================================================================

/// Process supervision with boundary-token completion detection
pub mod exec;

/// Media inspection through the prober binary
pub mod prober;

#[cfg(test)]
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use exec::{ExecBuffer, ExecReport, ProcessStatus};
pub use prober::{JsonMetadataParser, MediaInfo, MetadataParser, Prober, StreamInfo};

// ============================================================================
// BINARY RESOLUTION
// ============================================================================

/// Resolves and caches the engine and prober binary paths. The cells are
/// shared across clones, so every component holding a copy of the same
/// configuration resolves each binary at most once; after start-up the
/// cache is read-mostly.
#[derive(Debug, Clone, Default)]
pub struct BinaryResolver {
    cells: Arc<ResolverCells>,
}

#[derive(Debug, Default)]
struct ResolverCells {
    engine: OnceLock<PathBuf>,
    prober: OnceLock<PathBuf>,
}

impl BinaryResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved path to the engine binary, cached after the first call.
    pub fn engine(&self, override_path: Option<&Path>) -> CoreResult<PathBuf> {
        Self::resolve_cached(&self.cells.engine, override_path, DEFAULT_ENGINE_BINARY)
    }

    /// Resolved path to the prober binary, cached after the first call.
    pub fn prober(&self, override_path: Option<&Path>) -> CoreResult<PathBuf> {
        Self::resolve_cached(&self.cells.prober, override_path, DEFAULT_PROBER_BINARY)
    }

    fn resolve_cached(
        cell: &OnceLock<PathBuf>,
        override_path: Option<&Path>,
        name: &str,
    ) -> CoreResult<PathBuf> {
        if let Some(path) = cell.get() {
            return Ok(path.clone());
        }
        let resolved = resolve_binary(override_path, name)?;
        Ok(cell.get_or_init(|| resolved).clone())
    }
}

/// Locates an executable: a configured absolute path is validated as-is,
/// otherwise the search path is scanned for the given name.
pub fn resolve_binary(override_path: Option<&Path>, name: &str) -> CoreResult<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            log::debug!("Using configured {name} binary: {}", path.display());
            return Ok(path.to_path_buf());
        }
        return Err(CoreError::Config(format!(
            "configured {name} binary does not exist: {}",
            path.display()
        )));
    }

    let search_path = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&search_path) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            log::debug!("Found {name} on the search path: {}", candidate.display());
            return Ok(candidate);
        }
    }

    log::warn!("Dependency '{name}' not found on the search path.");
    Err(CoreError::DependencyNotFound(name.to_string()))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Checks that a resolved binary is actually executable by running it with
/// `-version` and discarding the output.
pub fn check_dependency(binary: &Path) -> CoreResult<()> {
    let result = Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(status) if status.success() => {
            log::debug!("Dependency check passed: {}", binary.display());
            Ok(())
        }
        Ok(status) => {
            log::warn!(
                "Dependency '{}' exited with {status} during the version check.",
                binary.display()
            );
            Err(command_failed_error(
                binary.to_string_lossy(),
                status.code(),
                "version check returned a failure status",
            ))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{}' not found.", binary.display());
            Err(CoreError::DependencyNotFound(
                binary.to_string_lossy().into_owned(),
            ))
        }
        Err(e) => {
            log::error!("Failed to start dependency check for '{}': {e}", binary.display());
            Err(command_start_error(binary.to_string_lossy(), e))
        }
    }
}

/// Captures the first line of a binary's `-version` banner.
pub fn binary_version(binary: &Path) -> CoreResult<String> {
    let output = Command::new(binary)
        .arg("-version")
        .stderr(Stdio::null())
        .output()
        .map_err(|e| command_start_error(binary.to_string_lossy(), e))?;

    let text = String::from_utf8_lossy(&output.stdout);
    Ok(text.lines().next().unwrap_or_default().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_binary_finds_sh_on_path() {
        // `sh` is guaranteed on any platform the supervisor supports.
        let resolved = resolve_binary(None, "sh").unwrap();
        assert!(resolved.is_file());
    }

    #[test]
    fn resolve_binary_rejects_missing_override() {
        let err = resolve_binary(Some(Path::new("/nonexistent/ffmpeg")), "ffmpeg");
        assert!(matches!(err, Err(CoreError::Config(_))));
    }

    #[test]
    fn resolve_binary_reports_missing_dependency() {
        let err = resolve_binary(None, "mediaforge_no_such_binary");
        assert!(matches!(err, Err(CoreError::DependencyNotFound(_))));
    }

    #[test]
    fn resolver_caches_resolution_across_clones() {
        let sh = resolve_binary(None, "sh").unwrap();

        let resolver = BinaryResolver::new();
        assert_eq!(resolver.engine(Some(sh.as_path())).unwrap(), sh);

        // The cached path is shared with clones and sticks even when a
        // later caller passes a different (broken) override.
        let cloned = resolver.clone();
        let again = cloned
            .engine(Some(Path::new("/nonexistent/engine")))
            .unwrap();
        assert_eq!(again, sh);
    }

    #[test]
    fn resolver_cells_are_per_binary() {
        let sh = resolve_binary(None, "sh").unwrap();
        let echo = resolve_binary(None, "echo").unwrap();

        let resolver = BinaryResolver::new();
        assert_eq!(resolver.engine(Some(sh.as_path())).unwrap(), sh);
        assert_eq!(resolver.prober(Some(echo.as_path())).unwrap(), echo);
        assert_eq!(resolver.engine(Some(sh.as_path())).unwrap(), sh);
    }

    #[test]
    fn check_dependency_accepts_working_binary() {
        let echo = resolve_binary(None, "echo").unwrap();
        assert!(check_dependency(&echo).is_ok());
    }

    #[test]
    fn check_dependency_rejects_failing_binary() {
        // `false` ignores its arguments and always exits non-zero.
        let falsy = resolve_binary(None, "false").unwrap();
        let err = check_dependency(&falsy);
        assert!(matches!(err, Err(CoreError::CommandFailed { .. })));
    }
}
