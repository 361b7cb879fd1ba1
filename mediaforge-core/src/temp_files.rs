//! Temporary file paths and random identifiers for the process supervisor.

use std::path::{Path, PathBuf};

/// Returns a temporary file path with random suffix. Does not create the file.
///
/// Used by the process supervisor for its redirected output buffer, where the
/// file is created by the spawned shell rather than by this process.
pub fn temp_file_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    let filename = format!("{prefix}_{}.{extension}", random_id(6));
    dir.join(filename)
}

/// Returns a random alphanumeric identifier of the given length.
///
/// Also used to derive per-invocation boundary tokens; the identifier is
/// never based on the program name so it cannot collide with its output.
pub fn random_id(len: usize) -> String {
    use rand::distributions::Alphanumeric;
    use rand::{thread_rng, Rng};

    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_file_path_is_unique() {
        let dir = Path::new("/tmp");
        let a = temp_file_path(dir, "buf", "txt");
        let b = temp_file_path(dir, "buf", "txt");
        assert_ne!(a, b);
        assert!(a.to_string_lossy().ends_with(".txt"));
    }

    #[test]
    fn random_id_has_requested_length() {
        assert_eq!(random_id(12).len(), 12);
        assert!(random_id(12).chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
