//! Canonical local file paths.

use std::path::{Path, PathBuf};

/// Returns the default location of the progress file, relative to the
/// working directory.
#[must_use]
pub fn default_state_file() -> PathBuf {
    PathBuf::from("logs").join("state.json")
}

/// Returns the temporary sibling a file is written to before being
/// renamed over `path`.
#[must_use]
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
