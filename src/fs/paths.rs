//! Path and directory management.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Ensure a directory exists, creating it if necessary.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

/// Resolve a filename inside the destination directory.
///
/// The filename must be a single path component.
pub fn destination_path(dir: &Path, filename: &str) -> Result<PathBuf> {
    let candidate = Path::new(filename);
    if candidate.components().count() != 1 || candidate.file_name().is_none() {
        return Err(Error::InvalidFilename(filename.to_string()));
    }
    Ok(dir.join(filename))
}

/// Delete a partially written file. A missing file is not an error.
pub async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed partial file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove partial file {}: {}", path.display(), e),
    }
}
