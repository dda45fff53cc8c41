use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::LockError;

/// Replace `path` with `contents` in a single rename so readers never see a
/// partially written artifact.
///
/// # Errors
///
/// Returns an I/O error when the temporary file cannot be created, written or
/// moved over `path`.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), LockError> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|source| LockError::io("create temporary file in", parent, source))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|source| LockError::io("write", tmp.path(), source))?;
    tmp.as_file()
        .sync_all()
        .map_err(|source| LockError::io("sync", tmp.path(), source))?;
    tmp.persist(path)
        .map_err(|err| LockError::io("replace", path, err.error))?;
    Ok(())
}

/// Read an artifact, mapping failures to [`LockError::Io`].
pub(crate) fn read_text(path: &Path) -> Result<String, LockError> {
    fs::read_to_string(path).map_err(|source| LockError::io("read", path, source))
}
