//! File helpers shared by the hooks.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{HookError, Result};

/// Maximum size of a file read into memory (10 MB).
///
/// Handoff documents and edited sources are expected to be far smaller;
/// anything larger is skipped rather than slurped.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Read a file into a string, refusing files over [`MAX_FILE_SIZE`].
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string, refusing files over `max_size` bytes.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    check_size(path, max_size)?;
    fs::read_to_string(path).map_err(|e| HookError::storage(path, e))
}

/// Like [`read_to_string_limited`], but invalid UTF-8 is replaced with
/// U+FFFD instead of failing the read.
pub fn read_lossy_limited(path: &Path) -> Result<String> {
    check_size(path, MAX_FILE_SIZE)?;
    let bytes = fs::read(path).map_err(|e| HookError::storage(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn check_size(path: &Path, max_size: u64) -> Result<()> {
    let size = fs::metadata(path)
        .map_err(|e| HookError::storage(path, e))?
        .len();
    if size > max_size {
        return Err(HookError::storage(
            path,
            std::io::Error::other(format!(
                "file is too large ({} bytes, max {} bytes)",
                size, max_size
            )),
        ));
    }
    Ok(())
}

/// Write `contents` to `path` atomically using temp file + rename.
///
/// The temp file lives next to the target so the rename stays on one
/// filesystem.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let temp_path = temp_path_for(path);

    {
        let mut file =
            fs::File::create(&temp_path).map_err(|e| HookError::storage(&temp_path, e))?;
        file.write_all(contents.as_bytes())
            .map_err(|e| HookError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| HookError::storage(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| HookError::storage(path, e))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}
