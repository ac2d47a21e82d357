//! Project root discovery.

use std::path::{Path, PathBuf};

/// Files or directories whose presence marks a project root.
pub const PROJECT_MARKERS: &[&str] = &[
    ".git",
    "pyproject.toml",
    "package.json",
    "Cargo.toml",
    "go.mod",
];

/// Find the nearest directory at or above `path` holding a project marker.
///
/// The path is resolved first when possible. The path itself is checked,
/// then each ancestor in order; the first match wins. Returns `None` when
/// the filesystem root is reached without a match.
pub fn find_project_root(path: &Path) -> Option<PathBuf> {
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    resolved
        .ancestors()
        .find(|dir| has_marker(dir))
        .map(Path::to_path_buf)
}

fn has_marker(dir: &Path) -> bool {
    PROJECT_MARKERS
        .iter()
        .any(|marker| dir.join(marker).exists())
}
