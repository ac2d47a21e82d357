//! Advisory scan for secrets hardcoded in source files.

use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::{DirEntry, WalkDir};

use crate::error::{HookError, Result};
use crate::util::read_to_string_limited;

/// Directories never descended into.
pub const SKIP_DIRS: &[&str] = &[
    ".git",
    ".venv",
    "venv",
    "node_modules",
    "dist",
    "build",
    "target",
];

/// Lowercased substrings that mark a line as a probable false positive.
pub const SAFE_MARKERS: &[&str] = &[
    "example", "test", "mock", "fake", "dummy", "getenv", "environ", "config", "setting", "# ",
];

/// Hits kept per pattern per file.
pub const MAX_HITS_PER_FILE: usize = 2;

/// Findings shown to the user.
pub const MAX_FINDINGS_SHOWN: usize = 5;

/// Characters shown per finding.
pub const MAX_FINDING_CHARS: usize = 100;

const SECRET_NAMES: &[&str] = &["api_key|apikey", "password", "secret", "token"];

/// One suspicious line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Path relative to the scanned root.
    pub path: PathBuf,
    /// 1-based line number.
    pub line_number: usize,
    /// The line as written.
    pub line: String,
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line_number, self.line.trim())
    }
}

/// Scans a tree for `name = "literal"` assignments of secret-like names.
pub struct SecretScanner {
    patterns: Vec<Regex>,
    extensions: Vec<String>,
}

impl SecretScanner {
    /// Scanner for files with the given extensions (without the dot).
    pub fn new(extensions: &[String]) -> Result<Self> {
        let patterns = SECRET_NAMES
            .iter()
            .map(|name| {
                Regex::new(&format!(r#"(?i)\b({})\b\s*=\s*['"][^'"]+['"]"#, name))
                    .map_err(|e| HookError::config(format!("invalid secret pattern: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        })
    }

    /// Scan `root` file by file, keeping at most two hits per pattern in
    /// each file.
    ///
    /// Unreadable files and directories are skipped.
    pub fn scan(&self, root: &Path) -> Vec<Finding> {
        let mut findings = Vec::new();

        for (path, content) in self.collect_sources(root) {
            for pattern in &self.patterns {
                let hits = content
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| pattern.is_match(line) && !is_probably_safe(line))
                    .take(MAX_HITS_PER_FILE)
                    .map(|(idx, line)| Finding {
                        path: path.clone(),
                        line_number: idx + 1,
                        line: line.to_string(),
                    });
                findings.extend(hits);
            }
        }
        findings
    }

    fn collect_sources(&self, root: &Path) -> Vec<(PathBuf, String)> {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e));

        let mut sources = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!("secret scan skipped entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.wants(entry.path()) {
                continue;
            }
            let Ok(content) = read_to_string_limited(entry.path()) else {
                continue;
            };
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            sources.push((relative, content));
        }
        sources
    }

    fn wants(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|want| want == &e.to_lowercase()))
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIP_DIRS.contains(&name))
}

fn is_probably_safe(line: &str) -> bool {
    let lower = line.to_lowercase();
    SAFE_MARKERS.iter().any(|marker| lower.contains(marker))
}
