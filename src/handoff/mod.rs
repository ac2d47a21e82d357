//! Handoff documents: markdown notes one session leaves for the next.
//!
//! Layout under the project root:
//!
//! ```text
//! docs/handoff/
//! ├── .current                      # YAML pointer to the newest handoff
//! ├── HANDOFF-20260101-120000.md    # the newest `retention` documents
//! └── archive/                      # everything older
//! ```
//!
//! File names sort chronologically, so "newest" is simply the largest name.

mod content;
mod metadata;

pub use content::{
    count_modified_files, extract_mentioned_files, extract_summary, fallback_estimate,
    TokenEstimator, NO_SUMMARY, SUMMARY_HEADING,
};
pub use metadata::{is_plain_file_name, HandoffMetadata, HandoffMode};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::config::HandoffConfig;
use crate::error::{HookError, Result};
use crate::process::{CommandRunner, Invocation};
use crate::util::read_lossy_limited;

const FILE_PREFIX: &str = "HANDOFF-";
const FILE_SUFFIX: &str = ".md";
const ARCHIVE_DIR: &str = "archive";
const METADATA_FILE: &str = ".current";

/// File name for a handoff created at `at`.
pub fn handoff_file_name(at: DateTime<Local>) -> String {
    format!("{}{}{}", FILE_PREFIX, at.format("%Y%m%d-%H%M%S"), FILE_SUFFIX)
}

fn is_handoff_file_name(name: &str) -> bool {
    name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX)
}

/// What a listing shows about one handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffInfo {
    pub filename: String,
    pub path: PathBuf,
    /// Last modification time of the document.
    pub created: DateTime<Local>,
    pub size: u64,
    pub summary: String,
    pub token_estimate: usize,
    pub archived: bool,
}

impl fmt::Display for HandoffInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let archived = if self.archived { " (archived)" } else { "" };
        write!(f, "{}{}: {}", self.filename, archived, self.summary)
    }
}

/// A loaded handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub content: String,
    pub info: HandoffInfo,
}

/// Result of checking a handoff against the current tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub valid: bool,
    pub warnings: Vec<String>,
    pub age_days: i64,
    /// `<path> (deleted)` or `<path> (modified)`.
    pub files_changed: Vec<String>,
    /// Files with unresolved merge conflicts.
    pub conflicts: Vec<String>,
    /// Set when there was nothing to verify.
    pub error: Option<String>,
}

impl VerifyReport {
    fn not_found() -> Self {
        Self {
            valid: false,
            error: Some("Handoff not found".to_string()),
            ..Self::default()
        }
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Valid: {}", self.valid)?;
        if let Some(ref error) = self.error {
            writeln!(f, "Error: {}", error)?;
        }
        let sections = [
            ("Warnings:", &self.warnings),
            ("Files changed:", &self.files_changed),
            ("Conflicts:", &self.conflicts),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            writeln!(f, "{}", title)?;
            for item in items {
                writeln!(f, "  - {}", item)?;
            }
        }
        Ok(())
    }
}

/// Creates, finds and checks handoff documents for one project.
pub struct HandoffManager<R: CommandRunner> {
    root: PathBuf,
    dir: PathBuf,
    archive_dir: PathBuf,
    metadata_path: PathBuf,
    retention: usize,
    stale_days: i64,
    model: String,
    tokens: TokenEstimator,
    git_timeout: Duration,
    runner: R,
}

impl<R: CommandRunner> HandoffManager<R> {
    /// Manager for the project at `root`.
    pub fn new(root: impl Into<PathBuf>, config: &HandoffConfig, runner: R) -> Self {
        let root = root.into();
        let dir = root.join(&config.dir);
        Self {
            archive_dir: dir.join(ARCHIVE_DIR),
            metadata_path: dir.join(METADATA_FILE),
            dir,
            root,
            retention: config.retention.max(1),
            stale_days: config.stale_days,
            model: config.resolved_model(),
            tokens: TokenEstimator::new(config.tokenizer_argv()),
            git_timeout: Duration::from_secs(crate::config::TimeoutConfig::default().git_secs),
            runner,
        }
    }

    pub fn git_timeout(mut self, timeout: Duration) -> Self {
        self.git_timeout = timeout;
        self
    }

    /// Active handoff directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Write a new handoff, point the sidecar at it and archive old ones.
    pub fn create(&self, content: &str, mode: HandoffMode) -> Result<PathBuf> {
        self.create_at(content, mode, Local::now())
    }

    /// Like [`create`](Self::create) with an explicit creation time.
    pub fn create_at(
        &self,
        content: &str,
        mode: HandoffMode,
        now: DateTime<Local>,
    ) -> Result<PathBuf> {
        self.ensure_dirs()?;

        let mut stamp = now;
        let mut filename = handoff_file_name(stamp);
        while self.dir.join(&filename).exists() || self.archive_dir.join(&filename).exists() {
            stamp += chrono::Duration::seconds(1);
            filename = handoff_file_name(stamp);
        }

        let path = self.dir.join(&filename);
        fs::write(&path, content).map_err(|e| HookError::storage(&path, e))?;

        let metadata = HandoffMetadata {
            current: filename,
            created: now,
            model: self.model.clone(),
            token_estimate: self.tokens.estimate(&self.runner, content),
            files_modified: count_modified_files(content),
            mode,
        };
        metadata.write(&self.metadata_path)?;

        self.archive_old()?;
        tracing::debug!(path = %path.display(), "handoff created");
        Ok(path)
    }

    fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.archive_dir).map_err(|e| HookError::storage(&self.archive_dir, e))
    }

    /// Move all but the newest `retention` active handoffs into the archive.
    ///
    /// Returns the names moved.
    pub fn archive_old(&self) -> Result<Vec<String>> {
        let names = handoff_names(&self.dir)?;
        if names.len() <= self.retention {
            return Ok(Vec::new());
        }

        let excess = names.len() - self.retention;
        let mut moved = Vec::with_capacity(excess);
        for name in names.into_iter().take(excess) {
            let from = self.dir.join(&name);
            let to = self.archive_dir.join(&name);
            fs::rename(&from, &to).map_err(|e| HookError::storage(&from, e))?;
            moved.push(name);
        }
        Ok(moved)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Path of the newest handoff, per the sidecar.
    ///
    /// `None` when the sidecar is missing or corrupt, or points at a file
    /// that is not in the active directory.
    pub fn latest(&self) -> Option<PathBuf> {
        let current = HandoffMetadata::read_current(&self.metadata_path)?;
        if !is_plain_file_name(&current) {
            tracing::warn!(current = %current, "handoff pointer is not a file name");
            return None;
        }
        let path = self.dir.join(&current);
        path.is_file().then_some(path)
    }

    /// The sidecar contents, if readable.
    pub fn metadata(&self) -> Option<HandoffMetadata> {
        HandoffMetadata::read(&self.metadata_path)
    }

    /// Active handoffs newest first, then archived ones newest first.
    ///
    /// A document that cannot be read is logged and left out.
    pub fn list(&self, include_archived: bool) -> Result<Vec<HandoffInfo>> {
        let mut infos = self.infos_in(&self.dir, false)?;
        if include_archived {
            infos.extend(self.infos_in(&self.archive_dir, true)?);
        }
        Ok(infos)
    }

    fn infos_in(&self, dir: &Path, archived: bool) -> Result<Vec<HandoffInfo>> {
        let mut infos = Vec::new();
        for name in handoff_names(dir)?.into_iter().rev() {
            let path = dir.join(&name);
            match self.info(&path, archived) {
                Ok(info) => infos.push(info),
                Err(e) => tracing::warn!(path = %path.display(), "skipping handoff: {}", e),
            }
        }
        Ok(infos)
    }

    /// Load a handoff by name (active first, then archive), or the latest.
    pub fn load(&self, name: Option<&str>) -> Result<Option<Handoff>> {
        let Some((path, archived)) = self.locate(name) else {
            return Ok(None);
        };
        let content = read_lossy_limited(&path)?;
        let info = self.info_with_content(&path, &content, archived)?;
        Ok(Some(Handoff { content, info }))
    }

    fn locate(&self, name: Option<&str>) -> Option<(PathBuf, bool)> {
        match name {
            None => self.latest().map(|p| (p, false)),
            Some(name) if !is_plain_file_name(name) => None,
            Some(name) => {
                let active = self.dir.join(name);
                if active.is_file() {
                    return Some((active, false));
                }
                let archived = self.archive_dir.join(name);
                archived.is_file().then_some((archived, true))
            }
        }
    }

    fn info(&self, path: &Path, archived: bool) -> Result<HandoffInfo> {
        let content = read_lossy_limited(path)?;
        self.info_with_content(path, &content, archived)
    }

    fn info_with_content(
        &self,
        path: &Path,
        content: &str,
        archived: bool,
    ) -> Result<HandoffInfo> {
        let meta = fs::metadata(path).map_err(|e| HookError::storage(path, e))?;
        let modified = meta.modified().map_err(|e| HookError::storage(path, e))?;
        Ok(HandoffInfo {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            created: DateTime::<Local>::from(modified),
            size: meta.len(),
            summary: extract_summary(content),
            token_estimate: self.tokens.estimate(&self.runner, content),
            archived,
        })
    }

    // =========================================================================
    // Verify
    // =========================================================================

    /// Check a handoff (by name, or the latest) against the working tree.
    pub fn verify(&self, name: Option<&str>) -> Result<VerifyReport> {
        self.verify_at(name, Local::now())
    }

    /// Like [`verify`](Self::verify), measuring age from `now`.
    pub fn verify_at(&self, name: Option<&str>, now: DateTime<Local>) -> Result<VerifyReport> {
        let Some(handoff) = self.load(name)? else {
            return Ok(VerifyReport::not_found());
        };
        let created = handoff.info.created;

        let mut report = VerifyReport {
            valid: true,
            age_days: (now - created).num_days(),
            ..VerifyReport::default()
        };
        if report.age_days > self.stale_days {
            report
                .warnings
                .push(format!("Handoff is {} days old", report.age_days));
        }

        for file in extract_mentioned_files(&handoff.content) {
            let full = self.root.join(&file);
            match fs::metadata(&full).and_then(|m| m.modified()) {
                Err(_) if !full.exists() => {
                    report.files_changed.push(format!("{} (deleted)", file))
                }
                Err(e) => tracing::debug!(path = %full.display(), "cannot stat: {}", e),
                Ok(mtime) if DateTime::<Local>::from(mtime) > created => {
                    report.files_changed.push(format!("{} (modified)", file))
                }
                Ok(_) => {}
            }
        }

        match self.merge_conflicts() {
            Some(conflicts) => report.conflicts = conflicts,
            None => {
                report.valid = false;
                report
                    .warnings
                    .push("Unable to check git conflicts (git unavailable)".to_string());
            }
        }
        Ok(report)
    }

    /// Files with unresolved conflicts, or `None` when git cannot tell.
    fn merge_conflicts(&self) -> Option<Vec<String>> {
        let out = self.runner.run(
            &Invocation::new(["git", "diff", "--name-only", "--diff-filter=U"])
                .timeout(self.git_timeout)
                .cwd(&self.root),
        );
        if !out.success {
            tracing::debug!("git diff failed: {}", out.stderr.trim());
            return None;
        }
        Some(
            out.stdout
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

/// Handoff file names in `dir`, oldest first. A missing directory is empty.
fn handoff_names(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(HookError::storage(dir, e)),
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_handoff_file_name(name))
        .collect();
    names.sort();
    Ok(names)
}
