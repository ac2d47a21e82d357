//! Post-edit hook input.
//!
//! The assistant passes the triggering tool and the edited file through
//! `TOOL_USE` and `FILE_PATH`.

use std::env;
use std::path::{Path, PathBuf};

/// Tools whose completion should trigger formatting.
pub const EDIT_TOOLS: &[&str] = &["Edit", "Write", "MultiEdit"];

/// Language family of an edited file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    TypeScript,
    Rust,
    Go,
}

impl Language {
    /// Look up the handler language for a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "py" | "pyi" => Some(Self::Python),
            "ts" | "tsx" | "js" | "jsx" | "mjs" | "mts" => Some(Self::TypeScript),
            "rs" => Some(Self::Rust),
            "go" => Some(Self::Go),
            _ => None,
        }
    }

    /// Look up the handler language for a path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Why the hook did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `TOOL_USE` was not set; the hook is probably misconfigured.
    MissingToolUse,
    /// `FILE_PATH` was not set; the hook is probably misconfigured.
    MissingFilePath,
    /// The triggering tool does not edit files.
    NotAnEdit,
    /// The file no longer exists (deleted after the edit).
    FileMissing,
    /// No handler for this extension.
    UnsupportedExtension,
}

impl SkipReason {
    /// Whether the skip points at a hook configuration problem.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, Self::MissingToolUse | Self::MissingFilePath)
    }
}

/// Outcome of gating an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Run the handler for `language` on `path`.
    Proceed { path: PathBuf, language: Language },
    /// Exit silently.
    Skip(SkipReason),
}

/// A post-edit event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditEvent {
    /// The tool that ran (`TOOL_USE`).
    pub tool_use: Option<String>,
    /// The file that was touched (`FILE_PATH`).
    pub file_path: Option<PathBuf>,
}

impl EditEvent {
    pub fn new(tool_use: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            tool_use: Some(tool_use.into()),
            file_path: Some(file_path.into()),
        }
    }

    /// Read the event from the process environment. Empty values count as unset.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            tool_use: non_empty("TOOL_USE"),
            file_path: non_empty("FILE_PATH").map(PathBuf::from),
        }
    }

    /// Decide whether and how to handle this event.
    pub fn gate(&self) -> Gate {
        let Some(tool_use) = self.tool_use.as_deref() else {
            return Gate::Skip(SkipReason::MissingToolUse);
        };
        if !EDIT_TOOLS.contains(&tool_use) {
            return Gate::Skip(SkipReason::NotAnEdit);
        }
        let Some(path) = self.file_path.as_ref() else {
            return Gate::Skip(SkipReason::MissingFilePath);
        };
        if !path.exists() {
            return Gate::Skip(SkipReason::FileMissing);
        }
        match Language::from_path(path) {
            Some(language) => Gate::Proceed {
                path: path.clone(),
                language,
            },
            None => Gate::Skip(SkipReason::UnsupportedExtension),
        }
    }
}
