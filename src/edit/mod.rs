//! Post-edit hook: format and lint a file right after the assistant edits it.
//!
//! The flow is gate → extension table → language handler → report. Nothing
//! here ever blocks the assistant; missing tools and failed steps become
//! warning lines in the report.

mod event;
mod handlers;
mod report;

pub use event::{EditEvent, Gate, Language, SkipReason, EDIT_TOOLS};
pub use handlers::async_issues;
pub use report::{
    excerpt, short_diagnostic, truncate_chars, Report, ReportLine,
    MAX_DETAIL_LINES, MAX_DIAGNOSTIC_CHARS,
};

use std::path::Path;

use crate::config::TimeoutConfig;
use crate::process::CommandRunner;
use crate::tools::{PathLocator, ToolLocator, ToolResolver};

/// Dispatches edited files to their language handler.
pub struct PostEditHook<R: CommandRunner, L: ToolLocator = PathLocator> {
    runner: R,
    resolver: ToolResolver<L>,
    timeouts: TimeoutConfig,
}

impl<R: CommandRunner, L: ToolLocator> PostEditHook<R, L> {
    pub fn new(runner: R, resolver: ToolResolver<L>, timeouts: TimeoutConfig) -> Self {
        Self {
            runner,
            resolver,
            timeouts,
        }
    }

    /// Handle an event. Returns `None` when the event is gated out.
    pub fn handle(&self, event: &EditEvent) -> Option<Report> {
        match event.gate() {
            Gate::Skip(reason) => {
                if reason.is_misconfiguration() {
                    tracing::warn!(
                        ?reason,
                        "post-edit hook needs TOOL_USE and FILE_PATH; check the hook configuration"
                    );
                } else {
                    tracing::debug!(?reason, "post-edit skipped");
                }
                None
            }
            Gate::Proceed { path, language } => Some(self.run_handler(&path, language)),
        }
    }

    /// Run the handler for `language` on `path`, bypassing the gate.
    pub fn run_handler(&self, path: &Path, language: Language) -> Report {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mut report = Report::new(name);

        match language {
            Language::Python => self.handle_python(path, &mut report),
            Language::TypeScript => self.handle_typescript(path, &mut report),
            Language::Rust => self.handle_rust(path, &mut report),
            Language::Go => self.handle_go(path, &mut report),
        }
        report
    }
}
