//! Audit hook: append one record per observed tool call to a shared log.
//!
//! Only malformed stdin blocks. Everything else (git missing, log not
//! writable) surfaces as a non-blocking error so auditing never stops the
//! command it observes.

mod context;
mod event;

pub use context::{GitContext, SystemContext};
pub use event::{AuditEvent, ToolInput};

use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::config::Config;
use crate::error::{HookError, Result};
use crate::process::CommandRunner;

/// Timestamp layout of a record header, millisecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Everything that goes into one log record.
#[derive(Debug, Clone)]
pub struct AuditRecord<'a> {
    pub timestamp: DateTime<Local>,
    pub event: &'a AuditEvent,
    pub cwd: &'a Path,
    pub git: &'a GitContext,
    pub system: &'a SystemContext,
}

impl AuditRecord<'_> {
    /// Render the record, separator line included, without a trailing newline.
    pub fn render(&self) -> String {
        let input = &self.event.tool_input;
        [
            format!(
                "[{}] SESSION:{} HOST:{} USER:{}",
                self.timestamp.format(TIMESTAMP_FORMAT),
                self.event.short_session(),
                self.system.hostname,
                self.system.username
            ),
            format!(
                "CWD: {} REPO: {} BRANCH: {}",
                self.cwd.display(),
                self.git.repo,
                self.git.describe_branch()
            ),
            format!("COMMAND: {}", input.command.as_deref().unwrap_or("unknown")),
            format!(
                "DESCRIPTION: {}",
                input.description.as_deref().unwrap_or("No description")
            ),
            format!(
                "EVENT: {} TOOL: {}",
                self.event.hook_event_name.as_deref().unwrap_or("unknown"),
                self.event.tool_name.as_deref().unwrap_or("unknown")
            ),
            "---".to_string(),
        ]
        .join("\n")
    }
}

/// Appends audit records to the log file.
pub struct AuditLogger<R: CommandRunner> {
    runner: R,
    log_path: PathBuf,
    git_timeout: Duration,
    check_dirty: bool,
}

impl<R: CommandRunner> AuditLogger<R> {
    pub fn new(runner: R, log_path: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            log_path: log_path.into(),
            git_timeout: Duration::from_secs(crate::config::TimeoutConfig::default().git_secs),
            check_dirty: false,
        }
    }

    /// Logger configured from `config`; fails when no log path can be found.
    pub fn from_config(runner: R, config: &Config) -> Result<Self> {
        let log_path = config
            .audit
            .resolved_log_path()
            .ok_or_else(|| {
                HookError::config("cannot determine audit log path (no home directory)")
            })?;
        Ok(Self::new(runner, log_path)
            .git_timeout(config.timeouts.git())
            .check_dirty(config.audit.git_status))
    }

    pub fn git_timeout(mut self, timeout: Duration) -> Self {
        self.git_timeout = timeout;
        self
    }

    pub fn check_dirty(mut self, enabled: bool) -> Self {
        self.check_dirty = enabled;
        self
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Parse `input`, enrich it and append the record.
    pub fn log(&self, input: &str) -> Result<()> {
        let event = AuditEvent::parse(input)?;
        let cwd = resolve_cwd(event.cwd_path());
        let git = GitContext::collect(&self.runner, &cwd, self.git_timeout, self.check_dirty);
        let system = SystemContext::collect();

        let record = AuditRecord {
            timestamp: Local::now(),
            event: &event,
            cwd: &cwd,
            git: &git,
            system: &system,
        };
        self.append(&record.render())
    }

    fn append(&self, record: &str) -> Result<()> {
        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent).map_err(|e| HookError::storage(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| HookError::storage(&self.log_path, e))?;
        file.write_all(format!("{}\n", record).as_bytes())
            .map_err(|e| HookError::storage(&self.log_path, e))?;
        tracing::debug!(path = %self.log_path.display(), "audit record appended");
        Ok(())
    }
}

/// The event's cwd, else the process cwd, else home. A directory that does
/// not exist is replaced by home.
pub fn resolve_cwd(requested: Option<PathBuf>) -> PathBuf {
    let home = dirs::home_dir();
    let candidate = requested
        .or_else(|| env::current_dir().ok())
        .or_else(|| home.clone())
        .unwrap_or_else(|| PathBuf::from("/"));

    if candidate.exists() {
        candidate
    } else {
        home.unwrap_or_else(|| PathBuf::from("/"))
    }
}
