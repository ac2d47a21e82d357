//! Git and host context attached to each audit record.

use std::path::Path;
use std::time::Duration;

use crate::process::{CommandRunner, Invocation};

const UNKNOWN: &str = "unknown";

/// Repository state of the directory a command ran in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitContext {
    pub repo: String,
    pub branch: String,
    pub commit: String,
    pub dirty: bool,
}

impl Default for GitContext {
    fn default() -> Self {
        Self {
            repo: UNKNOWN.to_string(),
            branch: UNKNOWN.to_string(),
            commit: UNKNOWN.to_string(),
            dirty: false,
        }
    }
}

impl GitContext {
    /// Query git in `cwd`. Any failure leaves the field `unknown`.
    ///
    /// `git status` is only consulted when `check_dirty` is set; it can be
    /// slow on large repositories.
    pub fn collect<R: CommandRunner>(
        runner: &R,
        cwd: &Path,
        timeout: Duration,
        check_dirty: bool,
    ) -> Self {
        if !cwd.exists() {
            return Self::default();
        }

        let git = |args: &[&str]| -> Option<String> {
            let argv = std::iter::once("git").chain(args.iter().copied());
            let out = runner.run(&Invocation::new(argv).timeout(timeout).cwd(cwd));
            out.stdout_if_success()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let repo = git(&["rev-parse", "--show-toplevel"]).and_then(|top| {
            Path::new(&top)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        });
        let branch = git(&["branch", "--show-current"])
            .or_else(|| git(&["describe", "--tags", "--exact-match"]));
        let commit = git(&["rev-parse", "--short", "HEAD"]);
        let dirty = check_dirty && git(&["status", "--porcelain"]).is_some();

        Self {
            repo: repo.unwrap_or_else(|| UNKNOWN.to_string()),
            branch: branch.unwrap_or_else(|| UNKNOWN.to_string()),
            commit: commit.unwrap_or_else(|| UNKNOWN.to_string()),
            dirty,
        }
    }

    /// `branch`, `branch@commit`, plus ` [dirty]` when applicable.
    pub fn describe_branch(&self) -> String {
        let mut out = self.branch.clone();
        if self.commit != UNKNOWN {
            out.push('@');
            out.push_str(&self.commit);
        }
        if self.dirty {
            out.push_str(" [dirty]");
        }
        out
    }
}

/// Host and user running the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemContext {
    pub hostname: String,
    pub username: String,
}

impl SystemContext {
    pub fn collect() -> Self {
        let hostname = whoami::fallible::hostname().unwrap_or_else(|e| {
            tracing::debug!("hostname unavailable: {}", e);
            UNKNOWN.to_string()
        });
        let username = whoami::fallible::username().unwrap_or_else(|e| {
            tracing::debug!("username unavailable: {}", e);
            UNKNOWN.to_string()
        });
        Self { hostname, username }
    }
}
