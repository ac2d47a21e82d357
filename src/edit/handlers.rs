//! Per-language format and lint handlers.
//!
//! Each handler formats first, then lints. The steps are independent: a
//! failed format never skips the lint, and a missing tool only produces a
//! warning line. Handlers cannot fail; every problem ends up in the report.

use std::path::Path;
use std::time::Duration;

use regex::Regex;

use super::report::{short_diagnostic, Report};
use super::PostEditHook;
use crate::process::{CommandRunner, Invocation, ToolOutput};
use crate::project::find_project_root;
use crate::tools::{Ecosystem, ToolLocator};
use crate::util::read_lossy_limited;

impl<R: CommandRunner, L: ToolLocator> PostEditHook<R, L> {
    // =========================================================================
    // Python
    // =========================================================================

    pub(super) fn handle_python(&self, path: &Path, report: &mut Report) {
        let file = path_arg(path);

        match self.resolver.resolve("ruff", Ecosystem::Python) {
            None => report.warn("ruff not found"),
            Some(ruff) => {
                let format = self.exec(
                    &ruff,
                    &["format", &file],
                    self.timeouts.default_timeout(),
                    None,
                );
                if format.success {
                    report.ok("formatted");
                } else {
                    report.warn(format!(
                        "format failed: {}",
                        short_diagnostic(format.combined(), "Unknown error")
                    ));
                }

                let lint = self.exec(
                    &ruff,
                    &["check", "--fix", "--quiet", &file],
                    self.timeouts.default_timeout(),
                    None,
                );
                if !lint.success {
                    report.warn_with_excerpt("Linting failed:", lint.combined(), "Linting failed");
                }
            }
        }

        match read_lossy_limited(path) {
            Ok(source) => {
                let issues = async_issues(&source);
                if !issues.is_empty() {
                    report.warn(format!("async: {}", issues.join(", ")));
                }
            }
            Err(e) => tracing::debug!(path = %path.display(), "skipping async check: {}", e),
        }
    }

    // =========================================================================
    // TypeScript / JavaScript
    // =========================================================================

    pub(super) fn handle_typescript(&self, path: &Path, report: &mut Report) {
        let file = path_arg(path);

        match self.resolver.resolve("prettier", Ecosystem::Node) {
            None => report.warn("prettier not found"),
            Some(prettier) => {
                let out = self.exec(&prettier, &["--write", &file], self.timeouts.prettier(), None);
                if out.success {
                    report.ok("prettier");
                } else {
                    report.warn(format!(
                        "prettier failed: {}",
                        short_diagnostic(out.combined(), "Unknown error")
                    ));
                }
            }
        }

        match self.resolver.resolve("eslint", Ecosystem::Node) {
            None => report.warn("eslint not found"),
            Some(eslint) => {
                let out = self.exec(
                    &eslint,
                    &["--fix", &file],
                    self.timeouts.default_timeout(),
                    None,
                );
                if out.success {
                    report.ok("eslint");
                } else {
                    report.warn_with_excerpt("eslint failed:", out.combined(), "eslint failed");
                }
            }
        }
    }

    // =========================================================================
    // Rust
    // =========================================================================

    pub(super) fn handle_rust(&self, path: &Path, report: &mut Report) {
        let Some(root) = find_project_root(path).filter(|r| r.join("Cargo.toml").exists()) else {
            report.warn("No Cargo.toml found");
            return;
        };
        if !self.resolver.has("cargo") {
            report.warn("cargo not found");
            return;
        }

        let cargo = vec!["cargo".to_string()];
        let file = path_arg(path);

        let fmt = self.exec(
            &cargo,
            &["fmt", "--", &file],
            self.timeouts.default_timeout(),
            Some(&root),
        );
        if fmt.success {
            report.ok("cargo fmt");
        } else {
            report.warn(format!(
                "fmt failed: {}",
                short_diagnostic(fmt.combined(), "Unknown error")
            ));
        }

        let clippy = self.exec(
            &cargo,
            &["clippy", "--message-format=short", "-q"],
            self.timeouts.default_timeout(),
            Some(&root),
        );
        let relative = path
            .canonicalize()
            .ok()
            .and_then(|p| p.strip_prefix(&root).ok().map(path_arg));
        let output = format!("{}\n{}", clippy.stdout, clippy.stderr);
        let mentions_file = output.lines().find(|line| {
            line.contains(file.as_str())
                || relative
                    .as_deref()
                    .is_some_and(|rel| !rel.is_empty() && line.contains(rel))
        });

        match mentions_file {
            Some(line) => report.warn(short_diagnostic(line, "clippy warning")),
            None if !clippy.success => {
                report.warn(short_diagnostic(clippy.combined(), "clippy failed"))
            }
            None => {}
        }
    }

    // =========================================================================
    // Go
    // =========================================================================

    pub(super) fn handle_go(&self, path: &Path, report: &mut Report) {
        let file = path_arg(path);

        if self.resolver.has("gofmt") {
            let gofmt = vec!["gofmt".to_string()];
            let out = self.exec(&gofmt, &["-w", &file], self.timeouts.default_timeout(), None);
            if out.success {
                report.ok("gofmt");
            } else {
                report.warn(format!(
                    "gofmt failed: {}",
                    short_diagnostic(out.combined(), "Unknown error")
                ));
            }
        } else if self.resolver.has("go") {
            let go = vec!["go".to_string()];
            let out = self.exec(&go, &["fmt", &file], self.timeouts.default_timeout(), None);
            if out.success {
                report.ok("go fmt");
            } else {
                report.warn(format!(
                    "go fmt failed: {}",
                    short_diagnostic(out.combined(), "Unknown error")
                ));
            }
        } else {
            report.warn("gofmt/go not found");
        }

        let module_root = find_project_root(path).filter(|r| r.join("go.mod").exists());
        if let Some(root) = module_root {
            if self.resolver.has("golangci-lint") {
                let lint = vec!["golangci-lint".to_string()];
                let out = self.exec(
                    &lint,
                    &["run", "--fast", &file],
                    self.timeouts.default_timeout(),
                    Some(&root),
                );
                if !out.success {
                    report.warn(short_diagnostic(out.combined(), "golangci-lint failed"));
                }
            }
        }
    }

    fn exec(
        &self,
        prefix: &[String],
        args: &[&str],
        timeout: Duration,
        cwd: Option<&Path>,
    ) -> ToolOutput {
        let argv = prefix
            .iter()
            .cloned()
            .chain(args.iter().map(|a| a.to_string()));
        let mut invocation = Invocation::new(argv).timeout(timeout);
        if let Some(cwd) = cwd {
            invocation = invocation.cwd(cwd);
        }
        self.runner.run(&invocation)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Blocking calls inside async Python code.
///
/// Only applies when the file defines a coroutine; the check is a hint,
/// not a parse.
pub fn async_issues(source: &str) -> Vec<&'static str> {
    let mut issues = Vec::new();
    if !source.contains("async def") {
        return issues;
    }
    if source.contains("time.sleep(") {
        issues.push("time.sleep → asyncio.sleep");
    }
    if source.contains("requests.") && imports_requests(source) {
        issues.push("requests → httpx/aiohttp");
    }
    issues
}

fn imports_requests(source: &str) -> bool {
    Regex::new(r"(?m)^\s*import\s+requests\b")
        .map(|re| re.is_match(source))
        .unwrap_or(false)
}
