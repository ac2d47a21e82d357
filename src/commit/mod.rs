//! Pre-commit quality gate for Python projects.
//!
//! Runs formatting, linting, type and secret checks in that order. Every
//! check runs even after an earlier one fails; failures accumulate by name
//! and decide the exit code.

mod secrets;

pub use secrets::{
    Finding, SecretScanner, MAX_FINDINGS_SHOWN, MAX_FINDING_CHARS, MAX_HITS_PER_FILE,
    SAFE_MARKERS, SKIP_DIRS,
};

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::config::{SecretsConfig, TimeoutConfig};
use crate::edit::truncate_chars;
use crate::error::exit_codes;
use crate::process::{CommandRunner, Invocation, ToolOutput};
use crate::tools::{Ecosystem, PathLocator, ToolLocator, ToolResolver};

/// Lint output lines shown on failure.
pub const MAX_LINT_LINES: usize = 20;

/// Files whose presence means mypy is configured.
pub const MYPY_CONFIG_FILES: &[&str] = &["mypy.ini", "pyproject.toml", "setup.cfg"];

const MISSING_STUBS: &str = "Cannot find implementation or library stub";

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Name used in the failure summary.
    pub name: &'static str,
    pub passed: bool,
    /// Lines printed for this check, in order.
    pub lines: Vec<String>,
}

impl CheckOutcome {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            passed: true,
            lines: Vec::new(),
        }
    }

    fn say(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn fail(&mut self, line: impl Into<String>) {
        self.passed = false;
        self.say(line);
    }
}

/// All check outcomes of one gate run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreCommitReport {
    pub checks: Vec<CheckOutcome>,
}

impl PreCommitReport {
    /// Names of failed checks, in run order.
    pub fn failed(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name)
            .collect()
    }

    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            exit_codes::SUCCESS
        } else {
            exit_codes::BLOCKING
        }
    }
}

impl fmt::Display for PreCommitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n🐍 Python Pre-commit Check\n")?;
        for check in &self.checks {
            for line in &check.lines {
                writeln!(f, "{}", line)?;
            }
        }
        writeln!(f, "\n{}", "=".repeat(40))?;

        let failed = self.failed();
        if failed.is_empty() {
            writeln!(f, "✅ All checks passed!")
        } else {
            writeln!(f, "❌ Failed: {}", failed.join(", "))?;
            writeln!(f, "Fix the issues and try again.")
        }
    }
}

/// Runs the ordered checks against a project directory.
pub struct PreCommitGate<R: CommandRunner, L: ToolLocator = PathLocator> {
    runner: R,
    resolver: ToolResolver<L>,
    timeouts: TimeoutConfig,
    secrets: SecretsConfig,
}

impl<R: CommandRunner, L: ToolLocator> PreCommitGate<R, L> {
    pub fn new(
        runner: R,
        resolver: ToolResolver<L>,
        timeouts: TimeoutConfig,
        secrets: SecretsConfig,
    ) -> Self {
        Self {
            runner,
            resolver,
            timeouts,
            secrets,
        }
    }

    /// Run every check in `root`.
    pub fn run(&self, root: &Path) -> PreCommitReport {
        let checks = vec![
            self.check_formatting(root),
            self.check_linting(root),
            self.check_types(root),
            self.check_security(root),
        ];
        for check in checks.iter().filter(|c| !c.passed) {
            tracing::debug!(check = check.name, "pre-commit check failed");
        }
        PreCommitReport { checks }
    }

    fn check_formatting(&self, root: &Path) -> CheckOutcome {
        let mut outcome = CheckOutcome::new("Formatting");
        outcome.say("🎨 Checking formatting...");

        let out = self.ruff(root, &["format", "--check", "."]);
        if out.success {
            outcome.say("✅ Formatting OK");
        } else {
            outcome.fail("❌ Formatting issues. Run: ruff format .");
        }
        outcome
    }

    fn check_linting(&self, root: &Path) -> CheckOutcome {
        let mut outcome = CheckOutcome::new("Linting");
        outcome.say("🔍 Running linter...");

        let out = self.ruff(root, &["check", "."]);
        if out.success {
            outcome.say("✅ Linting OK");
        } else {
            outcome.fail("❌ Linting issues:");
            for line in out.combined().lines().take(MAX_LINT_LINES) {
                outcome.say(line);
            }
            outcome.say("\nRun: ruff check --fix .");
        }
        outcome
    }

    fn check_types(&self, root: &Path) -> CheckOutcome {
        let mut outcome = CheckOutcome::new("Types");
        if !self.resolver.has("mypy") {
            return outcome;
        }
        if !MYPY_CONFIG_FILES.iter().any(|f| root.join(f).exists()) {
            return outcome;
        }

        outcome.say("📝 Checking types...");
        let out = self.exec(
            vec!["mypy".into(), ".".into()],
            root,
            self.timeouts.type_check(),
        );
        if out.success {
            outcome.say("✅ Types OK");
        } else if out.stdout.contains(MISSING_STUBS) || out.stderr.contains(MISSING_STUBS) {
            outcome.say("⚠️  Some type stubs missing (non-blocking)");
        } else {
            outcome.fail("❌ Type errors:");
            for line in out.combined().lines().take(MAX_LINT_LINES) {
                outcome.say(line);
            }
        }
        outcome
    }

    fn check_security(&self, root: &Path) -> CheckOutcome {
        let mut outcome = CheckOutcome::new("Security");
        outcome.say("🔒 Security check...");

        let scanner = match SecretScanner::new(&self.secrets.extensions) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("secret scan unavailable: {}", e);
                outcome.say("✅ Security OK");
                return outcome;
            }
        };

        let findings = scanner.scan(root);
        if findings.is_empty() {
            outcome.say("✅ Security OK");
            return outcome;
        }

        outcome.say("⚠️  Potential hardcoded secrets:");
        for finding in findings.iter().take(MAX_FINDINGS_SHOWN) {
            let text = finding.to_string();
            outcome.say(format!("  {}", truncate_chars(&text, MAX_FINDING_CHARS)));
        }
        outcome.say("\nConsider using environment variables.");
        outcome
    }

    fn ruff(&self, root: &Path, args: &[&str]) -> ToolOutput {
        let mut argv = self.resolver.resolve_or_bare("ruff", Ecosystem::Python);
        argv.extend(args.iter().map(|a| a.to_string()));
        self.exec(argv, root, self.timeouts.check())
    }

    fn exec(&self, argv: Vec<String>, root: &Path, timeout: Duration) -> ToolOutput {
        self.runner
            .run(&Invocation::new(argv).timeout(timeout).cwd(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::RecordingRunner;
    use crate::tools::FixedLocator;
    use std::fs;
    use tempfile::TempDir;

    fn gate<'a>(
        runner: &'a RecordingRunner,
        tools: &[&str],
    ) -> PreCommitGate<&'a RecordingRunner, FixedLocator> {
        PreCommitGate::new(
            runner,
            ToolResolver::new(FixedLocator::new(tools.iter().copied())),
            TimeoutConfig::default(),
            SecretsConfig::default(),
        )
    }

    #[test]
    fn test_all_checks_pass() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::new();

        let report = gate(&runner, &["ruff"]).run(dir.path());

        assert!(report.passed());
        assert_eq!(report.exit_code(), exit_codes::SUCCESS);
        assert_eq!(
            runner.command_lines(),
            vec!["ruff format --check .", "ruff check ."]
        );
        let rendered = report.to_string();
        assert!(rendered.starts_with("\n🐍 Python Pre-commit Check\n\n🎨 Checking formatting...\n"));
        assert!(rendered.ends_with(&format!("{}\n✅ All checks passed!\n", "=".repeat(40))));
    }

    #[test]
    fn test_failures_accumulate_in_order() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::new()
            .respond("ruff format", ToolOutput::failed("Would reformat: a.py", ""))
            .respond("ruff check", ToolOutput::failed("a.py:1:1: F401 unused\n", ""));

        let report = gate(&runner, &["ruff"]).run(dir.path());

        assert_eq!(report.failed(), vec!["Formatting", "Linting"]);
        assert_eq!(report.exit_code(), exit_codes::BLOCKING);
        let rendered = report.to_string();
        assert!(rendered.contains("❌ Formatting issues. Run: ruff format .\n"));
        assert!(rendered
            .contains("❌ Linting issues:\na.py:1:1: F401 unused\n\nRun: ruff check --fix .\n"));
        assert!(
            rendered.ends_with("❌ Failed: Formatting, Linting\nFix the issues and try again.\n")
        );
    }

    #[test]
    fn test_lint_output_is_capped() {
        let dir = TempDir::new().unwrap();
        let noisy: String = (0..50).map(|i| format!("E{}\n", i)).collect();
        let runner = RecordingRunner::new().respond("ruff check", ToolOutput::failed(noisy, ""));

        let report = gate(&runner, &["ruff"]).run(dir.path());

        let lint = &report.checks[1];
        // heading + 20 lines + hint
        assert_eq!(lint.lines.len(), 1 + 1 + MAX_LINT_LINES + 1);
        assert_eq!(lint.lines[2 + MAX_LINT_LINES - 1], "E19");
    }

    #[test]
    fn test_missing_ruff_runs_bare_and_fails() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::new()
            .respond("ruff", ToolOutput::failed("", "Command not found: ruff"));

        let report = gate(&runner, &[]).run(dir.path());

        assert_eq!(runner.command_lines()[0], "ruff format --check .");
        assert_eq!(report.failed(), vec!["Formatting", "Linting"]);
    }

    #[test]
    fn test_ruff_via_uvx() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::new();

        gate(&runner, &["uvx"]).run(dir.path());

        assert_eq!(runner.command_lines()[0], "uvx ruff format --check .");
        assert_eq!(runner.calls()[0].cwd.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_types_skipped_without_config() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::new();

        let report = gate(&runner, &["ruff", "mypy"]).run(dir.path());

        assert!(report.checks[2].lines.is_empty());
        assert!(!runner.command_lines().iter().any(|l| l.starts_with("mypy")));
    }

    #[test]
    fn test_types_missing_stubs_are_non_blocking() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mypy.ini"), "[mypy]\n").unwrap();
        let runner = RecordingRunner::new().respond(
            "mypy",
            ToolOutput::failed(
                "a.py:1: error: Cannot find implementation or library stub for module",
                "",
            ),
        );

        let report = gate(&runner, &["ruff", "mypy"]).run(dir.path());

        assert!(report.passed());
        assert_eq!(runner.calls()[2].timeout, Duration::from_secs(60));
        assert_eq!(
            report.checks[2].lines,
            vec![
                "📝 Checking types...",
                "⚠️  Some type stubs missing (non-blocking)"
            ]
        );
    }

    #[test]
    fn test_type_errors_fail() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pyproject.toml"), "").unwrap();
        let runner = RecordingRunner::new().respond(
            "mypy",
            ToolOutput::failed("a.py:3: error: Incompatible types", ""),
        );

        let report = gate(&runner, &["ruff", "mypy"]).run(dir.path());

        assert_eq!(report.failed(), vec!["Types"]);
    }

    #[test]
    fn test_secrets_are_advisory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("settings_prod.py"), "").unwrap();
        fs::write(dir.path().join("app.py"), "API_KEY = 'sk-live-abc'\n").unwrap();
        let runner = RecordingRunner::new();

        let report = gate(&runner, &["ruff"]).run(dir.path());

        assert!(report.passed());
        let security = &report.checks[3];
        assert_eq!(
            security.lines,
            vec![
                "🔒 Security check...",
                "⚠️  Potential hardcoded secrets:",
                "  app.py:1: API_KEY = 'sk-live-abc'",
                "\nConsider using environment variables.",
            ]
        );
    }

    #[test]
    fn test_secret_findings_are_capped_and_truncated() {
        let dir = TempDir::new().unwrap();
        let long = format!("password = '{}'\n", "z".repeat(150));
        fs::write(dir.path().join("a.py"), format!("{long}password = 'a2'\n")).unwrap();
        for name in ["b.py", "c.py", "d.py"] {
            fs::write(dir.path().join(name), "password = 'p1'\npassword = 'p2'\n").unwrap();
        }
        let runner = RecordingRunner::new();

        let report = gate(&runner, &["ruff"]).run(dir.path());

        assert!(report.passed());
        let security = &report.checks[3].lines;
        let shown: Vec<&String> = security.iter().filter(|l| l.starts_with("  ")).collect();
        assert_eq!(shown.len(), MAX_FINDINGS_SHOWN);
        assert_eq!(shown[0].chars().count(), 2 + MAX_FINDING_CHARS);
        assert!(shown[0].starts_with("  a.py:1: password = 'zzz"));
        assert!(shown.iter().all(|l| l.chars().count() <= 2 + MAX_FINDING_CHARS));
        assert_eq!(shown[4].as_str(), "  c.py:1: password = 'p1'");
        assert_eq!(security.last().unwrap(), "\nConsider using environment variables.");
    }
}
