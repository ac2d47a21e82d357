//! Subprocess invocation for hooksmith.
//!
//! Every external tool is run from a literal argv list, never through a
//! shell, with a timeout. A non-zero exit is a normal outcome; only a
//! failure to execute (timeout, missing binary, OS error) is reported as
//! a diagnostic, and even then the caller receives a `ToolOutput`.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::DEFAULT_TIMEOUT_SECS;

/// Poll interval while waiting for a child to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A single subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program followed by its arguments.
    pub argv: Vec<String>,
    /// Time limit for the whole run.
    pub timeout: Duration,
    /// Working directory (inherits ours when `None`).
    pub cwd: Option<PathBuf>,
    /// Text fed to the child's stdin.
    pub stdin: Option<String>,
}

impl Invocation {
    /// Create an invocation from an argv list with the default timeout.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cwd: None,
            stdin: None,
        }
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Feed `input` on stdin.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// The program name, if any.
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Human-readable command line, for logs.
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

/// Result of running a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Whether the tool ran and exited with status 0.
    pub success: bool,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr, or the execution diagnostic.
    pub stderr: String,
}

impl ToolOutput {
    /// A successful run.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed run.
    pub fn failed(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// stdout if it has content, otherwise stderr, trimmed.
    pub fn combined(&self) -> &str {
        let stdout = self.stdout.trim();
        if stdout.is_empty() {
            self.stderr.trim()
        } else {
            stdout
        }
    }

    /// Trimmed stdout when the run succeeded.
    pub fn stdout_if_success(&self) -> Option<&str> {
        self.success.then(|| self.stdout.trim())
    }
}

/// Why a subprocess could not be executed.
#[derive(Debug)]
pub enum RunFailure {
    /// The time limit elapsed and the child was killed.
    TimedOut(Duration),
    /// The program does not exist.
    NotFound(String),
    /// Any other OS-level error.
    Os(std::io::Error),
    /// The argv list was empty.
    EmptyCommand,
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimedOut(t) => write!(f, "Command timed out after {}s", t.as_secs()),
            Self::NotFound(program) => write!(f, "Command not found: {}", program),
            Self::Os(e) => write!(f, "OS error: {}", e),
            Self::EmptyCommand => write!(f, "OS error: empty command"),
        }
    }
}

impl From<RunFailure> for ToolOutput {
    fn from(failure: RunFailure) -> Self {
        ToolOutput::failed("", failure.to_string())
    }
}

/// Trait for anything that can execute an invocation.
///
/// Hooks depend on this trait so tests can substitute a recording fake.
pub trait CommandRunner {
    /// Run the invocation. Execution failures come back as a failed output.
    fn run(&self, invocation: &Invocation) -> ToolOutput;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, invocation: &Invocation) -> ToolOutput {
        (**self).run(invocation)
    }
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run, keeping execution failures distinct from tool failures.
    pub fn try_run(&self, invocation: &Invocation) -> Result<ToolOutput, RunFailure> {
        let (program, args) = invocation
            .argv
            .split_first()
            .ok_or(RunFailure::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if let Some(ref cwd) = invocation.cwd {
            cmd.current_dir(cwd);
        }

        tracing::debug!(command = %invocation.display(), "spawning");

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RunFailure::NotFound(program.clone()),
            _ => RunFailure::Os(e),
        })?;

        let stdin_writer = spawn_writer(child.stdin.take(), invocation.stdin.clone());
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let status = wait_with_timeout(&mut child, invocation.timeout);
        // The pipe is closed once the child is gone, so the writer cannot hang.
        let _ = stdin_writer.join();
        let status = status?;

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        Ok(ToolOutput {
            success: status.success(),
            stdout,
            stderr,
        })
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> ToolOutput {
        match self.try_run(invocation) {
            Ok(output) => output,
            Err(failure) => {
                tracing::debug!(command = %invocation.display(), "{}", failure);
                failure.into()
            }
        }
    }
}

/// Feed stdin on its own thread so a child that never reads it cannot
/// stall the timeout loop.
fn spawn_writer<W: Write + Send + 'static>(
    pipe: Option<W>,
    input: Option<String>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        if let (Some(mut pipe), Some(input)) = (pipe, input) {
            // A child that exits early closes the pipe; nothing to report.
            let _ = pipe.write_all(input.as_bytes());
        }
    })
}

/// Drain a pipe on its own thread so a chatty child never blocks on a full pipe.
fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> Result<std::process::ExitStatus, RunFailure> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RunFailure::TimedOut(timeout));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => return Err(RunFailure::Os(e)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let inv = Invocation::new(["ruff", "format", "a.py"])
            .timeout(Duration::from_secs(5))
            .cwd("/tmp")
            .stdin("hello");

        assert_eq!(inv.program(), Some("ruff"));
        assert_eq!(inv.display(), "ruff format a.py");
        assert_eq!(inv.timeout, Duration::from_secs(5));
        assert_eq!(inv.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(inv.stdin.as_deref(), Some("hello"));
    }

    #[test]
    fn test_combined_prefers_stdout() {
        assert_eq!(ToolOutput::failed("  out \n", "err").combined(), "out");
        assert_eq!(ToolOutput::failed("  ", " err\n").combined(), "err");
    }

    #[test]
    fn test_failure_messages_are_distinct() {
        let timed_out = RunFailure::TimedOut(Duration::from_secs(3)).to_string();
        let not_found = RunFailure::NotFound("ruff".into()).to_string();
        let os = RunFailure::Os(std::io::Error::other("boom")).to_string();

        assert_eq!(timed_out, "Command timed out after 3s");
        assert_eq!(not_found, "Command not found: ruff");
        assert_eq!(os, "OS error: boom");
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_command() {
        let output = SystemRunner::new().run(&Invocation::new(["echo", "hello"]));
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_command_is_not_an_error() {
        let result = SystemRunner::new().try_run(&Invocation::new(["false"]));
        let output = result.unwrap();
        assert!(!output.success);
    }

    #[test]
    fn test_command_not_found() {
        let result =
            SystemRunner::new().try_run(&Invocation::new(["nonexistent_command_12345"]));
        assert!(matches!(result, Err(RunFailure::NotFound(_))));

        let output = SystemRunner::new().run(&Invocation::new(["nonexistent_command_12345"]));
        assert!(!output.success);
        assert!(output.stderr.to_lowercase().contains("not found"));
    }

    #[test]
    fn test_empty_command() {
        let output = SystemRunner::new().run(&Invocation::new(Vec::<String>::new()));
        assert!(!output.success);
        assert_eq!(output.stderr, "OS error: empty command");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let inv = Invocation::new(["sleep", "10"]).timeout(Duration::from_millis(200));
        let start = Instant::now();
        let output = SystemRunner::new().run(&inv);

        assert!(!output.success);
        assert!(output.stderr.contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_with_cwd() {
        let dir = tempfile::TempDir::new().unwrap();
        let canonical = dir.path().canonicalize().unwrap();
        let output = SystemRunner::new().run(&Invocation::new(["pwd"]).cwd(&canonical));
        assert_eq!(output.stdout.trim(), canonical.to_string_lossy());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_applies_when_child_ignores_large_stdin() {
        let input = "x".repeat(1024 * 1024);
        let inv = Invocation::new(["sleep", "3"])
            .timeout(Duration::from_millis(300))
            .stdin(input);
        let start = Instant::now();
        let output = SystemRunner::new().run(&inv);

        assert!(!output.success);
        assert!(output.stderr.contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn test_large_stdin_round_trips() {
        let input = "y".repeat(256 * 1024);
        let output = SystemRunner::new().run(&Invocation::new(["wc", "-c"]).stdin(input));
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "262144");
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_is_forwarded() {
        let output = SystemRunner::new().run(&Invocation::new(["cat"]).stdin("piped text"));
        assert!(output.success);
        assert_eq!(output.stdout, "piped text");
    }

    #[test]
    fn test_recording_runner_longest_prefix() {
        let runner = testing::RecordingRunner::new()
            .respond("git", ToolOutput::failed("", "fatal"))
            .respond("git branch", ToolOutput::ok("main\n"));

        assert_eq!(
            runner.run(&Invocation::new(["git", "branch", "--show-current"])),
            ToolOutput::ok("main\n")
        );
        assert!(!runner.run(&Invocation::new(["git", "rev-parse"])).success);
        assert!(runner.run(&Invocation::new(["ruff"])).success);
        assert_eq!(runner.calls().len(), 3);
    }
}
