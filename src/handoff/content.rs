//! Reading structure out of handoff markdown.

use std::time::Duration;

use crate::process::{CommandRunner, Invocation};

/// Heading whose next line is the one-line summary.
pub const SUMMARY_HEADING: &str = "## 🎯 Session Summary";

pub const NO_SUMMARY: &str = "No summary available";

const FILE_SECTION_TITLES: &[&str] = &["Modified Files", "Files Modified"];

/// The line after the summary heading, trimmed.
pub fn extract_summary(content: &str) -> String {
    let mut lines = content.lines();
    while let Some(line) = lines.next() {
        if line.starts_with(SUMMARY_HEADING) {
            return lines
                .next()
                .map(|l| l.trim().to_string())
                .unwrap_or_else(|| NO_SUMMARY.to_string());
        }
    }
    NO_SUMMARY.to_string()
}

/// Number of bullets that mention a modified or changed file.
pub fn count_modified_files(content: &str) -> usize {
    content
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            line.trim().starts_with("- ")
                && (lower.contains("modified") || lower.contains("changed"))
        })
        .count()
}

/// Paths listed under a "Modified Files" section.
///
/// Bullets read `- path - note`; the section ends at the next `##` heading.
pub fn extract_mentioned_files(content: &str) -> Vec<String> {
    let mut files = Vec::new();
    let mut in_section = false;

    for line in content.lines() {
        if FILE_SECTION_TITLES.iter().any(|t| line.contains(t)) {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        if line.starts_with("##") {
            in_section = false;
        } else if line.trim().starts_with('-') {
            let item = line.trim_matches(|c| c == '-' || c == ' ');
            if let Some(path) = item.split(" - ").next().filter(|p| !p.is_empty()) {
                files.push(path.to_string());
            }
        }
    }
    files
}

/// Estimates how many tokens a document costs.
///
/// With a tokenizer command configured, the text goes to its stdin and the
/// count is read from stdout. Otherwise, or when the command fails, one
/// token is assumed per four characters.
#[derive(Debug, Clone)]
pub struct TokenEstimator {
    command: Option<Vec<String>>,
    timeout: Duration,
}

impl TokenEstimator {
    /// Timeout for the tokenizer command.
    pub const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(command: Option<Vec<String>>) -> Self {
        Self {
            command,
            timeout: Self::TIMEOUT,
        }
    }

    pub fn estimate<R: CommandRunner>(&self, runner: &R, content: &str) -> usize {
        let Some(argv) = self.command.as_ref() else {
            return fallback_estimate(content);
        };

        let out = runner.run(
            &Invocation::new(argv.iter().cloned())
                .timeout(self.timeout)
                .stdin(content),
        );
        match out.stdout_if_success().map(str::parse::<usize>) {
            Some(Ok(count)) => count,
            _ => {
                tracing::debug!("tokenizer unavailable, estimating from length");
                fallback_estimate(content)
            }
        }
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(None)
    }
}

/// One token per four characters.
pub fn fallback_estimate(content: &str) -> usize {
    content.chars().count() / 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::RecordingRunner;
    use crate::process::ToolOutput;

    const DOC: &str = "# Handoff\n\
\n\
## 🎯 Session Summary\n\
  Wired the audit logger into the CLI  \n\
\n\
## 📁 Modified Files\n\
- src/audit/mod.rs - modified record format\n\
- src/main.rs - changed exit codes\n\
- docs/notes.md\n\
\n\
## Next Steps\n\
- run the release - not a file\n";

    #[test]
    fn test_extract_summary() {
        assert_eq!(extract_summary(DOC), "Wired the audit logger into the CLI");
        assert_eq!(extract_summary("# nothing here"), NO_SUMMARY);
        assert_eq!(extract_summary("## 🎯 Session Summary"), NO_SUMMARY);
    }

    #[test]
    fn test_extract_mentioned_files_stops_at_next_heading() {
        assert_eq!(
            extract_mentioned_files(DOC),
            vec!["src/audit/mod.rs", "src/main.rs", "docs/notes.md"]
        );
    }

    #[test]
    fn test_files_modified_title_variant() {
        let doc = "### Files Modified\n- a.py - fix\n";
        assert_eq!(extract_mentioned_files(doc), vec!["a.py"]);
    }

    #[test]
    fn test_count_modified_files() {
        assert_eq!(count_modified_files(DOC), 2);
        assert_eq!(count_modified_files("Modified everything\n"), 0);
    }

    #[test]
    fn test_fallback_estimate_counts_chars() {
        assert_eq!(fallback_estimate("abcdefgh"), 2);
        assert_eq!(fallback_estimate("ééééé"), 1);
    }

    #[test]
    fn test_tokenizer_command() {
        let runner = RecordingRunner::new().respond("count-tokens", ToolOutput::ok("42\n"));
        let estimator = TokenEstimator::new(Some(vec!["count-tokens".into()]));

        assert_eq!(estimator.estimate(&runner, "some text"), 42);
        let calls = runner.calls();
        assert_eq!(calls[0].stdin.as_deref(), Some("some text"));
        assert_eq!(calls[0].timeout, TokenEstimator::TIMEOUT);
    }

    #[test]
    fn test_tokenizer_failure_falls_back() {
        let runner = RecordingRunner::new()
            .respond("count-tokens", ToolOutput::failed("", "Command not found: count-tokens"));
        let estimator = TokenEstimator::new(Some(vec!["count-tokens".into()]));
        assert_eq!(estimator.estimate(&runner, "abcdefgh"), 2);

        let garbage = RecordingRunner::new().respond("count-tokens", ToolOutput::ok("many"));
        assert_eq!(estimator.estimate(&garbage, "abcdefgh"), 2);
    }

    #[test]
    fn test_no_tokenizer_runs_nothing() {
        let runner = RecordingRunner::new();
        assert_eq!(TokenEstimator::default().estimate(&runner, "abcd"), 1);
        assert!(runner.calls().is_empty());
    }
}
