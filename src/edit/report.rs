//! Human-readable post-edit output.
//!
//! Tool output is noisy; the report keeps one line per step and cuts
//! diagnostics down so the assistant can scan them.

use std::fmt;

/// Maximum characters shown for a single-line diagnostic.
pub const MAX_DIAGNOSTIC_CHARS: usize = 80;

/// Maximum lines shown from a linter's output.
pub const MAX_DETAIL_LINES: usize = 3;

/// One line of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLine {
    /// A step that succeeded.
    Ok(String),
    /// A step that failed or a tool that is missing.
    Warn(String),
    /// Indented excerpt of tool output under a warning.
    Detail(String),
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(msg) => write!(f, "  ✓ {}", msg),
            Self::Warn(msg) => write!(f, "  ⚠️  {}", msg),
            Self::Detail(msg) => write!(f, "      {}", msg),
        }
    }
}

/// Everything a handler had to say about one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// File name shown in the header.
    pub file_name: String,
    /// Lines in the order the steps ran.
    pub lines: Vec<ReportLine>,
}

impl Report {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            lines: Vec::new(),
        }
    }

    pub fn ok(&mut self, msg: impl Into<String>) {
        self.lines.push(ReportLine::Ok(msg.into()));
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.lines.push(ReportLine::Warn(msg.into()));
    }

    /// Warn with `heading`, followed by the first lines of `output`.
    pub fn warn_with_excerpt(&mut self, heading: impl Into<String>, output: &str, fallback: &str) {
        self.warn(heading);
        for line in excerpt(output, MAX_DETAIL_LINES, fallback) {
            self.lines.push(ReportLine::Detail(line));
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "🔧 {}", self.file_name)?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Cut `text` to at most `max` characters, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// A one-line diagnostic: the first non-blank line of `output` cut to
/// [`MAX_DIAGNOSTIC_CHARS`], or `fallback` when there is none.
pub fn short_diagnostic(output: &str, fallback: &str) -> String {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or(fallback);
    truncate_chars(line, MAX_DIAGNOSTIC_CHARS).to_string()
}

/// Up to `max` lines of `output`, each cut to [`MAX_DIAGNOSTIC_CHARS`], or
/// just `fallback` when empty.
pub fn excerpt(output: &str, max: usize, fallback: &str) -> Vec<String> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return vec![fallback.to_string()];
    }
    trimmed
        .lines()
        .take(max)
        .map(|l| truncate_chars(l.trim_end(), MAX_DIAGNOSTIC_CHARS).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_render_report() {
        let mut report = Report::new("main.py");
        report.ok("formatted");
        report.warn_with_excerpt("Linting failed:", "E501 line too long\nF401 unused", "x");

        let rendered = report.to_string();
        assert_eq!(
            rendered,
            "\n🔧 main.py\n  ✓ formatted\n  ⚠️  Linting failed:\n\
             \x20     E501 line too long\n      F401 unused\n"
        );
    }

    #[test]
    fn test_excerpt_limits_lines() {
        let lines = excerpt("1\n2\n3\n4\n5", MAX_DETAIL_LINES, "none");
        assert_eq!(lines, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_excerpt_fallback() {
        assert_eq!(excerpt("  \n", 3, "Linting failed"), vec!["Linting failed"]);
    }

    #[test]
    fn test_short_diagnostic_takes_first_line() {
        assert_eq!(short_diagnostic("\n  error: x\nmore", "none"), "error: x");
        assert_eq!(short_diagnostic("", "clippy failed"), "clippy failed");
        assert_eq!(short_diagnostic(" \n\t\n", "Unknown error"), "Unknown error");
    }

    #[test]
    fn test_short_diagnostic_truncates() {
        let long = format!("{}\nsecond line", "e".repeat(200));
        let cut = short_diagnostic(&long, "Unknown error");
        assert_eq!(cut.chars().count(), MAX_DIAGNOSTIC_CHARS);
        assert!(!cut.contains('\n'));
    }

    #[test]
    fn test_excerpt_truncates_each_line() {
        let output = format!("{}\nshort", "w".repeat(300));
        let lines = excerpt(&output, MAX_DETAIL_LINES, "none");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].chars().count(), MAX_DIAGNOSTIC_CHARS);
        assert_eq!(lines[1], "short");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 5), "ab");
    }

    proptest! {
        #[test]
        fn truncate_never_exceeds_budget(s in "\\PC*", max in 0usize..120) {
            let cut = truncate_chars(&s, max);
            prop_assert!(cut.chars().count() <= max);
            prop_assert!(s.starts_with(cut));
        }

        #[test]
        fn short_diagnostic_is_one_bounded_line(s in "\\PC*(\n\\PC*){0,4}") {
            let line = short_diagnostic(&s, "fallback");
            prop_assert!(line.chars().count() <= MAX_DIAGNOSTIC_CHARS);
            prop_assert!(!line.contains('\n'));
        }
    }
}
