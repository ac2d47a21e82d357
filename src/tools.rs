//! Tool resolution.
//!
//! A logical tool name becomes an argv prefix: the binary itself when it is
//! on `PATH`, otherwise the ecosystem's launcher (`uvx ruff`, `npx eslint`),
//! otherwise nothing. Callers treat "nothing" as a warning, never an error.

use std::collections::HashSet;

/// Family of tools sharing one fallback launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ecosystem {
    /// Python tools, launched through `uvx`.
    Python,
    /// Node tools, launched through `npx`.
    Node,
    /// Native binaries with no launcher.
    Native,
}

impl Ecosystem {
    /// The launcher used when the tool itself is missing.
    pub fn launcher(&self) -> Option<&'static str> {
        match self {
            Self::Python => Some("uvx"),
            Self::Node => Some("npx"),
            Self::Native => None,
        }
    }
}

/// Trait for answering "is this binary on PATH?".
pub trait ToolLocator {
    fn is_available(&self, tool: &str) -> bool;
}

/// Looks binaries up on the real `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLocator;

impl ToolLocator for PathLocator {
    fn is_available(&self, tool: &str) -> bool {
        which::which(tool).is_ok()
    }
}

/// A fixed set of available tools.
#[derive(Debug, Clone, Default)]
pub struct FixedLocator {
    available: HashSet<String>,
}

impl FixedLocator {
    pub fn new<I, S>(tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            available: tools.into_iter().map(Into::into).collect(),
        }
    }
}

impl ToolLocator for FixedLocator {
    fn is_available(&self, tool: &str) -> bool {
        self.available.contains(tool)
    }
}

/// Resolves logical tool names to argv prefixes.
#[derive(Debug, Clone, Default)]
pub struct ToolResolver<L: ToolLocator = PathLocator> {
    locator: L,
}

impl ToolResolver<PathLocator> {
    /// Resolver backed by the real `PATH`.
    pub fn system() -> Self {
        Self {
            locator: PathLocator,
        }
    }
}

impl<L: ToolLocator> ToolResolver<L> {
    pub fn new(locator: L) -> Self {
        Self { locator }
    }

    /// Whether `tool` itself is on PATH.
    pub fn has(&self, tool: &str) -> bool {
        self.locator.is_available(tool)
    }

    /// Resolve `tool` to the argv prefix that runs it.
    ///
    /// Returns `None` when neither the tool nor its launcher is available.
    pub fn resolve(&self, tool: &str, ecosystem: Ecosystem) -> Option<Vec<String>> {
        if self.has(tool) {
            return Some(vec![tool.to_string()]);
        }
        match ecosystem.launcher() {
            Some(launcher) if self.has(launcher) => {
                Some(vec![launcher.to_string(), tool.to_string()])
            }
            _ => {
                tracing::debug!(tool, "tool unavailable");
                None
            }
        }
    }

    /// Like [`resolve`](Self::resolve), but falls back to the bare tool name.
    ///
    /// Used where running a missing tool should surface as a failed check
    /// rather than being skipped.
    pub fn resolve_or_bare(&self, tool: &str, ecosystem: Ecosystem) -> Vec<String> {
        self.resolve(tool, ecosystem)
            .unwrap_or_else(|| vec![tool.to_string()])
    }
}
