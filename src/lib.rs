//! hooksmith - lifecycle hooks for an AI coding assistant
//!
//! Four hooks share one binary: a post-edit formatter/linter dispatcher, a
//! pre-commit quality gate, an audit logger and a handoff document manager.
//! Every hook shells out to existing tools; none of them reimplements a
//! formatter or linter.

pub mod audit;
pub mod commit;
pub mod config;
pub mod edit;
pub mod error;
pub mod handoff;
pub mod process;
pub mod project;
pub mod tools;
pub mod util;

pub use audit::{AuditEvent, AuditLogger, GitContext, SystemContext};
pub use commit::{PreCommitGate, PreCommitReport, SecretScanner};
pub use config::Config;
pub use edit::{EditEvent, Language, PostEditHook, Report};
pub use error::{exit_codes, FailOpen, HookError, Result};
pub use handoff::{HandoffManager, HandoffMode, VerifyReport};
pub use process::{CommandRunner, Invocation, SystemRunner, ToolOutput};
pub use project::find_project_root;
pub use tools::{Ecosystem, ToolResolver};
