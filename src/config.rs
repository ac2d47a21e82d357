//! Configuration loading for hooksmith.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.hooksmith/config.toml`)
//! 3. User config (`~/.hooksmith/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. Hooks run with the defaults when no
//! config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HookError, Result};

/// Main configuration struct for hooksmith.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Subprocess timeouts.
    pub timeouts: TimeoutConfig,
    /// Audit logger configuration.
    pub audit: AuditConfig,
    /// Handoff manager configuration.
    pub handoff: HandoffConfig,
    /// Secret scan configuration.
    pub secrets: SecretsConfig,
}

/// Subprocess timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default timeout for formatter and linter invocations.
    pub default_secs: u64,
    /// Timeout for prettier, which is usually fast.
    pub prettier_secs: u64,
    /// Timeout for pre-commit format and lint checks.
    pub check_secs: u64,
    /// Timeout for type checking.
    pub type_check_secs: u64,
    /// Timeout for git queries.
    pub git_secs: u64,
}

impl TimeoutConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_secs)
    }

    pub fn prettier(&self) -> Duration {
        Duration::from_secs(self.prettier_secs)
    }

    pub fn check(&self) -> Duration {
        Duration::from_secs(self.check_secs)
    }

    pub fn type_check(&self) -> Duration {
        Duration::from_secs(self.type_check_secs)
    }

    pub fn git(&self) -> Duration {
        Duration::from_secs(self.git_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_secs: DEFAULT_TIMEOUT_SECS,
            prettier_secs: 15,
            check_secs: 30,
            type_check_secs: 60,
            git_secs: 5,
        }
    }
}

/// Default subprocess timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Audit logger configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    /// Explicit log path. Defaults to `~/.claude/command-audit.log`.
    pub log_path: Option<PathBuf>,
    /// Whether to query `git status` for the dirty flag (slow on big repos).
    pub git_status: bool,
}

impl AuditConfig {
    /// Resolve the audit log path.
    pub fn resolved_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(default_audit_log_path)
    }
}

/// Handoff manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HandoffConfig {
    /// Handoff directory, relative to the project root.
    pub dir: PathBuf,
    /// Number of handoffs kept in the active directory.
    pub retention: usize,
    /// Age in days after which a handoff is reported as stale.
    pub stale_days: i64,
    /// Model recorded in the metadata sidecar.
    pub model: Option<String>,
    /// Command printing the token count of the text on its stdin.
    pub tokenizer: Option<String>,
}

/// Model recorded when none is configured.
pub const DEFAULT_MODEL: &str = "claude-sonnet";

impl HandoffConfig {
    /// The configured model, or [`DEFAULT_MODEL`].
    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    /// The tokenizer command split into argv, if configured.
    pub fn tokenizer_argv(&self) -> Option<Vec<String>> {
        let argv: Vec<String> = self
            .tokenizer
            .as_deref()?
            .split_whitespace()
            .map(str::to_string)
            .collect();
        (!argv.is_empty()).then_some(argv)
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("docs").join("handoff"),
            retention: 5,
            stale_days: 7,
            model: None,
            tokenizer: None,
        }
    }
}

/// Secret scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SecretsConfig {
    /// File extensions to scan (without the dot).
    pub extensions: Vec<String>,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["py".to_string()],
        }
    }
}

/// Parse a positive timeout value, falling back to `default` otherwise.
pub fn parse_timeout(value: Option<&str>, default: u64) -> u64 {
    let Some(raw) = value else {
        return default;
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => n as u64,
        _ => {
            tracing::warn!(
                "Invalid CLAUDE_HOOK_TIMEOUT value '{}'. Using default '{}'.",
                raw, default
            );
            default
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    fn load_user_config() -> Option<Config> {
        let home = hooksmith_home()?;
        Self::load_optional(&home.join("config.toml"))
    }

    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_optional(&cwd.join(".hooksmith").join("config.toml"))
    }

    /// Load a config file that may legitimately be absent.
    ///
    /// A file that exists but does not parse is reported, then ignored.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring config: {}", e);
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| HookError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| HookError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // CLAUDE_HOOK_TIMEOUT
        if let Ok(val) = env::var("CLAUDE_HOOK_TIMEOUT") {
            self.timeouts.default_secs = parse_timeout(Some(&val), self.timeouts.default_secs);
        }

        // CLAUDE_AUDIT_GIT_STATUS
        if let Ok(val) = env::var("CLAUDE_AUDIT_GIT_STATUS") {
            self.audit.git_status = val == "1";
        }

        // HOOKSMITH_AUDIT_LOG
        if let Ok(val) = env::var("HOOKSMITH_AUDIT_LOG") {
            if val.is_empty() {
                tracing::warn!("HOOKSMITH_AUDIT_LOG is empty, using default");
            } else {
                self.audit.log_path = Some(PathBuf::from(val));
            }
        }

        if let Ok(val) = env::var("CLAUDE_MODEL") {
            if !val.is_empty() {
                self.handoff.model = Some(val);
            }
        }

        if let Ok(val) = env::var("HOOKSMITH_TOKENIZER") {
            if !val.trim().is_empty() {
                self.handoff.tokenizer = Some(val);
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// Field by field: every non-default value of `other` wins. A layer
    /// cannot reset a value back to its default once a lower layer changed it.
    fn merge(mut self, other: Config) -> Self {
        let default_timeouts = TimeoutConfig::default();
        if other.timeouts.default_secs != default_timeouts.default_secs {
            self.timeouts.default_secs = other.timeouts.default_secs;
        }
        if other.timeouts.prettier_secs != default_timeouts.prettier_secs {
            self.timeouts.prettier_secs = other.timeouts.prettier_secs;
        }
        if other.timeouts.check_secs != default_timeouts.check_secs {
            self.timeouts.check_secs = other.timeouts.check_secs;
        }
        if other.timeouts.type_check_secs != default_timeouts.type_check_secs {
            self.timeouts.type_check_secs = other.timeouts.type_check_secs;
        }
        if other.timeouts.git_secs != default_timeouts.git_secs {
            self.timeouts.git_secs = other.timeouts.git_secs;
        }

        if other.audit.log_path.is_some() {
            self.audit.log_path = other.audit.log_path;
        }
        if other.audit.git_status {
            self.audit.git_status = true;
        }

        let default_handoff = HandoffConfig::default();
        if other.handoff.dir != default_handoff.dir {
            self.handoff.dir = other.handoff.dir;
        }
        if other.handoff.retention != default_handoff.retention {
            self.handoff.retention = other.handoff.retention;
        }
        if other.handoff.stale_days != default_handoff.stale_days {
            self.handoff.stale_days = other.handoff.stale_days;
        }
        if other.handoff.model.is_some() {
            self.handoff.model = other.handoff.model;
        }
        if other.handoff.tokenizer.is_some() {
            self.handoff.tokenizer = other.handoff.tokenizer;
        }

        if other.secrets.extensions != SecretsConfig::default().extensions {
            self.secrets.extensions = other.secrets.extensions;
        }

        self
    }
}

/// Get the hooksmith home directory.
///
/// Checks `HOOKSMITH_HOME` first, then falls back to `~/.hooksmith`.
pub fn hooksmith_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOOKSMITH_HOME") {
        if home.is_empty() {
            tracing::warn!("HOOKSMITH_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("HOOKSMITH_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    dirs::home_dir().map(|home| home.join(".hooksmith"))
}

/// Default audit log path: `~/.claude/command-audit.log`.
pub fn default_audit_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude").join("command-audit.log"))
}

/// Crash log written by the panic handler.
pub fn crash_log_path() -> Option<PathBuf> {
    hooksmith_home().map(|h| h.join("crash.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        env::remove_var("CLAUDE_HOOK_TIMEOUT");
        env::remove_var("CLAUDE_AUDIT_GIT_STATUS");
        env::remove_var("HOOKSMITH_AUDIT_LOG");
        env::remove_var("CLAUDE_MODEL");
        env::remove_var("HOOKSMITH_TOKENIZER");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.timeouts.default_secs, 60);
        assert_eq!(config.timeouts.prettier_secs, 15);
        assert_eq!(config.timeouts.check_secs, 30);
        assert_eq!(config.timeouts.type_check_secs, 60);
        assert_eq!(config.timeouts.git_secs, 5);

        assert!(config.audit.log_path.is_none());
        assert!(!config.audit.git_status);

        assert_eq!(config.handoff.dir, PathBuf::from("docs/handoff"));
        assert_eq!(config.handoff.retention, 5);
        assert_eq!(config.handoff.stale_days, 7);

        assert_eq!(config.secrets.extensions, vec!["py"]);
    }

    #[test]
    fn test_parse_timeout_valid() {
        assert_eq!(parse_timeout(Some("30"), 60), 30);
    }

    #[test]
    fn test_parse_timeout_none_returns_default() {
        assert_eq!(parse_timeout(None, 60), 60);
    }

    #[test]
    fn test_parse_timeout_rejects_garbage() {
        assert_eq!(parse_timeout(Some("invalid"), 60), 60);
        assert_eq!(parse_timeout(Some("-10"), 60), 60);
        assert_eq!(parse_timeout(Some("0"), 60), 60);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let toml_content = r#"
[timeouts]
default_secs = 90
git_secs = 2

[handoff]
retention = 3
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(config.timeouts.default_secs, 90);
        assert_eq!(config.timeouts.git_secs, 2);
        assert_eq!(config.handoff.retention, 3);
        assert_eq!(config.handoff.stale_days, 7);
        assert_eq!(config.timeouts.prettier_secs, 15);
    }

    #[test]
    fn test_load_from_file_missing() {
        let result = Config::load_from_file(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "this is not valid toml [[[").unwrap();

        let result = Config::load_from_file(&config_path);
        assert!(matches!(result, Err(HookError::Config { .. })));
    }

    #[test]
    #[serial]
    fn test_project_config_precedence() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".hooksmith");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(
            project_dir.join("config.toml"),
            "[secrets]\nextensions = [\"py\", \"ts\"]\n",
        )
        .unwrap();

        let config = Config::load_from_cwd(dir.path());

        assert_eq!(config.secrets.extensions, vec!["py", "ts"]);
        assert_eq!(config.timeouts.check_secs, 30);
    }

    #[test]
    #[serial]
    fn test_env_var_precedence() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".hooksmith");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(
            project_dir.join("config.toml"),
            "[timeouts]\ndefault_secs = 45\n",
        )
        .unwrap();

        env::set_var("CLAUDE_HOOK_TIMEOUT", "12");
        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.timeouts.default_secs, 12);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_invalid_timeout_keeps_layered_value() {
        clear_env();
        let dir = TempDir::new().unwrap();

        env::set_var("CLAUDE_HOOK_TIMEOUT", "soon");
        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.timeouts.default_secs, DEFAULT_TIMEOUT_SECS);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_audit_overrides() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("audit.log");

        env::set_var("CLAUDE_AUDIT_GIT_STATUS", "1");
        env::set_var("HOOKSMITH_AUDIT_LOG", &log);
        let config = Config::load_from_cwd(dir.path());

        assert!(config.audit.git_status);
        assert_eq!(config.audit.resolved_log_path(), Some(log));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_handoff_overrides() {
        clear_env();
        let dir = TempDir::new().unwrap();

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.handoff.resolved_model(), DEFAULT_MODEL);
        assert_eq!(config.handoff.tokenizer_argv(), None);

        env::set_var("CLAUDE_MODEL", "claude-opus");
        env::set_var("HOOKSMITH_TOKENIZER", "count-tokens --model x");
        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.handoff.resolved_model(), "claude-opus");
        assert_eq!(
            config.handoff.tokenizer_argv(),
            Some(vec!["count-tokens".into(), "--model".into(), "x".into()])
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_project_config_is_ignored() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".hooksmith");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("config.toml"), "[[[").unwrap();

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.handoff, HandoffConfig::default());
    }

    #[test]
    fn test_merge_takes_non_default_fields() {
        let mut other = Config::default();
        other.timeouts.git_secs = 1;
        other.handoff.stale_days = 14;

        let mut base = Config::default();
        base.timeouts.prettier_secs = 20;

        let merged = base.merge(other);
        assert_eq!(merged.timeouts.git_secs, 1);
        assert_eq!(merged.timeouts.prettier_secs, 20);
        assert_eq!(merged.handoff.stale_days, 14);
    }

    #[test]
    fn test_timeout_durations() {
        let timeouts = TimeoutConfig::default();
        assert_eq!(timeouts.default_timeout(), Duration::from_secs(60));
        assert_eq!(timeouts.prettier(), Duration::from_secs(15));
        assert_eq!(timeouts.git(), Duration::from_secs(5));
    }

    #[test]
    #[serial]
    fn test_hooksmith_home_env() {
        let dir = TempDir::new().unwrap();
        env::set_var("HOOKSMITH_HOME", dir.path());
        assert_eq!(hooksmith_home(), Some(dir.path().to_path_buf()));
        assert_eq!(crash_log_path(), Some(dir.path().join("crash.log")));
        env::remove_var("HOOKSMITH_HOME");
    }
}
