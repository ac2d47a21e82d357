//! hooksmith - lifecycle hooks for an AI coding assistant
//!
//! CLI entry point with global panic handler.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hooksmith::audit::AuditLogger;
use hooksmith::commit::PreCommitGate;
use hooksmith::config::{crash_log_path, Config};
use hooksmith::edit::{EditEvent, PostEditHook};
use hooksmith::error::{exit_codes, HookError};
use hooksmith::handoff::{HandoffManager, HandoffMode};
use hooksmith::process::SystemRunner;
use hooksmith::tools::ToolResolver;

// =============================================================================
// CLI Definition
// =============================================================================

/// hooksmith - lifecycle hooks for an AI coding assistant
#[derive(Parser)]
#[command(name = "hooksmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// [Hook] Format and lint the file named by FILE_PATH after an edit
    PostEdit,

    /// [Hook] Run the pre-commit quality gate in the current directory
    PreCommit,

    /// [Hook] Append the JSON event on stdin to the audit log
    Audit,

    /// [User/Agent] Manage session handoff documents
    Handoff {
        /// Project root (defaults to the current directory)
        #[arg(long, global = true)]
        root: Option<PathBuf>,
        #[command(subcommand)]
        action: HandoffAction,
    },
}

#[derive(Subcommand)]
enum HandoffAction {
    /// Write a new handoff document
    Create {
        /// Markdown content of the handoff
        #[arg(long)]
        content: String,
        /// Level of detail
        #[arg(long, value_enum, default_value_t = HandoffMode::Quick)]
        mode: HandoffMode,
    },
    /// Print the path of the newest handoff
    Latest,
    /// List handoffs with their summaries
    List {
        /// Include archived handoffs
        #[arg(long)]
        archived: bool,
    },
    /// Print a handoff (the latest by default)
    Load {
        /// Handoff file name
        #[arg(long)]
        file: Option<String>,
    },
    /// Check a handoff against the working tree
    Verify {
        /// Handoff file name
        #[arg(long)]
        file: Option<String>,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("hooksmith error: {}", e);
            exit_code(exit_codes::NON_BLOCKING)
        }
    }
}

/// Log to stderr, filtered by `HOOKSMITH_LOG` (default `warn`).
fn init_logging() {
    let filter =
        EnvFilter::try_from_env("HOOKSMITH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Set up the global panic handler.
///
/// On panic, logs to `<hooksmith home>/crash.log` and exits with the
/// non-blocking code so a crash never blocks the assistant.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("hooksmith panic: {}", info);

        if let Some(crash_log) = crash_log_path() {
            if let Some(parent) = crash_log.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::NON_BLOCKING);
    }));
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX))
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::PostEdit => run_post_edit(),
        Commands::PreCommit => run_pre_commit(),
        Commands::Audit => run_audit(),
        Commands::Handoff { root, action } => {
            let root = match root {
                Some(root) => root,
                None => std::env::current_dir()?,
            };
            run_handoff(root, action)
        }
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn run_post_edit() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load();
    let hook = PostEditHook::new(SystemRunner::new(), ToolResolver::system(), config.timeouts);

    if let Some(report) = hook.handle(&EditEvent::from_env()) {
        println!("{}", report);
    }
    Ok(exit_code(exit_codes::SUCCESS))
}

fn run_pre_commit() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let config = Config::load_from_cwd(&cwd);
    let gate = PreCommitGate::new(
        SystemRunner::new(),
        ToolResolver::system(),
        config.timeouts,
        config.secrets,
    );

    let report = gate.run(&cwd);
    print!("{}", report);
    Ok(exit_code(report.exit_code()))
}

fn run_audit() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("audit: failed to read stdin: {}", e);
        return Ok(exit_code(exit_codes::NON_BLOCKING));
    }

    let config = Config::load();
    let result = AuditLogger::from_config(SystemRunner::new(), &config)
        .and_then(|logger| logger.log(&input));

    match result {
        Ok(()) => Ok(exit_code(exit_codes::SUCCESS)),
        Err(e) => {
            match &e {
                HookError::InvalidInput { message } => eprintln!("audit: {}", message),
                other => eprintln!("audit: {}", other),
            }
            Ok(exit_code(e.exit_code()))
        }
    }
}

fn run_handoff(
    root: PathBuf,
    action: HandoffAction,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load_from_cwd(&root);
    let manager = HandoffManager::new(&root, &config.handoff, SystemRunner::new())
        .git_timeout(config.timeouts.git());

    let outcome = match action {
        HandoffAction::Create { content, mode } => manager
            .create(&content, mode)
            .map(|path| format!("Created handoff: {}", path.display())),
        HandoffAction::Latest => Ok(match manager.latest() {
            Some(path) => format!("Latest handoff: {}", path.display()),
            None => "No handoffs found".to_string(),
        }),
        HandoffAction::List { archived } => manager.list(archived).map(|infos| {
            infos
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n")
        }),
        HandoffAction::Load { file } => {
            manager
                .load(file.as_deref())
                .map(|handoff| match handoff {
                    Some(handoff) => handoff.content,
                    None => "No handoffs found".to_string(),
                })
        }
        HandoffAction::Verify { file } => manager
            .verify(file.as_deref())
            .map(|report| report.to_string().trim_end().to_string()),
    };

    match outcome {
        Ok(text) => {
            if !text.is_empty() {
                println!("{}", text);
            }
            Ok(exit_code(exit_codes::SUCCESS))
        }
        Err(e) => {
            eprintln!("handoff: {}", e);
            Ok(exit_code(e.exit_code()))
        }
    }
}
