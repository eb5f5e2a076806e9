//! Binary entry point for the mocklint CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Analyze a compilation document exported by a host adapter
//! mocklint check build/compilation.json
//!
//! # Human-readable output
//! mocklint check build/compilation.json --format text
//!
//! # List rules with the effective configuration applied
//! mocklint --config mocklint.toml rules
//! ```
//!
//! ## Exit codes
//!
//! - `0`: no error-severity diagnostics
//! - `1`: at least one error-severity diagnostic
//! - `2`: invalid arguments, input document or config
//! - `3`: input file not found
//! - `10`: internal error

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use mocklint_core::config::{find_config_from, Config};
use mocklint_core::error::{MockLintError, OutputErrorCode};
use mocklint_core::output::{
    emit_response, emit_text, CheckResponse, ErrorResponse, RulesResponse,
};
use mocklint_core::{Analyzer, CancellationToken, CatalogCache, Compilation};

// ============================================================================
// CLI Structure
// ============================================================================

/// Checks Moq mock configuration against the mocked types.
#[derive(Parser, Debug)]
#[command(
    name = "mocklint",
    version,
    about = "Checks Moq mock configuration against the mocked types"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Config file (default: mocklint.toml found upward from the input).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Output format for the check command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum CheckFormat {
    /// Full JSON response (default).
    #[default]
    Json,
    /// One line per diagnostic plus a summary.
    Text,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a compilation document.
    Check {
        /// Path to the compilation JSON document.
        file: PathBuf,
        /// Output format.
        #[arg(long, value_enum, default_value = "json")]
        format: CheckFormat,
    },
    /// List all rules.
    Rules,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(1),
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command. `Ok(true)` means error diagnostics were found.
fn execute(cli: Cli) -> Result<bool, MockLintError> {
    match cli.command {
        Command::Check { file, format } => execute_check(&cli.global, &file, format),
        Command::Rules => execute_rules(&cli.global).map(|_| false),
    }
}

// ============================================================================
// Command Executors
// ============================================================================

fn execute_check(
    global: &GlobalArgs,
    file: &Path,
    format: CheckFormat,
) -> Result<bool, MockLintError> {
    let config = resolve_config(global, file.parent())?;
    let compilation = Arc::new(load_compilation(file)?);
    info!(
        file = %file.display(),
        compilation = %compilation.id,
        nodes = compilation.nodes.len(),
        "loaded compilation"
    );

    let cache = CatalogCache::new();
    let analysis =
        Analyzer::with_config(config).analyze(&compilation, &cache, &CancellationToken::new());
    let response = CheckResponse::new(compilation.id.to_string(), analysis);

    let mut stdout = io::stdout();
    match format {
        CheckFormat::Json => emit_response(&response, &mut stdout)?,
        CheckFormat::Text => emit_text(&response, &mut stdout)?,
    }
    stdout.flush()?;
    Ok(response.has_errors())
}

fn execute_rules(global: &GlobalArgs) -> Result<(), MockLintError> {
    let cwd = std::env::current_dir()?;
    let config = resolve_config(global, Some(&cwd))?;
    let response = RulesResponse::new(|c| config.is_enabled(c), |c| config.severity_for(c));
    emit_response(&response, &mut io::stdout())?;
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// `--config` when given, otherwise the nearest mocklint.toml above
/// `search_from`, otherwise defaults.
fn resolve_config(global: &GlobalArgs, search_from: Option<&Path>) -> Result<Config, MockLintError> {
    if let Some(path) = &global.config {
        if !path.is_file() {
            return Err(MockLintError::file_not_found(path.display().to_string()));
        }
        debug!(path = %path.display(), "using config from --config");
        return Config::load(path);
    }
    let start = match search_from {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    match find_config_from(&start) {
        Some(path) => {
            debug!(path = %path.display(), "using discovered config");
            Config::load(&path)
        }
        None => Ok(Config::default()),
    }
}

fn load_compilation(file: &Path) -> Result<Compilation, MockLintError> {
    if !file.is_file() {
        return Err(MockLintError::file_not_found(file.display().to_string()));
    }
    let content = fs::read_to_string(file)?;
    Compilation::from_json(&content)
}
