//! Binary entry point for the simtok CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Tokenize every serialized Java tree under a directory
//! simtok tokens --root trees/
//!
//! # Tokenize selected files, JSON output
//! simtok --format json tokens --root trees/ src/A.json src/B.json
//!
//! # Delegate to an external adapter for another language
//! simtok tokens --root project/ --frontend external --adapter js-tokens --ext js
//!
//! # List the token vocabulary
//! simtok vocab
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use simtok::cli::{run_tokens, TokensRequest};
use simtok::config::{CliOverrides, FrontendKind};
use simtok::error::{OutputErrorCode, SimtokError};
use simtok::output::{
    emit_response, render_text, render_vocabulary, ErrorResponse, TokensResponse,
    VocabularyResponse,
};

// ============================================================================
// CLI Structure
// ============================================================================

/// Structural token streams for source similarity detection.
#[derive(Parser, Debug)]
#[command(name = "simtok", version, about = "Structural token streams for similarity detection")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output (overridden by RUST_LOG).
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
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

/// Output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One `line:column<TAB>NAME (length)` line per token.
    Text,
    /// Versioned JSON response.
    Json,
}

/// Front end selection on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FrontendArg {
    /// Serialized Java syntax trees.
    Java,
    /// External adapter program.
    External,
}

impl From<FrontendArg> for FrontendKind {
    fn from(arg: FrontendArg) -> Self {
        match arg {
            FrontendArg::Java => FrontendKind::Java,
            FrontendArg::External => FrontendKind::External,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tokenize files under a root directory.
    ///
    /// Without FILES, the root is scanned for files with the front end's
    /// extension (`json` for Java trees, or `--ext`).
    Tokens {
        /// Root directory; files are relative to it.
        #[arg(long)]
        root: PathBuf,

        /// Front end (default: java, or `frontend` in simtok.json).
        #[arg(long, value_enum)]
        frontend: Option<FrontendArg>,

        /// Adapter program for the external front end.
        #[arg(long)]
        adapter: Option<PathBuf>,

        /// Argument passed to the adapter before the file path (repeatable).
        #[arg(long = "adapter-arg", allow_hyphen_values = true)]
        adapter_args: Vec<String>,

        /// Adapter time limit per file, in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Maximum syntax tree nesting depth.
        #[arg(long)]
        max_depth: Option<usize>,

        /// Extension to scan for when no files are given.
        #[arg(long)]
        ext: Option<String>,

        /// Files to tokenize, relative to the root, in order.
        files: Vec<PathBuf>,
    },
    /// List the token vocabulary.
    Vocab,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_json);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(SimtokError::PartialFailure { failed, total }) => {
            // The tokens response already reports the failures.
            warn!(failed, total, "some files failed to tokenize");
            ExitCode::from(OutputErrorCode::PartialFailure.code())
        }
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), SimtokError> {
    let format = cli.global.format;
    match cli.command {
        Command::Tokens {
            root,
            frontend,
            adapter,
            adapter_args,
            timeout,
            max_depth,
            ext,
            files,
        } => {
            let request = TokensRequest {
                root,
                files,
                overrides: CliOverrides {
                    frontend: frontend.map(FrontendKind::from),
                    adapter,
                    adapter_args,
                    timeout_secs: timeout,
                    max_depth,
                    extension: ext,
                },
            };
            execute_tokens(&request, format)
        }
        Command::Vocab => execute_vocab(format),
    }
}

// ============================================================================
// Command Executors
// ============================================================================

fn execute_tokens(request: &TokensRequest, format: OutputFormat) -> Result<(), SimtokError> {
    let outcome = run_tokens(request)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            let response =
                TokensResponse::new(&outcome.frontend, outcome.files.len(), &outcome.result);
            emit_response(&response, &mut out)?;
        }
        OutputFormat::Text => {
            render_text(&outcome.result.stream, &mut out)?;
            for failure in &outcome.result.failures {
                eprintln!("error: {}: {}", failure.file, failure.message);
            }
        }
    }
    out.flush()?;

    if outcome.result.is_complete() {
        Ok(())
    } else {
        Err(SimtokError::PartialFailure {
            failed: outcome.result.error_count,
            total: outcome.files.len(),
        })
    }
}

fn execute_vocab(format: OutputFormat) -> Result<(), SimtokError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => emit_response(&VocabularyResponse::new(), &mut out)?,
        OutputFormat::Text => render_vocabulary(&mut out)?,
    }
    out.flush()?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn tokens_with_files() {
            let cli = Cli::try_parse_from([
                "simtok", "tokens", "--root", "trees", "A.json", "B.json",
            ])
            .unwrap();
            match cli.command {
                Command::Tokens { root, files, .. } => {
                    assert_eq!(root, PathBuf::from("trees"));
                    assert_eq!(files, vec![PathBuf::from("A.json"), PathBuf::from("B.json")]);
                }
                other => panic!("unexpected command: {:?}", other),
            }
            assert_eq!(cli.global.format, OutputFormat::Text);
        }

        #[test]
        fn adapter_args_accept_leading_hyphens() {
            let cli = Cli::try_parse_from([
                "simtok",
                "tokens",
                "--root",
                ".",
                "--frontend",
                "external",
                "--adapter",
                "node",
                "--adapter-arg",
                "--experimental",
                "--adapter-arg",
                "tokens.js",
            ])
            .unwrap();
            match cli.command {
                Command::Tokens {
                    frontend,
                    adapter_args,
                    ..
                } => {
                    assert_eq!(frontend, Some(FrontendArg::External));
                    assert_eq!(adapter_args, vec!["--experimental", "tokens.js"]);
                }
                other => panic!("unexpected command: {:?}", other),
            }
        }

        #[test]
        fn global_flags_after_subcommand() {
            let cli = Cli::try_parse_from(["simtok", "vocab", "--format", "json"]).unwrap();
            assert_eq!(cli.global.format, OutputFormat::Json);
            assert!(matches!(cli.command, Command::Vocab));
        }

        #[test]
        fn root_is_required() {
            assert!(Cli::try_parse_from(["simtok", "tokens"]).is_err());
        }

        #[test]
        fn unknown_frontend_is_rejected() {
            assert!(Cli::try_parse_from(["simtok", "tokens", "--root", ".", "--frontend", "cobol"])
                .is_err());
        }
    }

    mod log_level_tests {
        use super::*;

        #[test]
        fn levels_convert_to_tracing() {
            assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
            assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
            assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        }
    }
}
