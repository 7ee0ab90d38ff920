//! Cross-language adapter: tokens from an external program.
//!
//! Languages without an in-process AST provider delegate to a program that
//! prints a token table. The program is configured explicitly when the
//! adapter is built; there is no process-wide default command.
//!
//! # Protocol
//!
//! - Invocation: `program [args...] <absolute path>`, once per file, stdin
//!   closed, bounded by a timeout.
//! - Success: exit status 0 and, on stdout, JSON Lines with one record per
//!   token: `{"kind": <code>, "line": <line>, "column": <column>, "length": <n>}`.
//!   `kind` is a code of the shared vocabulary ([`TokenKind`]). Blank lines
//!   are ignored. `FILE_END` records are dropped; the file driver appends the
//!   boundary token itself.
//! - Failure: non-zero exit, timeout, or any record that does not decode.
//!   The whole file is rejected; no partial token table is trusted.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::position::Position;
use crate::provider::{FileError, Frontend};
use crate::token::{Token, TokenKind, TokenStream};

/// Default time an adapter program may run per file.
pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(60);

/// How long to wait for the pipe readers after a timed-out program is killed.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

// ============================================================================
// Errors
// ============================================================================

/// Errors from the external adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The configured program could not be resolved (environment level).
    #[error("adapter program not found: {program}")]
    ProgramNotFound { program: PathBuf },

    /// The program could not be started.
    #[error("failed to spawn {program}: {reason}")]
    SpawnFailed { program: PathBuf, reason: String },

    /// The program ran past its time limit and was killed.
    #[error("adapter timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The program exited unsuccessfully.
    #[error("adapter exited with {}: {stderr}", describe_exit(.code))]
    ExitStatus { code: Option<i32>, stderr: String },

    /// A record of the token table could not be decoded.
    #[error("undecodable token record on line {line}: {reason}")]
    Decode { line: usize, reason: String },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for an [`ExternalAdapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalAdapterConfig {
    /// Program to run (a path, or a name looked up on `PATH`).
    pub program: PathBuf,
    /// Arguments placed before the file path.
    pub args: Vec<String>,
    /// Time limit per file.
    pub timeout: Duration,
}

impl ExternalAdapterConfig {
    /// Configuration running `program` with no extra arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        ExternalAdapterConfig {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_ADAPTER_TIMEOUT,
        }
    }

    /// Set the arguments placed before the file path.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-file time limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Front end that delegates tokenization to an external program.
#[derive(Debug, Clone)]
pub struct ExternalAdapter {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

/// Captured result of one adapter run.
struct RunOutput {
    stdout: String,
    elapsed: Duration,
}

impl ExternalAdapter {
    /// Build an adapter, resolving the program up front.
    ///
    /// An unresolvable program is an environment-level failure: no file
    /// could ever succeed, so it is reported here instead of per file.
    pub fn new(config: ExternalAdapterConfig) -> Result<Self, AdapterError> {
        let program =
            which::which(&config.program).map_err(|_| AdapterError::ProgramNotFound {
                program: config.program.clone(),
            })?;
        Ok(ExternalAdapter {
            program,
            args: config.args,
            timeout: config.timeout,
        })
    }

    /// Resolved program path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the program on `path` and decode its token table.
    pub fn run(&self, path: &Path, file: &str) -> Result<Vec<Token>, AdapterError> {
        let output = self.execute(path)?;
        let tokens = decode_token_table(&output.stdout, file)?;
        debug!(
            file,
            tokens = tokens.len(),
            elapsed_ms = output.elapsed.as_millis() as u64,
            "adapter run complete"
        );
        Ok(tokens)
    }

    fn execute(&self, path: &Path) -> Result<RunOutput, AdapterError> {
        let start = Instant::now();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AdapterError::SpawnFailed {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        // Drain both pipes while waiting so a large table cannot fill the
        // pipe buffer and stall the child.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                let stderr = join_within(stderr, DRAIN_GRACE);
                let drained = join_within(stdout, DRAIN_GRACE).is_some() && stderr.is_some();
                if !drained {
                    debug!(
                        program = %self.program.display(),
                        "pipe reader left running; a descendant still holds the pipe"
                    );
                }
                warn!(
                    program = %self.program.display(),
                    path = %path.display(),
                    stderr = stderr.as_deref().unwrap_or("").trim(),
                    "adapter timed out after {:?}",
                    self.timeout
                );
                return Err(AdapterError::Timeout {
                    timeout: self.timeout,
                });
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                join_within(stdout, DRAIN_GRACE);
                join_within(stderr, DRAIN_GRACE);
                return Err(AdapterError::SpawnFailed {
                    program: self.program.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let stdout = join_output(stdout);
        let stderr = join_output(stderr);

        if !status.success() {
            return Err(AdapterError::ExitStatus {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(RunOutput {
            stdout,
            elapsed: start.elapsed(),
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_output(handle: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    let bytes = handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Join a pipe reader if it finishes within `grace`.
///
/// Returns `None` when the reader is still blocked at the deadline. It is
/// then left to end on its own once the last writer closes the pipe.
fn join_within(handle: Option<thread::JoinHandle<Vec<u8>>>, grace: Duration) -> Option<String> {
    let handle = handle?;
    let deadline = Instant::now() + grace;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(Duration::from_millis(5));
    }
    Some(join_output(Some(handle)))
}

impl Frontend for ExternalAdapter {
    fn name(&self) -> &str {
        "external"
    }

    fn tokenize(&self, path: &Path, file: &str, out: &mut TokenStream) -> Result<(), FileError> {
        let tokens = self.run(path, file)?;
        out.extend(tokens);
        Ok(())
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireRecord {
    kind: u16,
    line: i32,
    column: i32,
    length: u32,
}

/// Decode an adapter's JSON Lines token table into tokens for `file`.
///
/// Fails on the first record that is not valid JSON, names a code outside
/// the vocabulary, has length 0, or has a position that is neither 1-based
/// nor the sentinel. `FILE_END` records are skipped.
pub fn decode_token_table(output: &str, file: &str) -> Result<Vec<Token>, AdapterError> {
    let mut tokens = Vec::new();

    for (index, raw) in output.lines().enumerate() {
        let line = index + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let record: WireRecord = serde_json::from_str(raw).map_err(|e| AdapterError::Decode {
            line,
            reason: e.to_string(),
        })?;

        let kind = TokenKind::from_code(record.kind).ok_or_else(|| AdapterError::Decode {
            line,
            reason: format!("unknown token: {}", record.kind),
        })?;
        if kind == TokenKind::FileEnd {
            continue;
        }

        if record.length == 0 {
            return Err(AdapterError::Decode {
                line,
                reason: "token length must be at least 1".to_string(),
            });
        }

        let position = Position::new(record.line, record.column);
        if !position.is_resolved() && !position.is_sentinel() {
            return Err(AdapterError::Decode {
                line,
                reason: format!("invalid position {}", position),
            });
        }

        tokens.push(Token::new(kind, file, position, record.length));
    }

    Ok(tokens)
}
