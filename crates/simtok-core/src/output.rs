//! Output types and rendering.
//!
//! JSON responses carry a `schema_version` so downstream comparison tools
//! can detect format changes. The text rendering is meant for people.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::driver::{FileFailure, ParseBatchResult};
use crate::error::{OutputErrorCode, SimtokError};
use crate::token::{Token, TokenKind};

/// Schema version of JSON output.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Tokens
// ============================================================================

/// One token as emitted in JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Numeric vocabulary code.
    pub kind: u16,
    /// Stable vocabulary name.
    pub name: String,
    pub file: String,
    pub line: i32,
    pub column: i32,
    pub length: u32,
}

impl From<&Token> for TokenInfo {
    fn from(token: &Token) -> Self {
        TokenInfo {
            kind: token.kind.code(),
            name: token.kind.name().to_string(),
            file: token.file.clone(),
            line: token.line,
            column: token.column,
            length: token.length,
        }
    }
}

/// Response for the `tokens` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokensResponse {
    /// `"ok"`, or `"partial"` when some files failed.
    pub status: String,
    pub schema_version: String,
    /// Front end that produced the tokens.
    pub frontend: String,
    /// Number of files requested.
    pub files: usize,
    pub error_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FileFailure>,
    pub tokens: Vec<TokenInfo>,
}

impl TokensResponse {
    pub fn new(frontend: impl Into<String>, files: usize, result: &ParseBatchResult) -> Self {
        let status = if result.is_complete() { "ok" } else { "partial" };
        TokensResponse {
            status: status.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            frontend: frontend.into(),
            files,
            error_count: result.error_count,
            failures: result.failures.clone(),
            tokens: result.stream.iter().map(TokenInfo::from).collect(),
        }
    }
}

// ============================================================================
// Vocabulary
// ============================================================================

/// One vocabulary member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindInfo {
    pub code: u16,
    pub name: String,
    /// Code of the matching END-class kind, for opening kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closing: Option<u16>,
}

impl From<TokenKind> for KindInfo {
    fn from(kind: TokenKind) -> Self {
        KindInfo {
            code: kind.code(),
            name: kind.name().to_string(),
            closing: kind.closing().map(TokenKind::code),
        }
    }
}

/// Response for the `vocab` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyResponse {
    pub status: String,
    pub schema_version: String,
    pub count: usize,
    pub kinds: Vec<KindInfo>,
}

impl VocabularyResponse {
    pub fn new() -> Self {
        VocabularyResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            count: TokenKind::COUNT,
            kinds: TokenKind::ALL.iter().copied().map(KindInfo::from).collect(),
        }
    }
}

impl Default for VocabularyResponse {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u8,
    pub message: String,
}

impl ErrorInfo {
    pub fn from_error(err: &SimtokError) -> Self {
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
        }
    }
}

/// Response emitted when a command fails outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `"error"`.
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &SimtokError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Write `response` as pretty JSON followed by a newline.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Write tokens as text: a `# file` header whenever the file changes, then
/// one `line:column<TAB>NAME (length)` line per token.
pub fn render_text<'a, I>(tokens: I, writer: &mut impl Write) -> io::Result<()>
where
    I: IntoIterator<Item = &'a Token>,
{
    let mut current: Option<&str> = None;
    for token in tokens {
        if current != Some(token.file.as_str()) {
            writeln!(writer, "# {}", token.file)?;
            current = Some(token.file.as_str());
        }
        writeln!(writer, "{}", token)?;
    }
    Ok(())
}

/// Write the vocabulary as text, one `code<TAB>NAME` line per kind.
pub fn render_vocabulary(writer: &mut impl Write) -> io::Result<()> {
    for kind in TokenKind::ALL {
        writeln!(writer, "{}\t{}", kind.code(), kind.name())?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
