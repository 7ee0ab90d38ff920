//! Token vocabulary, tokens and token streams.
//!
//! The vocabulary is shared by every front end. Numeric codes are stable and
//! contiguous from `0` (`FILE_END`) upward; downstream comparison engines and
//! external adapters exchange tokens by code, so codes must never be reused
//! or reordered.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::position::Position;

// ============================================================================
// Vocabulary
// ============================================================================

macro_rules! vocabulary {
    ($( $(#[$meta:meta])* $variant:ident = $code:literal => $name:literal, )+) => {
        /// Semantic token kind.
        ///
        /// Serializes as its numeric code; deserialization rejects codes
        /// outside the vocabulary.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "u16", into = "u16")]
        #[repr(u16)]
        pub enum TokenKind {
            $( $(#[$meta])* $variant = $code, )+
        }

        impl TokenKind {
            /// Every kind, in code order.
            pub const ALL: &'static [TokenKind] = &[ $( TokenKind::$variant, )+ ];

            /// Number of kinds in the vocabulary.
            pub const COUNT: usize = Self::ALL.len();

            /// Display name used in listings and reports.
            pub fn name(self) -> &'static str {
                match self {
                    $( TokenKind::$variant => $name, )+
                }
            }

            /// Look up a kind by its numeric code.
            pub fn from_code(code: u16) -> Option<TokenKind> {
                match code {
                    $( $code => Some(TokenKind::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

vocabulary! {
    /// Boundary marker, exactly one per processed file.
    FileEnd = 0 => "EOF",
    Package = 1 => "PACKAGE",
    Import = 2 => "IMPORT",
    ClassBegin = 3 => "CLASS{",
    ClassEnd = 4 => "}CLASS",
    InterfaceBegin = 5 => "INTERF{",
    InterfaceEnd = 6 => "}INTERF",
    EnumBegin = 7 => "ENUM{",
    EnumEnd = 8 => "}ENUM",
    EnumConstant = 9 => "ENUM_CONST",
    AnnoTypeBegin = 10 => "ANNO_T{",
    AnnoTypeEnd = 11 => "}ANNO_T",
    MethodBegin = 12 => "METHOD{",
    MethodEnd = 13 => "}METHOD",
    ConstrBegin = 14 => "CONSTR{",
    ConstrEnd = 15 => "}CONSTR",
    VarDef = 16 => "VARDEF",
    SyncBegin = 17 => "SYNC{",
    SyncEnd = 18 => "}SYNC",
    DoBegin = 19 => "DO{",
    DoEnd = 20 => "}DO",
    WhileBegin = 21 => "WHILE{",
    WhileEnd = 22 => "}WHILE",
    ForBegin = 23 => "FOR{",
    ForEnd = 24 => "}FOR",
    SwitchBegin = 25 => "SWITCH{",
    SwitchEnd = 26 => "}SWITCH",
    Case = 27 => "CASE",
    /// Opens a `try`; there is no matching END kind.
    TryBegin = 28 => "TRY{",
    /// Opens a `try` with resources; there is no matching END kind.
    TryWithResource = 29 => "TRY_RES{",
    CatchBegin = 30 => "CATCH{",
    CatchEnd = 31 => "}CATCH",
    Finally = 32 => "FINALLY",
    IfBegin = 33 => "IF{",
    Else = 34 => "ELSE",
    IfEnd = 35 => "}IF",
    Cond = 36 => "COND",
    Break = 37 => "BREAK",
    Continue = 38 => "CONTINUE",
    Return = 39 => "RETURN",
    Throw = 40 => "THROW",
    Yield = 41 => "YIELD",
    Assert = 42 => "ASSERT",
    Apply = 43 => "APPLY",
    NewClass = 44 => "NEWCLASS",
    NewArray = 45 => "NEWARRAY",
    InitBegin = 46 => "INIT{",
    InitEnd = 47 => "}INIT",
    ArrayInitBegin = 48 => "ARRAY_INIT{",
    ArrayInitEnd = 49 => "}ARRAY_INIT",
    Assign = 50 => "ASSIGN",
    Anno = 51 => "ANNO",
    Lambda = 52 => "LAMBDA",
    ModuleBegin = 53 => "MODULE{",
    ModuleEnd = 54 => "}MODULE",
    Exports = 55 => "EXPORTS",
    Requires = 56 => "REQUIRES",
    Provides = 57 => "PROVIDES",
}

impl TokenKind {
    /// Numeric code of this kind.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// END counterpart of a BEGIN-class kind.
    ///
    /// `None` for leaf kinds, END kinds, and the openers that never get a
    /// closing token (`TRY{`, `TRY_RES{`, `NEWCLASS`, `NEWARRAY`).
    pub fn closing(self) -> Option<TokenKind> {
        use TokenKind::*;
        let end = match self {
            ClassBegin => ClassEnd,
            InterfaceBegin => InterfaceEnd,
            EnumBegin => EnumEnd,
            AnnoTypeBegin => AnnoTypeEnd,
            MethodBegin => MethodEnd,
            ConstrBegin => ConstrEnd,
            SyncBegin => SyncEnd,
            DoBegin => DoEnd,
            WhileBegin => WhileEnd,
            ForBegin => ForEnd,
            SwitchBegin => SwitchEnd,
            CatchBegin => CatchEnd,
            IfBegin => IfEnd,
            InitBegin => InitEnd,
            ArrayInitBegin => ArrayInitEnd,
            ModuleBegin => ModuleEnd,
            _ => return None,
        };
        Some(end)
    }

    /// True for kinds that close a BEGIN-class kind.
    pub fn is_closing(self) -> bool {
        Self::ALL.iter().any(|k| k.closing() == Some(self))
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<TokenKind> for u16 {
    fn from(kind: TokenKind) -> u16 {
        kind.code()
    }
}

/// A numeric code outside the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown token: {0}")]
pub struct UnknownCode(pub u16);

impl TryFrom<u16> for TokenKind {
    type Error = UnknownCode;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        TokenKind::from_code(code).ok_or(UnknownCode(code))
    }
}

/// Display name for a numeric code.
///
/// Codes outside the vocabulary (including negative ones) produce
/// `"unknown token: <code>"`; this function never panics.
pub fn code_to_string(code: i64) -> String {
    match u16::try_from(code).ok().and_then(TokenKind::from_code) {
        Some(kind) => kind.name().to_string(),
        None => format!("unknown token: {}", code),
    }
}

// ============================================================================
// Token
// ============================================================================

/// One semantic token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Vocabulary member.
    pub kind: TokenKind,
    /// Path of the source file, relative to the batch root.
    pub file: String,
    /// Line (1-based) or -1.
    pub line: i32,
    /// Column (1-based) or -1.
    pub column: i32,
    /// Length of the source construct the token stands for (at least 1).
    pub length: u32,
}

impl Token {
    /// Create a token. A zero length is raised to 1.
    pub fn new(kind: TokenKind, file: impl Into<String>, position: Position, length: u32) -> Self {
        Token {
            kind,
            file: file.into(),
            line: position.line,
            column: position.column,
            length: length.max(1),
        }
    }

    /// The boundary token closing `file`'s contribution.
    pub fn file_end(file: impl Into<String>) -> Self {
        Token::new(TokenKind::FileEnd, file, Position::SENTINEL, 1)
    }

    /// Start position of the token.
    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}\t{} ({})",
            self.line, self.column, self.kind, self.length
        )
    }
}

// ============================================================================
// TokenStream
// ============================================================================

/// Ordered, append-only sequence of tokens for one parse invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty stream.
    pub fn new() -> Self {
        TokenStream::default()
    }

    /// Append one token.
    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Append tokens in order.
    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) {
        self.tokens.extend(tokens);
    }

    /// Drop every token after the first `len`.
    ///
    /// Used by the file driver to discard a failed file's partial output;
    /// tokens of earlier files are never touched.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.tokens.truncate(len);
    }

    /// The tokens as a slice.
    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    /// Consume the stream.
    pub fn into_vec(self) -> Vec<Token> {
        self.tokens
    }

    /// Tokens attributed to `file`, in stream order.
    pub fn for_file<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Token> + 'a {
        self.tokens.iter().filter(move |t| t.file == file)
    }

    /// Token kinds in stream order.
    pub fn kinds(&self) -> Vec<TokenKind> {
        self.tokens.iter().map(|t| t.kind).collect()
    }
}

impl Deref for TokenStream {
    type Target = [Token];

    fn deref(&self) -> &[Token] {
        &self.tokens
    }
}

impl From<Vec<Token>> for TokenStream {
    fn from(tokens: Vec<Token>) -> Self {
        TokenStream { tokens }
    }
}

impl IntoIterator for TokenStream {
    type Item = Token;
    type IntoIter = std::vec::IntoIter<Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.into_iter()
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

// ============================================================================
// Pairing check
// ============================================================================

/// A BEGIN/END pairing violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairingError {
    /// An END token closes something other than the innermost open BEGIN.
    #[error("token {index}: {found} does not close {expected:?}")]
    Mismatched {
        index: usize,
        found: TokenKind,
        expected: Option<TokenKind>,
    },

    /// A file ended while BEGIN tokens were still open.
    #[error("token {index}: {file} ended with {open} unclosed token(s), innermost {innermost}")]
    Unclosed {
        index: usize,
        file: String,
        open: usize,
        innermost: TokenKind,
    },
}

/// Verify BEGIN/END nesting in a token sequence.
///
/// Every BEGIN-class token with an END counterpart must be closed by exactly
/// one matching END at the same depth before the `FILE_END` of its file.
/// Leaf tokens and unpaired openers are ignored.
pub fn check_pairing(tokens: &[Token]) -> Result<(), PairingError> {
    let mut open: Vec<TokenKind> = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::FileEnd {
            if let Some(&innermost) = open.last() {
                return Err(PairingError::Unclosed {
                    index,
                    file: token.file.clone(),
                    open: open.len(),
                    innermost,
                });
            }
            continue;
        }

        if let Some(end) = token.kind.closing() {
            open.push(end);
        } else if token.kind.is_closing() {
            let expected = open.pop();
            if expected != Some(token.kind) {
                return Err(PairingError::Mismatched {
                    index,
                    found: token.kind,
                    expected,
                });
            }
        }
    }

    match open.last() {
        Some(&innermost) => Err(PairingError::Unclosed {
            index: tokens.len(),
            file: tokens.last().map(|t| t.file.clone()).unwrap_or_default(),
            open: open.len(),
            innermost,
        }),
        None => Ok(()),
    }
}

// ============================================================================
// Tests
// ============================================================================
