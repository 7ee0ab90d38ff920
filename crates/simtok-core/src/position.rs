//! Source positions and the position resolver.
//!
//! Tokens carry a 1-based (line, column) pair. Syntax trees do not always
//! know where a node came from (synthesized nodes, partial provider output),
//! so every lookup goes through a fallback chain:
//!
//! 1. the node's own range endpoint,
//! 2. the position supplied by the caller (usually the enclosing node's start),
//! 3. [`Position::SENTINEL`].
//!
//! Resolution is total: nothing in this module can fail.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::walk::SyntaxNode;

// ============================================================================
// Position
// ============================================================================

/// A (line, column) pair in a source file.
///
/// Both components are 1-based. `(-1, -1)` is the sentinel used when no real
/// location is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-based).
    pub line: i32,
    /// Column number (1-based).
    pub column: i32,
}

impl Position {
    /// Position used when no location can be resolved.
    pub const SENTINEL: Position = Position {
        line: -1,
        column: -1,
    };

    /// Create a new position.
    pub const fn new(line: i32, column: i32) -> Self {
        Position { line, column }
    }

    /// True for the `(-1, -1)` sentinel.
    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }

    /// True when both components are 1-based, i.e. a real source location.
    pub fn is_resolved(&self) -> bool {
        self.line >= 1 && self.column >= 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// ============================================================================
// SourceRange
// ============================================================================

/// Inclusive begin/end positions of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    /// First character of the node.
    pub begin: Position,
    /// Last character of the node.
    pub end: Position,
}

impl SourceRange {
    /// Create a range from its endpoints.
    pub const fn new(begin: Position, end: Position) -> Self {
        SourceRange { begin, end }
    }

    /// Shorthand for `SourceRange::new(Position::new(..), Position::new(..))`.
    pub const fn lines(begin_line: i32, begin_column: i32, end_line: i32, end_column: i32) -> Self {
        SourceRange {
            begin: Position::new(begin_line, begin_column),
            end: Position::new(end_line, end_column),
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Start of `range`, else `fallback`, else the sentinel.
pub fn resolve_start(range: Option<SourceRange>, fallback: Option<Position>) -> Position {
    range
        .map(|r| r.begin)
        .or(fallback)
        .unwrap_or(Position::SENTINEL)
}

/// End of `range`, else `fallback`, else the sentinel.
pub fn resolve_end(range: Option<SourceRange>, fallback: Option<Position>) -> Position {
    range
        .map(|r| r.end)
        .or(fallback)
        .unwrap_or(Position::SENTINEL)
}

/// Start position of `node`, falling back to `fallback`, then the sentinel.
pub fn start_of<N: SyntaxNode + ?Sized>(node: &N, fallback: Option<Position>) -> Position {
    resolve_start(node.range(), fallback)
}

/// End position of `node`, falling back to `fallback`, then the sentinel.
pub fn end_of<N: SyntaxNode + ?Sized>(node: &N, fallback: Option<Position>) -> Position {
    resolve_end(node.range(), fallback)
}
