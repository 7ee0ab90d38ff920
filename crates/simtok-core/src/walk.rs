//! Structural tokenization walker.
//!
//! The walker visits a syntax tree depth-first and asks a language's
//! [`DispatchRules`] what to emit for each node:
//!
//! - `before_dispatch` runs first. It may emit tokens and may dispatch
//!   chosen children itself, in whatever order the construct needs.
//! - If it returns [`Dispatch::UseDefault`], the walker dispatches every
//!   child in source order and then calls `after_dispatch`, which typically
//!   emits the END-class token at the node's end position.
//! - If it returns [`Dispatch::Handled`], the handler owned the whole
//!   subtree: children and `after_dispatch` are skipped.
//!
//! # Example
//!
//! ```
//! use simtok_core::position::{start_of, SourceRange};
//! use simtok_core::token::{TokenKind, TokenStream};
//! use simtok_core::walk::{Dispatch, DispatchRules, SyntaxNode, WalkError, Walker};
//!
//! struct Block {
//!     range: Option<SourceRange>,
//!     body: Vec<Block>,
//! }
//!
//! impl SyntaxNode for Block {
//!     fn range(&self) -> Option<SourceRange> {
//!         self.range
//!     }
//!     fn children(&self) -> Vec<&Self> {
//!         self.body.iter().collect()
//!     }
//! }
//!
//! struct Loops;
//!
//! impl DispatchRules for Loops {
//!     type Node = Block;
//!
//!     fn before_dispatch(
//!         &self,
//!         walker: &mut Walker<'_, Self>,
//!         node: &Block,
//!     ) -> Result<Dispatch, WalkError> {
//!         walker.emit_text(TokenKind::WhileBegin, start_of(node, None), "while");
//!         Ok(Dispatch::UseDefault)
//!     }
//!
//!     fn after_dispatch(&self, walker: &mut Walker<'_, Self>, node: &Block) {
//!         walker.emit_end(TokenKind::WhileEnd, node);
//!     }
//! }
//!
//! let tree = Block { range: Some(SourceRange::lines(1, 1, 3, 1)), body: vec![] };
//! let mut stream = TokenStream::new();
//! Walker::new(&Loops, "Main.java", &mut stream).dispatch(&tree).unwrap();
//! assert_eq!(stream.kinds(), vec![TokenKind::WhileBegin, TokenKind::WhileEnd]);
//! ```

use thiserror::Error;

use crate::position::{end_of, Position, SourceRange};
use crate::token::{Token, TokenKind, TokenStream};

/// Default limit on tree nesting before a walk is abandoned.
pub const DEFAULT_MAX_DEPTH: usize = 4096;

// ============================================================================
// Tree abstraction
// ============================================================================

/// Read-only view of a syntax tree node.
pub trait SyntaxNode {
    /// Source range of the node, if the provider recorded one.
    fn range(&self) -> Option<SourceRange>;

    /// Child nodes in source order.
    fn children(&self) -> Vec<&Self>;
}

// ============================================================================
// Dispatch rules
// ============================================================================

/// Outcome of [`DispatchRules::before_dispatch`].
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dispatch {
    /// The handler visited the subtree and emitted any closing tokens itself.
    Handled,
    /// Walk the children in source order, then call `after_dispatch`.
    UseDefault,
}

/// Per-language token emission rules.
pub trait DispatchRules {
    /// Node type of the language's syntax tree.
    type Node: SyntaxNode;

    /// Emit tokens before the node's children and decide who walks them.
    fn before_dispatch(
        &self,
        walker: &mut Walker<'_, Self>,
        node: &Self::Node,
    ) -> Result<Dispatch, WalkError>;

    /// Emit tokens after the children of a default-walked node.
    fn after_dispatch(&self, walker: &mut Walker<'_, Self>, node: &Self::Node);
}

/// Errors that abort a walk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkError {
    /// The tree nests deeper than the configured limit.
    #[error("syntax tree nesting exceeds {limit} levels")]
    DepthExceeded { limit: usize },
}

// ============================================================================
// Walker
// ============================================================================

/// Tree walker bound to one file's contribution to a token stream.
pub struct Walker<'a, R: DispatchRules + ?Sized> {
    rules: &'a R,
    file: &'a str,
    out: &'a mut TokenStream,
    depth: usize,
    max_depth: usize,
}

impl<'a, R: DispatchRules + ?Sized> Walker<'a, R> {
    /// Create a walker appending tokens for `file` to `out`.
    pub fn new(rules: &'a R, file: &'a str, out: &'a mut TokenStream) -> Self {
        Walker {
            rules,
            file,
            out,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Visit `node` and its subtree.
    pub fn dispatch(&mut self, node: &R::Node) -> Result<(), WalkError> {
        if self.depth >= self.max_depth {
            return Err(WalkError::DepthExceeded {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        let result = self.dispatch_inner(node);
        self.depth -= 1;
        result
    }

    fn dispatch_inner(&mut self, node: &R::Node) -> Result<(), WalkError> {
        let rules = self.rules;
        match rules.before_dispatch(self, node)? {
            Dispatch::Handled => {}
            Dispatch::UseDefault => {
                for child in node.children() {
                    self.dispatch(child)?;
                }
                rules.after_dispatch(self, node);
            }
        }
        Ok(())
    }

    /// Visit each node in order.
    pub fn dispatch_all<'n, I>(&mut self, nodes: I) -> Result<(), WalkError>
    where
        I: IntoIterator<Item = &'n R::Node>,
        R::Node: 'n,
    {
        for node in nodes {
            self.dispatch(node)?;
        }
        Ok(())
    }

    /// Append a token at `position`.
    pub fn emit(&mut self, kind: TokenKind, position: Position, length: usize) {
        let length = u32::try_from(length).unwrap_or(u32::MAX);
        self.out.push(Token::new(kind, self.file, position, length));
    }

    /// Append a token whose length is that of `text`.
    pub fn emit_text(&mut self, kind: TokenKind, position: Position, text: &str) {
        self.emit(kind, position, text.chars().count());
    }

    /// Append a length-1 token at the end of `node` (sentinel if unknown).
    pub fn emit_end(&mut self, kind: TokenKind, node: &R::Node) {
        self.emit(kind, end_of(node, None), 1);
    }
}
