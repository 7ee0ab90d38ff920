//! Front-end seam: AST providers and language front ends.
//!
//! A [`Frontend`] turns one file into tokens. Languages with an in-process
//! parser plug in through [`TreeFrontend`], which pairs an [`AstProvider`]
//! with that language's [`DispatchRules`]. Languages without one go through
//! the external adapter in [`crate::external`], which implements
//! [`Frontend`] directly.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::external::AdapterError;
use crate::token::TokenStream;
use crate::walk::{DispatchRules, SyntaxNode, WalkError, Walker, DEFAULT_MAX_DEPTH};

// ============================================================================
// AST provider
// ============================================================================

/// Errors reported by an [`AstProvider`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The file does not exist.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// The file exists but could not be parsed.
    #[error("syntax error in {path}: {message}")]
    Syntax { path: PathBuf, message: String },

    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProviderError {
    /// Classify an IO error from reading `path`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            ProviderError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ProviderError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Produces a syntax tree for a source file.
pub trait AstProvider {
    /// Root node type of the produced tree.
    type Node: SyntaxNode;

    /// Parse the file at `path` (absolute).
    fn parse(&self, path: &Path) -> Result<Self::Node, ProviderError>;
}

// ============================================================================
// Frontend
// ============================================================================

/// Why a single file contributed no structural tokens.
#[derive(Debug, Error)]
pub enum FileError {
    /// The AST provider failed (missing file, syntax error, IO).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The walk was abandoned partway.
    #[error("walk failed: {0}")]
    Walk(#[from] WalkError),

    /// The external adapter failed or produced an unusable token table.
    #[error("external adapter failed: {0}")]
    Adapter(#[from] AdapterError),
}

/// Turns one file into tokens.
pub trait Frontend {
    /// Short name for logs and reports.
    fn name(&self) -> &str;

    /// Append the structural tokens of the file at `path` to `out`, attributed
    /// to `file` (the path relative to the batch root).
    ///
    /// On error the caller discards whatever was appended for this file.
    fn tokenize(&self, path: &Path, file: &str, out: &mut TokenStream) -> Result<(), FileError>;
}

/// Front end for languages with an in-process AST provider.
#[derive(Debug, Clone)]
pub struct TreeFrontend<P, R> {
    name: String,
    provider: P,
    rules: R,
    max_depth: usize,
}

impl<P, R> TreeFrontend<P, R>
where
    P: AstProvider,
    R: DispatchRules<Node = P::Node>,
{
    /// Pair a provider with the rules for its trees.
    pub fn new(name: impl Into<String>, provider: P, rules: R) -> Self {
        TreeFrontend {
            name: name.into(),
            provider,
            rules,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the walker nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl<P, R> Frontend for TreeFrontend<P, R>
where
    P: AstProvider,
    R: DispatchRules<Node = P::Node>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn tokenize(&self, path: &Path, file: &str, out: &mut TokenStream) -> Result<(), FileError> {
        let tree = self.provider.parse(path)?;
        Walker::new(&self.rules, file, out)
            .with_max_depth(self.max_depth)
            .dispatch(&tree)?;
        Ok(())
    }
}
