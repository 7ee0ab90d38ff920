//! Loads serialized Java syntax trees.

use std::fs;
use std::path::Path;

use simtok_core::provider::{AstProvider, ProviderError};
use tracing::trace;

use crate::ast::Node;

/// [`AstProvider`] reading a JSON-serialized [`Node`] tree per file.
///
/// A missing file is [`ProviderError::NotFound`]; malformed JSON or a tree
/// that does not match the node schema is [`ProviderError::Syntax`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTreeProvider;

impl JsonTreeProvider {
    pub fn new() -> Self {
        JsonTreeProvider
    }

    /// Parse a tree from JSON text. `path` is used for error reporting.
    pub fn parse_str(&self, path: &Path, text: &str) -> Result<Node, ProviderError> {
        serde_json::from_str(text).map_err(|e| ProviderError::Syntax {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl AstProvider for JsonTreeProvider {
    type Node = Node;

    fn parse(&self, path: &Path) -> Result<Node, ProviderError> {
        let text = fs::read_to_string(path).map_err(|e| ProviderError::from_io(path, e))?;
        trace!(path = %path.display(), bytes = text.len(), "loaded syntax tree");
        self.parse_str(path, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = JsonTreeProvider
            .parse(&dir.path().join("Missing.json"))
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[test]
    fn malformed_json_is_syntax_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Broken.json");
        fs::write(&path, "{\"kind\": ").unwrap();
        let err = JsonTreeProvider.parse(&path).unwrap_err();
        assert!(matches!(err, ProviderError::Syntax { .. }));
    }

    #[test]
    fn unknown_node_kind_is_syntax_error() {
        let err = JsonTreeProvider
            .parse_str(Path::new("X.json"), r#"{"kind": {"statement": "goto"}}"#)
            .unwrap_err();
        match err {
            ProviderError::Syntax { path, message } => {
                assert_eq!(path, Path::new("X.json"));
                assert!(message.contains("goto"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn valid_tree_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Empty.json");
        fs::write(&path, r#"{"kind": {"statement": "empty"}}"#).unwrap();
        let node = JsonTreeProvider.parse(&path).unwrap();
        assert_eq!(node, Node::new(crate::ast::Statement::Empty));
    }
}
