//! Java front end for simtok.
//!
//! Turns Java syntax trees into structural tokens. Trees come from an
//! external Java parser, serialized as JSON in the [`ast`] schema, and are
//! loaded by [`JsonTreeProvider`].
//!
//! ```
//! use simtok_java::ast::{Declaration, Node};
//! use simtok_core::token::TokenKind;
//!
//! let class = Node::new(Declaration::Class {
//!     name: "A".to_string(),
//!     interface: false,
//!     annotations: vec![],
//!     type_parameters: vec![],
//!     extends: vec![],
//!     implements: vec![],
//!     members: vec![],
//! })
//! .at(1, 1, 2, 1);
//!
//! let tokens = simtok_java::tokenize_tree(&class, "A.java").unwrap();
//! assert_eq!(tokens.kinds(), vec![TokenKind::ClassBegin, TokenKind::ClassEnd]);
//! ```

pub mod ast;
pub mod provider;
pub mod rules;

use simtok_core::provider::TreeFrontend;
use simtok_core::token::TokenStream;
use simtok_core::walk::{WalkError, Walker};

pub use ast::Node;
pub use provider::JsonTreeProvider;
pub use rules::JavaRules;

/// Name the Java front end reports in logs and output.
pub const FRONTEND_NAME: &str = "java";

/// The Java front end over JSON-serialized trees.
pub type JavaFrontend = TreeFrontend<JsonTreeProvider, JavaRules>;

/// Build the Java front end.
pub fn frontend() -> JavaFrontend {
    TreeFrontend::new(FRONTEND_NAME, JsonTreeProvider::new(), JavaRules)
}

/// Walk one in-memory tree. No `FILE_END` is appended.
pub fn tokenize_tree(tree: &Node, file: &str) -> Result<TokenStream, WalkError> {
    let mut out = TokenStream::new();
    Walker::new(&JavaRules, file, &mut out).dispatch(tree)?;
    Ok(out)
}
