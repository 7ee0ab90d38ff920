//! Core infrastructure for simtok.
//!
//! This crate provides the language-agnostic parts of structural
//! tokenization:
//! - The token vocabulary, tokens and token streams
//! - Source positions and fallback resolution
//! - The dispatch-rule tree walker
//! - The front-end seam (AST providers, tree front ends)
//! - The external adapter for languages without an in-process parser
//! - Per-file and batch drivers
//! - Layered configuration, error codes and JSON output types

pub mod config;
pub mod driver;
pub mod error;
pub mod external;
pub mod output;
pub mod position;
pub mod provider;
pub mod token;
pub mod walk;
