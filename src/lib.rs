//! simtok: structural token streams for source similarity detection.
//!
//! Walks syntax trees and emits a flat stream of semantic tokens (class
//! begin, method end, loop begin, assignment, ...) per file, for a
//! downstream plagiarism or clone detector to compare.

// Core infrastructure - re-exported from simtok-core
pub use simtok_core::config;
pub use simtok_core::driver;
pub use simtok_core::error;
pub use simtok_core::external;
pub use simtok_core::output;
pub use simtok_core::position;
pub use simtok_core::provider;
pub use simtok_core::token;
pub use simtok_core::walk;

// Language front ends
pub use simtok_java as java;

// Command runners behind the binary
pub mod cli;
