//! Error types for the command-line surface.
//!
//! Subsystem errors ([`BatchError`], [`ConfigError`], [`AdapterError`]) are
//! bridged into [`SimtokError`], which maps onto a stable [`OutputErrorCode`]
//! used both as the process exit code and in JSON error responses.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::driver::BatchError;
use crate::external::AdapterError;

// ============================================================================
// Error Codes
// ============================================================================

/// Stable error codes for output and exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Bad command-line input.
    InvalidArguments = 2,
    /// The batch could not run: unusable root, bad config, missing adapter.
    EnvironmentError = 3,
    /// The batch ran but some files contributed only `FILE_END`.
    PartialFailure = 4,
    /// Bugs or unexpected state.
    InternalError = 10,
}

impl OutputErrorCode {
    /// Numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Top-level error rendered by the CLI.
#[derive(Debug, Error)]
pub enum SimtokError {
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Some files failed; their tokens were replaced by `FILE_END` alone.
    #[error("{failed} of {total} files failed to tokenize")]
    PartialFailure { failed: usize, total: usize },

    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl SimtokError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        SimtokError::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SimtokError::InternalError {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

impl From<&SimtokError> for OutputErrorCode {
    fn from(err: &SimtokError) -> Self {
        match err {
            SimtokError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            SimtokError::Config(_) => OutputErrorCode::EnvironmentError,
            SimtokError::Batch(_) => OutputErrorCode::EnvironmentError,
            SimtokError::Adapter(_) => OutputErrorCode::EnvironmentError,
            SimtokError::PartialFailure { .. } => OutputErrorCode::PartialFailure,
            SimtokError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<SimtokError> for OutputErrorCode {
    fn from(err: SimtokError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridge: io::Error -> SimtokError
// ============================================================================

impl From<io::Error> for SimtokError {
    fn from(err: io::Error) -> Self {
        SimtokError::internal(format!("IO error: {}", err))
    }
}

// ============================================================================
// Tests
// ============================================================================
