//! Central error types for dfslice.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic
//! `Display` and `From` implementations.
//!
//! Note the taxonomy: only conditions that abort a whole query live here.
//! Partial-resolution failures (an import that points nowhere, a callee
//! whose source cannot be read) are not errors anywhere in the API; the
//! engine degrades to a smaller slice instead.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum SliceError {
    /// IO operation failed (without path context - prefer IoWithPath when path is available)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO operation failed with path context for better error messages
    #[error("IO error at {path}: {error}")]
    IoWithPath {
        error: std::io::Error,
        path: PathBuf,
    },

    /// Criterion target file does not exist. Distinct from `Parse`: this is
    /// a usage error, a malformed file is not.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Failed to parse a source file that the query directly targets
    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    /// Tree-sitter grammar/loading error
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),

    /// Malformed slicing criterion (expected `<file>:<line>:<variable>`)
    #[error("Invalid criterion: {0}")]
    InvalidCriterion(String),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenience type alias for Results using SliceError.
pub type Result<T> = std::result::Result<T, SliceError>;

impl SliceError {
    /// Create an IO error with path context.
    ///
    /// Use this when reading files to produce actionable error messages
    /// that include the file path that failed.
    #[inline]
    pub fn io_with_path(error: std::io::Error, path: impl AsRef<Path>) -> Self {
        SliceError::IoWithPath {
            error,
            path: path.as_ref().to_path_buf(),
        }
    }
}
