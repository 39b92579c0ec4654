//! Error types for props-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in props-core
///
/// Parsing and property set mutations never fail; these errors only come
/// from the file system boundary and from edits addressed to things that
/// do not exist.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No bundle with that name was found by the scanner
    #[error("no files found for bundle '{0}'")]
    BundleNotFound(String),

    /// An edit referred to a file that is not part of the session
    #[error("file '{0}' is not loaded")]
    FileNotLoaded(String),

    /// More than one loaded file has this file name
    #[error("file name '{0}' matches several loaded files; use the path")]
    AmbiguousFile(String),

    /// A key that could not be written back as a `key=value` line
    #[error("invalid key '{0}': keys must be non-empty and contain no '#', '=' or whitespace")]
    InvalidKey(String),

    /// A value that would not stay on one line
    #[error("invalid value {0:?}: values must not contain line breaks")]
    InvalidValue(String),

    /// An edit matched nothing to change
    #[error("edit not applied: {0}")]
    EditNotApplied(String),

    /// CSV output error from the csv crate
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
