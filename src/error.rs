//! Error handling for kiln.
//! Every stage of a run reports one of these variants back to the runner,
//! which alone decides whether a rollback is needed.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while materializing a template.
#[derive(Error, Debug)]
pub enum Error {
    /// A values document could not be read from disk.
    #[error("Cannot read values document '{path}': {source}.")]
    ConfigReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A values document is not a structured mapping.
    #[error("Cannot parse values document '{path}': {reason}.")]
    ConfigParseError { path: PathBuf, reason: String },

    /// The merged values do not satisfy `values.schema.json`.
    #[error("Values do not match schema '{path}':\n{}", .violations.join("\n"))]
    ConfigValidationError {
        path: PathBuf,
        violations: Vec<String>,
    },

    /// A name or file content is not a valid template.
    #[error("Template error in '{path}': {source}.")]
    TemplateSyntaxError {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },

    /// A file of the template tree could not be read.
    #[error("Failed to read '{path}': {source}.")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template source '{path}' does not exist or is not a directory.")]
    NotADirectoryError { path: PathBuf },

    #[error("Destination '{path}' is not empty.")]
    DestinationNotEmptyError { path: PathBuf },

    /// Cloning a remote template failed or timed out.
    #[error("Failed to fetch '{url}': {reason}.")]
    SourceFetchError {
        url: String,
        reason: String,
        #[source]
        source: Option<git2::Error>,
    },

    #[error("Template entry '{path}' rendered to an empty name.")]
    EmptyNameError { path: PathBuf },

    /// A rendered path points outside of the destination root.
    #[error("Rendered path '{path}' escapes destination '{root}'.")]
    PathEscapeError { path: PathBuf, root: PathBuf },

    #[error("Failed to write '{path}': {source}.")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Hook '{hook}' failed: {reason}.")]
    HookExecutionError { hook: String, reason: String },

    /// Cleaning up after a failed run failed as well. Carries the error that
    /// triggered the rollback.
    #[error("Rollback failed ({reason}) after: {original}")]
    RollbackError {
        #[source]
        original: Box<Error>,
        reason: String,
    },

    #[error("Ignore file error: {0}.")]
    IgnoreError(String),

    #[error("IO error: {0}.")]
    IoError(#[from] std::io::Error),
}

/// Convenience type alias for results carrying a kiln [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Prints the error together with its chain of causes and exits with status 1.
pub fn default_error_handler(err: Error) {
    eprintln!("Error: {err}");
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
    std::process::exit(1);
}
