use std::path::PathBuf;

use thiserror::Error;

/// Failures around the compiler: loading inputs and writing outputs.
/// Schema problems are never reported here, see [`crate::ValidationError`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to parse JSON in {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("JSON pointer {pointer} selects nothing in {path}")]
    Pointer { path: PathBuf, pointer: String },

    #[error("invalid jq expression: {0}")]
    JqCompile(String),

    #[error("jq expression failed on {path}: {message}")]
    Jq { path: PathBuf, message: String },

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("unreadable glob match: {0}")]
    GlobEntry(#[from] glob::GlobError),

    #[error("glob pattern matched no files: {0}")]
    NoMatches(String),

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
