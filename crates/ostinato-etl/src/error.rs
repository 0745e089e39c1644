use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the import pipeline.
///
/// `MalformedRow` is row-scoped: the importer recovers from it locally
/// (skip and count) and it never aborts a stage. The file- and
/// directory-level variants abort their stage and are surfaced to the
/// caller.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("data directory not found: {}", .0.display())]
    MissingDataDir(PathBuf),

    #[error("source file not found: {}", .0.display())]
    MissingSourceFile(PathBuf),

    #[error("{file}:{line}: malformed row: {reason}")]
    MalformedRow {
        file: String,
        line: usize,
        reason: String,
    },

    #[error(transparent)]
    Core(#[from] ostinato_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ImportResult<T> = std::result::Result<T, ImportError>;
