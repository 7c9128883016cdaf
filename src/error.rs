use std::path::PathBuf;
use thiserror::Error;

pub type DatSheetResult<T> = Result<T, DatSheetError>;

/// Run-level failures. Anything scoped to a single file, object or cell is a
/// [`crate::diagnostics::Warning`] instead.
#[derive(Error, Debug)]
pub enum DatSheetError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ZIP: {message}: {}", path.display())]
    Archive { path: PathBuf, message: String },

    #[error("ZIP: required entry '{0}' not found in workbook")]
    MissingEntry(String),

    #[error("XML: {entry}: {message}")]
    Xml { entry: String, message: String },

    #[error("REL: '{source_part}' has no relationship of type {kind}")]
    MissingRelationship { source_part: String, kind: String },

    #[error("URD: cannot read directory {}: {message}", path.display())]
    RootDirectory { path: PathBuf, message: String },
}

impl DatSheetError {
    pub(crate) fn xml(entry: &str, err: impl std::fmt::Display) -> Self {
        DatSheetError::Xml {
            entry: entry.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn archive(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        DatSheetError::Archive {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Failure to turn raw source bytes into canonical UTF-8 text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("content is not valid {encoding}")]
    Malformed { encoding: &'static str },

    #[error("content looks binary (NUL byte at offset {offset})")]
    Binary { offset: usize },
}
