use crate::DocId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("query syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    #[error("document not found or deleted: {0}")]
    NotFound(DocId),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("index format version {found} is newer than supported version {supported}")]
    Version { found: u32, supported: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub(crate) fn syntax(message: impl Into<String>, offset: usize) -> Self {
        Error::Syntax { message: message.into(), offset }
    }
}
