use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("deployment record field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("field `{0}` is reserved by the deployment record")]
    ReservedField(String),

    #[error("invalid record name `{0}`")]
    InvalidName(String),

    #[error("deployment record json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to move deployment record into place at {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RecordError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RecordError::Io {
            path: path.into(),
            source,
        }
    }
}
