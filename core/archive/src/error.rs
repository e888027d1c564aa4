use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Buffer allocation failed: {0}")]
    Buffer(#[from] TryReserveError),
    #[error("Item {index} failed: {source}")]
    Item {
        index: u32,
        #[source]
        source: wem::WemError,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
