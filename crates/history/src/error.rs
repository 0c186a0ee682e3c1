use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("History serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("History item not found: {0}")]
    NotFound(String),

    #[error("Import rejected: {0}")]
    InvalidImport(String),
}
