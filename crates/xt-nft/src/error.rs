use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to run nft: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("nft command failed: {0}")]
    Command(String),

    #[error("invalid nft JSON output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("table '{0}' not found")]
    NoSuchTable(String),
}
