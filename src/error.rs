use thiserror::Error;

pub type Result<T, E = PlayerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Target {0} not found")]
    MissingTarget(String),
    #[error("Branch {0} not found")]
    MissingBranch(String),
    #[error("Data key {0} not found")]
    MissingData(String),
    #[error("Data key {key} has an unexpected shape: {source}")]
    InvalidData {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Step {0} is missing required field {1}")]
    MissingField(usize, &'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
