use artfill_model::ProposalId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Media server error: {0}")]
    MediaServer(#[from] crate::media_server::MediaServerError),

    #[error("Upload failed for {key}: {reason}")]
    Upload { key: String, reason: String },

    #[error("No usable provider configured")]
    NoUsableProvider,

    #[error("Unknown proposal: {0}")]
    UnknownProposal(ProposalId),

    #[error("A run is already in progress")]
    RunInProgress,
}

pub type Result<T> = std::result::Result<T, EngineError>;
