use thiserror::Error;

use crate::identity::domain::signature_store::StoreError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to decode video: {0}")]
    Decode(String),
    #[error("face detection failed on frame {frame}: {message}")]
    Detect { frame: usize, message: String },
    #[error("failed to persist signatures: {0}")]
    Persist(#[from] StoreError),
    #[error("pipeline already executed")]
    AlreadyExecuted,
}
