//! Error types surfaced by the workflow engine

use thiserror::Error;
use uuid::Uuid;

/// Hard failures returned by engine operations.
///
/// Expected run failures (generation errors, missing prerequisites) are not
/// represented here; they come back as an unsuccessful
/// [`StageResult`](crate::workflow::StageResult) with the workflow marked failed.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Workflow {0} not found")]
    NotFound(Uuid),

    #[error("Brief {0} not found")]
    BriefNotFound(Uuid),

    #[error("{0}")]
    Validation(String),

    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Unknown control level: {0}")]
    UnknownControlLevel(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }

    /// True for errors caused by the caller rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            WorkflowError::Validation(_)
                | WorkflowError::UnknownStage(_)
                | WorkflowError::UnknownControlLevel(_)
        )
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
