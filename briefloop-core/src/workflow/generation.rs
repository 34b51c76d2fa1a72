//! Generation service trait and request types

use crate::models::outputs::{StageOutput, StageOutputKind};
use crate::models::workflow::{StageName, WorkflowInput};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Everything a generation service needs to produce one stage's output
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub workflow_id: Uuid,
    /// Stage to generate
    pub stage: StageName,
    pub input: WorkflowInput,
    /// Outputs of the stages this one depends on, in pipeline order. A
    /// full-brief request with none asks for a one-shot brief from `input`.
    pub prerequisites: Vec<StageOutput>,
    /// The stage's own last output, seeding a revision
    pub previous_output: Option<StageOutput>,
    /// Reviewer feedback to address
    pub feedback: Option<String>,
}

impl GenerationRequest {
    /// Typed prerequisite output, if it was supplied
    pub fn prerequisite<T: StageOutputKind>(&self) -> Option<&T> {
        self.prerequisites.iter().find_map(T::from_output)
    }

    /// True when both a previous output and feedback are present
    pub fn is_revision(&self) -> bool {
        self.previous_output.is_some() && self.feedback.is_some()
    }
}

/// External service producing structured stage output
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate the output for `request.stage`
    ///
    /// # Returns
    /// The stage output, or an error describing why generation failed
    async fn generate(&self, request: &GenerationRequest) -> Result<StageOutput>;
}
