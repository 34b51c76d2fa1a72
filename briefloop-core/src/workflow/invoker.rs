//! Per-stage dispatch to the generation service

use crate::models::outputs::StageOutput;
use crate::models::workflow::{StageName, WorkflowState};
use crate::workflow::generation::{GenerationRequest, GenerationService};
use crate::workflow::registry;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Result of one generation attempt. Never an error: every failure mode is
/// folded into [`GenerationOutcome::Failure`].
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Success(StageOutput),
    Failure(String),
}

/// Resolves prerequisite outputs and calls the generation service
pub struct GenerationInvoker {
    service: Arc<dyn GenerationService>,
}

impl GenerationInvoker {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }

    /// Assemble the request for `stage`, failing when a prerequisite stage
    /// has not produced output yet
    pub fn build_request(
        workflow: &WorkflowState,
        stage: StageName,
        feedback: Option<String>,
    ) -> Result<GenerationRequest, String> {
        let missing: Vec<&str> = registry::prerequisites(stage)
            .iter()
            .filter(|prerequisite| workflow.stage(**prerequisite).output.is_none())
            .map(|prerequisite| prerequisite.as_str())
            .collect();

        if !missing.is_empty() {
            return Err(format!(
                "Cannot run {}: no output yet from {}",
                stage,
                missing.join(", ")
            ));
        }

        let prerequisites = registry::prerequisites(stage)
            .iter()
            .filter_map(|prerequisite| workflow.stage(*prerequisite).output.clone())
            .collect();

        Ok(GenerationRequest {
            workflow_id: workflow.id,
            stage,
            input: workflow.input.clone(),
            prerequisites,
            previous_output: workflow.stage(stage).output.clone(),
            feedback,
        })
    }

    /// Run generation for `stage` against the current workflow state
    pub async fn invoke(
        &self,
        workflow: &WorkflowState,
        stage: StageName,
        feedback: Option<String>,
    ) -> GenerationOutcome {
        match Self::build_request(workflow, stage, feedback) {
            Ok(request) => self.generate(&request).await,
            Err(reason) => GenerationOutcome::Failure(reason),
        }
    }

    /// Call the service for a prepared request; any error or panic becomes
    /// [`GenerationOutcome::Failure`]
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        let stage = request.stage;
        let result = AssertUnwindSafe(self.service.generate(request))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(output)) if output.stage() == stage => GenerationOutcome::Success(output),
            Ok(Ok(output)) => GenerationOutcome::Failure(format!(
                "Generation service returned {} output for stage {}",
                output.stage(),
                stage
            )),
            Ok(Err(e)) => GenerationOutcome::Failure(format!("{:#}", e)),
            Err(_) => GenerationOutcome::Failure(format!(
                "Generation service panicked while running {}",
                stage
            )),
        }
    }
}
