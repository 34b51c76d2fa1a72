//! Workflow state machine engine

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::workflow::{
    ControlLevel, SavedBrief, StageName, StageStatus, WorkflowInput, WorkflowState,
    WorkflowStatus,
};
use crate::workflow::generation::GenerationService;
use crate::workflow::invoker::{GenerationInvoker, GenerationOutcome};
use crate::workflow::ledger;
use crate::workflow::locks::WorkflowLocks;
use crate::workflow::persistence::WorkflowStore;
use crate::workflow::registry;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of a run-style engine operation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    pub success: bool,
    pub workflow: WorkflowState,
    /// The stage that just ran is waiting on a human
    pub requires_approval: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    fn succeeded(workflow: WorkflowState, requires_approval: bool) -> Self {
        Self {
            success: true,
            workflow,
            requires_approval,
            error: None,
        }
    }

    fn failed(workflow: WorkflowState, error: String) -> Self {
        Self {
            success: false,
            workflow,
            requires_approval: false,
            error: Some(error),
        }
    }
}

/// Human decision on a single stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageAction {
    Approve { continue_to_next: bool },
    Reject { feedback: String },
    Rerun { feedback: Option<String> },
}

/// Drives workflows through the stage pipeline.
///
/// Every public operation that mutates a workflow holds that workflow's lock
/// for its whole load-mutate-save cycle. Chained runs (approve then run next,
/// reject then regenerate, the pipeline loop) go through the `*_locked`
/// helpers and reuse the guard already held.
pub struct WorkflowEngine {
    store: Arc<dyn WorkflowStore>,
    invoker: GenerationInvoker,
    locks: WorkflowLocks,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn WorkflowStore>, service: Arc<dyn GenerationService>) -> Self {
        Self {
            store,
            invoker: GenerationInvoker::new(service),
            locks: WorkflowLocks::new(),
        }
    }

    async fn load(&self, id: Uuid) -> WorkflowResult<WorkflowState> {
        self.store
            .get(id)
            .await?
            .ok_or(WorkflowError::NotFound(id))
    }

    async fn persist(&self, workflow: &mut WorkflowState) -> WorkflowResult<()> {
        self.store.save(workflow).await?;
        Ok(())
    }

    /// Persist the state a run finished in. When that save fails the record
    /// would be left `running`, so the store error is recorded as the run's
    /// failure and saved once more before the error is returned.
    async fn persist_run(
        &self,
        workflow: &mut WorkflowState,
        stage: StageName,
    ) -> WorkflowResult<()> {
        let Err(err) = self.persist(workflow).await else {
            return Ok(());
        };

        let reason = format!("{:#}", err);
        workflow.stage_mut(stage).status = StageStatus::Pending;
        workflow.status = WorkflowStatus::Failed;
        workflow.error = Some(reason.clone());

        match self.persist(workflow).await {
            Ok(()) => tracing::warn!(
                workflow_id = %workflow.id,
                stage = %stage,
                error = %reason,
                "Failed to save stage result, marked workflow failed"
            ),
            Err(retry) => tracing::error!(
                workflow_id = %workflow.id,
                stage = %stage,
                error = %reason,
                retry_error = %format!("{:#}", retry),
                "Failed to save stage result"
            ),
        }
        Err(err)
    }

    // Workflow management

    /// Create and persist a new workflow in `draft`
    pub async fn create_workflow(
        &self,
        name: &str,
        input: WorkflowInput,
        control_level: ControlLevel,
    ) -> WorkflowResult<WorkflowState> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::validation("Workflow name is required"));
        }
        input.validate()?;

        let mut workflow = WorkflowState::new(name, input, control_level);
        self.persist(&mut workflow).await?;

        tracing::info!(
            workflow_id = %workflow.id,
            control_level = %control_level,
            "Created workflow '{}'",
            workflow.name
        );
        Ok(workflow)
    }

    pub async fn get_workflow(&self, id: Uuid) -> WorkflowResult<WorkflowState> {
        self.load(id).await
    }

    /// All workflows, most recently updated first
    pub async fn list_workflows(&self) -> WorkflowResult<Vec<WorkflowState>> {
        Ok(self.store.list().await?)
    }

    pub async fn delete_workflow(&self, id: Uuid) -> WorkflowResult<()> {
        let _guard = self.locks.acquire(id).await;
        if !self.store.delete(id).await? {
            return Err(WorkflowError::NotFound(id));
        }
        tracing::info!(workflow_id = %id, "Deleted workflow");
        Ok(())
    }

    /// Replace the topic idea; a blank value clears it. Stage state is untouched.
    pub async fn update_topic(
        &self,
        id: Uuid,
        topic_idea: Option<String>,
    ) -> WorkflowResult<WorkflowState> {
        let _guard = self.locks.acquire(id).await;
        let mut workflow = self.load(id).await?;

        workflow.input.topic_idea = topic_idea
            .map(|topic| topic.trim().to_string())
            .filter(|topic| !topic.is_empty());
        self.persist(&mut workflow).await?;

        tracing::debug!(workflow_id = %id, "Updated topic idea");
        Ok(workflow)
    }

    /// Return every stage to `pending` with zero attempts, keeping saved briefs
    pub async fn reset_workflow(&self, id: Uuid) -> WorkflowResult<WorkflowState> {
        let _guard = self.locks.acquire(id).await;
        let mut workflow = self.load(id).await?;

        workflow.reset();
        self.persist(&mut workflow).await?;

        tracing::info!(
            workflow_id = %id,
            saved_briefs = workflow.saved_briefs.len(),
            "Reset workflow"
        );
        Ok(workflow)
    }

    // Stage operations

    /// Run a single stage, optionally steering it with feedback
    pub async fn run_stage(
        &self,
        id: Uuid,
        stage: StageName,
        feedback: Option<String>,
    ) -> WorkflowResult<StageResult> {
        let _guard = self.locks.acquire(id).await;
        self.run_stage_locked(id, stage, feedback).await
    }

    async fn run_stage_locked(
        &self,
        id: Uuid,
        stage: StageName,
        feedback: Option<String>,
    ) -> WorkflowResult<StageResult> {
        let mut workflow = self.load(id).await?;

        let execution = workflow.stage_mut(stage);
        execution.status = StageStatus::Running;
        execution.started_at = Some(Utc::now());
        execution.attempts += 1;
        let attempt = execution.attempts;

        workflow.status = WorkflowStatus::Running;
        workflow.current_stage = Some(stage);
        workflow.error = None;
        // Persist before generating so readers see the run in progress
        self.persist(&mut workflow).await?;

        tracing::info!(
            workflow_id = %id,
            stage = %stage,
            attempt,
            revision = feedback.is_some(),
            "Running stage"
        );

        match self.invoker.invoke(&workflow, stage, feedback).await {
            GenerationOutcome::Failure(reason) => {
                // Any previous output stays in place
                workflow.stage_mut(stage).status = StageStatus::Pending;
                workflow.status = WorkflowStatus::Failed;
                workflow.error = Some(reason.clone());
                self.persist_run(&mut workflow, stage).await?;

                tracing::warn!(
                    workflow_id = %id,
                    stage = %stage,
                    attempt,
                    error = %reason,
                    "Stage failed"
                );
                Ok(StageResult::failed(workflow, reason))
            }
            GenerationOutcome::Success(output) => {
                let requires_approval =
                    registry::requires_approval(workflow.control_level, stage);

                let execution = workflow.stage_mut(stage);
                execution.output = Some(output);
                execution.completed_at = Some(Utc::now());
                execution.status = if requires_approval {
                    StageStatus::AwaitingApproval
                } else {
                    StageStatus::Approved
                };
                workflow.refresh_status();
                self.persist_run(&mut workflow, stage).await?;

                tracing::info!(
                    workflow_id = %id,
                    stage = %stage,
                    attempt,
                    requires_approval,
                    status = ?workflow.status,
                    "Stage completed"
                );
                Ok(StageResult::succeeded(workflow, requires_approval))
            }
        }
    }

    /// Accept a stage's output. Approving the final stage completes the
    /// workflow; otherwise the next stage runs when `continue_to_next` is set.
    pub async fn approve_stage(
        &self,
        id: Uuid,
        stage: StageName,
        continue_to_next: bool,
    ) -> WorkflowResult<StageResult> {
        let _guard = self.locks.acquire(id).await;
        self.approve_stage_locked(id, stage, continue_to_next).await
    }

    async fn approve_stage_locked(
        &self,
        id: Uuid,
        stage: StageName,
        continue_to_next: bool,
    ) -> WorkflowResult<StageResult> {
        let mut workflow = self.load(id).await?;

        let execution = workflow.stage_mut(stage);
        execution.status = StageStatus::Approved;
        execution.feedback = None;

        tracing::info!(workflow_id = %id, stage = %stage, "Stage approved");

        match registry::next_stage(stage) {
            None => {
                workflow.status = WorkflowStatus::Completed;
                workflow.current_stage = None;
                self.persist(&mut workflow).await?;
                tracing::info!(workflow_id = %id, "Workflow completed");
                Ok(StageResult::succeeded(workflow, false))
            }
            Some(next) if continue_to_next => {
                self.persist(&mut workflow).await?;
                self.run_stage_locked(id, next, None).await
            }
            Some(_) => {
                workflow.status = WorkflowStatus::Paused;
                self.persist(&mut workflow).await?;
                Ok(StageResult::succeeded(workflow, false))
            }
        }
    }

    /// Reject a stage and regenerate it with the reviewer's feedback
    pub async fn reject_stage(
        &self,
        id: Uuid,
        stage: StageName,
        feedback: &str,
    ) -> WorkflowResult<StageResult> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(WorkflowError::validation(
                "Feedback is required when rejecting a stage",
            ));
        }

        let _guard = self.locks.acquire(id).await;
        let mut workflow = self.load(id).await?;

        let execution = workflow.stage_mut(stage);
        execution.status = StageStatus::Rejected;
        execution.feedback = Some(feedback.to_string());
        self.persist(&mut workflow).await?;

        tracing::info!(workflow_id = %id, stage = %stage, "Stage rejected, regenerating");
        self.run_stage_locked(id, stage, Some(feedback.to_string()))
            .await
    }

    /// Run a stage again from any state; blank feedback is ignored
    pub async fn rerun_stage(
        &self,
        id: Uuid,
        stage: StageName,
        feedback: Option<String>,
    ) -> WorkflowResult<StageResult> {
        let feedback = feedback
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        self.run_stage(id, stage, feedback).await
    }

    /// Run stages in order from `start` (the first stage when `None`),
    /// stopping at the first failure or checkpoint
    pub async fn run_pipeline(
        &self,
        id: Uuid,
        start: Option<StageName>,
    ) -> WorkflowResult<StageResult> {
        let _guard = self.locks.acquire(id).await;
        let start = start.unwrap_or(registry::STAGES[0]);
        self.run_pipeline_locked(id, start).await
    }

    async fn run_pipeline_locked(
        &self,
        id: Uuid,
        start: StageName,
    ) -> WorkflowResult<StageResult> {
        tracing::debug!(workflow_id = %id, start = %start, "Running pipeline");

        for stage in registry::stages_from(start) {
            let result = self.run_stage_locked(id, *stage, None).await?;
            if !result.success || result.requires_approval {
                return Ok(result);
            }
        }

        let workflow = self.load(id).await?;
        Ok(StageResult::succeeded(workflow, false))
    }

    /// Resume from the first stage that is not yet approved
    pub async fn continue_pipeline(&self, id: Uuid) -> WorkflowResult<StageResult> {
        let _guard = self.locks.acquire(id).await;
        let mut workflow = self.load(id).await?;

        match workflow.first_incomplete_stage() {
            Some(stage) => self.run_pipeline_locked(id, stage).await,
            None => {
                workflow.status = WorkflowStatus::Completed;
                workflow.current_stage = None;
                self.persist(&mut workflow).await?;
                Ok(StageResult::succeeded(workflow, false))
            }
        }
    }

    /// Dispatch a human decision on `stage`
    pub async fn apply_stage_action(
        &self,
        id: Uuid,
        stage: StageName,
        action: StageAction,
    ) -> WorkflowResult<StageResult> {
        match action {
            StageAction::Approve { continue_to_next } => {
                self.approve_stage(id, stage, continue_to_next).await
            }
            StageAction::Reject { feedback } => self.reject_stage(id, stage, &feedback).await,
            StageAction::Rerun { feedback } => self.rerun_stage(id, stage, feedback).await,
        }
    }

    // Saved briefs

    /// Snapshot the current full brief onto the workflow's ledger
    pub async fn save_brief(
        &self,
        id: Uuid,
        name: Option<String>,
    ) -> WorkflowResult<(SavedBrief, WorkflowState)> {
        let _guard = self.locks.acquire(id).await;
        let mut workflow = self.load(id).await?;

        let saved = ledger::record_snapshot(&mut workflow, name)?;
        self.persist(&mut workflow).await?;

        tracing::info!(workflow_id = %id, brief_id = %saved.id, "Saved brief");
        Ok((saved, workflow))
    }

    /// Remove a saved brief; an unknown brief id leaves the ledger unchanged
    pub async fn delete_saved_brief(
        &self,
        id: Uuid,
        brief_id: Uuid,
    ) -> WorkflowResult<WorkflowState> {
        let _guard = self.locks.acquire(id).await;
        let mut workflow = self.load(id).await?;

        if !ledger::remove_snapshot(&mut workflow, brief_id) {
            tracing::debug!(workflow_id = %id, brief_id = %brief_id, "Saved brief not present");
        }
        self.persist(&mut workflow).await?;
        Ok(workflow)
    }
}
