//! Workflow state data models

use crate::error::WorkflowError;
use crate::models::outputs::{StageOutput, StageOutputKind, VideoBrief};
use crate::workflow::registry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One named step of the fixed pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    TopicResearch,
    ScriptOutline,
    FullBrief,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::TopicResearch => "topic-research",
            StageName::ScriptOutline => "script-outline",
            StageName::FullBrief => "full-brief",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            StageName::TopicResearch => "Topic Research",
            StageName::ScriptOutline => "Script Outline",
            StageName::FullBrief => "Full Video Brief",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        registry::STAGES
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| WorkflowError::UnknownStage(s.to_string()))
    }
}

/// Approval policy selected at workflow creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ControlLevel {
    /// No stage pauses for approval
    Autopilot,
    /// Only the configured checkpoint stages pause
    #[default]
    Checkpoints,
    /// Every stage pauses
    FullControl,
}

impl ControlLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlLevel::Autopilot => "autopilot",
            ControlLevel::Checkpoints => "checkpoints",
            ControlLevel::FullControl => "full-control",
        }
    }
}

impl fmt::Display for ControlLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlLevel {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "autopilot" => Ok(ControlLevel::Autopilot),
            "checkpoints" => Ok(ControlLevel::Checkpoints),
            "full-control" => Ok(ControlLevel::FullControl),
            other => Err(WorkflowError::UnknownControlLevel(other.to_string())),
        }
    }
}

/// Coarse pipeline status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStatus {
    /// Nothing started yet
    #[default]
    Draft,
    /// A stage is executing
    Running,
    /// Waiting on a human, or stopped after a checkpoint
    Paused,
    /// Every stage approved
    Completed,
    /// The most recent run attempt errored
    Failed,
}

/// Per-stage status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    #[default]
    Pending,
    Running,
    AwaitingApproval,
    Approved,
    Rejected,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Paused => "paused",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::AwaitingApproval => "awaiting-approval",
            StageStatus::Approved => "approved",
            StageStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters driving generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInput {
    pub niche: String,
    pub target_audience: String,
    pub business_goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor_channels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<String>>,
    /// Specific idea for this video, if the creator already has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_idea: Option<String>,
}

impl WorkflowInput {
    /// Check the fields every stage relies on
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let required = [
            ("niche", &self.niche),
            ("targetAudience", &self.target_audience),
            ("businessGoal", &self.business_goal),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| *field)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::validation(format!(
                "Input must include {}",
                missing.join(", ")
            )))
        }
    }
}

/// Record of one stage within one workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StageExecution {
    pub status: StageStatus,
    /// Result of the most recent successful run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<StageOutput>,
    /// Note attached when the stage was rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Executions for every stage; one field per stage so none can be missing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct StageExecutions {
    pub topic_research: StageExecution,
    pub script_outline: StageExecution,
    pub full_brief: StageExecution,
}

impl StageExecutions {
    pub fn get(&self, stage: StageName) -> &StageExecution {
        match stage {
            StageName::TopicResearch => &self.topic_research,
            StageName::ScriptOutline => &self.script_outline,
            StageName::FullBrief => &self.full_brief,
        }
    }

    pub fn get_mut(&mut self, stage: StageName) -> &mut StageExecution {
        match stage {
            StageName::TopicResearch => &mut self.topic_research,
            StageName::ScriptOutline => &mut self.script_outline,
            StageName::FullBrief => &mut self.full_brief,
        }
    }

    /// Executions in registry order
    pub fn iter(&self) -> impl Iterator<Item = (StageName, &StageExecution)> {
        registry::STAGES.iter().map(move |stage| (*stage, self.get(*stage)))
    }
}

/// Named snapshot of a finished brief
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SavedBrief {
    pub id: Uuid,
    pub brief: VideoBrief,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_idea: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Aggregate root persisted per workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub id: Uuid,
    pub name: String,
    pub control_level: ControlLevel,
    pub status: WorkflowStatus,
    pub current_stage: Option<StageName>,
    pub input: WorkflowInput,
    pub stages: StageExecutions,
    /// Most recent first
    #[serde(default)]
    pub saved_briefs: Vec<SavedBrief>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowState {
    /// Fresh workflow in `draft` with every stage pending
    pub fn new(name: impl Into<String>, input: WorkflowInput, control_level: ControlLevel) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            control_level,
            status: WorkflowStatus::Draft,
            current_stage: None,
            input,
            stages: StageExecutions::default(),
            saved_briefs: Vec::new(),
            created_at: now,
            updated_at: now,
            error: None,
        }
    }

    pub fn stage(&self, stage: StageName) -> &StageExecution {
        self.stages.get(stage)
    }

    pub fn stage_mut(&mut self, stage: StageName) -> &mut StageExecution {
        self.stages.get_mut(stage)
    }

    /// Typed output of the stage that produces `T`
    pub fn output<T: StageOutputKind>(&self) -> Option<&T> {
        self.stage(T::STAGE).output.as_ref().and_then(T::from_output)
    }

    /// First stage, in registry order, that is not yet approved
    pub fn first_incomplete_stage(&self) -> Option<StageName> {
        self.stages
            .iter()
            .find(|(_, execution)| execution.status != StageStatus::Approved)
            .map(|(stage, _)| stage)
    }

    /// Project the coarse status from the stage statuses.
    ///
    /// `running` and `failed` have no stable per-stage projection and are
    /// only ever assigned explicitly by the engine.
    pub fn derive_status(&self) -> WorkflowStatus {
        if self
            .stages
            .iter()
            .all(|(_, e)| e.status == StageStatus::Approved)
        {
            WorkflowStatus::Completed
        } else if self
            .stages
            .iter()
            .all(|(_, e)| e.status == StageStatus::Pending && e.attempts == 0)
        {
            WorkflowStatus::Draft
        } else {
            WorkflowStatus::Paused
        }
    }

    /// Apply [`derive_status`](Self::derive_status), clearing the current
    /// stage once the pipeline has completed
    pub fn refresh_status(&mut self) {
        self.status = self.derive_status();
        if self.status == WorkflowStatus::Completed {
            self.current_stage = None;
        }
    }

    /// Return every stage to its initial state. Saved briefs are kept.
    pub fn reset(&mut self) {
        self.stages = StageExecutions::default();
        self.status = WorkflowStatus::Draft;
        self.current_stage = None;
        self.error = None;
    }
}
