//! Static stage ordering and checkpoint policy

use crate::models::workflow::{ControlLevel, StageName};

/// Pipeline stages in execution order
pub static STAGES: [StageName; 3] = [
    StageName::TopicResearch,
    StageName::ScriptOutline,
    StageName::FullBrief,
];

/// Stages that pause for approval under [`ControlLevel::Checkpoints`]
static CHECKPOINT_STAGES: &[StageName] = &[StageName::TopicResearch, StageName::FullBrief];

/// A stage as scheduled under a given control level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePlan {
    pub stage: StageName,
    pub requires_approval: bool,
}

/// Stages that must pause for approval under `level`
pub fn checkpoint_stages(level: ControlLevel) -> &'static [StageName] {
    match level {
        ControlLevel::Autopilot => &[],
        ControlLevel::Checkpoints => CHECKPOINT_STAGES,
        ControlLevel::FullControl => &STAGES,
    }
}

pub fn requires_approval(level: ControlLevel, stage: StageName) -> bool {
    checkpoint_stages(level).contains(&stage)
}

/// Ordered stages with their approval flag under `level`
pub fn stage_plan(level: ControlLevel) -> Vec<StagePlan> {
    STAGES
        .iter()
        .map(|stage| StagePlan {
            stage: *stage,
            requires_approval: requires_approval(level, *stage),
        })
        .collect()
}

/// Zero-based position of `stage` in the pipeline
pub fn position(stage: StageName) -> usize {
    // every StageName variant is listed in STAGES
    STAGES.iter().position(|s| *s == stage).unwrap_or(STAGES.len())
}

/// Stage following `stage`, or `None` for the final stage
pub fn next_stage(stage: StageName) -> Option<StageName> {
    STAGES.get(position(stage) + 1).copied()
}

/// Stage whose output is the pipeline's final artifact
pub fn final_stage() -> StageName {
    STAGES[STAGES.len() - 1]
}

/// Stages whose outputs `stage` consumes, in pipeline order
pub fn prerequisites(stage: StageName) -> &'static [StageName] {
    match stage {
        StageName::TopicResearch => &[],
        StageName::ScriptOutline => &[StageName::TopicResearch],
        StageName::FullBrief => &[StageName::TopicResearch, StageName::ScriptOutline],
    }
}

/// Stages from `start` through the end of the pipeline
pub fn stages_from(start: StageName) -> &'static [StageName] {
    &STAGES[position(start)..]
}
