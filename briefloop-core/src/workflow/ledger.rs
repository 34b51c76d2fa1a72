//! Saved brief snapshots

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::outputs::VideoBrief;
use crate::models::workflow::{SavedBrief, WorkflowState};
use crate::workflow::registry;
use chrono::Utc;
use uuid::Uuid;

/// Snapshot the current full brief onto the front of the workflow's ledger.
///
/// The name defaults to the brief's theme title when absent or blank.
pub fn record_snapshot(
    workflow: &mut WorkflowState,
    name: Option<String>,
) -> WorkflowResult<SavedBrief> {
    let brief = workflow.output::<VideoBrief>().cloned().ok_or_else(|| {
        WorkflowError::validation(format!(
            "No brief to save - run the {} stage first",
            registry::final_stage()
        ))
    })?;

    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| brief.theme.title.clone());

    let saved = SavedBrief {
        id: Uuid::new_v4(),
        brief,
        topic_idea: workflow.input.topic_idea.clone(),
        created_at: Utc::now(),
        name: Some(name),
    };

    workflow.saved_briefs.insert(0, saved.clone());
    Ok(saved)
}

/// Remove the snapshot with `brief_id`; returns whether one was removed
pub fn remove_snapshot(workflow: &mut WorkflowState, brief_id: Uuid) -> bool {
    let before = workflow.saved_briefs.len();
    workflow.saved_briefs.retain(|saved| saved.id != brief_id);
    workflow.saved_briefs.len() != before
}
