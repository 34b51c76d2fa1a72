//! Single-shot brief data models

use crate::models::outputs::VideoBrief;
use crate::models::workflow::WorkflowInput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of a brief generated in one call, without stages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum QuickBriefStatus {
    #[default]
    Draft,
    Generating,
    Ready,
    Failed,
}

impl QuickBriefStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuickBriefStatus::Draft => "draft",
            QuickBriefStatus::Generating => "generating",
            QuickBriefStatus::Ready => "ready",
            QuickBriefStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for QuickBriefStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A brief produced straight from the creator's inputs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuickBrief {
    pub id: Uuid,
    pub name: String,
    pub status: QuickBriefStatus,
    pub input: WorkflowInput,
    /// Latest successful generation; kept when a regeneration fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brief: Option<VideoBrief>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuickBrief {
    pub fn new(name: impl Into<String>, input: WorkflowInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: QuickBriefStatus::Draft,
            input,
            brief: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outcome of generating a quick brief
#[derive(Debug, Clone, Serialize)]
pub struct QuickBriefResult {
    pub success: bool,
    pub workflow: QuickBrief,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::outputs::fixtures;

    #[test]
    fn test_new_brief_is_draft() {
        let brief = QuickBrief::new("Launch", WorkflowInput::default());
        assert_eq!(brief.status, QuickBriefStatus::Draft);
        assert!(brief.brief.is_none());
        assert_eq!(brief.created_at, brief.updated_at);
    }

    #[test]
    fn test_wire_shape() {
        let mut brief = QuickBrief::new("Launch", WorkflowInput::default());
        let json = serde_json::to_value(&brief).unwrap();
        assert_eq!(json["status"], "draft");
        assert!(json.get("brief").is_none());
        assert!(json.get("createdAt").is_some());

        brief.status = QuickBriefStatus::Ready;
        brief.brief = Some(fixtures::video_brief("Ready"));
        let json = serde_json::to_value(&brief).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["brief"]["theme"]["title"], "Ready");

        let back: QuickBrief = serde_json::from_value(json).unwrap();
        assert_eq!(back, brief);
    }
}
