//! Structured outputs produced by each pipeline stage

use crate::models::workflow::StageName;
use serde::{Deserialize, Serialize};

/// Output of the `topic-research` stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicResearch {
    pub topic: String,
    pub title: String,
    pub angle: String,
    pub why_now: String,
    pub target_viewer: String,
    pub problem_solved: String,
    pub what_were_building_name: String,
    pub what_were_building_description: String,
    #[serde(default)]
    pub tools_needed: Vec<String>,
    #[serde(default)]
    pub alternative_topics: Vec<AlternativeTopic>,
}

/// Backup topic suggested alongside the chosen one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlternativeTopic {
    pub topic: String,
    pub angle: String,
}

/// Output of the `script-outline` stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOutline {
    pub title: String,
    pub hook: String,
    pub total_length: String,
    #[serde(default)]
    pub sections: Vec<ScriptSection>,
    #[serde(default)]
    pub build_overview: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSection {
    pub timestamp: String,
    pub duration: String,
    pub section_type: SectionType,
    pub purpose: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    pub what_to_show: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Hook,
    Problem,
    Solution,
    Demo,
    Recap,
    Cta,
}

/// Output of the `full-brief` stage, the final artifact of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoBrief {
    pub theme: BriefTheme,
    pub tutorial: Tutorial,
    #[serde(default)]
    pub script: Vec<ScriptLine>,
    #[serde(default)]
    pub build_steps: Vec<BuildStep>,
    pub assets: BriefAssets,
    pub cta: CallToAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BriefTheme {
    pub title: String,
    pub hook: String,
    pub problem_solved: String,
    pub target_viewer: String,
    pub video_length: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tutorial {
    pub tool_name: String,
    pub what_it_does: String,
    #[serde(default)]
    pub tools_used: Vec<String>,
    pub difficulty_level: DifficultyLevel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// One word-for-word line of the script
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptLine {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub line_type: ScriptLineType,
    pub script: String,
    pub on_screen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_step: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLineType {
    Hook,
    Talking,
    Demo,
    Transition,
    Cta,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildStep {
    pub step_number: u32,
    pub title: String,
    pub action: String,
    pub exact_instructions: String,
    pub what_to_show: String,
    pub what_to_say: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BriefAssets {
    pub thumbnail: Thumbnail,
    #[serde(default)]
    pub screen_recordings: Vec<String>,
    #[serde(default)]
    pub b_roll: Vec<String>,
    #[serde(default)]
    pub graphics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Thumbnail {
    pub text: String,
    pub visual_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallToAction {
    pub verbal_cta: String,
    pub description_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_magnet: Option<String>,
}

/// Output of any stage, tagged by the stage that produced it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "stage", content = "data", rename_all = "kebab-case")]
pub enum StageOutput {
    TopicResearch(TopicResearch),
    ScriptOutline(ScriptOutline),
    FullBrief(VideoBrief),
}

impl StageOutput {
    /// Stage this output belongs to
    pub fn stage(&self) -> StageName {
        match self {
            StageOutput::TopicResearch(_) => StageName::TopicResearch,
            StageOutput::ScriptOutline(_) => StageName::ScriptOutline,
            StageOutput::FullBrief(_) => StageName::FullBrief,
        }
    }

    /// Decode an untagged JSON payload as the output type of `stage`
    pub fn from_json(stage: StageName, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match stage {
            StageName::TopicResearch => StageOutput::TopicResearch(serde_json::from_value(value)?),
            StageName::ScriptOutline => StageOutput::ScriptOutline(serde_json::from_value(value)?),
            StageName::FullBrief => StageOutput::FullBrief(serde_json::from_value(value)?),
        })
    }

    /// Untagged JSON payload, as handed to prompts and presentation
    pub fn to_json(&self) -> serde_json::Value {
        let value = match self {
            StageOutput::TopicResearch(o) => serde_json::to_value(o),
            StageOutput::ScriptOutline(o) => serde_json::to_value(o),
            StageOutput::FullBrief(o) => serde_json::to_value(o),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

/// Compile-time link between a stage and the type of its output.
pub trait StageOutputKind: Sized {
    const STAGE: StageName;

    fn from_output(output: &StageOutput) -> Option<&Self>;

    fn into_output(self) -> StageOutput;
}

impl StageOutputKind for TopicResearch {
    const STAGE: StageName = StageName::TopicResearch;

    fn from_output(output: &StageOutput) -> Option<&Self> {
        match output {
            StageOutput::TopicResearch(o) => Some(o),
            _ => None,
        }
    }

    fn into_output(self) -> StageOutput {
        StageOutput::TopicResearch(self)
    }
}

impl StageOutputKind for ScriptOutline {
    const STAGE: StageName = StageName::ScriptOutline;

    fn from_output(output: &StageOutput) -> Option<&Self> {
        match output {
            StageOutput::ScriptOutline(o) => Some(o),
            _ => None,
        }
    }

    fn into_output(self) -> StageOutput {
        StageOutput::ScriptOutline(self)
    }
}

impl StageOutputKind for VideoBrief {
    const STAGE: StageName = StageName::FullBrief;

    fn from_output(output: &StageOutput) -> Option<&Self> {
        match output {
            StageOutput::FullBrief(o) => Some(o),
            _ => None,
        }
    }

    fn into_output(self) -> StageOutput {
        StageOutput::FullBrief(self)
    }
}
