//! Per-stage prompt construction

use crate::models::outputs::{ScriptOutline, StageOutputKind, TopicResearch};
use crate::models::workflow::{StageName, WorkflowInput};
use crate::workflow::generation::GenerationRequest;
use anyhow::{anyhow, Result};
use std::fmt::Write;

const DEFAULT_STYLE: &str = "Direct and practical";

/// Lower bound on completion tokens for the full brief, which carries a
/// word-for-word script
const FULL_BRIEF_MIN_TOKENS: u32 = 8000;

const TOPIC_RESEARCH_SYSTEM: &str = r#"You research topics for short YouTube tutorials about building practical things with AI.
Pick one topic for a 2-5 minute video that shows the viewer how to build a specific tool, workflow or automation, is immediately useful to the target audience, and positions the creator as someone who can help them.

Respond with a single JSON object:
{
  "topic": "string",
  "title": "string",
  "angle": "string",
  "whyNow": "string",
  "targetViewer": "string",
  "problemSolved": "string",
  "whatWereBuildingName": "string",
  "whatWereBuildingDescription": "string",
  "toolsNeeded": ["string"],
  "alternativeTopics": [{"topic": "string", "angle": "string"}]
}"#;

const SCRIPT_OUTLINE_SYSTEM: &str = r#"You outline short YouTube tutorials about building practical things with AI.
The video runs 2-5 minutes: a hook that shows the end result, the problem, the solution overview, the build itself as the longest section, then recap and call to action. No filler.

Respond with a single JSON object:
{
  "title": "string",
  "hook": "string",
  "totalLength": "M:SS",
  "sections": [{
    "timestamp": "M:SS",
    "duration": "string",
    "sectionType": "hook|problem|solution|demo|recap|cta",
    "purpose": "string",
    "keyPoints": ["string"],
    "whatToShow": "string"
  }],
  "buildOverview": ["string"]
}"#;

const FULL_BRIEF_SYSTEM: &str = r#"You write complete, ready-to-record briefs for short YouTube tutorials about building practical things with AI.
The script is word for word, in the creator's own first-person voice, 2-5 minutes when read aloud and synced with what is on screen. Build steps are specific enough to follow, including exact prompts and settings.

Respond with a single JSON object:
{
  "theme": {"title": "string", "hook": "string", "problemSolved": "string", "targetViewer": "string", "videoLength": "M:SS"},
  "tutorial": {"toolName": "string", "whatItDoes": "string", "toolsUsed": ["string"], "difficultyLevel": "beginner|intermediate|advanced"},
  "script": [{"timestamp": "M:SS", "type": "hook|talking|demo|transition|cta", "script": "string", "onScreen": "string", "buildStep": "string (optional)"}],
  "buildSteps": [{"stepNumber": 1, "title": "string", "action": "string", "exactInstructions": "string", "whatToShow": "string", "whatToSay": "string"}],
  "assets": {"thumbnail": {"text": "string", "visualDescription": "string"}, "screenRecordings": ["string"], "bRoll": ["string"], "graphics": ["string"]},
  "cta": {"verbalCta": "string", "descriptionText": "string", "leadMagnet": "string (optional)"}
}"#;

/// System and user messages for one generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePrompt {
    pub system: &'static str,
    pub user: String,
}

/// Completion token budget for `stage`
pub fn max_tokens_for(stage: StageName, configured: u32) -> u32 {
    match stage {
        StageName::FullBrief => configured.max(FULL_BRIEF_MIN_TOKENS),
        _ => configured,
    }
}

/// Build the prompt for `request.stage`, appending a revision section when
/// the request carries both a previous output and feedback
pub fn build_prompt(request: &GenerationRequest) -> Result<StagePrompt> {
    let (system, user) = match request.stage {
        StageName::TopicResearch => (TOPIC_RESEARCH_SYSTEM, topic_research_prompt(&request.input)),
        StageName::ScriptOutline => {
            let research = required::<TopicResearch>(request)?;
            (SCRIPT_OUTLINE_SYSTEM, script_outline_prompt(&request.input, research))
        }
        StageName::FullBrief if request.prerequisites.is_empty() => {
            (FULL_BRIEF_SYSTEM, one_shot_brief_prompt(&request.input))
        }
        StageName::FullBrief => {
            let research = required::<TopicResearch>(request)?;
            let outline = required::<ScriptOutline>(request)?;
            (FULL_BRIEF_SYSTEM, full_brief_prompt(&request.input, research, outline))
        }
    };

    Ok(StagePrompt {
        system,
        user: with_revision(user, request),
    })
}

fn required<T: StageOutputKind>(request: &GenerationRequest) -> Result<&T> {
    request
        .prerequisite::<T>()
        .ok_or_else(|| anyhow!("Missing {} output for {}", T::STAGE, request.stage))
}

fn style(input: &WorkflowInput) -> &str {
    input
        .style_notes
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_STYLE)
}

fn topic_research_prompt(input: &WorkflowInput) -> String {
    let mut prompt = String::new();
    let topic_idea = input
        .topic_idea
        .as_deref()
        .map(str::trim)
        .filter(|idea| !idea.is_empty());

    match topic_idea {
        Some(idea) => {
            let _ = writeln!(prompt, "Develop this specific video idea: {}", idea);
            prompt.push_str("Decide exactly what to build, which tools to use and the angle.\n\n");
        }
        None => {
            prompt.push_str("Choose the best video topic for this creator.\n\n");
        }
    }

    let _ = writeln!(prompt, "Niche: {}", input.niche);
    let _ = writeln!(prompt, "Target audience: {}", input.target_audience);
    let _ = writeln!(prompt, "What they sell: {}", input.business_goal);
    if let Some(notes) = input.style_notes.as_deref().filter(|s| !s.trim().is_empty()) {
        let _ = writeln!(prompt, "Style: {}", notes);
    }
    if let Some(channels) = input.competitor_channels.as_ref().filter(|c| !c.is_empty()) {
        let _ = writeln!(prompt, "Competitor channels: {}", channels.join(", "));
    }
    if let Some(constraints) = input.constraints.as_ref().filter(|c| !c.is_empty()) {
        let _ = writeln!(prompt, "Constraints: {}", constraints.join("; "));
    }
    prompt
}

fn script_outline_prompt(input: &WorkflowInput, research: &TopicResearch) -> String {
    let mut prompt = String::from("Outline this video.\n\n");
    let _ = writeln!(prompt, "Topic: {}", research.topic);
    let _ = writeln!(prompt, "Title: {}", research.title);
    let _ = writeln!(prompt, "Angle: {}", research.angle);
    let _ = writeln!(
        prompt,
        "Building: {} - {}",
        research.what_were_building_name, research.what_were_building_description
    );
    let _ = writeln!(prompt, "Tools: {}", research.tools_needed.join(", "));
    let _ = writeln!(prompt, "Target viewer: {}", research.target_viewer);
    let _ = writeln!(prompt, "Problem solved: {}", research.problem_solved);
    let _ = writeln!(prompt, "Style: {}", style(input));
    prompt
}

fn full_brief_prompt(
    input: &WorkflowInput,
    research: &TopicResearch,
    outline: &ScriptOutline,
) -> String {
    let mut prompt = String::from("Write the full brief for this video.\n\n");
    let _ = writeln!(prompt, "Title: {}", outline.title);
    let _ = writeln!(prompt, "Hook: {}", outline.hook);
    let _ = writeln!(prompt, "Length: {}", outline.total_length);
    let _ = writeln!(
        prompt,
        "Building: {} - {}",
        research.what_were_building_name, research.what_were_building_description
    );
    let _ = writeln!(prompt, "Tools: {}", research.tools_needed.join(", "));

    prompt.push_str("\nOutline:\n");
    for section in &outline.sections {
        let _ = writeln!(
            prompt,
            "[{}] {:?}: {}\n  Show: {}\n  Points: {}",
            section.timestamp,
            section.section_type,
            section.purpose,
            section.what_to_show,
            section.key_points.join(", ")
        );
    }

    prompt.push_str("\nBuild overview:\n");
    for (i, step) in outline.build_overview.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", i + 1, step);
    }

    let _ = writeln!(prompt, "\nTarget viewer: {}", research.target_viewer);
    let _ = writeln!(prompt, "Problem: {}", research.problem_solved);
    let _ = writeln!(prompt, "Niche: {}", input.niche);
    let _ = writeln!(prompt, "Style: {}", style(input));
    let _ = writeln!(prompt, "Business: {}", input.business_goal);
    prompt
}

fn one_shot_brief_prompt(input: &WorkflowInput) -> String {
    let mut prompt = String::from("Write a complete video brief from scratch.\n\n");
    let _ = writeln!(prompt, "Niche: {}", input.niche);
    let _ = writeln!(prompt, "Target audience: {}", input.target_audience);
    let _ = writeln!(prompt, "What they sell: {}", input.business_goal);
    let _ = writeln!(prompt, "Style: {}", style(input));
    if let Some(idea) = input.topic_idea.as_deref().filter(|s| !s.trim().is_empty()) {
        let _ = writeln!(prompt, "Topic idea: {}", idea);
    }
    if let Some(constraints) = input.constraints.as_ref().filter(|c| !c.is_empty()) {
        let _ = writeln!(prompt, "Constraints: {}", constraints.join("; "));
    }
    prompt.push_str(
        "\nPick something the viewer can build along with the video in 2-5 minutes, using accessible tools, and include the exact prompts or settings to use.\n",
    );
    prompt
}

fn with_revision(mut user: String, request: &GenerationRequest) -> String {
    let (Some(previous), Some(feedback)) = (&request.previous_output, &request.feedback) else {
        return user;
    };

    let previous_json =
        serde_json::to_string_pretty(&previous.to_json()).unwrap_or_else(|_| "{}".to_string());
    let _ = write!(
        user,
        "\n---\n\nREVISION REQUEST\nPrevious output:\n```json\n{}\n```\n\nFeedback: \"{}\"\n\nRevise the output to address the feedback. Keep what works.",
        previous_json, feedback
    );
    user
}
