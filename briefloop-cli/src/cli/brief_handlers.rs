//! Quick brief command handlers

use crate::cli::brief::BriefCommands;
use crate::cli::workflow_handlers::{non_empty, open_backends, print_json, read_input_file};
use anyhow::Result;
use briefloop_core::models::{Configuration, QuickBrief, WorkflowInput};
use briefloop_core::workflow::QuickBriefEngine;

/// Create the quick brief engine over the configured store and service
pub fn create_quick_brief_engine(config: &Configuration) -> Result<QuickBriefEngine> {
    let (store, service) = open_backends(config)?;
    Ok(QuickBriefEngine::new(store, service))
}

/// Dispatch one quick brief subcommand
pub async fn handle_brief_command(
    command: BriefCommands,
    config: &Configuration,
    json: bool,
) -> Result<()> {
    let engine = create_quick_brief_engine(config)?;

    match command {
        BriefCommands::Create {
            name,
            niche,
            audience,
            goal,
            style_notes,
            constraints,
            topic,
            input,
        } => {
            let input = match input {
                Some(path) => read_input_file(&path)?,
                None => WorkflowInput {
                    niche: niche.unwrap_or_default(),
                    target_audience: audience.unwrap_or_default(),
                    business_goal: goal.unwrap_or_default(),
                    style_notes,
                    constraints: non_empty(constraints),
                    topic_idea: topic,
                    ..WorkflowInput::default()
                },
            };
            let brief = engine.create_brief(&name, input).await?;
            if json {
                return print_json(&brief);
            }
            println!("✅ Created quick brief '{}'", brief.name);
            println!("   ID: {}", brief.id);
            println!();
            println!("Use 'briefloop brief generate {}' to write it", brief.id);
            Ok(())
        }
        BriefCommands::List => {
            let briefs = engine.list_briefs().await?;
            if json {
                return print_json(&briefs);
            }
            if briefs.is_empty() {
                println!("No quick briefs yet. Use 'briefloop brief create' to start one.");
                return Ok(());
            }
            println!("Quick briefs ({} total):", briefs.len());
            println!("======================");
            for brief in &briefs {
                println!(
                    "  {}  {:<10} {}  (updated {})",
                    brief.id,
                    brief.status.as_str(),
                    brief.name,
                    brief.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
            Ok(())
        }
        BriefCommands::Show { id } => {
            let brief = engine.get_brief(id).await?;
            if json {
                return print_json(&brief);
            }
            print_brief(&brief);
            Ok(())
        }
        BriefCommands::Delete { id } => {
            engine.delete_brief(id).await?;
            if json {
                return print_json(&serde_json::json!({ "success": true, "id": id }));
            }
            println!("🗑️  Deleted quick brief {}", id);
            Ok(())
        }
        BriefCommands::Generate { id, feedback } => {
            let result = engine.generate_brief(id, feedback).await?;
            if json {
                print_json(&result)?;
            } else {
                print_brief(&result.workflow);
            }
            match result.error {
                Some(error) => Err(anyhow::anyhow!("Brief generation failed: {}", error)),
                None => Ok(()),
            }
        }
    }
}

fn print_brief(brief: &QuickBrief) {
    println!("Quick brief '{}'", brief.name);
    println!("==================");
    println!("ID:       {}", brief.id);
    println!("Status:   {}", brief.status);
    println!("Niche:    {}", brief.input.niche);
    println!("Updated:  {}", brief.updated_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(error) = &brief.error {
        println!("Error:    {}", error);
    }

    if let Some(video) = &brief.brief {
        println!();
        println!("Title:    {}", video.theme.title);
        println!("Hook:     {}", video.theme.hook);
        println!("Length:   {}", video.theme.video_length);
        println!("Building: {}", video.tutorial.tool_name);
        println!("Script:   {} lines, {} build steps", video.script.len(), video.build_steps.len());
    }
}
