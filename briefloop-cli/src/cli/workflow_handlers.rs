//! Workflow command handlers

use crate::cli::workflow::WorkflowCommands;
use anyhow::{Context, Result};
use briefloop_core::llm::OpenAiGenerationService;
use briefloop_core::models::{
    Configuration, ControlLevel, StageName, StageStatus, WorkflowInput, WorkflowState,
};
use briefloop_core::workflow::{JsonFileStore, StageResult, WorkflowEngine};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Open the configured JSON store and generation service
pub fn open_backends(
    config: &Configuration,
) -> Result<(Arc<JsonFileStore>, Arc<OpenAiGenerationService>)> {
    let store = Arc::new(
        JsonFileStore::new(&config.data_dir).context("Failed to initialize workflow store")?,
    );
    let service = Arc::new(
        OpenAiGenerationService::from_config(&config.generation)
            .context("Failed to initialize generation service")?,
    );
    Ok((store, service))
}

/// Create the engine over the configured JSON store and generation service
pub fn create_engine(config: &Configuration) -> Result<WorkflowEngine> {
    let (store, service) = open_backends(config)?;
    Ok(WorkflowEngine::new(store, service))
}

/// Dispatch one workflow subcommand
pub async fn handle_workflow_command(
    command: WorkflowCommands,
    config: &Configuration,
    json: bool,
) -> Result<()> {
    let engine = create_engine(config)?;

    match command {
        WorkflowCommands::Create {
            name,
            niche,
            audience,
            goal,
            style_notes,
            competitors,
            constraints,
            topic,
            input,
            control_level,
        } => {
            let input = match input {
                Some(path) => read_input_file(&path)?,
                None => WorkflowInput {
                    niche: niche.unwrap_or_default(),
                    target_audience: audience.unwrap_or_default(),
                    business_goal: goal.unwrap_or_default(),
                    style_notes,
                    competitor_channels: non_empty(competitors),
                    constraints: non_empty(constraints),
                    topic_idea: topic,
                },
            };
            let level = control_level.unwrap_or(config.default_control_level);
            handle_create(&engine, &name, input, level, json).await
        }
        WorkflowCommands::List => handle_list(&engine, json).await,
        WorkflowCommands::Show { id, stage } => handle_show(&engine, id, stage, json).await,
        WorkflowCommands::Delete { id } => {
            engine.delete_workflow(id).await?;
            if json {
                print_json(&serde_json::json!({ "success": true, "id": id }))
            } else {
                println!("🗑️  Deleted workflow {}", id);
                Ok(())
            }
        }
        WorkflowCommands::Topic { id, topic } => {
            let workflow = engine.update_topic(id, topic).await?;
            if json {
                return print_workflow_json(&workflow);
            }
            match &workflow.input.topic_idea {
                Some(topic) => println!("✅ Topic set to '{}'", topic),
                None => println!("✅ Topic cleared"),
            }
            Ok(())
        }
        WorkflowCommands::Reset { id } => {
            let workflow = engine.reset_workflow(id).await?;
            if json {
                return print_workflow_json(&workflow);
            }
            println!(
                "🔄 Reset workflow '{}' ({} saved briefs kept)",
                workflow.name,
                workflow.saved_briefs.len()
            );
            Ok(())
        }
        WorkflowCommands::Run { id, stage, resume } => {
            let result = if resume {
                engine.continue_pipeline(id).await?
            } else if let Some(stage) = stage {
                engine.run_stage(id, stage, None).await?
            } else {
                engine.run_pipeline(id, None).await?
            };
            report_stage_result(&result, json)
        }
        WorkflowCommands::Approve {
            id,
            stage,
            no_continue,
        } => {
            let result = engine.approve_stage(id, stage, !no_continue).await?;
            report_stage_result(&result, json)
        }
        WorkflowCommands::Reject {
            id,
            stage,
            feedback,
        } => {
            let result = engine.reject_stage(id, stage, &feedback).await?;
            report_stage_result(&result, json)
        }
        WorkflowCommands::Rerun {
            id,
            stage,
            feedback,
        } => {
            let result = engine.rerun_stage(id, stage, feedback).await?;
            report_stage_result(&result, json)
        }
        WorkflowCommands::SaveBrief { id, name } => {
            let (saved, workflow) = engine.save_brief(id, name).await?;
            if json {
                return print_json(&serde_json::json!({
                    "success": true,
                    "savedBrief": saved,
                    "workflow": workflow,
                }));
            }
            println!(
                "💾 Saved brief '{}' ({})",
                saved.name.as_deref().unwrap_or("untitled"),
                saved.id
            );
            println!("   {} saved briefs on this workflow", workflow.saved_briefs.len());
            Ok(())
        }
        WorkflowCommands::DeleteBrief { id, brief_id } => {
            let workflow = engine.delete_saved_brief(id, brief_id).await?;
            if json {
                return print_workflow_json(&workflow);
            }
            println!("🗑️  Removed saved brief {}", brief_id);
            Ok(())
        }
    }
}

pub(crate) fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

pub(crate) fn read_input_file(path: &Path) -> Result<WorkflowInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse input file {}", path.display()))
}

async fn handle_create(
    engine: &WorkflowEngine,
    name: &str,
    input: WorkflowInput,
    control_level: ControlLevel,
    json: bool,
) -> Result<()> {
    let workflow = engine.create_workflow(name, input, control_level).await?;

    if json {
        return print_workflow_json(&workflow);
    }
    println!("✅ Created workflow '{}'", workflow.name);
    println!("   ID:            {}", workflow.id);
    println!("   Control level: {}", workflow.control_level);
    println!();
    println!("Use 'briefloop run {}' to start generating", workflow.id);
    Ok(())
}

async fn handle_list(engine: &WorkflowEngine, json: bool) -> Result<()> {
    let workflows = engine.list_workflows().await?;

    if json {
        return print_json(&serde_json::json!({ "workflows": workflows }));
    }
    if workflows.is_empty() {
        println!("No workflows yet. Use 'briefloop create' to start one.");
        return Ok(());
    }

    println!("Workflows ({} total):", workflows.len());
    println!("===================");
    for workflow in &workflows {
        println!(
            "  {}  {:<10} {:<13} {}  (updated {})",
            workflow.id,
            workflow.status.as_str(),
            workflow.control_level.as_str(),
            workflow.name,
            workflow.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn handle_show(
    engine: &WorkflowEngine,
    id: Uuid,
    stage: Option<StageName>,
    json: bool,
) -> Result<()> {
    let workflow = engine.get_workflow(id).await?;

    if let Some(stage) = stage {
        let output = workflow
            .stage(stage)
            .output
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Stage {} has no output yet", stage))?;
        return print_json(&output.to_json());
    }

    if json {
        return print_workflow_json(&workflow);
    }
    print_workflow(&workflow);
    Ok(())
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_workflow_json(workflow: &WorkflowState) -> Result<()> {
    print_json(&serde_json::json!({ "success": true, "workflow": workflow }))
}

fn stage_marker(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Pending => "·",
        StageStatus::Running => "…",
        StageStatus::AwaitingApproval => "?",
        StageStatus::Approved => "✓",
        StageStatus::Rejected => "✗",
    }
}

fn print_workflow(workflow: &WorkflowState) {
    println!("Workflow '{}'", workflow.name);
    println!("==================");
    println!("ID:             {}", workflow.id);
    println!("Status:         {}", workflow.status);
    println!("Control level:  {}", workflow.control_level);
    if let Some(stage) = workflow.current_stage {
        println!("Current stage:  {}", stage);
    }
    println!("Niche:          {}", workflow.input.niche);
    if let Some(topic) = &workflow.input.topic_idea {
        println!("Topic idea:     {}", topic);
    }
    println!(
        "Updated:        {}",
        workflow.updated_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(error) = &workflow.error {
        println!("Error:          {}", error);
    }

    println!();
    println!("Stages:");
    for (stage, execution) in workflow.stages.iter() {
        println!(
            "  {} {:<17} {:<18} attempts: {}",
            stage_marker(execution.status),
            stage.label(),
            execution.status.as_str(),
            execution.attempts
        );
        if let Some(feedback) = &execution.feedback {
            println!("      feedback: {}", feedback);
        }
    }

    if !workflow.saved_briefs.is_empty() {
        println!();
        println!("Saved briefs:");
        for saved in &workflow.saved_briefs {
            println!(
                "  {}  {}  ({})",
                saved.id,
                saved.name.as_deref().unwrap_or("untitled"),
                saved.created_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
}

fn report_stage_result(result: &StageResult, json: bool) -> Result<()> {
    if json {
        print_json(result)?;
    } else {
        print_workflow(&result.workflow);
        println!();
        if let Some(error) = &result.error {
            println!("❌ {}", error);
        } else if result.requires_approval {
            if let Some(stage) = result.workflow.current_stage {
                println!("⏸️  {} is awaiting approval", stage.label());
                println!(
                    "   Use 'briefloop approve {id} {stage}' or 'briefloop reject {id} {stage} --feedback ...'",
                    id = result.workflow.id,
                    stage = stage
                );
            }
        } else {
            println!("✅ Workflow is {}", result.workflow.status);
        }
    }

    if result.success {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Stage run failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        ))
    }
}
