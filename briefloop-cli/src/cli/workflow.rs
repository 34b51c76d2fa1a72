//! Workflow CLI commands

use briefloop_core::models::{ControlLevel, StageName};
use clap::Subcommand;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum WorkflowCommands {
    /// Create a workflow from generation inputs
    ///
    /// Inputs come either from flags or from a JSON file shaped like
    /// {"niche": ..., "targetAudience": ..., "businessGoal": ..., "topicIdea": ...}
    ///
    /// Examples:
    ///   briefloop create "Launch video" --niche "AI automation" \
    ///     --audience "Agency owners" --goal "Sell consulting"
    ///   briefloop create "Launch video" --input input.json --control-level autopilot
    Create {
        /// Workflow name
        name: String,

        /// Creator niche
        #[arg(long, required_unless_present = "input")]
        niche: Option<String>,

        /// Target audience
        #[arg(long, required_unless_present = "input")]
        audience: Option<String>,

        /// Business goal the video serves
        #[arg(long, required_unless_present = "input")]
        goal: Option<String>,

        /// Free-form style guidance
        #[arg(long)]
        style_notes: Option<String>,

        /// Competitor channel (repeatable)
        #[arg(long = "competitor")]
        competitors: Vec<String>,

        /// Constraint the brief must respect (repeatable)
        #[arg(long = "constraint")]
        constraints: Vec<String>,

        /// Specific topic idea for this video
        #[arg(long)]
        topic: Option<String>,

        /// Read inputs from a JSON file instead of flags
        #[arg(long, conflicts_with_all = ["niche", "audience", "goal"])]
        input: Option<PathBuf>,

        /// autopilot, checkpoints or full-control (default: from configuration)
        #[arg(short, long)]
        control_level: Option<ControlLevel>,
    },

    /// List workflows, most recently updated first
    List,

    /// Show a workflow and its stages
    Show {
        /// Workflow ID (UUID)
        id: Uuid,

        /// Print the output of this stage
        #[arg(long)]
        stage: Option<StageName>,
    },

    /// Delete a workflow
    Delete {
        /// Workflow ID (UUID)
        id: Uuid,
    },

    /// Set the topic idea; omit the value to clear it
    Topic {
        /// Workflow ID (UUID)
        id: Uuid,

        /// New topic idea
        topic: Option<String>,
    },

    /// Return every stage to pending, keeping saved briefs
    Reset {
        /// Workflow ID (UUID)
        id: Uuid,
    },

    /// Run the pipeline, a single stage, or continue from the first unapproved stage
    ///
    /// Examples:
    ///   briefloop run <id>
    ///   briefloop run <id> --stage script-outline
    ///   briefloop run <id> --continue
    Run {
        /// Workflow ID (UUID)
        id: Uuid,

        /// Run only this stage
        #[arg(long, conflicts_with = "resume")]
        stage: Option<StageName>,

        /// Continue from the first stage that is not yet approved
        #[arg(long = "continue")]
        resume: bool,
    },

    /// Approve a stage and, unless told otherwise, run the next one
    Approve {
        /// Workflow ID (UUID)
        id: Uuid,

        /// Stage to approve
        stage: StageName,

        /// Stop after approving
        #[arg(long)]
        no_continue: bool,
    },

    /// Reject a stage and regenerate it with feedback
    Reject {
        /// Workflow ID (UUID)
        id: Uuid,

        /// Stage to reject
        stage: StageName,

        /// What should change
        #[arg(short, long)]
        feedback: String,
    },

    /// Regenerate a stage, optionally with feedback
    Rerun {
        /// Workflow ID (UUID)
        id: Uuid,

        /// Stage to rerun
        stage: StageName,

        /// Optional guidance for the new attempt
        #[arg(short, long)]
        feedback: Option<String>,
    },

    /// Snapshot the current full brief
    SaveBrief {
        /// Workflow ID (UUID)
        id: Uuid,

        /// Snapshot name (default: the brief title)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Remove a saved brief
    DeleteBrief {
        /// Workflow ID (UUID)
        id: Uuid,

        /// Saved brief ID (UUID)
        brief_id: Uuid,
    },
}
