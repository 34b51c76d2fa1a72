//! Quick brief CLI commands

use clap::Subcommand;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum BriefCommands {
    /// Create a quick brief from generation inputs
    ///
    /// Examples:
    ///   briefloop brief create "Launch" --niche "AI automation" \
    ///     --audience "Agency owners" --goal "Sell consulting"
    ///   briefloop brief create "Launch" --input input.json
    Create {
        /// Brief name
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

        /// Constraint the brief must respect (repeatable)
        #[arg(long = "constraint")]
        constraints: Vec<String>,

        /// Specific topic idea for this video
        #[arg(long)]
        topic: Option<String>,

        /// Read inputs from a JSON file instead of flags
        #[arg(long, conflicts_with_all = ["niche", "audience", "goal"])]
        input: Option<PathBuf>,
    },

    /// List quick briefs, most recently updated first
    List,

    /// Show a quick brief
    Show {
        /// Brief ID (UUID)
        id: Uuid,
    },

    /// Delete a quick brief
    Delete {
        /// Brief ID (UUID)
        id: Uuid,
    },

    /// Generate the brief, or revise the last one with feedback
    ///
    /// Examples:
    ///   briefloop brief generate <id>
    ///   briefloop brief generate <id> --feedback "shorter intro"
    Generate {
        /// Brief ID (UUID)
        id: Uuid,

        /// What should change from the previous version
        #[arg(short, long)]
        feedback: Option<String>,
    },
}
