//! Serve and configuration command handlers

use crate::cli::workflow_handlers::open_backends;
use anyhow::{Context, Result};
use briefloop_core::models::{Configuration, ControlLevel, LogLevel};
use briefloop_core::server::BriefloopServer;
use briefloop_core::workflow::{QuickBriefEngine, WorkflowEngine};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle the 'serve' command
pub async fn handle_serve(
    config: &Configuration,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server_host.clone());
    let port = port.unwrap_or(config.server_port);
    let (store, service) = open_backends(config)?;
    let engine = Arc::new(WorkflowEngine::new(store.clone(), service.clone()));
    let quick_briefs = Arc::new(QuickBriefEngine::new(store, service));

    println!("🚀 briefloop API on http://{}:{}", host, port);
    println!("   Workflows: {}", config.data_dir.display());
    println!("   Press Ctrl+C to stop");

    BriefloopServer::new(host, port, engine, quick_briefs)
        .with_default_control_level(config.default_control_level)
        .start()
        .await
}

/// Handle 'config' without --init: print the effective configuration
pub fn handle_config_show(config: &Configuration, config_path: &Path, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("📄 Config file: {}", config_path.display());
    if !config_path.exists() {
        println!("   (not present, showing defaults; run 'briefloop config --init')");
    }
    println!();
    print!(
        "{}",
        toml::to_string_pretty(config).context("Failed to serialize config")?
    );
    Ok(())
}

/// Handle 'config --init': prompt for each setting and save
pub async fn handle_config_init(config_path: &Path) -> Result<()> {
    println!("⚙️  Initializing briefloop configuration");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📄 Config file: {}", config_path.display());

    let mut config = if config_path.exists() {
        println!("⚠️  Configuration file already exists. Loading existing values...");
        Configuration::load_from_file(config_path)
            .context("Failed to load existing config")?
    } else {
        println!("✨ Creating new configuration with defaults...");
        Configuration::default()
    };

    println!("\n📝 Please answer the following questions (press Enter to use default):\n");
    let stdin = io::stdin();
    let mut lines = stdin.lock();
    apply_answers(&mut config, &mut lines)?;

    if let Err(errors) = config.validate() {
        println!("\n❌ Configuration is invalid:");
        for error in &errors {
            println!("   - {}", error);
        }
        anyhow::bail!("Configuration not saved");
    }

    config.save_to_file(config_path)?;
    println!("\n✅ Configuration saved to {}", config_path.display());
    println!(
        "   Set {} in your environment before running stages.",
        config.generation.api_key_env
    );
    Ok(())
}

fn prompt(reader: &mut impl BufRead, question: &str, current: &str) -> Result<Option<String>> {
    print!("{} [{}]: ", question, current);
    io::stdout().flush()?;

    let mut line = String::new();
    reader.read_line(&mut line)?;
    let answer = line.trim();
    Ok(if answer.is_empty() {
        None
    } else {
        Some(answer.to_string())
    })
}

fn parse_log_level(value: &str) -> Option<LogLevel> {
    match value.to_ascii_lowercase().as_str() {
        "error" => Some(LogLevel::Error),
        "warn" => Some(LogLevel::Warn),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        "trace" => Some(LogLevel::Trace),
        _ => None,
    }
}

/// Read one answer per setting; blank or invalid answers keep the current value
fn apply_answers(config: &mut Configuration, reader: &mut impl BufRead) -> Result<()> {
    let current = config.data_dir.display().to_string();
    if let Some(dir) = prompt(reader, "Workflow data directory", &current)? {
        config.data_dir = PathBuf::from(dir);
    }

    let current = config.log_level.as_str().to_string();
    if let Some(level) = prompt(reader, "Log level (error/warn/info/debug/trace)", &current)? {
        match parse_log_level(&level) {
            Some(level) => config.log_level = level,
            None => println!("⚠️  Invalid log level, keeping {}", current),
        }
    }

    let current = config.default_control_level.to_string();
    if let Some(level) = prompt(
        reader,
        "Default control level (autopilot/checkpoints/full-control)",
        &current,
    )? {
        match level.parse::<ControlLevel>() {
            Ok(level) => config.default_control_level = level,
            Err(e) => println!("⚠️  {}, keeping {}", e, current),
        }
    }

    let current = config.server_port.to_string();
    if let Some(port) = prompt(reader, "Server port", &current)? {
        match port.parse::<u16>() {
            Ok(port) => config.server_port = port,
            Err(_) => println!("⚠️  Invalid port, keeping {}", current),
        }
    }

    let current = config.generation.api_base.clone();
    if let Some(base) = prompt(reader, "Generation API base URL", &current)? {
        config.generation.api_base = base;
    }

    let current = config.generation.model.clone();
    if let Some(model) = prompt(reader, "Model", &current)? {
        config.generation.model = model;
    }

    let current = config.generation.api_key_env.clone();
    if let Some(var) = prompt(reader, "Environment variable holding the API key", &current)? {
        config.generation.api_key_env = var;
    }

    Ok(())
}
