//! # Briefloop Core Library
//!
//! Staged video-brief generation with human approval checkpoints: the data
//! model, the workflow engine and its stores, the LLM-backed generation
//! service and the HTTP API.

pub mod error;
pub mod llm;
pub mod models;
pub mod server;
pub mod services;
pub mod workflow;

pub use error::{WorkflowError, WorkflowResult};
