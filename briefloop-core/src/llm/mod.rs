//! LLM-backed generation service

pub mod client;
pub mod json;
pub mod prompts;
pub mod service;

pub use client::ChatClient;
pub use json::extract_json;
pub use service::OpenAiGenerationService;
