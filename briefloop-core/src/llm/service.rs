//! Generation service backed by a chat completions API

use crate::llm::client::ChatClient;
use crate::llm::json::extract_json;
use crate::llm::prompts;
use crate::models::configuration::GenerationConfig;
use crate::models::outputs::StageOutput;
use crate::workflow::generation::{GenerationRequest, GenerationService};
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Generates stage outputs by prompting an OpenAI-compatible model
pub struct OpenAiGenerationService {
    client: ChatClient,
    max_tokens: u32,
}

impl OpenAiGenerationService {
    pub fn new(client: ChatClient, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Ok(Self::new(ChatClient::from_config(config)?, config.max_tokens))
    }
}

#[async_trait]
impl GenerationService for OpenAiGenerationService {
    async fn generate(&self, request: &GenerationRequest) -> Result<StageOutput> {
        let prompt = prompts::build_prompt(request)?;
        let max_tokens = prompts::max_tokens_for(request.stage, self.max_tokens);

        tracing::debug!(
            workflow_id = %request.workflow_id,
            stage = %request.stage,
            revision = request.is_revision(),
            max_tokens,
            "Requesting generation"
        );

        let text = self
            .client
            .complete(prompt.system, &prompt.user, max_tokens)
            .await?;
        let value = extract_json(&text)?;

        StageOutput::from_json(request.stage, value)
            .with_context(|| format!("Response did not match the {} output shape", request.stage))
    }
}
