//! Minimal client for OpenAI-compatible chat completions

use crate::models::configuration::GenerationConfig;
use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completions client. The API key is never logged.
pub struct ChatClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    api_key_env: String,
    model: String,
    temperature: f64,
}

impl ChatClient {
    /// Build a client, reading the API key from the configured environment
    /// variable. A missing key only fails once a request is made.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Self::new(config, api_key)
    }

    pub fn new(config: &GenerationConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: completions_endpoint(&config.api_base)?,
            api_key,
            api_key_env: config.api_key_env.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send one system + user exchange and return the assistant text
    pub async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Environment variable {} is not set", self.api_key_env))?;

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "response_format": { "type": "json_object" },
        });

        let res = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .context("Chat completion request failed")?;

        if !res.status().is_success() {
            let status = res.status();
            let err_body = res.text().await.unwrap_or_default();
            bail!("Chat completion API error {}: {}", status, err_body);
        }

        let parsed: ChatCompletionResponse = res
            .json()
            .await
            .context("Invalid chat completion response")?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

/// `<api_base>/chat/completions`, tolerating a base without a trailing slash
fn completions_endpoint(api_base: &str) -> Result<Url> {
    let mut base = Url::parse(api_base)
        .with_context(|| format!("Invalid generation API base URL: {}", api_base))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("chat/completions")
        .context("Failed to build chat completions URL")
}
