use crate::config::{AiConfig, AiProviderKind};
use crate::error::{GeniusError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str =
    "You are a SQL expert. Answer using exactly the section headers requested in the prompt.";

/// A text-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn is_available(&self) -> bool;

    /// Send one prompt and return the model's raw text reply.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Build the provider selected by `config`.
pub fn provider_from_config(config: &AiConfig) -> Result<Arc<dyn LlmProvider>> {
    config.validate()?;
    let provider: Arc<dyn LlmProvider> = match config.provider {
        AiProviderKind::Ollama => Arc::new(OllamaClient::new(config)?),
        AiProviderKind::Groq => Arc::new(ChatCompletionsClient::new(config)?),
    };
    info!("Using {} ({})", provider.name(), config.model());
    Ok(provider)
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GeniusError::Llm(format!("Failed to build HTTP client: {}", e)))
}

/// Local Ollama server (`/api/generate`, non-streaming).
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    pub fn new(config: &AiConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(AiProviderKind::Ollama.timeout())?,
            endpoint: config.endpoint().to_string(),
            model: config.model().to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaClient {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn is_available(&self) -> bool {
        match self.client.get(format!("{}/api/tags", self.endpoint)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Ollama not reachable: {}", e);
                false
            }
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| GeniusError::Llm(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GeniusError::Llm(format!("Ollama error ({}): {}", status, text)));
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| GeniusError::Llm(format!("Failed to parse Ollama response: {}", e)))?;
        Ok(parsed.response)
    }
}

/// OpenAI-compatible `/chat/completions` endpoint (Groq by default).
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ChatCompletionsClient {
    pub fn new(config: &AiConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.provider.timeout())?,
            endpoint: config.endpoint().to_string(),
            model: config.model().to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl LlmProvider for ChatCompletionsClient {
    fn name(&self) -> &str {
        "Groq"
    }

    async fn is_available(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/models", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await;
        matches!(result, Ok(response) if response.status().is_success())
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.1,
            "max_tokens": 2048
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GeniusError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GeniusError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        if !status.is_success() {
            let message = response_json["error"]["message"]
                .as_str()
                .unwrap_or("unknown error");
            return Err(GeniusError::Llm(format!("API error ({}): {}", status, message)));
        }

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| GeniusError::Llm("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}
