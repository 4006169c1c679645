use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{LlmConfig, LlmProviderType};

/// Trait for LLM providers that can run a single chat completion.
pub trait CompletionProvider: Send + Sync {
    /// Run one completion with a system instruction and a single user turn,
    /// returning the first choice's text content.
    fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Get the provider name for display
    fn provider_name(&self) -> &'static str;
}

/// Sampling settings shared by every provider.
#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl From<&LlmConfig> for CompletionOptions {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

// ============================================================================
// OpenAI-compatible provider (works with LM Studio, OpenAI, and compatible APIs)
// ============================================================================

pub struct OpenAICompatibleProvider {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    options: CompletionOptions,
}

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

impl OpenAICompatibleProvider {
    pub fn new(endpoint: &str, model: &str, api_key: Option<&str>, options: CompletionOptions) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.map(|s| s.to_string()),
            options,
        }
    }
}

impl CompletionProvider for OpenAICompatibleProvider {
    fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = OpenAIChatRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };

        let url = format!("{}/chat/completions", self.endpoint);

        let agent = ureq::AgentBuilder::new().timeout(self.options.timeout).build();

        let mut req = agent.post(&url).set("Content-Type", "application/json");

        if let Some(ref api_key) = self.api_key {
            req = req.set("Authorization", &format!("Bearer {}", api_key));
        }

        let response = req
            .send_json(&request)
            .map_err(|e| anyhow!("LLM request failed: {}", e))?;

        let chat_response: OpenAIChatResponse = response
            .into_json()
            .map_err(|e| anyhow!("Failed to parse LLM response: {}", e))?;

        chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow!("No response from LLM"))
    }

    fn provider_name(&self) -> &'static str {
        "OpenAI-compatible"
    }
}

// ============================================================================
// Anthropic Claude provider
// ============================================================================

pub struct AnthropicProvider {
    api_key: String,
    model: String,
    options: CompletionOptions,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponseContent {
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: Option<&str>, options: CompletionOptions) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.unwrap_or("claude-sonnet-4-20250514").to_string(),
            options,
        }
    }
}

impl CompletionProvider for AnthropicProvider {
    fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
            system: system.to_string(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        let agent = ureq::AgentBuilder::new().timeout(self.options.timeout).build();

        let response = agent
            .post("https://api.anthropic.com/v1/messages")
            .set("Content-Type", "application/json")
            .set("x-api-key", &self.api_key)
            .set("anthropic-version", "2023-06-01")
            .send_json(&request)
            .map_err(|e| anyhow!("Anthropic request failed: {}", e))?;

        let anthropic_response: AnthropicResponse = response
            .into_json()
            .map_err(|e| anyhow!("Failed to parse Anthropic response: {}", e))?;

        anthropic_response
            .content
            .first()
            .and_then(|c| c.text.clone())
            .ok_or_else(|| anyhow!("No response from Anthropic"))
    }

    fn provider_name(&self) -> &'static str {
        "Anthropic Claude"
    }
}

// ============================================================================
// Ollama provider
// ============================================================================

pub struct OllamaProvider {
    endpoint: String,
    model: String,
    options: CompletionOptions,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

impl OllamaProvider {
    pub fn new(endpoint: Option<&str>, model: &str, options: CompletionOptions) -> Self {
        Self {
            endpoint: endpoint.unwrap_or("http://localhost:11434").to_string(),
            model: model.to_string(),
            options,
        }
    }
}

impl CompletionProvider for OllamaProvider {
    fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: vec![
                OllamaMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                OllamaMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.options.temperature,
                num_predict: self.options.max_tokens,
            },
        };

        let url = format!("{}/api/chat", self.endpoint);

        let agent = ureq::AgentBuilder::new().timeout(self.options.timeout).build();

        let response = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_json(&request)
            .map_err(|e| anyhow!("Ollama request failed: {}", e))?;

        let chat_response: OllamaChatResponse = response
            .into_json()
            .map_err(|e| anyhow!("Failed to parse Ollama response: {}", e))?;

        Ok(chat_response.message.content)
    }

    fn provider_name(&self) -> &'static str {
        "Ollama"
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an LLM provider based on configuration
pub fn create_provider(config: &LlmConfig) -> Box<dyn CompletionProvider> {
    let options = CompletionOptions::from(config);

    match config.provider {
        LlmProviderType::LmStudio => Box::new(OpenAICompatibleProvider::new(
            &config.endpoint,
            &config.model,
            config.api_key.as_deref(),
            options,
        )),
        LlmProviderType::OpenAI => Box::new(OpenAICompatibleProvider::new(
            "https://api.openai.com/v1",
            &config.model,
            config.api_key.as_deref(),
            options,
        )),
        LlmProviderType::Anthropic => {
            let api_key = config.api_key.as_deref().unwrap_or("");
            Box::new(AnthropicProvider::new(api_key, Some(&config.model), options))
        }
        LlmProviderType::Ollama => Box::new(OllamaProvider::new(
            Some(&config.endpoint),
            &config.model,
            options,
        )),
    }
}
