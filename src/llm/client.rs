use anyhow::Result;
use std::sync::Arc;

use super::provider::{create_provider, CompletionProvider};
use crate::config::LlmConfig;

/// LLM client that wraps a provider implementation
pub struct LlmClient {
    provider: Arc<dyn CompletionProvider>,
}

impl LlmClient {
    /// Create a new LlmClient from configuration
    pub fn from_config(config: &LlmConfig) -> Self {
        let provider = create_provider(config);

        Self {
            provider: Arc::from(provider),
        }
    }

    /// Wrap an already-constructed provider (used by tests to inject fakes)
    #[allow(dead_code)]
    pub fn from_provider(provider: Box<dyn CompletionProvider>) -> Self {
        Self {
            provider: Arc::from(provider),
        }
    }

    /// Get the provider name
    #[allow(dead_code)]
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Run one completion through the configured provider
    pub fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.provider.complete(system, user)
    }
}

// Make LlmClient Clone by wrapping provider in Arc
impl Clone for LlmClient {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}
