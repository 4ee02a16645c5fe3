//! Ollama LLM Provider
//!
//! Talks to a local Ollama server through the non-streaming `/api/chat`
//! endpoint. No API key is involved.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{LLMError, LLMProvider, Message, Result};
use crate::config::OllamaConfig;

/// Sampling temperature; plans should be stable across runs
const PLAN_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// Base URL, typically http://localhost:11434
    base_url: String,

    /// Model tag, e.g. "llama3.1:8b"
    model: String,

    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            // Local models can be slow to load; the planner enforces its own deadline
            client: Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn from_config(config: &OllamaConfig) -> Self {
        Self::new(config.base_url.clone(), config.model.clone())
    }

    fn build_request<'a>(&'a self, messages: &'a [Message]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream: false,
            options: ChatOptions {
                temperature: PLAN_TEMPERATURE,
            },
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        matches!(self.client.get(&url).send().await, Ok(r) if r.status().is_success())
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let request = self.build_request(messages);
        tracing::debug!(
            "Ollama request: model={}, messages={}, total_chars={}",
            self.model,
            request.messages.len(),
            request.messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else if e.is_connect() {
                    LLMError::ProviderUnavailable(format!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.base_url
                    ))
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::InvalidRequest(format!(
                "model '{}' not available: {}",
                self.model, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::ProviderUnavailable(format!(
                "Ollama API error ({}): {}",
                status, body
            )));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::debug!(
            "Ollama answered in {:.1}s ({} chars)",
            started.elapsed().as_secs_f64(),
            reply.message.content.len()
        );
        Ok(reply.message.content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}
