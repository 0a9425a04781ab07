//! Reply generation over the `OpenAI` chat completions protocol

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{ApiKeys, LlmConfig, LlmProvider};
use crate::session::Turn;
use crate::{Error, Result};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Produces the next assistant turn of a conversation
#[async_trait]
pub trait Responder: Send + Sync {
    /// Generate a reply to `user_text`
    ///
    /// `context` holds earlier turns, oldest first, and does not include
    /// `user_text`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the request or cannot be reached
    async fn generate(
        &self,
        system_instruction: &str,
        context: &[Turn],
        user_text: &str,
    ) -> Result<String>;
}

/// A message in a chat completions request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Lay out a conversation as chat messages: system, context, then the new user text
#[must_use]
pub fn build_messages(system_instruction: &str, context: &[Turn], user_text: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(context.len() + 2);
    messages.push(ChatMessage {
        role: "system",
        content: system_instruction.to_string(),
    });
    messages.extend(context.iter().map(|turn| ChatMessage {
        role: turn.role().as_str(),
        content: turn.content().to_string(),
    }));
    messages.push(ChatMessage {
        role: "user",
        content: user_text.to_string(),
    });
    messages
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Chat completions client (Groq, `OpenAI`, or any compatible endpoint)
pub struct ChatResponder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl ChatResponder {
    /// Create a responder against `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String, base_url: String, temperature: f32) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("API key required for chat completions".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature,
        })
    }
}

#[async_trait]
impl Responder for ChatResponder {
    async fn generate(
        &self,
        system_instruction: &str,
        context: &[Turn],
        user_text: &str,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: build_messages(system_instruction, context, user_text),
            temperature: self.temperature,
        };

        tracing::debug!(
            model = %self.model,
            context_turns = context.len(),
            "requesting chat completion"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat completion request failed");
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat completion API error");
            return Err(Error::Llm(format!("chat completion error {status}: {body}")));
        }

        let result: ChatResponse = response.json().await?;
        let reply = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        tracing::info!(reply_chars = reply.len(), "chat completion received");
        Ok(reply)
    }
}

/// Build the configured responder
///
/// # Errors
///
/// Returns error if the provider's API key is not configured
pub fn responder_from_config(config: &LlmConfig, keys: &ApiKeys) -> Result<Arc<dyn Responder>> {
    let (api_key, default_base) = match config.provider {
        LlmProvider::Groq => (keys.groq.clone(), GROQ_BASE_URL),
        LlmProvider::OpenAi => (keys.openai.clone(), OPENAI_BASE_URL),
    };

    let responder = ChatResponder::new(
        api_key.unwrap_or_default(),
        config.model.clone(),
        config.base_url.clone().unwrap_or_else(|| default_base.to_string()),
        config.temperature,
    )?;

    tracing::info!(provider = ?config.provider, model = %config.model, "LLM configured");
    Ok(Arc::new(responder))
}
