use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::{Summarizer, SummaryInput};
use crate::error::{AppError, Result};

const SYSTEM_PROMPT: &str = "You are a strength coach. Summarize the workout in two or three \
sentences: what was trained, notable loads, and one suggestion for next time. Plain text only.";

/// Summarizer backed by any OpenAI-compatible chat completions endpoint.
pub struct OpenAiSummarizer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiSummarizer {
    pub fn new(base_url: String, api_key: String, model: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    fn unavailable(detail: impl Into<String>) -> AppError {
        AppError::ServiceUnavailable(detail.into())
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    fn name(&self) -> &'static str {
        "openai"
    }

    #[instrument(skip(self, input), fields(model = %self.model, session_id = %input.session.id))]
    async fn summarize(&self, input: &SummaryInput) -> Result<String> {
        let description = input.describe();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &description,
                },
            ],
            temperature: 0.4,
        };

        debug!("Sending summary request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to reach LLM endpoint: {}", e);
                Self::unavailable(format!("Failed to connect: {e}"))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::unavailable(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::unavailable(format!(
                "API error ({}): {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| Self::unavailable(format!("Failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| Self::unavailable("Empty completion"))
    }
}
