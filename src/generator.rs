//! Chat-completion client that turns a question plus documentation context into
//! an answer.
//!
//! Speaks the OpenAI wire format: `POST {base_url}/chat/completions` with a
//! bearer token, a fixed model and exactly two messages (system persona, user
//! question with context). Provider defaults are used for every sampling
//! parameter.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::CompletionConfig;
use crate::error::{GenerationError, make_snippet};

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, question: &str, context: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> ChatMessage {
        ChatMessage {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> ChatMessage {
        ChatMessage {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// The user turn: question and context embedded verbatim.
pub fn user_prompt(question: &str, context: &str) -> String {
    format!("Pergunta: {question}\n\nContexto:\n{context}")
}

pub fn build_messages(system_prompt: &str, question: &str, context: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(user_prompt(question, context)),
    ]
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn first_answer(self) -> Result<String, GenerationError> {
        let first = self
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyChoices)?;
        Ok(first
            .message
            .content
            .map(|c| c.trim().to_string())
            .unwrap_or_default())
    }
}

pub struct ChatCompletionGenerator {
    client: reqwest::Client,
    url_chat: String,
    model: String,
    system_prompt: String,
}

impl ChatCompletionGenerator {
    /// Builds the HTTP client with the bearer token baked into default headers.
    pub fn new(
        cfg: &CompletionConfig,
        timeout: Duration,
    ) -> anyhow::Result<ChatCompletionGenerator> {
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", cfg.api_key))
            .context("OPENAI_API_KEY is not a valid HTTP header value")?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build completion HTTP client")?;

        let url_chat = format!("{}/chat/completions", cfg.base_url.trim_end_matches('/'));
        info!(model = %cfg.model, url = %url_chat, "completion client initialized");

        Ok(ChatCompletionGenerator {
            client,
            url_chat,
            model: cfg.model.clone(),
            system_prompt: cfg.system_prompt.clone(),
        })
    }
}

#[async_trait]
impl AnswerGenerator for ChatCompletionGenerator {
    async fn generate(&self, question: &str, context: &str) -> Result<String, GenerationError> {
        let started = Instant::now();
        let messages = build_messages(&self.system_prompt, question, context);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &messages,
        };

        debug!(
            model = %self.model,
            question_len = question.len(),
            context_len = context.len(),
            "POST {}", self.url_chat
        );

        let response = self
            .client
            .post(&self.url_chat)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| error!(error = %e, model = %self.model, "completion request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);
            error!(
                %status,
                %snippet,
                model = %self.model,
                latency_ms = started.elapsed().as_millis(),
                "completion API returned non-success status"
            );
            return Err(GenerationError::Status { status, snippet });
        }

        let out: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!(error = %e, model = %self.model, "failed to decode completion response");
            GenerationError::Decode(e)
        })?;

        let answer = out.first_answer()?;
        info!(
            model = %self.model,
            answer_len = answer.len(),
            latency_ms = started.elapsed().as_millis(),
            "chat completion completed"
        );
        Ok(answer)
    }
}
