use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::ModelSettings;

/// Used when the user submits without typing a question.
pub const DEFAULT_QUERY: &str = "Analyze the text above and provide a direct answer or solution.";

const SYSTEM_PROMPT: &str = "You are a concise assistant shown in a small overlay panel.\n\
- The user gives you text extracted from their screen with OCR, plus a question about it.\n\
- Answer briefly and directly, without conversational filler.\n\
- For code questions, give the corrected or improved code first, then a short explanation.\n\
- For conceptual questions, give a clear short answer; use lists when they help.\n\
- Format the whole response in Markdown.";

/// Longest slice of a raw response body kept in an error message.
const MAX_BODY_IN_ERROR: usize = 500;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no API key found (set {0})")]
    MissingApiKey(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("API error: {0}")]
    Api(String),
    #[error("invalid response format: {0}")]
    Malformed(String),
}

/// The remote language model: context text plus a question in, markdown out.
pub trait ModelClient: Send + Sync {
    fn ask(&self, context: &str, query: &str) -> Result<String, ModelError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

pub fn user_prompt(context: &str, query: &str) -> String {
    let question = if query.trim().is_empty() {
        DEFAULT_QUERY
    } else {
        query.trim()
    };
    format!("Here is the text from my screen:\n---\n{context}\n---\n\nHere is my question: {question}")
}

/// JSON body for a chat completion request.
pub fn build_payload(model: &str, max_tokens: u32, context: &str, query: &str) -> serde_json::Value {
    let req = ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: user_prompt(context, query),
            },
        ],
        max_tokens,
    };
    serde_json::to_value(req).unwrap_or(serde_json::Value::Null)
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_IN_ERROR) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

/// Interpret a chat completion response. API-reported errors win over the
/// HTTP status so the user sees the provider's message.
pub fn parse_response(status: u16, body: &str) -> Result<String, ModelError> {
    if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(body) {
        return Err(ModelError::Api(env.error.message));
    }
    if !(200..300).contains(&status) {
        return Err(ModelError::Http {
            status,
            body: truncate(body),
        });
    }
    serde_json::from_str::<ChatResponse>(body)
        .ok()
        .and_then(|r| r.choices.into_iter().next())
        .and_then(|c| c.message.content)
        .ok_or_else(|| ModelError::Malformed(truncate(body)))
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    api_key_env: String,
}

impl OpenAiClient {
    pub fn new(settings: &ModelSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent("glassbar overlay")
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            api_key_env: settings.api_key_env.clone(),
        })
    }
}

impl ModelClient for OpenAiClient {
    fn ask(&self, context: &str, query: &str) -> Result<String, ModelError> {
        let key = std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ModelError::MissingApiKey(self.api_key_env.clone()))?;

        let payload = build_payload(&self.model, self.max_tokens, context, query);
        let body = serde_json::to_vec(&payload).map_err(|e| ModelError::Malformed(e.to_string()))?;

        tracing::debug!(endpoint = %self.endpoint, model = %self.model, "sending model request");
        let resp = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {key}"))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp.text().map_err(|e| ModelError::Network(e.to_string()))?;
        parse_response(status, &text)
    }
}
