//! Minimal OpenAI-compatible chat completion client.
//!
//! One POST per call, no retries. Calls are instrumented and log the model,
//! latency and response size (not contents). The API key is never logged.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::CompletionSettings;
use crate::error::ContentError;
use crate::prompts::Prompt;

/// Anything that turns a prompt into raw model text.
#[async_trait]
pub trait Completion: Send + Sync {
  async fn complete(&self, prompt: &Prompt) -> Result<String, ContentError>;
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub temperature: f32,
}

impl OpenAI {
  pub fn new(settings: CompletionSettings) -> Result<Self, ContentError> {
    let client = reqwest::Client::builder()
      .timeout(settings.timeout)
      .build()
      .map_err(|e| ContentError::Network(e.to_string()))?;
    Ok(Self {
      client,
      api_key: settings.api_key,
      base_url: settings.base_url,
      model: settings.model,
      temperature: 0.7,
    })
  }

  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let settings = CompletionSettings::from_env()?;
    Self::new(settings).ok()
  }
}

#[async_trait]
impl Completion for OpenAI {
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, user_len = prompt.user.len()))]
  async fn complete(&self, prompt: &Prompt) -> Result<String, ContentError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: &self.model,
      messages: vec![
        ChatMessageReq { role: "system", content: &prompt.system },
        ChatMessageReq { role: "user", content: &prompt.user },
      ],
      temperature: self.temperature,
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "skilltree-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await
      .map_err(|e| ContentError::Network(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(ContentError::Network(format!("HTTP {status}: {msg}")));
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| ContentError::Network(format!("malformed completion envelope: {e}")))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }

    let text = first_choice_text(body);
    debug!(elapsed = ?start.elapsed(), response_len = text.len(), "Completion received");
    Ok(text)
  }
}

/// Text of the first choice, or empty when the envelope has none.
fn first_choice_text(body: ChatCompletionResponse) -> String {
  body.choices
    .into_iter()
    .next()
    .and_then(|c| c.message)
    .and_then(|m| m.content)
    .unwrap_or_default()
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessageReq<'a>>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq<'a> { role: &'a str, content: &'a str }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { #[serde(default)] message: Option<ChatMessageResp> }
#[derive(Deserialize)]
struct ChatMessageResp { #[serde(default)] content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
