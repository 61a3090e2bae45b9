//! Minimal OpenAI client for the text-to-question conversion.
//!
//! We only call chat.completions and request a strict JSON object back.
//! Calls are instrumented and log model name, latency and response size (not contents).
//!
//! NOTE: We never log the API key, and transport errors are logged but not returned
//! verbatim to clients.

use std::time::Instant;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::errors::{ConvertError, GENERIC_SERVICE_MESSAGE};
use crate::util::{fill_template, trunc_for_log};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    // One request per conversion: no client timeout, no retry.
    let client = reqwest::Client::builder().build().ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// JSON-object chat completion, returned as an untyped value.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json(&self, system: &str, user: &str, temperature: f32) -> Result<Value, ConvertError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "teacoo-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| {
        error!(target: "convert", error = %e, "OpenAI request failed");
        ConvertError::External(GENERIC_SERVICE_MESSAGE.into())
      })?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      return Err(service_error(status, &body));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| {
      error!(target: "convert", error = %e, "OpenAI response body was not a chat completion");
      ConvertError::DataShape
    })?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    completion_json(&body)
  }

  /// Ask the model to structure `text` into questions. `system` and `example`
  /// override the configured prompt pieces when given.
  #[instrument(level = "info", skip_all, fields(text_len = text.len(), custom_system = system.is_some(), custom_example = example.is_some()))]
  pub async fn convert_text(
    &self,
    prompts: &Prompts,
    text: &str,
    system: Option<&str>,
    example: Option<&str>,
  ) -> Result<Value, ConvertError> {
    let system = system.unwrap_or(&prompts.convert_system);
    let example = example.unwrap_or(&prompts.convert_example);
    let user = fill_template(&prompts.convert_user_template, &[("example", example), ("text", text)]);

    let start = Instant::now();
    let result = self.chat_json(system, &user, 0.2).await;
    let elapsed = start.elapsed();
    match &result {
      Ok(_) => info!(target: "convert", ?elapsed, "Model response received"),
      Err(e) => error!(target: "convert", ?elapsed, error = %e, "Model call failed during conversion"),
    }
    result
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Non-success status → `External` carrying the service's own message, or the
/// generic one when the body is not an OpenAI error object.
fn service_error(status: reqwest::StatusCode, body: &str) -> ConvertError {
  error!(target: "convert", %status, body = %trunc_for_log(body, 300), "OpenAI returned an error status");
  let msg = extract_openai_error(body).unwrap_or_else(|| GENERIC_SERVICE_MESSAGE.to_string());
  ConvertError::External(msg)
}

/// First choice's content, parsed as JSON.
fn completion_json(body: &ChatCompletionResponse) -> Result<Value, ConvertError> {
  let text = body.choices.first()
    .and_then(|c| c.message.content.as_deref())
    .unwrap_or_default();
  serde_json::from_str::<Value>(text).map_err(|e| {
    error!(target: "convert", error = %e, text_len = text.len(), "OpenAI content was not JSON");
    ConvertError::DataShape
  })
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
