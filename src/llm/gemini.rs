//! Google Gemini provider implementation

use super::types::{ChatReply, ChatRole, ChatTurn, Usage};
use super::{ChatModel, ChatSession, LlmError};
use crate::config::GenerationSettings;
use crate::secrets::ApiKey;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini model bound to one system instruction
#[derive(Clone)]
pub struct GeminiModel {
    inner: Arc<GeminiInner>,
}

struct GeminiInner {
    client: Client,
    api_key: ApiKey,
    endpoint: String,
    model_id: String,
    system_instruction: String,
    generation: GenerationSettings,
}

impl GeminiModel {
    /// Build the client. Fails if the model identifier is unusable or the
    /// HTTP client cannot be created.
    pub fn new(
        api_key: ApiKey,
        model_name: &str,
        api_base: &str,
        system_instruction: impl Into<String>,
        generation: GenerationSettings,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let model_id = validate_model_name(model_name)?;

        let endpoint = format!(
            "{}/models/{}:generateContent",
            api_base.trim_end_matches('/'),
            model_id
        );

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(GeminiInner {
                client,
                api_key,
                endpoint,
                model_id,
                system_instruction: system_instruction.into(),
                generation,
            }),
        })
    }
}

/// Accepts `name` or `models/name`; returns the bare name
fn validate_model_name(model_name: &str) -> Result<String, LlmError> {
    let name = model_name.trim();
    let name = name.strip_prefix("models/").unwrap_or(name);
    if name.is_empty() {
        return Err(LlmError::config("Model name is empty"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
    {
        return Err(LlmError::config(format!(
            "Invalid character {bad:?} in model name {model_name:?}"
        )));
    }
    Ok(name.to_string())
}

impl ChatModel for GeminiModel {
    fn start_chat(&self, history: Vec<ChatTurn>) -> Box<dyn ChatSession> {
        Box::new(GeminiChat {
            inner: self.inner.clone(),
            history,
        })
    }

    fn model_id(&self) -> &str {
        &self.inner.model_id
    }
}

/// One chat against the Gemini `generateContent` endpoint
struct GeminiChat {
    inner: Arc<GeminiInner>,
    history: Vec<ChatTurn>,
}

impl GeminiInner {
    fn translate_request(&self, history: &[ChatTurn], message: &str) -> GeminiRequest {
        let system_instruction = if self.system_instruction.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: self.system_instruction.clone(),
                }],
            })
        };

        let contents = history
            .iter()
            .chain(std::iter::once(&ChatTurn::user(message)))
            .filter(|turn| !turn.parts.is_empty())
            .map(|turn| GeminiContent {
                role: Some(turn.role.as_str().to_string()),
                parts: turn
                    .parts
                    .iter()
                    .map(|text| GeminiPart { text: text.clone() })
                    .collect(),
            })
            .collect();

        let generation_config =
            if self.generation.temperature.is_none() && self.generation.max_output_tokens.is_none() {
                None
            } else {
                Some(GeminiGenerationConfig {
                    temperature: self.generation.temperature,
                    max_output_tokens: self.generation.max_output_tokens,
                })
            };

        GeminiRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }

    async fn generate(&self, request: &GeminiRequest) -> Result<ChatReply, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |resp| resp.error.message);
            return Err(match status.as_u16() {
                400 => LlmError::invalid_request(format!("Invalid request: {message}")),
                401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
                429 => LlmError::rate_limit(format!("Rate limit exceeded: {message}")),
                500..=599 => LlmError::server_error(format!("Server error: {message}")),
                _ => LlmError::unknown(format!("HTTP {status}: {message}")),
            });
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::invalid_response(format!("Failed to parse response: {e}")))?;

        normalize_response(gemini_response)
    }
}

fn normalize_response(resp: GeminiResponse) -> Result<ChatReply, LlmError> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LlmError::empty_response(format!(
            "Prompt was blocked: {reason}"
        )));
    }

    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::empty_response("No candidates in response"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
        return Err(LlmError::empty_response(format!(
            "Response contained no text (finish reason: {reason})"
        )));
    }

    let usage = resp.usage_metadata.map_or_else(Usage::default, |u| Usage {
        input_tokens: u64::from(u.prompt_token_count),
        output_tokens: u64::from(u.candidates_token_count),
    });

    Ok(ChatReply {
        text,
        finish_reason: candidate.finish_reason,
        usage,
    })
}

#[async_trait]
impl ChatSession for GeminiChat {
    async fn send_message(&mut self, text: &str) -> Result<ChatReply, LlmError> {
        let request = self.inner.translate_request(&self.history, text);
        let reply = self.inner.generate(&request).await?;

        self.history.push(ChatTurn::user(text));
        self.history.push(ChatTurn {
            role: ChatRole::Model,
            parts: vec![reply.text.clone()],
        });
        Ok(reply)
    }

    fn history(&self) -> &[ChatTurn] {
        &self.history
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
