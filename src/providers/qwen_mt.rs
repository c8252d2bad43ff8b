use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::{ChatRequest, CompletionFuture, CompletionProvider};
use crate::error::TranslateError;
use crate::settings::ProviderConfig;

const TEMPERATURE: f64 = 0.1;

/// Chat-completions client for Qwen MT compatible endpoints. One POST per
/// chunk, bearer credential, single attempt: failures are surfaced to the
/// caller, never retried here.
#[derive(Debug, Clone, Default)]
pub struct QwenMt;

impl QwenMt {
    pub fn new() -> Self {
        Self
    }
}

impl CompletionProvider for QwenMt {
    fn complete(&self, config: &ProviderConfig, request: ChatRequest) -> CompletionFuture {
        let config = config.clone();
        Box::pin(async move { call_chat_completions(&config, request).await })
    }
}

async fn call_chat_completions(
    config: &ProviderConfig,
    request: ChatRequest,
) -> Result<String, TranslateError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .build()?;

    let body = json!({
        "model": request.model,
        "temperature": TEMPERATURE,
        "messages": [
            {"role": "system", "content": request.instruction},
            {"role": "user", "content": request.input}
        ]
    });

    let response = client
        .post(&config.endpoint)
        .bearer_auth(&config.api_key)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(TranslateError::Provider {
            status: Some(status.as_u16()),
            detail: format!(
                "Qwen MT API error ({}): {}",
                status,
                extract_provider_error(&text).unwrap_or(text)
            ),
        });
    }

    let payload: ChatResponse =
        serde_json::from_str(&text).map_err(|err| TranslateError::Provider {
            status: Some(status.as_u16()),
            detail: format!("failed to parse provider response JSON: {}", err),
        })?;
    let content = payload
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_deref())
        .map(str::trim)
        .unwrap_or_default();
    if content.is_empty() {
        return Err(TranslateError::EmptyResponse);
    }
    Ok(content.to_string())
}

fn extract_provider_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
        code: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    let mut parts = Vec::new();
    if let Some(message) = error.message {
        if !message.trim().is_empty() {
            parts.push(message);
        }
    }
    if let Some(code) = error.code {
        if !code.trim().is_empty() {
            parts.push(format!("code: {}", code));
        }
    }
    if parts.is_empty() { None } else { Some(parts.join(" | ")) }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
