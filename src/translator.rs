use tracing::debug;

use crate::error::TranslateError;
use crate::providers::{ChatRequest, CompletionProvider};
use crate::settings::ProviderConfig;
use crate::translations::{self, Normalized};

/// One ordered batch of source strings, intended to align 1:1 with the
/// returned translations by position.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub texts: Vec<String>,
    pub target_language: String,
    pub source_language: Option<String>,
    pub model: String,
}

/// Orchestrates a batch translation: credential check, prompt
/// construction, a single provider call, response normalization.
#[derive(Debug, Clone)]
pub struct Translator<P: CompletionProvider> {
    provider: P,
}

impl<P: CompletionProvider> Translator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub async fn translate_batch(
        &self,
        config: &ProviderConfig,
        request: BatchRequest,
    ) -> Result<Vec<String>, TranslateError> {
        if config.api_key.trim().is_empty() {
            return Err(TranslateError::Configuration(
                "no API key configured; add provider.apiKey to your settings".to_string(),
            ));
        }

        let instruction = translations::render_instruction(
            &request.target_language,
            request.source_language.as_deref(),
        );
        let input = translations::numbered_block(&request.texts);
        let content = self
            .provider
            .complete(
                config,
                ChatRequest {
                    model: request.model,
                    instruction,
                    input,
                },
            )
            .await?;

        let normalized = translations::normalize_response(&content)?;
        if let Normalized::LineRecovered(lines) = &normalized {
            debug!(
                "strict array parse failed; recovered {} lines from raw text",
                lines.len()
            );
        }
        Ok(normalized.into_lines())
    }
}
