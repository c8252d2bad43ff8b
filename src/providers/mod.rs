use std::future::Future;
use std::pin::Pin;

use crate::error::TranslateError;
use crate::settings::ProviderConfig;

mod qwen_mt;

pub use qwen_mt::QwenMt;

/// One chat-completion request. The provider resolves it to the first
/// choice's message content; normalization happens upstream.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub instruction: String,
    pub input: String,
}

pub type CompletionFuture = Pin<Box<dyn Future<Output = Result<String, TranslateError>> + Send>>;

pub trait CompletionProvider: Clone + Send + Sync {
    fn complete(&self, config: &ProviderConfig, request: ChatRequest) -> CompletionFuture;
}
