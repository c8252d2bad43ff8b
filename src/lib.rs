use anyhow::{Result, anyhow};
use kuchiki::traits::TendrilSink;
use std::path::Path;

pub mod error;
pub mod logging;
pub mod notify;
pub mod page;
pub mod providers;
pub mod server;
pub mod service;
pub mod settings;
pub mod translations;
mod translator;

pub use error::TranslateError;
pub use page::{PageSession, PageState};
pub use providers::QwenMt;
pub use service::{ServiceHandle, TranslateTexts};
pub use translator::{BatchRequest, Translator};

/// CLI-level configuration, resolved from flags before `run`.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub lang: Option<String>,
    pub model: Option<String>,
    pub key: Option<String>,
    pub endpoint: Option<String>,
    pub settings_path: Option<String>,
    pub auto: bool,
}

/// Translate one HTML document in place and return the serialized result.
/// With `auto`, the page is translated only when its declared language is
/// marked always-translate; otherwise the document passes through
/// unchanged.
pub async fn run(config: Config, input: String) -> Result<String> {
    let settings = resolve_settings(&config)?;

    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("stdin is empty"));
    }

    let document = kuchiki::parse_html().one(input);
    let handle = service::spawn(settings.clone(), QwenMt::new());
    let mut session = PageSession::new(document, handle)
        .with_fallback_language(page::language::locale_from_env());

    if config.auto {
        if settings.auto_translate {
            session
                .auto_translate_check(&settings.always_translate_languages)
                .await;
        }
    } else {
        session.translate(false).await;
    }

    if let Some(error) = session.last_error() {
        return Err(anyhow!("{error}"));
    }

    Ok(session.document().to_string())
}

/// Run the background HTTP service for external UIs.
pub async fn serve(config: Config, addr: String) -> Result<()> {
    let settings = resolve_settings(&config)?;
    let handle = service::spawn(settings, QwenMt::new());
    server::run_server(handle, addr).await
}

fn resolve_settings(config: &Config) -> Result<settings::Settings> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;

    if let Some(lang) = trimmed(config.lang.as_deref()) {
        settings.target_language = lang;
    }
    if let Some(model) = trimmed(config.model.as_deref()) {
        settings.model = model;
    }
    if let Some(endpoint) = trimmed(config.endpoint.as_deref()) {
        settings.provider.endpoint = endpoint;
    }
    if let Some(key) = trimmed(config.key.as_deref()) {
        settings.provider.api_key = key;
    } else if settings.provider.api_key.trim().is_empty() {
        if let Some(key) = get_env("DASHSCOPE_API_KEY") {
            settings.provider.api_key = key;
        }
    }

    Ok(settings)
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
