use std::collections::HashMap;

use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::TranslateError;
use crate::providers::CompletionProvider;
use crate::settings::{Settings, SettingsPatch};
use crate::translator::{BatchRequest, Translator};

const REQUEST_BUFFER: usize = 16;

/// Engine-to-client RPC payload for one chunk. Unset fields fall back to
/// the service's current settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateTexts {
    pub texts: Vec<String>,
    #[serde(default)]
    pub target_language: Option<String>,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

type Reply<T> = oneshot::Sender<Result<T, TranslateError>>;

enum ServiceRequest {
    TranslateTexts {
        payload: TranslateTexts,
        reply: Reply<Vec<String>>,
    },
    GetSettings {
        reply: Reply<Settings>,
    },
    UpdateSettings {
        patch: SettingsPatch,
        reply: Reply<Settings>,
    },
    GetTabState {
        reply: Reply<HashMap<u32, bool>>,
    },
    SetTabTranslation {
        tab_id: u32,
        enabled: bool,
        reply: Reply<()>,
    },
}

/// The privileged background context: owns provider configuration and the
/// per-session tab state, and serves request/response messages from any
/// number of handles. No per-page state lives here.
struct Service<P: CompletionProvider> {
    settings: Settings,
    tabs: HashMap<u32, bool>,
    translator: Translator<P>,
    rx: mpsc::Receiver<ServiceRequest>,
}

impl<P: CompletionProvider> Service<P> {
    async fn run(mut self) {
        while let Some(request) = self.rx.recv().await {
            match request {
                ServiceRequest::TranslateTexts { payload, reply } => {
                    let result = self.translate_texts(payload).await;
                    let _ = reply.send(result);
                }
                ServiceRequest::GetSettings { reply } => {
                    let _ = reply.send(Ok(self.settings.clone()));
                }
                ServiceRequest::UpdateSettings { patch, reply } => {
                    self.settings.apply_patch(patch);
                    let _ = reply.send(Ok(self.settings.clone()));
                }
                ServiceRequest::GetTabState { reply } => {
                    let _ = reply.send(Ok(self.tabs.clone()));
                }
                ServiceRequest::SetTabTranslation {
                    tab_id,
                    enabled,
                    reply,
                } => {
                    self.tabs.insert(tab_id, enabled);
                    let _ = reply.send(Ok(()));
                }
            }
        }
        debug!("translation service stopped");
    }

    async fn translate_texts(
        &self,
        payload: TranslateTexts,
    ) -> Result<Vec<String>, TranslateError> {
        let request = BatchRequest {
            texts: payload.texts,
            target_language: pick(payload.target_language, &self.settings.target_language),
            source_language: payload.source_language,
            model: pick(payload.model, &self.settings.model),
        };
        self.translator
            .translate_batch(&self.settings.provider, request)
            .await
    }
}

fn pick(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Client half of the service channel. Cheap to clone; every request is
/// correlated with its reply through a oneshot channel, and a dropped
/// service surfaces as `ServiceClosed`.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<ServiceRequest>,
}

pub fn spawn<P: CompletionProvider + 'static>(settings: Settings, provider: P) -> ServiceHandle {
    let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
    let service = Service {
        settings,
        tabs: HashMap::new(),
        translator: Translator::new(provider),
        rx,
    };
    tokio::spawn(service.run());
    ServiceHandle { tx }
}

impl ServiceHandle {
    pub async fn translate_texts(
        &self,
        payload: TranslateTexts,
    ) -> Result<Vec<String>, TranslateError> {
        self.request(|reply| ServiceRequest::TranslateTexts { payload, reply })
            .await
    }

    pub async fn get_settings(&self) -> Result<Settings, TranslateError> {
        self.request(|reply| ServiceRequest::GetSettings { reply })
            .await
    }

    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, TranslateError> {
        self.request(|reply| ServiceRequest::UpdateSettings { patch, reply })
            .await
    }

    pub async fn get_tab_state(&self) -> Result<HashMap<u32, bool>, TranslateError> {
        self.request(|reply| ServiceRequest::GetTabState { reply })
            .await
    }

    pub async fn set_tab_translation(
        &self,
        tab_id: u32,
        enabled: bool,
    ) -> Result<(), TranslateError> {
        self.request(|reply| ServiceRequest::SetTabTranslation {
            tab_id,
            enabled,
            reply,
        })
        .await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> ServiceRequest,
    ) -> Result<T, TranslateError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| TranslateError::ServiceClosed)?;
        rx.await.map_err(|_| TranslateError::ServiceClosed)?
    }
}
