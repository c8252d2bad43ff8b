pub mod extract;
pub mod language;

pub use extract::{TextSlot, collect_text_nodes};

use std::collections::HashMap;
use std::rc::Rc;

use kuchiki::NodeRef;
use tracing::warn;

use crate::error::TranslateError;
use crate::notify::{StatusSink, Tone, TracingSink};
use crate::service::{ServiceHandle, TranslateTexts};

/// Chunk cap per translation request. Chunks are submitted sequentially,
/// so result order is derivable by concatenation.
pub const CHUNK_SIZE: usize = 30;

/// Lifecycle of one document instance. Drives which commands are
/// accepted; `Translating` doubles as the re-entrancy guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Idle,
    Translating,
    Translated,
}

/// Session-scoped translation state for one live document: the state
/// machine, the ordered node list of the last successful attempt, and the
/// original-text map. All of it dies with the session; nothing persists
/// across documents.
pub struct PageSession {
    document: NodeRef,
    state: PageState,
    nodes: Vec<NodeRef>,
    originals: HashMap<usize, String>,
    service: ServiceHandle,
    fallback_language: Option<String>,
    sink: Box<dyn StatusSink>,
    last_error: Option<String>,
}

impl PageSession {
    pub fn new(document: NodeRef, service: ServiceHandle) -> Self {
        Self {
            document,
            state: PageState::Idle,
            nodes: Vec::new(),
            originals: HashMap::new(),
            service,
            fallback_language: None,
            sink: Box::new(TracingSink),
            last_error: None,
        }
    }

    pub fn with_fallback_language(mut self, language: Option<String>) -> Self {
        self.fallback_language = language;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn document(&self) -> &NodeRef {
        &self.document
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Declared page language (document attribute, body attribute, runtime
    /// fallback), lower-cased.
    pub fn page_language(&self) -> String {
        language::detect(&self.document, self.fallback_language.as_deref())
    }

    /// Translate if untranslated, restore if translated. Ignored while a
    /// translation is in flight.
    pub async fn toggle_translation(&mut self) -> PageState {
        match self.state {
            PageState::Translating => {}
            PageState::Translated => self.restore(),
            PageState::Idle => self.translate(false).await,
        }
        self.state
    }

    /// Forced re-translation: restore originals first, then run the full
    /// pipeline against current settings, so a changed target language
    /// takes effect cleanly.
    pub async fn retranslate_page(&mut self) -> PageState {
        if self.state == PageState::Translating {
            return self.state;
        }
        if self.state == PageState::Translated {
            self.restore();
        }
        self.translate(true).await;
        self.state
    }

    /// Non-forced translate when the page's primary language subtag is
    /// marked always-translate. Best-effort: declared language only.
    pub async fn auto_translate_check(&mut self, always_translate: &HashMap<String, bool>) {
        let primary = language::primary_subtag(&self.page_language());
        if always_translate.get(&primary).copied().unwrap_or(false) {
            self.translate(false).await;
        }
    }

    pub async fn translate(&mut self, force: bool) {
        if self.state == PageState::Translating {
            return;
        }
        if self.state == PageState::Translated && !force {
            return;
        }

        self.state = PageState::Translating;
        self.sink.notify(Tone::Info, "translating page…");

        match self.run_pipeline().await {
            Ok(true) => {
                self.state = PageState::Translated;
                self.last_error = None;
                self.sink.notify(Tone::Success, "page translated");
            }
            Ok(false) => {
                self.state = PageState::Idle;
                self.last_error = None;
                self.sink
                    .notify(Tone::Info, "no translatable text on this page");
            }
            Err(err) => {
                // Failed attempts leave the page untouched and retryable.
                self.state = PageState::Idle;
                let message = err.to_string();
                self.sink
                    .notify(Tone::Error, &format!("translation failed: {message}"));
                self.last_error = Some(message);
            }
        }
    }

    /// Put every recorded node back to its original value. Detached nodes
    /// are skipped; the original map is kept so a later forced retranslate
    /// still has its baseline.
    pub fn restore(&mut self) {
        if self.state == PageState::Translating {
            return;
        }
        for node in &self.nodes {
            if !is_attached(node, &self.document) {
                continue;
            }
            let Some(text) = node.as_text() else { continue };
            if let Some(original) = self.originals.get(&node_key(node)) {
                *text.borrow_mut() = original.clone();
            }
        }
        self.state = PageState::Idle;
        self.sink.notify(Tone::Info, "original text restored");
    }

    async fn run_pipeline(&mut self) -> Result<bool, TranslateError> {
        let settings = self.service.get_settings().await?;
        let slots = extract::collect_text_nodes(&self.document);
        if slots.is_empty() {
            return Ok(false);
        }

        let source_language = self.page_language();

        // Every chunk must resolve before any node is mutated; a failed
        // chunk aborts the attempt with the document unchanged.
        let mut translations = Vec::with_capacity(slots.len());
        for chunk in slots.chunks(CHUNK_SIZE) {
            let batch = self
                .service
                .translate_texts(TranslateTexts {
                    texts: chunk.iter().map(|slot| slot.value.clone()).collect(),
                    target_language: Some(settings.target_language.clone()),
                    source_language: Some(source_language.clone()),
                    model: Some(settings.model.clone()),
                })
                .await?;
            translations.extend(batch);
        }

        if translations.len() < slots.len() {
            warn!(
                "provider returned {} translations for {} nodes; the tail keeps its original text",
                translations.len(),
                slots.len()
            );
        }

        self.apply(&slots, &translations);
        self.nodes = slots.into_iter().map(|slot| slot.node).collect();
        Ok(true)
    }

    /// Node `i` receives translation `i` when present and non-empty;
    /// otherwise it keeps its current value. The original value is
    /// recorded on first mutation only and never overwritten.
    fn apply(&mut self, slots: &[TextSlot], translations: &[String]) {
        for (index, slot) in slots.iter().enumerate() {
            let Some(text) = slot.node.as_text() else {
                continue;
            };
            self.originals
                .entry(node_key(&slot.node))
                .or_insert_with(|| text.borrow().clone());
            if let Some(translated) = translations.get(index) {
                if !translated.is_empty() {
                    *text.borrow_mut() = translated.clone();
                }
            }
        }
    }
}

/// Opaque identity for a node, usable as a map key without owning it.
/// Stable for as long as the document keeps the node alive.
fn node_key(node: &NodeRef) -> usize {
    Rc::as_ptr(&node.0) as usize
}

fn is_attached(node: &NodeRef, document: &NodeRef) -> bool {
    node.ancestors()
        .any(|ancestor| Rc::ptr_eq(&ancestor.0, &document.0))
}
