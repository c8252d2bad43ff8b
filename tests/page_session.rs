use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink;

use llm_page_translator::error::TranslateError;
use llm_page_translator::providers::{ChatRequest, CompletionFuture, CompletionProvider};
use llm_page_translator::service::{self, TranslateTexts};
use llm_page_translator::settings::{ProviderConfig, ProviderPatch, Settings, SettingsPatch};
use llm_page_translator::{PageSession, PageState};

/// Scripted stand-in for the chat-completions endpoint: answers each
/// numbered input line with "<target>:<line>" as a strict JSON array,
/// recording every request it sees.
#[derive(Clone, Default)]
struct ScriptedProvider {
    calls: Arc<Mutex<Vec<ChatRequest>>>,
    fail_on_call: Option<usize>,
    reply_count: Option<usize>,
}

impl ScriptedProvider {
    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn call(&self, index: usize) -> ChatRequest {
        self.calls.lock().unwrap()[index].clone()
    }
}

impl CompletionProvider for ScriptedProvider {
    fn complete(&self, _config: &ProviderConfig, request: ChatRequest) -> CompletionFuture {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len() - 1
        };
        let fail = self.fail_on_call == Some(call_index);
        let reply_count = self.reply_count;
        Box::pin(async move {
            if fail {
                return Err(TranslateError::Provider {
                    status: Some(500),
                    detail: "scripted failure".to_string(),
                });
            }
            let target = target_of(&request.instruction);
            let mut lines = request
                .input
                .lines()
                .map(|line| line.splitn(2, ". ").nth(1).unwrap_or(line))
                .map(|line| format!("{target}:{line}"))
                .collect::<Vec<_>>();
            if let Some(cap) = reply_count {
                lines.truncate(cap);
            }
            Ok(serde_json::to_string(&lines).unwrap())
        })
    }
}

/// Pulls the target language back out of the rendered instruction
/// ("… from <source> to <target>. Preserve …").
fn target_of(instruction: &str) -> String {
    instruction
        .split(" to ")
        .nth(1)
        .and_then(|rest| rest.split('.').next())
        .unwrap_or("??")
        .to_string()
}

fn settings_with_key() -> Settings {
    let mut settings = Settings::default();
    settings.provider.api_key = "test-key".to_string();
    settings
}

fn parse(html: &str) -> NodeRef {
    kuchiki::parse_html().one(html)
}

fn text_of(document: &NodeRef, selector: &str) -> String {
    document
        .select_first(selector)
        .unwrap()
        .as_node()
        .text_contents()
}

#[tokio::test]
async fn toggle_translates_then_restores_byte_for_byte() {
    let provider = ScriptedProvider::default();
    let handle = service::spawn(settings_with_key(), provider.clone());
    let document = parse("<html><body><p>Hello world</p><span>Bonjour</span></body></html>");
    let mut session = PageSession::new(document.clone(), handle);

    let state = session.toggle_translation().await;
    assert_eq!(state, PageState::Translated);
    assert_eq!(text_of(&document, "p"), "zh-CN:Hello world");
    assert_eq!(text_of(&document, "span"), "zh-CN:Bonjour");

    let state = session.toggle_translation().await;
    assert_eq!(state, PageState::Idle);
    assert_eq!(text_of(&document, "p"), "Hello world");
    assert_eq!(text_of(&document, "span"), "Bonjour");
}

#[tokio::test]
async fn chunks_are_sequential_and_order_is_preserved() {
    let provider = ScriptedProvider::default();
    let handle = service::spawn(settings_with_key(), provider.clone());
    let items = (0..35)
        .map(|i| format!("<li>item number {i:02}</li>"))
        .collect::<String>();
    let document = parse(&format!("<html><body><ul>{items}</ul></body></html>"));
    let mut session = PageSession::new(document.clone(), handle);

    session.translate(false).await;
    assert_eq!(session.state(), PageState::Translated);

    // 35 nodes split into one chunk of 30 and one of 5, each numbered
    // from 1 again.
    assert_eq!(provider.call_count(), 2);
    assert_eq!(provider.call(0).input.lines().count(), 30);
    assert_eq!(provider.call(1).input.lines().count(), 5);
    assert!(provider.call(1).input.starts_with("1. "));

    let texts = document
        .select("li")
        .unwrap()
        .map(|li| li.as_node().text_contents())
        .collect::<Vec<_>>();
    assert_eq!(texts.len(), 35);
    for (i, text) in texts.iter().enumerate() {
        assert_eq!(text, &format!("zh-CN:item number {i:02}"));
    }
}

#[tokio::test]
async fn failed_chunk_leaves_document_untouched() {
    let provider = ScriptedProvider {
        fail_on_call: Some(1),
        ..Default::default()
    };
    let handle = service::spawn(settings_with_key(), provider.clone());
    let items = (0..35)
        .map(|i| format!("<li>item number {i:02}</li>"))
        .collect::<String>();
    let document = parse(&format!("<html><body><ul>{items}</ul></body></html>"));
    let before = document.to_string();
    let mut session = PageSession::new(document.clone(), handle);

    session.translate(false).await;

    assert_eq!(session.state(), PageState::Idle);
    assert!(session.last_error().unwrap().contains("scripted failure"));
    assert_eq!(document.to_string(), before);
    // Both chunks were attempted; the first succeeded but was never
    // applied.
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn short_translation_array_leaves_the_tail_unchanged() {
    let provider = ScriptedProvider {
        reply_count: Some(3),
        ..Default::default()
    };
    let handle = service::spawn(settings_with_key(), provider.clone());
    let document = parse(
        "<html><body><p>one one</p><p>two two</p><p>three three</p>\
         <p>four four</p><p>five five</p></body></html>",
    );
    let mut session = PageSession::new(document.clone(), handle);

    session.translate(false).await;
    assert_eq!(session.state(), PageState::Translated);

    let texts = document
        .select("p")
        .unwrap()
        .map(|p| p.as_node().text_contents())
        .collect::<Vec<_>>();
    assert_eq!(
        texts,
        vec![
            "zh-CN:one one",
            "zh-CN:two two",
            "zh-CN:three three",
            "four four",
            "five five"
        ]
    );

    // Restore still returns everything to the original values.
    session.restore();
    let texts = document
        .select("p")
        .unwrap()
        .map(|p| p.as_node().text_contents())
        .collect::<Vec<_>>();
    assert_eq!(
        texts,
        vec!["one one", "two two", "three three", "four four", "five five"]
    );
}

#[tokio::test]
async fn translate_while_translated_is_a_no_op() {
    let provider = ScriptedProvider::default();
    let handle = service::spawn(settings_with_key(), provider.clone());
    let document = parse("<html><body><p>Hello world</p></body></html>");
    let mut session = PageSession::new(document.clone(), handle);

    session.translate(false).await;
    assert_eq!(provider.call_count(), 1);

    session.translate(false).await;
    assert_eq!(provider.call_count(), 1);
    assert_eq!(session.state(), PageState::Translated);
}

#[tokio::test]
async fn forced_retranslate_restores_then_uses_current_settings() {
    let provider = ScriptedProvider::default();
    let handle = service::spawn(settings_with_key(), provider.clone());
    let document = parse("<html><body><p>Hello world</p></body></html>");
    let mut session = PageSession::new(document.clone(), handle.clone());

    session.translate(false).await;
    assert_eq!(text_of(&document, "p"), "zh-CN:Hello world");

    handle
        .update_settings(SettingsPatch {
            target_language: Some("fr".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let state = session.retranslate_page().await;
    assert_eq!(state, PageState::Translated);
    // The second attempt saw the restored original, not the previous
    // translation.
    assert_eq!(text_of(&document, "p"), "fr:Hello world");
}

#[tokio::test]
async fn missing_api_key_surfaces_configuration_error() {
    let provider = ScriptedProvider::default();
    let handle = service::spawn(Settings::default(), provider.clone());
    let document = parse("<html><body><p>Hello world</p></body></html>");
    let before = document.to_string();
    let mut session = PageSession::new(document.clone(), handle);

    session.translate(false).await;

    assert_eq!(session.state(), PageState::Idle);
    assert!(session.last_error().unwrap().contains("API key"));
    assert_eq!(document.to_string(), before);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn page_without_translatable_text_stays_idle() {
    let provider = ScriptedProvider::default();
    let handle = service::spawn(settings_with_key(), provider.clone());
    let document =
        parse("<html><body><p>a</p><script>var translated = false;</script></body></html>");
    let mut session = PageSession::new(document.clone(), handle);

    session.translate(false).await;

    assert_eq!(session.state(), PageState::Idle);
    assert!(session.last_error().is_none());
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn detached_nodes_are_skipped_on_restore() {
    let provider = ScriptedProvider::default();
    let handle = service::spawn(settings_with_key(), provider.clone());
    let document = parse("<html><body><p>Hello world</p><span>Bonjour</span></body></html>");
    let mut session = PageSession::new(document.clone(), handle);

    session.translate(false).await;
    document.select_first("span").unwrap().as_node().detach();

    session.restore();
    assert_eq!(session.state(), PageState::Idle);
    assert_eq!(text_of(&document, "p"), "Hello world");
}

#[tokio::test]
async fn auto_translate_checks_the_primary_subtag() {
    let provider = ScriptedProvider::default();
    let handle = service::spawn(settings_with_key(), provider.clone());
    let document = parse(r#"<html lang="en-US"><body><p>Hello world</p></body></html>"#);
    let mut session = PageSession::new(document.clone(), handle);

    let marked = HashMap::from([("en".to_string(), true)]);
    session.auto_translate_check(&marked).await;
    assert_eq!(session.state(), PageState::Translated);
    assert_eq!(text_of(&document, "p"), "zh-CN:Hello world");
}

#[tokio::test]
async fn auto_translate_ignores_unmarked_languages() {
    let provider = ScriptedProvider::default();
    let handle = service::spawn(settings_with_key(), provider.clone());
    let document = parse(r#"<html lang="de"><body><p>Hallo Welt</p></body></html>"#);
    let mut session = PageSession::new(document.clone(), handle);

    let marked = HashMap::from([("en".to_string(), true), ("de".to_string(), false)]);
    session.auto_translate_check(&marked).await;
    assert_eq!(session.state(), PageState::Idle);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn page_language_prefers_document_attribute() {
    let provider = ScriptedProvider::default();
    let handle = service::spawn(settings_with_key(), provider);
    let document = parse(r#"<html lang="JA"><body><p>x y</p></body></html>"#);
    let session = PageSession::new(document, handle);
    assert_eq!(session.page_language(), "ja");
}

#[tokio::test]
async fn settings_updates_merge_provider_fields() {
    let provider = ScriptedProvider::default();
    let handle = service::spawn(Settings::default(), provider);

    let updated = handle
        .update_settings(SettingsPatch {
            provider: Some(ProviderPatch {
                api_key: Some("x".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(updated.provider.api_key, "x");
    assert_eq!(
        updated.provider.endpoint,
        Settings::default().provider.endpoint
    );
    assert_eq!(
        updated.provider.timeout_ms,
        Settings::default().provider.timeout_ms
    );
}

#[tokio::test]
async fn tab_state_round_trips_through_the_service() {
    let provider = ScriptedProvider::default();
    let handle = service::spawn(Settings::default(), provider);

    handle.set_tab_translation(7, true).await.unwrap();
    handle.set_tab_translation(9, false).await.unwrap();

    let state = handle.get_tab_state().await.unwrap();
    assert_eq!(state.get(&7), Some(&true));
    assert_eq!(state.get(&9), Some(&false));
}

#[tokio::test]
async fn translate_rpc_falls_back_to_settings_for_target_and_model() {
    let provider = ScriptedProvider::default();
    let handle = service::spawn(settings_with_key(), provider.clone());

    let translations = handle
        .translate_texts(TranslateTexts {
            texts: vec!["Hello".to_string()],
            target_language: None,
            source_language: Some("en".to_string()),
            model: None,
        })
        .await
        .unwrap();

    assert_eq!(translations, vec!["zh-CN:Hello".to_string()]);
    assert_eq!(provider.call(0).model, "qwen-mt-turbo");
    assert!(provider.call(0).instruction.contains("from en to zh-CN"));
}
