//! Pre-order walk over a document tree, translating every translatable
//! surface in place.
//!
//! The `value` attribute is the primary payload of a localization entry;
//! a handful of descriptive attributes and inline element text are
//! translated as well. Per-string failures are logged and skipped, never
//! propagated.

use crate::document::TranslatableNode;
use crate::events::{CancelToken, EventSink, LogLevel};
use crate::languages::LanguageSpec;
use crate::providers::{ProviderChain, ServiceUsed};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

const PRIMARY_ATTRIBUTE: &str = "value";
const TEXT_ATTRIBUTES: [&str; 6] = [
    "text",
    "description",
    "tooltip",
    "title",
    "label",
    "caption",
];

const PREVIEW_CHARS: usize = 120;

/// Translate `node` and all its descendants for one target language,
/// recording every provider outcome in `used`.
pub fn walk<'a>(
    node: &'a mut TranslatableNode,
    chain: &'a mut ProviderChain,
    language: &'a LanguageSpec,
    used: &'a mut HashSet<ServiceUsed>,
    sink: &'a EventSink,
    cancel: &'a CancelToken,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        if cancel.is_cancelled() {
            return;
        }

        if let Some(value) = node.attribute(PRIMARY_ATTRIBUTE).map(str::to_string) {
            translate_attribute(node, PRIMARY_ATTRIBUTE, &value, chain, language, used, sink)
                .await;
        }

        for attr in TEXT_ATTRIBUTES {
            if let Some(value) = node.attribute(attr).map(str::to_string) {
                translate_attribute(node, attr, &value, chain, language, used, sink).await;
            }
        }

        match node.text.take() {
            Some(text) if text.trim().is_empty() => {
                // Whitespace-only content is dropped so the element
                // serializes self-closing.
            }
            Some(text) => {
                let outcome = chain.translate(&text, language).await;
                record(used, outcome.service);
                if outcome.service == ServiceUsed::Failed {
                    log_failure(sink, node, language, &text);
                }
                node.text = Some(outcome.text.unwrap_or(text));
            }
            None => {}
        }

        for child in &mut node.children {
            if cancel.is_cancelled() {
                return;
            }
            walk(child, chain, language, used, sink, cancel).await;
        }
    })
}

async fn translate_attribute(
    node: &mut TranslatableNode,
    attr: &str,
    value: &str,
    chain: &mut ProviderChain,
    language: &LanguageSpec,
    used: &mut HashSet<ServiceUsed>,
    sink: &EventSink,
) {
    if value.trim().is_empty() {
        return;
    }

    let outcome = chain.translate(value, language).await;
    record(used, outcome.service);
    match outcome.text {
        Some(translated) => node.set_attribute(attr, translated),
        None => {
            if outcome.service == ServiceUsed::Failed {
                log_failure(sink, node, language, value);
            }
        }
    }
}

fn record(used: &mut HashSet<ServiceUsed>, service: ServiceUsed) {
    if matches!(service, ServiceUsed::Primary | ServiceUsed::Secondary) {
        used.insert(service);
    }
}

fn log_failure(sink: &EventSink, node: &TranslatableNode, language: &LanguageSpec, value: &str) {
    let preview: String = value.chars().take(PREVIEW_CHARS).collect();
    sink.log(
        LogLevel::Warning,
        format!(
            "Translation FAILED for {} - key='{}', value='{preview}'",
            language.name,
            node.key()
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::{BatchEvent, EventSink};
    use crate::languages::LanguageRegistry;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn google_body(text: &str) -> serde_json::Value {
        json!([[[text, "ignored", null]], null, "en"])
    }

    fn german() -> &'static LanguageSpec {
        LanguageRegistry::get().get_by_code("l10n_de").unwrap()
    }

    async fn google_only_chain(server: &MockServer) -> ProviderChain {
        let config = Config {
            source_file: PathBuf::from("l10n_en.xml"),
            output_dir: PathBuf::from("l10n"),
            deepl_api_key: None,
            deepl_api_url: String::new(),
            google_api_url: server.uri(),
            source_language: Some("l10n_en".to_string()),
            target_languages: vec!["l10n_de".to_string()],
            retry_attempts: 1,
            retry_delay: Duration::from_millis(1),
        };
        let (sink, _rx) = EventSink::channel();
        ProviderChain::initialize(&config, &sink, CancelToken::new()).await
    }

    fn entry(name: &str, value: &str) -> TranslatableNode {
        let mut node = TranslatableNode::new("text");
        node.set_attribute("name", name.to_string());
        node.set_attribute("value", value.to_string());
        node
    }

    #[tokio::test]
    async fn test_walk_translates_value_attribute() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Hello"))
            .respond_with(ResponseTemplate::new(200).set_body_json(google_body("Hallo")))
            .mount(&server)
            .await;

        let mut chain = google_only_chain(&server).await;
        let mut root = TranslatableNode::new("l10n");
        root.children.push(entry("greeting", "Hello"));

        let (sink, _rx) = EventSink::channel();
        let mut used = HashSet::new();
        walk(&mut root, &mut chain, german(), &mut used, &sink, &CancelToken::new()).await;

        assert_eq!(root.children[0].attribute("value"), Some("Hallo"));
        assert!(used.contains(&ServiceUsed::Secondary));
    }

    #[tokio::test]
    async fn test_walk_translates_secondary_attributes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Sharp tool"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(google_body("Scharfes Werkzeug")),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "Axe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(google_body("Axt")))
            .mount(&server)
            .await;

        let mut chain = google_only_chain(&server).await;
        let mut node = TranslatableNode::new("item");
        node.set_attribute("name", "axe".to_string());
        node.set_attribute("tooltip", "Sharp tool".to_string());
        node.set_attribute("title", "Axe".to_string());

        let (sink, _rx) = EventSink::channel();
        let mut used = HashSet::new();
        walk(&mut node, &mut chain, german(), &mut used, &sink, &CancelToken::new()).await;

        assert_eq!(node.attribute("tooltip"), Some("Scharfes Werkzeug"));
        assert_eq!(node.attribute("title"), Some("Axt"));
    }

    #[tokio::test]
    async fn test_walk_skips_blank_values() {
        // No mocks mounted: a request would fail the test via Failed status.
        let server = MockServer::start().await;
        let mut chain = google_only_chain(&server).await;
        let mut root = TranslatableNode::new("l10n");
        root.children.push(entry("empty", ""));
        root.children.push(entry("spaces", "   "));

        let (sink, _rx) = EventSink::channel();
        let mut used = HashSet::new();
        walk(&mut root, &mut chain, german(), &mut used, &sink, &CancelToken::new()).await;

        assert_eq!(root.children[0].attribute("value"), Some(""));
        assert_eq!(root.children[1].attribute("value"), Some("   "));
        assert!(used.is_empty());
    }

    #[tokio::test]
    async fn test_walk_clears_blank_inline_text() {
        let server = MockServer::start().await;
        let mut chain = google_only_chain(&server).await;
        let mut node = TranslatableNode::new("note");
        node.text = Some("   ".to_string());

        let (sink, _rx) = EventSink::channel();
        let mut used = HashSet::new();
        walk(&mut node, &mut chain, german(), &mut used, &sink, &CancelToken::new()).await;

        assert_eq!(node.text, None);
    }

    #[tokio::test]
    async fn test_walk_translates_inline_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Good morning"))
            .respond_with(ResponseTemplate::new(200).set_body_json(google_body("Guten Morgen")))
            .mount(&server)
            .await;

        let mut chain = google_only_chain(&server).await;
        let mut node = TranslatableNode::new("note");
        node.text = Some("Good morning".to_string());

        let (sink, _rx) = EventSink::channel();
        let mut used = HashSet::new();
        walk(&mut node, &mut chain, german(), &mut used, &sink, &CancelToken::new()).await;

        assert_eq!(node.text.as_deref(), Some("Guten Morgen"));
    }

    #[tokio::test]
    async fn test_walk_failure_keeps_original_and_logs() {
        // Server answers every rung with an echo, so the string fails.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut chain = google_only_chain(&server).await;
        let mut root = TranslatableNode::new("l10n");
        root.children.push(entry("greeting", "Hello"));

        let (sink, mut rx) = EventSink::channel();
        let mut used = HashSet::new();
        walk(&mut root, &mut chain, german(), &mut used, &sink, &CancelToken::new()).await;

        assert_eq!(root.children[0].attribute("value"), Some("Hello"));
        // Only successful services are recorded.
        assert!(used.is_empty());

        let mut saw_failure_log = false;
        while let Ok(event) = rx.try_recv() {
            if let BatchEvent::Log { message, .. } = event {
                if message.contains("Translation FAILED") && message.contains("key='greeting'") {
                    saw_failure_log = true;
                }
            }
        }
        assert!(saw_failure_log);
    }

    #[tokio::test]
    async fn test_walk_stops_on_cancellation() {
        let server = MockServer::start().await;
        let mut chain = google_only_chain(&server).await;
        let mut root = TranslatableNode::new("l10n");
        root.children.push(entry("greeting", "Hello"));

        let cancel = CancelToken::new();
        cancel.cancel();
        let (sink, _rx) = EventSink::channel();
        let mut used = HashSet::new();
        walk(&mut root, &mut chain, german(), &mut used, &sink, &cancel).await;

        // Nothing was translated and nothing was recorded.
        assert_eq!(root.children[0].attribute("value"), Some("Hello"));
        assert!(used.is_empty());
    }
}
