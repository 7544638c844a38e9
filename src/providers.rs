//! Translation providers and the fallback chain between them.
//!
//! The primary provider is DeepL (structured API, needs a key); the
//! secondary is the free Google endpoint, driven through an escalating
//! ladder of prompt shapes because the bare endpoint sometimes echoes the
//! input back unchanged. A string only counts as translated when the
//! extracted result differs from the input.

use crate::config::Config;
use crate::error::{Result, TranslatorError};
use crate::events::{CancelToken, EventSink, LogLevel};
use crate::languages::LanguageSpec;
use crate::placeholder::{freeze, restore};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

/// Which provider produced (or failed to produce) a single string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceUsed {
    Primary,
    Secondary,
    /// Nothing needed translating (blank or whitespace-only input).
    None,
    /// Every provider and every ladder rung was exhausted.
    Failed,
}

/// Result of translating one string.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutcome {
    pub text: Option<String>,
    pub service: ServiceUsed,
}

impl TranslationOutcome {
    fn skipped() -> Self {
        Self { text: None, service: ServiceUsed::None }
    }

    fn failed() -> Self {
        Self { text: None, service: ServiceUsed::Failed }
    }
}

#[derive(Debug, Serialize)]
struct DeeplRequest<'a> {
    text: Vec<&'a str>,
    target_lang: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct DeeplResponse {
    translations: Vec<DeeplTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeeplTranslation {
    text: String,
}

/// DeepL API client. Construction validates the key against the usage
/// endpoint so a bad key is caught once, up front, instead of on every
/// string.
#[derive(Debug)]
pub struct DeeplClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl DeeplClient {
    pub async fn initialize(api_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::new();
        let response = client
            .get(format!("{api_url}/usage"))
            .header("Authorization", format!("DeepL-Auth-Key {api_key}"))
            .send()
            .await
            .map_err(|e| TranslatorError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_deepl_status(status.as_u16(), "usage check"));
        }

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub async fn translate(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<String> {
        let request = DeeplRequest {
            text: vec![text],
            target_lang,
            source_lang,
        };

        let response = self
            .client
            .post(format!("{}/translate", self.api_url))
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslatorError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_deepl_status(status.as_u16(), "translate"));
        }

        let body: DeeplResponse = response
            .json()
            .await
            .map_err(|e| TranslatorError::ProviderUnavailable(e.to_string()))?;

        body.translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| {
                TranslatorError::ProviderUnavailable("empty translations array".to_string())
            })
    }
}

fn classify_deepl_status(status: u16, during: &str) -> TranslatorError {
    match status {
        401 | 403 => TranslatorError::ProviderAuthentication(format!(
            "HTTP {status} during {during}"
        )),
        456 => TranslatorError::ProviderQuotaExceeded(format!(
            "HTTP {status} during {during}"
        )),
        _ => TranslatorError::ProviderUnavailable(format!("HTTP {status} during {during}")),
    }
}

/// Client for the free Google endpoint (`client=gtx`).
///
/// The endpoint is flaky, so every call runs through a fixed-delay retry
/// loop and the underlying HTTP client is thrown away and rebuilt after a
/// failed attempt.
pub struct GoogleClient {
    client: reqwest::Client,
    api_url: String,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl GoogleClient {
    pub fn new(api_url: &str, retry_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_string(),
            retry_attempts,
            retry_delay,
        }
    }

    /// One translation with retries. Returns `Ok(None)` when cancelled.
    pub async fn translate(
        &mut self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        cancel: &CancelToken,
        sink: &EventSink,
    ) -> Result<Option<String>> {
        let mut last_error = String::new();

        for attempt in 0..self.retry_attempts.max(1) {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.translate_once(text, source_lang, target_lang).await {
                Ok(translated) => return Ok(Some(translated)),
                Err(e) => {
                    last_error = e.to_string();
                    debug!(attempt, "google attempt failed: {last_error}");
                    // The free endpoint sometimes wedges a connection; a
                    // fresh client clears any pooled state.
                    self.client = reqwest::Client::new();
                }
            }
        }

        sink.log(
            LogLevel::Warning,
            format!("Google Translate gave up after retries: {last_error}"),
        );
        Err(TranslatorError::ProviderUnavailable(last_error))
    }

    async fn translate_once(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("client", "gtx"),
                ("sl", source_lang),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| TranslatorError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslatorError::ProviderUnavailable(format!(
                "HTTP {status}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranslatorError::ProviderUnavailable(e.to_string()))?;

        parse_google_response(&body)
    }
}

/// The response is nested arrays; the translation is split into segments at
/// `[0][i][0]` which are concatenated in order.
fn parse_google_response(body: &serde_json::Value) -> Result<String> {
    let segments = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            TranslatorError::ProviderUnavailable("unexpected response shape".to_string())
        })?;

    let mut out = String::new();
    for segment in segments {
        if let Some(piece) = segment.get(0).and_then(|v| v.as_str()) {
            out.push_str(piece);
        }
    }

    if out.is_empty() {
        return Err(TranslatorError::ProviderUnavailable(
            "response contained no text segments".to_string(),
        ));
    }
    Ok(out)
}

/// One rung of the secondary-provider ladder: how to wrap the text before
/// sending, and how to dig the translation out of the response.
fn ladder_prompt(rung: usize, text: &str, language_name: &str) -> String {
    match rung {
        0 => text.to_string(),
        1 => format!("Please translate: {text}"),
        2 => format!("({text})"),
        3 => format!("Say \"{text}\" in {language_name}"),
        _ => format!("The word is: {text}."),
    }
}

fn ladder_extract(rung: usize, raw: &str) -> Option<String> {
    match rung {
        0 => Some(raw.to_string()),
        1 => Some(after_colon(raw)),
        2 => Some(raw.trim().trim_matches(|c| c == '(' || c == ')').trim().to_string()),
        // A provider often drops the quotes entirely; the whole response
        // minus any stray quote characters is still a valid answer.
        3 => first_quoted_span(raw)
            .or_else(|| Some(raw.replace('"', "").trim().to_string())),
        _ => Some(after_colon(raw).trim_end_matches('.').trim().to_string()),
    }
}

/// Text after the first colon, or the whole trimmed response when the
/// provider answered without one.
fn after_colon(raw: &str) -> String {
    raw.splitn(2, ':').last().unwrap_or(raw).trim().to_string()
}

fn first_quoted_span(raw: &str) -> Option<String> {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    let re = QUOTED.get_or_init(|| Regex::new(r#""([^"]*)""#).expect("quote pattern is valid"));
    re.captures(raw).map(|c| c[1].trim().to_string())
}

/// A rung is rejected when extraction produced nothing, a blank string, or
/// a case-insensitive echo of the input.
fn needs_retry(extracted: Option<&str>, frozen_input: &str) -> bool {
    match extracted {
        None => true,
        Some(text) => {
            let text = text.trim();
            text.is_empty() || text.to_lowercase() == frozen_input.trim().to_lowercase()
        }
    }
}

/// Primary-then-secondary provider chain shared by every language job.
pub struct ProviderChain {
    primary: Option<DeeplClient>,
    secondary: Option<GoogleClient>,
    source_deepl: Option<String>,
    source_google: String,
    sink: EventSink,
    cancel: CancelToken,
}

impl ProviderChain {
    /// Build the chain from configuration, probing the primary provider's
    /// key. A failed primary never aborts startup; the chain degrades to
    /// secondary-only and the failure is surfaced as a warning.
    pub async fn initialize(config: &Config, sink: &EventSink, cancel: CancelToken) -> Self {
        let source_spec = config
            .source_language
            .as_deref()
            .and_then(|code| crate::languages::LanguageRegistry::get().get_by_code(code));

        let source_deepl = source_spec
            .and_then(|spec| spec.deepl)
            .map(|code| deepl_source_code(code));
        let source_google = source_spec
            .and_then(|spec| spec.google)
            .unwrap_or("auto")
            .to_string();

        let primary = match &config.deepl_api_key {
            Some(key) => {
                match DeeplClient::initialize(&config.deepl_api_url, key).await {
                    Ok(client) => {
                        sink.log(LogLevel::Success, "DeepL API initialized");
                        Some(client)
                    }
                    Err(e) => {
                        sink.log(
                            LogLevel::Warning,
                            format!("DeepL unavailable, falling back to Google Translate: {e}"),
                        );
                        None
                    }
                }
            }
            None => {
                sink.log(
                    LogLevel::Info,
                    "No DeepL API key configured, using Google Translate only",
                );
                None
            }
        };

        let secondary = if config.google_api_url.is_empty() {
            None
        } else {
            Some(GoogleClient::new(
                &config.google_api_url,
                config.retry_attempts,
                config.retry_delay,
            ))
        };

        Self {
            primary,
            secondary,
            source_deepl,
            source_google,
            sink: sink.clone(),
            cancel,
        }
    }

    pub fn has_any_provider(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }

    /// Translate one string: blank in, blank out; otherwise freeze
    /// placeholders, try the primary, then walk the secondary ladder.
    pub async fn translate(&mut self, text: &str, language: &LanguageSpec) -> TranslationOutcome {
        if text.trim().is_empty() {
            return TranslationOutcome::skipped();
        }

        let frozen = freeze(text);

        if let (Some(primary), Some(target)) = (&self.primary, language.deepl) {
            match primary
                .translate(&frozen.text, target, self.source_deepl.as_deref())
                .await
            {
                // A blank primary result must not erase the source string.
                Ok(translated) if !translated.trim().is_empty() => {
                    return TranslationOutcome {
                        text: Some(restore(&translated, &frozen.tokens)),
                        service: ServiceUsed::Primary,
                    };
                }
                Ok(_) => {
                    self.sink.log(
                        LogLevel::Warning,
                        format!(
                            "DeepL returned an empty translation for {}, trying Google Translate",
                            language.code
                        ),
                    );
                }
                Err(e) => {
                    self.sink.log(
                        LogLevel::Warning,
                        format!("DeepL failed for {}, trying Google Translate: {e}", language.code),
                    );
                }
            }
        }

        let Some(google) = &mut self.secondary else {
            return TranslationOutcome::failed();
        };
        let Some(target) = language.google else {
            return TranslationOutcome::failed();
        };

        for rung in 0..5 {
            if self.cancel.is_cancelled() {
                return TranslationOutcome::skipped();
            }

            let prompt = ladder_prompt(rung, &frozen.text, language.name);
            let raw = match google
                .translate(&prompt, &self.source_google, target, &self.cancel, &self.sink)
                .await
            {
                Ok(Some(raw)) => raw,
                Ok(None) => return TranslationOutcome::skipped(),
                Err(_) => continue,
            };

            let extracted = ladder_extract(rung, &raw);
            if needs_retry(extracted.as_deref(), &frozen.text) {
                debug!(rung, "google rung rejected for {}", language.code);
                continue;
            }

            // needs_retry rules out None above.
            if let Some(extracted) = extracted {
                return TranslationOutcome {
                    text: Some(restore(&extracted, &frozen.tokens)),
                    service: ServiceUsed::Secondary,
                };
            }
        }

        TranslationOutcome::failed()
    }
}

/// DeepL rejects regional source codes ("EN-US" is a valid target but not a
/// valid source), so the region suffix is dropped.
fn deepl_source_code(target_code: &str) -> String {
    target_code
        .split('-')
        .next()
        .unwrap_or(target_code)
        .to_string()
}
