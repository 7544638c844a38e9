//! Batch orchestration: runs one translation job per target language and
//! reports progress over the event channel.
//!
//! A failed language never aborts the batch; only source-parse errors, a
//! completely empty provider chain, or an unknown target code do.

use crate::config::Config;
use crate::document::{self, SourceDocument};
use crate::error::{Result, TranslatorError};
use crate::events::{BatchEvent, CancelToken, EventSink, LogLevel, ServiceReported};
use crate::languages::{LanguageRegistry, LanguageSpec};
use crate::providers::{ProviderChain, ServiceUsed};
use crate::walker::walk;
use std::collections::HashSet;
use tokio::sync::mpsc;

/// Outcome of one per-language job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub language: String,
    pub succeeded: bool,
    pub service: ServiceReported,
}

/// Clone, translate and write one language.
async fn run_language_job(
    config: &Config,
    source: &SourceDocument,
    language: &LanguageSpec,
    chain: &mut ProviderChain,
    sink: &EventSink,
    cancel: &CancelToken,
) -> Result<JobResult> {
    let mut tree = source.root.clone();
    let mut used: HashSet<ServiceUsed> = HashSet::new();

    walk(&mut tree, chain, language, &mut used, sink, cancel).await;

    // A walk interrupted by cancellation must not produce a partial file.
    if cancel.is_cancelled() {
        return Ok(JobResult {
            language: language.code.to_string(),
            succeeded: false,
            service: ServiceReported::None,
        });
    }

    let rendered = document::serialize(&tree, source.declaration.as_deref())?;
    let output_path = config.output_dir.join(format!("{}.xml", language.code));
    std::fs::write(&output_path, rendered)?;
    sink.log(LogLevel::Info, format!("Saved: {}", output_path.display()));

    Ok(JobResult {
        language: language.code.to_string(),
        succeeded: true,
        service: reported_service(&used),
    })
}

/// The service shown for a finished language: the primary wins if it served
/// anything, then the secondary, then none.
fn reported_service(used: &HashSet<ServiceUsed>) -> ServiceReported {
    if used.contains(&ServiceUsed::Primary) {
        ServiceReported::Primary
    } else if used.contains(&ServiceUsed::Secondary) {
        ServiceReported::Secondary
    } else {
        ServiceReported::None
    }
}

/// Runs the whole batch on a worker task and reports through the channel.
pub struct BatchOrchestrator {
    config: Config,
    sink: EventSink,
    cancel: CancelToken,
}

impl BatchOrchestrator {
    pub fn new(config: Config, cancel: CancelToken) -> (Self, mpsc::UnboundedReceiver<BatchEvent>) {
        let (sink, rx) = EventSink::channel();
        (Self { config, sink, cancel }, rx)
    }

    /// Run the batch to completion. `BatchCompleted` is emitted exactly once
    /// on every path, including errors and cancellation.
    pub async fn run(self) {
        if let Err(e) = self.run_inner().await {
            self.sink.log(LogLevel::Error, format!("Critical error: {e}"));
            self.sink.status("Translation failed!");
        }
        self.sink.batch_completed();
    }

    async fn run_inner(&self) -> Result<()> {
        self.sink
            .log(LogLevel::Info, "Starting translation process...");

        let mut chain =
            ProviderChain::initialize(&self.config, &self.sink, self.cancel.clone()).await;
        if !chain.has_any_provider() {
            self.sink
                .log(LogLevel::Error, "No translation services available!");
            return Err(TranslatorError::NoProviders);
        }

        std::fs::create_dir_all(&self.config.output_dir)?;

        self.sink.status("Parsing source XML file...");
        let content = std::fs::read_to_string(&self.config.source_file).map_err(|e| {
            TranslatorError::SourceParse(format!(
                "cannot read {}: {e}",
                self.config.source_file.display()
            ))
        })?;
        let source = document::parse(&content)?;

        // Unknown codes abort the whole batch before any network traffic.
        let registry = LanguageRegistry::get();
        let mut targets = Vec::new();
        for code in &self.config.target_languages {
            let spec = registry.get_by_code(code).ok_or_else(|| {
                TranslatorError::Critical(format!("unknown target language: '{code}'"))
            })?;
            targets.push(spec);
        }

        let total = targets.len();
        let mut stopped = false;

        for (index, language) in targets.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                self.sink
                    .log(LogLevel::Warning, "Translation process stopped by user");
                stopped = true;
                break;
            }

            self.sink
                .status(format!("Translating to {}...", language.name));

            match run_language_job(
                &self.config,
                &source,
                language,
                &mut chain,
                &self.sink,
                &self.cancel,
            )
            .await
            {
                Ok(result) if result.succeeded => {
                    self.sink.log(
                        LogLevel::Success,
                        format!(
                            "Successfully translated {} using {}",
                            language.name,
                            result.service.label()
                        ),
                    );
                    self.sink
                        .language_completed(language.code, true, result.service);
                }
                Ok(result) => {
                    // Cancelled mid-walk: no file, no completion event.
                    debug_assert!(!result.succeeded);
                }
                Err(e) => {
                    self.sink.log(
                        LogLevel::Error,
                        format!("Failed to translate {}: {e}", language.name),
                    );
                    self.sink
                        .language_completed(language.code, false, ServiceReported::None);
                }
            }

            self.sink.progress(index + 1, total);
        }

        if stopped || self.cancel.is_cancelled() {
            self.sink.status("Translation stopped");
        } else {
            self.sink.status("Translation completed!");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reported_service_primary_wins() {
        let used = HashSet::from([ServiceUsed::Secondary, ServiceUsed::Primary]);
        assert_eq!(reported_service(&used), ServiceReported::Primary);
    }

    #[test]
    fn test_reported_service_secondary() {
        let used = HashSet::from([ServiceUsed::Secondary]);
        assert_eq!(reported_service(&used), ServiceReported::Secondary);
    }

    #[test]
    fn test_reported_service_none() {
        assert_eq!(reported_service(&HashSet::new()), ServiceReported::None);
    }
}
