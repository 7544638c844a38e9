use anyhow::{bail, Result};
use l10n_translator::batch::BatchOrchestrator;
use l10n_translator::config::Config;
use l10n_translator::events::{BatchEvent, CancelToken};
use std::path::PathBuf;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (absent in CI; ignored)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("l10n_translator=info".parse()?),
        )
        .init();

    // Source file: first argument wins, SOURCE_FILE is the fallback
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_env_with_source(PathBuf::from(path))?,
        None => Config::from_env()?,
    };

    info!(
        "Translating {} into {} languages",
        config.source_file.display(),
        config.target_languages.len()
    );

    let cancel = CancelToken::new();
    let (orchestrator, mut events) = BatchOrchestrator::new(config, cancel.clone());
    let worker = tokio::spawn(orchestrator.run());

    // First Ctrl-C requests a graceful stop; the worker finishes the string
    // in flight and skips the rest.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current string");
            cancel.cancel();
        }
    });

    let mut any_language_failed = false;
    let mut any_language_succeeded = false;
    let mut batch_failed = false;

    while let Some(event) = events.recv().await {
        match event {
            BatchEvent::Progress { current, total } => {
                info!("Progress: {current}/{total}");
            }
            BatchEvent::Status(status) => {
                info!("{status}");
                if status == "Translation failed!" {
                    batch_failed = true;
                }
            }
            // Already mirrored to tracing by the worker.
            BatchEvent::Log { .. } => {}
            BatchEvent::LanguageCompleted { code, success, service } => {
                if success {
                    any_language_succeeded = true;
                    info!("{code} done via {}", service.label());
                } else {
                    any_language_failed = true;
                }
            }
            BatchEvent::BatchCompleted => break,
        }
    }

    worker.await?;

    if batch_failed || (any_language_failed && !any_language_succeeded) {
        bail!("translation batch failed");
    }
    Ok(())
}
