//! Error taxonomy for the translation core.
//!
//! Recovery always happens at the narrowest scope: a per-string failure is a
//! `TranslationOutcome` with `ServiceUsed::Failed` (never an error), a
//! per-language failure becomes a failed `JobResult`, and only source-parse
//! errors, an empty provider chain, or errors escaping the per-language
//! boundary abort the batch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslatorError {
    /// The source document could not be read or parsed. Fatal; reported
    /// before any translation work starts.
    #[error("XML syntax error in source document: {0}")]
    SourceParse(String),

    /// The primary provider rejected the configured API key.
    #[error("provider authentication failed: {0}")]
    ProviderAuthentication(String),

    /// The primary provider's translation quota is exhausted.
    #[error("provider quota exceeded: {0}")]
    ProviderQuotaExceeded(String),

    /// A provider call failed for a transient or unclassified reason.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A single language's clone/walk/serialize failed. Logged and reported
    /// as a failed JobResult; never aborts the batch.
    #[error("translation job failed for {language}: {reason}")]
    LanguageJob { language: String, reason: String },

    /// Writing a translated document to disk failed. Treated as a language
    /// job failure by the orchestrator.
    #[error("failed to write output: {0}")]
    OutputWrite(#[from] std::io::Error),

    /// Rendering the translated tree back to XML failed.
    #[error("failed to serialize document: {0}")]
    Serialize(String),

    /// Neither the primary nor the secondary provider is usable.
    #[error("no translation service is available")]
    NoProviders,

    /// Anything escaping the per-language boundary; aborts the remaining
    /// batch.
    #[error("{0}")]
    Critical(String),
}

pub type Result<T> = std::result::Result<T, TranslatorError>;
