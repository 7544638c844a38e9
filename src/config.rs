use crate::languages::{detect_source_language, LanguageRegistry};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEEPL_KEY_PLACEHOLDER: &str = "YOUR_DEEPL_API_KEY_HERE";

#[derive(Debug, Clone)]
pub struct Config {
    // Source document
    pub source_file: PathBuf,
    pub output_dir: PathBuf,

    // Providers
    pub deepl_api_key: Option<String>,
    pub deepl_api_url: String,
    pub google_api_url: String,

    // Languages
    pub source_language: Option<String>,
    pub target_languages: Vec<String>,

    // Secondary-provider retry policy (fixed delay, no backoff)
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let source_file = PathBuf::from(
            std::env::var("SOURCE_FILE").context("SOURCE_FILE not set")?,
        );
        Self::from_env_with_source(source_file)
    }

    /// Same as `from_env`, but with the source file supplied by the caller
    /// (command-line argument takes precedence over the environment).
    pub fn from_env_with_source(source_file: PathBuf) -> Result<Self> {
        let output_dir = std::env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_output_dir(&source_file));

        // A placeholder key left over from a config template counts as no key.
        let deepl_api_key = std::env::var("DEEPL_API_KEY")
            .ok()
            .filter(|key| !key.is_empty() && key != DEEPL_KEY_PLACEHOLDER);

        let source_language = std::env::var("SOURCE_LANGUAGE").ok().or_else(|| {
            source_file
                .file_name()
                .and_then(|name| detect_source_language(&name.to_string_lossy()))
                .map(str::to_string)
        });

        let target_languages = match std::env::var("TARGET_LANGUAGES") {
            Ok(list) => parse_target_list(&list)?,
            Err(_) => default_targets(source_language.as_deref()),
        };

        Ok(Self {
            source_file,
            output_dir,
            deepl_api_key,
            deepl_api_url: std::env::var("DEEPL_API_URL")
                .unwrap_or_else(|_| "https://api-free.deepl.com/v2".to_string()),
            google_api_url: std::env::var("GOOGLE_API_URL").unwrap_or_else(|_| {
                "https://translate.googleapis.com/translate_a/single".to_string()
            }),
            source_language,
            target_languages,
            retry_attempts: std::env::var("RETRY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            retry_delay: Duration::from_millis(
                std::env::var("RETRY_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(400),
            ),
        })
    }
}

/// Output files land next to the source: in the source's own directory when
/// it is already called `l10n`, otherwise in an `l10n` subdirectory.
pub fn default_output_dir(source_file: &Path) -> PathBuf {
    let parent = source_file.parent().unwrap_or_else(|| Path::new("."));
    let is_l10n_dir = parent
        .file_name()
        .map(|name| name.to_string_lossy().eq_ignore_ascii_case("l10n"))
        .unwrap_or(false);
    if is_l10n_dir {
        parent.to_path_buf()
    } else {
        parent.join("l10n")
    }
}

fn parse_target_list(list: &str) -> Result<Vec<String>> {
    let registry = LanguageRegistry::get();
    let mut targets = Vec::new();
    for code in list.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if !registry.is_supported(code) {
            bail!("unsupported target language: '{code}'");
        }
        targets.push(code.to_string());
    }
    if targets.is_empty() {
        bail!("TARGET_LANGUAGES is set but contains no language codes");
    }
    Ok(targets)
}

/// Every supported language except the source itself.
fn default_targets(source_language: Option<&str>) -> Vec<String> {
    LanguageRegistry::get()
        .list_all()
        .iter()
        .filter(|spec| Some(spec.code) != source_language)
        .map(|spec| spec.code.to_string())
        .collect()
}
