//! Language registry: single source of truth for all supported targets.
//!
//! Each game localization file is keyed by an `l10n_*` code; the registry
//! maps that code to the service codes understood by the two translation
//! providers. A missing primary code means the primary provider cannot
//! serve that language at all (Catalan, Vietnamese).

use regex::Regex;
use std::sync::OnceLock;

/// Static description of one supported target language.
#[derive(Debug, Clone)]
pub struct LanguageSpec {
    /// Localization file code, e.g. `l10n_sv`.
    pub code: &'static str,
    /// Target code for the primary (DeepL) provider; `None` when unsupported.
    pub deepl: Option<&'static str>,
    /// Target code for the secondary (Google) provider.
    pub google: Option<&'static str>,
    /// English display name, also used in the "Say ... in {name}" ladder rung.
    pub name: &'static str,
}

/// Immutable registry of every supported language, validated once at first
/// access.
pub struct LanguageRegistry {
    languages: Vec<LanguageSpec>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global registry instance, building and validating it on the
    /// first call.
    ///
    /// # Panics
    /// Panics if the static table contains an entry with an empty display
    /// name or with no usable service code; that is a build-time defect, not
    /// a runtime condition.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| {
            let languages = supported_languages();
            for spec in &languages {
                assert!(
                    !spec.name.is_empty(),
                    "language {} has an empty display name",
                    spec.code
                );
                assert!(
                    spec.deepl.is_some() || spec.google.is_some(),
                    "language {} has no usable service code",
                    spec.code
                );
            }
            LanguageRegistry { languages }
        })
    }

    pub fn get_by_code(&self, code: &str) -> Option<&LanguageSpec> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    pub fn list_all(&self) -> &[LanguageSpec] {
        &self.languages
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }
}

/// Extract the `l10n_xx` stem from a source file name, if present.
///
/// `l10n_sv.xml` and `l10n_sv_custom.xml` both yield `l10n_sv`; anything
/// without a recognizable stem yields `None` and the caller falls back to
/// provider auto-detection.
pub fn detect_source_language(file_name: &str) -> Option<&'static str> {
    static STEM: OnceLock<Regex> = OnceLock::new();
    let re = STEM.get_or_init(|| Regex::new(r"(l10n_[a-z]{2,3})").expect("stem pattern is valid"));

    let lowered = file_name.to_lowercase();
    let stem = re.find(&lowered)?.as_str();
    LanguageRegistry::get()
        .get_by_code(stem)
        .map(|spec| spec.code)
}

fn supported_languages() -> Vec<LanguageSpec> {
    vec![
        LanguageSpec { code: "l10n_br", deepl: Some("PT-BR"), google: Some("pt"), name: "Portuguese (Brazil)" },
        LanguageSpec { code: "l10n_cs", deepl: Some("CS"), google: Some("cs"), name: "Czech" },
        LanguageSpec { code: "l10n_ct", deepl: None, google: Some("ca"), name: "Catalan" },
        LanguageSpec { code: "l10n_da", deepl: Some("DA"), google: Some("da"), name: "Danish" },
        LanguageSpec { code: "l10n_de", deepl: Some("DE"), google: Some("de"), name: "German" },
        LanguageSpec { code: "l10n_ea", deepl: Some("ES"), google: Some("es"), name: "Spanish (Latin America)" },
        LanguageSpec { code: "l10n_en", deepl: Some("EN-US"), google: Some("en"), name: "English" },
        LanguageSpec { code: "l10n_es", deepl: Some("ES"), google: Some("es"), name: "Spanish (Spain)" },
        LanguageSpec { code: "l10n_fc", deepl: Some("FR"), google: Some("fr"), name: "French (Canada)" },
        LanguageSpec { code: "l10n_fi", deepl: Some("FI"), google: Some("fi"), name: "Finnish" },
        LanguageSpec { code: "l10n_fr", deepl: Some("FR"), google: Some("fr"), name: "French (France)" },
        LanguageSpec { code: "l10n_hu", deepl: Some("HU"), google: Some("hu"), name: "Hungarian" },
        LanguageSpec { code: "l10n_id", deepl: Some("ID"), google: Some("id"), name: "Indonesian" },
        LanguageSpec { code: "l10n_it", deepl: Some("IT"), google: Some("it"), name: "Italian" },
        LanguageSpec { code: "l10n_jp", deepl: Some("JA"), google: Some("ja"), name: "Japanese" },
        LanguageSpec { code: "l10n_kr", deepl: Some("KO"), google: Some("ko"), name: "Korean" },
        LanguageSpec { code: "l10n_nl", deepl: Some("NL"), google: Some("nl"), name: "Dutch" },
        LanguageSpec { code: "l10n_no", deepl: Some("NB"), google: Some("no"), name: "Norwegian" },
        LanguageSpec { code: "l10n_pl", deepl: Some("PL"), google: Some("pl"), name: "Polish" },
        LanguageSpec { code: "l10n_pt", deepl: Some("PT-PT"), google: Some("pt"), name: "Portuguese (Portugal)" },
        LanguageSpec { code: "l10n_ro", deepl: Some("RO"), google: Some("ro"), name: "Romanian" },
        LanguageSpec { code: "l10n_ru", deepl: Some("RU"), google: Some("ru"), name: "Russian" },
        LanguageSpec { code: "l10n_sv", deepl: Some("SV"), google: Some("sv"), name: "Swedish" },
        LanguageSpec { code: "l10n_tr", deepl: Some("TR"), google: Some("tr"), name: "Turkish" },
        LanguageSpec { code: "l10n_uk", deepl: Some("UK"), google: Some("uk"), name: "Ukrainian" },
        LanguageSpec { code: "l10n_vi", deepl: None, google: Some("vi"), name: "Vietnamese" },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_all_languages() {
        assert_eq!(LanguageRegistry::get().list_all().len(), 26);
    }

    #[test]
    fn test_every_entry_is_usable() {
        for spec in LanguageRegistry::get().list_all() {
            assert!(!spec.name.is_empty());
            assert!(spec.deepl.is_some() || spec.google.is_some());
        }
    }

    #[test]
    fn test_get_by_code() {
        let registry = LanguageRegistry::get();
        let swedish = registry.get_by_code("l10n_sv").expect("Swedish exists");
        assert_eq!(swedish.name, "Swedish");
        assert_eq!(swedish.deepl, Some("SV"));
        assert_eq!(swedish.google, Some("sv"));
    }

    #[test]
    fn test_get_by_code_unknown() {
        assert!(LanguageRegistry::get().get_by_code("l10n_xx").is_none());
        assert!(!LanguageRegistry::get().is_supported("nonsense"));
    }

    #[test]
    fn test_languages_without_primary_code() {
        let registry = LanguageRegistry::get();
        assert!(registry.get_by_code("l10n_ct").unwrap().deepl.is_none());
        assert!(registry.get_by_code("l10n_vi").unwrap().deepl.is_none());
    }

    #[test]
    fn test_detect_source_language_plain() {
        assert_eq!(detect_source_language("l10n_sv.xml"), Some("l10n_sv"));
    }

    #[test]
    fn test_detect_source_language_with_suffix() {
        assert_eq!(detect_source_language("l10n_de_custom.xml"), Some("l10n_de"));
    }

    #[test]
    fn test_detect_source_language_case_insensitive() {
        assert_eq!(detect_source_language("L10N_FR.XML"), Some("l10n_fr"));
    }

    #[test]
    fn test_detect_source_language_unknown() {
        assert_eq!(detect_source_language("strings.xml"), None);
        assert_eq!(detect_source_language("l10n_zz.xml"), None);
    }
}
