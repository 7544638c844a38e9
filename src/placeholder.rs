//! Placeholder freezing: shields format specifiers from the translation
//! providers.
//!
//! Localization values embed printf-style specifiers (`%s`, `%1$d`) and
//! brace placeholders (`{0}`, `{name}`) that must survive translation
//! byte-for-byte. Before a string is sent to a provider, every placeholder
//! is swapped for an inert `__PH_<n>__` marker; after translation the
//! markers are swapped back by ordinal, wherever the provider moved them.

use regex::Regex;
use std::sync::OnceLock;

/// Matches, in order: numbered/typed printf specifiers (`%s`, `%d`, `%1$s`),
/// a percent sign followed by a single word character, brace-delimited
/// identifiers and brace-delimited integers.
fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"%\d*\$?[sd]|%\w|\{\w+\}|\{\d+\}").expect("placeholder pattern is valid")
    })
}

fn marker(ordinal: usize) -> String {
    format!("__PH_{ordinal}__")
}

/// A string with its placeholders replaced by inert markers, plus the
/// ordered token list needed to invert the substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenText {
    pub text: String,
    pub tokens: Vec<String>,
}

/// Replace every placeholder in `text` with a sequential marker.
///
/// Tokens are recorded in left-to-right order of occurrence, so
/// `restore(&frozen.text, &frozen.tokens)` reproduces the input exactly.
pub fn freeze(text: &str) -> FrozenText {
    let mut out = String::with_capacity(text.len());
    let mut tokens = Vec::new();
    let mut last = 0;

    for m in placeholder_pattern().find_iter(text) {
        out.push_str(&text[last..m.start()]);
        out.push_str(&marker(tokens.len()));
        tokens.push(m.as_str().to_string());
        last = m.end();
    }
    out.push_str(&text[last..]);

    FrozenText { text: out, tokens }
}

/// Replace each marker with its original literal, by ordinal, regardless of
/// where the provider relocated it within the string.
pub fn restore(text: &str, tokens: &[String]) -> String {
    let mut result = text.to_string();
    for (ordinal, token) in tokens.iter().enumerate() {
        result = result.replace(&marker(ordinal), token);
    }
    result
}
