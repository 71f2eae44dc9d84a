//! Heuristic output-language gate.
//!
//! Counts how many function words typical of the requested language appear
//! in a generated text versus function words typical of the default
//! language. When the requested-language count stays below the threshold
//! while the default-language count meets it, the text was almost
//! certainly generated in the wrong language. Word lists and the threshold
//! are policy parameters, overridable through configuration.

use std::collections::{HashMap, HashSet};

use crate::config::LanguageGateSettings;

/// Built-in function-word vocabularies, ten words per language
fn builtin_vocabularies() -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    map.insert(
        "pt".to_string(),
        ["que", "não", "uma", "para", "com", "por", "mais", "como", "seu", "nós"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    map.insert(
        "en".to_string(),
        ["the", "and", "that", "with", "for", "your", "this", "from", "have", "will"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    map.insert(
        "es".to_string(),
        ["los", "las", "una", "para", "con", "por", "más", "como", "pero", "nos"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    map
}

/// Language-mismatch detector with configurable vocabulary and threshold
pub struct LanguageGate {
    min_hits: usize,
    vocabularies: HashMap<String, Vec<String>>,
}

impl LanguageGate {
    /// Build from settings; configured vocabularies extend or replace the
    /// built-in ones per language code.
    pub fn new(settings: &LanguageGateSettings) -> Self {
        let mut vocabularies = builtin_vocabularies();
        for (lang, words) in &settings.vocabularies {
            vocabularies.insert(lang.clone(), words.clone());
        }
        Self {
            min_hits: settings.min_hits,
            vocabularies,
        }
    }

    /// Distinct vocabulary words present in the text
    fn hits(&self, words: &HashSet<String>, vocabulary: &[String]) -> usize {
        vocabulary
            .iter()
            .filter(|w| words.contains(&w.to_lowercase()))
            .count()
    }

    /// Whether `text` looks like it was generated in the default language
    /// instead of the requested one.
    pub fn mismatch(&self, text: &str, requested: &str, default: &str) -> bool {
        if requested.eq_ignore_ascii_case(default) {
            return false;
        }

        let (Some(requested_vocab), Some(default_vocab)) = (
            self.vocabularies.get(&requested.to_lowercase()),
            self.vocabularies.get(&default.to_lowercase()),
        ) else {
            // No vocabulary for one of the languages: nothing to judge with
            return false;
        };

        let words: HashSet<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphabetic())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_string())
            .collect();

        let requested_hits = self.hits(&words, requested_vocab);
        let default_hits = self.hits(&words, default_vocab);

        let requested_threshold = self.min_hits.min(requested_vocab.len());
        let default_threshold = self.min_hits.min(default_vocab.len());

        requested_hits < requested_threshold && default_hits >= default_threshold
    }
}
