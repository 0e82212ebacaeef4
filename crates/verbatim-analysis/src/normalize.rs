//! Text normalization for uploaded comments.
//!
//! This module turns a raw comment into a [`NormalizedText`]:
//! - Emoji and hashtag side channels extracted from the raw text
//! - Cleaned text: lowercase, no URLs, mentions, hashtags or punctuation
//! - Lemmas of the cleaned text, via a [`Lemmatizer`]
//!
//! Emoji detection tests one code point at a time against the Unicode emoji
//! database. Multi-codepoint sequences (ZWJ families, flags, keycaps) are not
//! recognized as a single emoji; this is a known limitation.

use std::sync::Arc;

use regex::Regex;
use verbatim_core::{Lemmatizer, NormalizedText};

use crate::error::{AnalysisError, AnalysisResult};

/// URL-like runs: `http` followed by non-whitespace.
const URL_PATTERN: &str = r"http\S+";

/// `@mention` tokens.
const MENTION_PATTERN: &str = r"@\w+";

/// `#hashtag` tokens, hyphens included.
const HASHTAG_TOKEN_PATTERN: &str = r"#[\w\-]+";

/// Hashtag bodies captured for the side channel.
const HASHTAG_CAPTURE_PATTERN: &str = r"#(\w+)";

/// Anything that is not a letter (accented Latin included), digit or space.
const DISALLOWED_PATTERN: &str = r"[^a-zA-ZÀ-ÿ0-9\s]";

/// Whitespace runs.
const WHITESPACE_PATTERN: &str = r"\s+";

/// Normalizes raw comments.
///
/// Cheap to clone; the lemmatizer is shared.
#[derive(Clone)]
pub struct Normalizer {
    lemmatizer: Arc<dyn Lemmatizer>,
    url: Regex,
    mention: Regex,
    hashtag_token: Regex,
    hashtag_capture: Regex,
    disallowed: Regex,
    whitespace: Regex,
}

impl Normalizer {
    /// Creates a normalizer around a lemmatizer.
    pub fn new(lemmatizer: Arc<dyn Lemmatizer>) -> AnalysisResult<Self> {
        Ok(Self {
            lemmatizer,
            url: compile(URL_PATTERN)?,
            mention: compile(MENTION_PATTERN)?,
            hashtag_token: compile(HASHTAG_TOKEN_PATTERN)?,
            hashtag_capture: compile(HASHTAG_CAPTURE_PATTERN)?,
            disallowed: compile(DISALLOWED_PATTERN)?,
            whitespace: compile(WHITESPACE_PATTERN)?,
        })
    }

    /// Normalizes one raw comment.
    pub fn normalize(&self, raw_text: &str) -> NormalizedText {
        let cleaned_text = self.clean(raw_text);
        let lemma_tokens = self.lemmatizer.lemmatize(&cleaned_text);

        NormalizedText {
            emojis: extract_emojis(raw_text),
            hashtags: self.extract_hashtags(raw_text),
            lemma_tokens,
            cleaned_text,
        }
    }

    /// Cleans raw text. Applying it to its own output changes nothing.
    pub fn clean(&self, raw_text: &str) -> String {
        let text = raw_text.to_lowercase();
        let text = self.url.replace_all(&text, "");
        let text = self.mention.replace_all(&text, "");
        let text = self.hashtag_token.replace_all(&text, "");
        let text = self.disallowed.replace_all(&text, " ");
        let text = self.whitespace.replace_all(&text, " ");
        text.trim().to_string()
    }

    /// Returns hashtag bodies (without `#`) in order of appearance.
    pub fn extract_hashtags(&self, raw_text: &str) -> Vec<String> {
        self.hashtag_capture
            .captures_iter(raw_text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer").finish_non_exhaustive()
    }
}

/// Returns every emoji code point of `raw_text`, in order, duplicates kept.
pub fn extract_emojis(raw_text: &str) -> Vec<String> {
    let mut buf = [0u8; 4];
    raw_text
        .chars()
        .filter(|c| !c.is_ascii())
        .filter(|c| emojis::get(c.encode_utf8(&mut buf)).is_some())
        .map(String::from)
        .collect()
}

fn compile(pattern: &str) -> AnalysisResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| AnalysisError::InvalidParameter(format!("pattern {}: {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lemma::LexiconLemmatizer;

    fn normalizer() -> Normalizer {
        Normalizer::new(Arc::new(LexiconLemmatizer::builtin())).unwrap()
    }

    #[test]
    fn side_channels_and_cleaning() {
        let normalized = normalizer().normalize("Bonjour 😀 #super http://x.com @bob");

        assert_eq!(normalized.emojis, vec!["😀"]);
        assert_eq!(normalized.hashtags, vec!["super"]);
        assert_eq!(normalized.cleaned_text, "bonjour");
        assert!(!normalized.cleaned_text.contains("x.com"));
        assert!(!normalized.cleaned_text.contains("bob"));
        assert!(!normalized.cleaned_text.contains("super"));
    }

    #[test]
    fn emojis_keep_order_and_duplicates() {
        assert_eq!(extract_emojis("👍 top 😡 👍"), vec!["👍", "😡", "👍"]);
    }

    #[test]
    fn emojis_ignore_plain_text() {
        assert!(extract_emojis("Très bien, merci !").is_empty());
        assert!(extract_emojis("#1 @2").is_empty());
    }

    #[test]
    fn hashtags_in_order() {
        let tags = normalizer().extract_hashtags("#Promo top #livraison_rapide et #promo");
        assert_eq!(tags, vec!["Promo", "livraison_rapide", "promo"]);
    }

    #[test]
    fn clean_keeps_accents_and_digits() {
        let cleaned = normalizer().clean("Livré en 48H, très DÉÇU!!!");
        assert_eq!(cleaned, "livré en 48h très déçu");
    }

    #[test]
    fn clean_removes_hyphenated_hashtags() {
        let cleaned = normalizer().clean("Génial #black-friday vraiment");
        assert_eq!(cleaned, "génial vraiment");
    }

    #[test]
    fn clean_collapses_whitespace() {
        let cleaned = normalizer().clean("  a\t\tb \n c  ");
        assert_eq!(cleaned, "a b c");
    }

    #[test]
    fn clean_is_idempotent() {
        let n = normalizer();
        let samples = [
            "Bonjour 😀 #super http://x.com @bob",
            "L'article est arrivé cassé... remboursement?",
            "http https://a.b/c?d=e http",
            "Prix: 12,99€ — trop cher!!",
            "ÉNORME déception, l'équipe @SAV ne répond pas",
            "",
        ];
        for sample in samples {
            let once = n.clean(sample);
            assert_eq!(n.clean(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn lemmas_come_from_cleaned_text() {
        let normalized = normalizer().normalize("Les produits sont arrivés, #top");
        assert_eq!(normalized.cleaned_text, "les produits sont arrivés");
        assert_eq!(normalized.lemma_tokens, vec!["produit", "arrivés"]);
        assert_eq!(normalized.lemma_text(), "produit arrivés");
    }

    #[test]
    fn empty_text() {
        let normalized = normalizer().normalize("");
        assert_eq!(normalized, NormalizedText::default());
    }
}
