//! Dictionary-based lemmatization with stop word removal.
//!
//! This module provides the linguistic model behind the text normalizer:
//! - Tokenization on Unicode word boundaries
//! - Stop word removal for French and English text
//! - Form -> lemma lookup from a built-in dictionary, optionally extended by
//!   a tab-separated lexicon file
//!
//! Tokens missing from the dictionary are kept unchanged.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use unicode_segmentation::UnicodeSegmentation;
use verbatim_core::Lemmatizer;

use crate::error::{AnalysisError, AnalysisResult};

/// French stop words, including elided articles left over after cleaning
/// (`l'avis` becomes `l avis`).
const FRENCH_STOP_WORDS: &[&str] = &[
    "a", "ai", "aie", "aient", "aies", "ait", "alors", "as", "au", "aucun", "aura", "aurai",
    "auraient", "aurais", "aurait", "aux", "avaient", "avais", "avait", "avec", "avez", "aviez",
    "avions", "avoir", "avons", "ayant", "c", "ca", "ça", "ce", "ceci", "cela", "celle", "celui",
    "ces", "cet", "cette", "chez", "d", "dans", "de", "des", "du", "elle", "elles", "en", "es",
    "est", "et", "étaient", "étais", "était", "étant", "été", "êtes", "être", "eu", "eux", "fait",
    "fut", "il", "ils", "j", "je", "l", "la", "le", "les", "leur", "leurs", "lui", "m", "ma",
    "mais", "me", "même", "mes", "moi", "mon", "n", "ne", "nos", "notre", "nous", "on", "ont",
    "ou", "où", "par", "pas", "peu", "plus", "pour", "qu", "que", "qui", "s", "sa", "sans", "se",
    "sera", "serai", "seront", "ses", "si", "son", "sont", "suis", "sur", "t", "ta", "te", "tes",
    "toi", "ton", "tout", "tous", "très", "tu", "un", "une", "vos", "votre", "vous", "y",
];

/// Common English stop words.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "all", "am", "an", "and", "any", "are", "as", "at", "be",
    "because", "been", "before", "being", "both", "but", "by", "can", "could", "did", "do",
    "does", "doing", "for", "from", "had", "has", "have", "having", "he", "her", "here", "his",
    "how", "i", "if", "in", "into", "is", "it", "its", "just", "me", "more", "most", "my", "no",
    "nor", "not", "of", "off", "on", "once", "only", "or", "other", "our", "out", "over", "own",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "those", "through", "to", "too", "under", "until",
    "up", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "why",
    "will", "with", "would", "you", "your",
];

/// Built-in form -> lemma pairs for frequent review vocabulary.
const BUILTIN_LEMMAS: &[(&str, &str)] = &[
    // French nouns and adjectives
    ("produits", "produit"),
    ("commandes", "commande"),
    ("livraisons", "livraison"),
    ("clients", "client"),
    ("vendeurs", "vendeur"),
    ("articles", "article"),
    ("prix", "prix"),
    ("délais", "délai"),
    ("problèmes", "problème"),
    ("services", "service"),
    ("rapides", "rapide"),
    ("lentes", "lent"),
    ("lente", "lent"),
    ("lents", "lent"),
    ("chers", "cher"),
    ("chère", "cher"),
    ("chères", "cher"),
    ("bons", "bon"),
    ("bonne", "bon"),
    ("bonnes", "bon"),
    ("mauvaise", "mauvais"),
    ("mauvaises", "mauvais"),
    ("belle", "beau"),
    ("belles", "beau"),
    ("beaux", "beau"),
    ("nouvelle", "nouveau"),
    ("nouveaux", "nouveau"),
    ("contente", "content"),
    ("contents", "content"),
    ("satisfaite", "satisfait"),
    ("satisfaits", "satisfait"),
    ("déçue", "déçu"),
    ("déçus", "déçu"),
    ("déçues", "déçu"),
    ("cassée", "cassé"),
    ("cassés", "cassé"),
    // French verbs
    ("aime", "aimer"),
    ("aimé", "aimer"),
    ("adore", "adorer"),
    ("adoré", "adorer"),
    ("recommande", "recommander"),
    ("recommandé", "recommander"),
    ("arrivé", "arriver"),
    ("arrivée", "arriver"),
    ("arrive", "arriver"),
    ("reçu", "recevoir"),
    ("reçue", "recevoir"),
    ("reçois", "recevoir"),
    ("trouvé", "trouver"),
    ("trouve", "trouver"),
    ("commandé", "commander"),
    ("attendu", "attendre"),
    ("attends", "attendre"),
    ("fonctionne", "fonctionner"),
    ("marche", "marcher"),
    ("rembourser", "rembourser"),
    ("remboursé", "rembourser"),
    // English
    ("products", "product"),
    ("orders", "order"),
    ("deliveries", "delivery"),
    ("prices", "price"),
    ("loved", "love"),
    ("loves", "love"),
    ("liked", "like"),
    ("likes", "like"),
    ("arrived", "arrive"),
    ("delivered", "deliver"),
    ("broken", "break"),
    ("works", "work"),
    ("worked", "work"),
    ("recommended", "recommend"),
];

/// Lemmatizer backed by stop word lists and a form -> lemma dictionary.
#[derive(Debug, Clone)]
pub struct LexiconLemmatizer {
    stop_words: HashSet<String>,
    lemmas: HashMap<String, String>,
}

impl LexiconLemmatizer {
    /// Creates a lemmatizer with the built-in stop words and dictionary.
    pub fn builtin() -> Self {
        let stop_words = FRENCH_STOP_WORDS
            .iter()
            .chain(ENGLISH_STOP_WORDS)
            .map(|w| (*w).to_string())
            .collect();
        let lemmas = BUILTIN_LEMMAS
            .iter()
            .map(|(form, lemma)| ((*form).to_string(), (*lemma).to_string()))
            .collect();

        Self { stop_words, lemmas }
    }

    /// Creates a lemmatizer from the built-in data plus a lexicon file.
    ///
    /// A lexicon that cannot be opened or parsed is an error.
    pub fn with_lexicon_file(path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            AnalysisError::Lexicon(format!("cannot open {}: {}", path.display(), e))
        })?;

        let mut lemmatizer = Self::builtin();
        let added = lemmatizer.extend_from_reader(BufReader::new(file))?;
        tracing::info!(path = %path.display(), entries = added, "Loaded lemma lexicon");
        Ok(lemmatizer)
    }

    /// Adds `form<TAB>lemma` lines. Blank lines and `#` comments are skipped.
    ///
    /// Returns the number of entries read.
    pub fn extend_from_reader<R: BufRead>(&mut self, reader: R) -> AnalysisResult<usize> {
        let mut added = 0;

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| AnalysisError::Lexicon(e.to_string()))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (form, lemma) = trimmed
                .split_once('\t')
                .map(|(f, l)| (f.trim(), l.trim()))
                .filter(|(f, l)| !f.is_empty() && !l.is_empty())
                .ok_or_else(|| {
                    AnalysisError::Lexicon(format!(
                        "line {}: expected 'form<TAB>lemma', got '{}'",
                        index + 1,
                        trimmed
                    ))
                })?;

            self.lemmas.insert(form.to_lowercase(), lemma.to_lowercase());
            added += 1;
        }

        Ok(added)
    }

    /// Adds extra stop words.
    pub fn add_stop_words<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_words.extend(words.into_iter().map(Into::into));
    }

    /// Checks whether a token is a stop word.
    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }

    /// Number of dictionary entries.
    pub fn dictionary_len(&self) -> usize {
        self.lemmas.len()
    }

    fn lemma_of<'a>(&'a self, token: &'a str) -> &'a str {
        self.lemmas.get(token).map(String::as_str).unwrap_or(token)
    }
}

impl Default for LexiconLemmatizer {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Lemmatizer for LexiconLemmatizer {
    fn lemmatize(&self, cleaned_text: &str) -> Vec<String> {
        cleaned_text
            .unicode_words()
            .filter(|word| word.chars().any(char::is_alphanumeric))
            .filter(|word| !self.is_stop_word(word))
            .map(|word| self.lemma_of(word).trim().to_string())
            .filter(|lemma| !lemma.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;

    #[test]
    fn lemmatize_drops_stop_words() {
        let lemmatizer = LexiconLemmatizer::builtin();
        let lemmas = lemmatizer.lemmatize("le produit est arrivé très vite");
        assert_eq!(lemmas, vec!["produit", "arriver", "vite"]);
    }

    #[test]
    fn lemmatize_keeps_unknown_tokens() {
        let lemmatizer = LexiconLemmatizer::builtin();
        let lemmas = lemmatizer.lemmatize("emballage soigné");
        assert_eq!(lemmas, vec!["emballage", "soigné"]);
    }

    #[test]
    fn lemmatize_preserves_order_and_duplicates() {
        let lemmatizer = LexiconLemmatizer::builtin();
        let lemmas = lemmatizer.lemmatize("produits chers produits");
        assert_eq!(lemmas, vec!["produit", "cher", "produit"]);
    }

    #[test]
    fn lemmatize_empty() {
        let lemmatizer = LexiconLemmatizer::builtin();
        assert!(lemmatizer.lemmatize("").is_empty());
        assert!(lemmatizer.lemmatize("le la les").is_empty());
    }

    #[test]
    fn lemmatize_english() {
        let lemmatizer = LexiconLemmatizer::builtin();
        let lemmas = lemmatizer.lemmatize("the products arrived broken");
        assert_eq!(lemmas, vec!["product", "arrive", "break"]);
    }

    #[test]
    fn extend_from_reader_overrides() {
        let mut lemmatizer = LexiconLemmatizer::builtin();
        let data = "# custom lexicon\n\nemballages\temballage\nProduits\tarticle\n";
        let added = lemmatizer.extend_from_reader(Cursor::new(data)).unwrap();

        assert_eq!(added, 2);
        assert_eq!(lemmatizer.lemmatize("emballages produits"), vec!["emballage", "article"]);
    }

    #[test]
    fn extend_from_reader_rejects_malformed_line() {
        let mut lemmatizer = LexiconLemmatizer::builtin();
        let result = lemmatizer.extend_from_reader(Cursor::new("ok\tok\nbroken line\n"));
        match result {
            Err(AnalysisError::Lexicon(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected lexicon error, got {:?}", other),
        }
    }

    #[test]
    fn lexicon_file_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "colis\tpaquet").unwrap();

        let lemmatizer = LexiconLemmatizer::with_lexicon_file(file.path()).unwrap();
        assert_eq!(lemmatizer.lemmatize("colis"), vec!["paquet"]);
    }

    #[test]
    fn missing_lexicon_file_is_an_error() {
        let result = LexiconLemmatizer::with_lexicon_file("/nonexistent/lexicon.tsv");
        assert!(matches!(result, Err(AnalysisError::Lexicon(_))));
    }

    #[test]
    fn add_stop_words() {
        let mut lemmatizer = LexiconLemmatizer::builtin();
        lemmatizer.add_stop_words(["vraiment"]);
        assert_eq!(lemmatizer.lemmatize("vraiment top"), vec!["top"]);
    }
}
