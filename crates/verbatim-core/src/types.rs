//! Core data types for the Verbatim comment analysis service.
//!
//! A [`Record`] is one uploaded comment. It is built once per surviving input
//! row and carries every derived field (normalized text, sentiment, theme
//! assignment) by the time it reaches the report stage.
//!
//! All types derive `Debug`, `Clone`, `Serialize`, and `Deserialize` for
//! inspection, copying, and JSON serialization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ID Types
// ============================================================================

/// Identifier of a record: the zero-based row index in the uploaded table.
///
/// Rows dropped by the empty-text filter leave gaps, so ids of surviving
/// records always point back at the row the analyst uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Creates a RecordId from a row index.
    #[must_use]
    pub const fn from_row(row: usize) -> Self {
        Self(row as u64)
    }

    /// Returns the row index.
    #[must_use]
    pub const fn row(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row-{}", self.0)
    }
}

// ============================================================================
// Sentiment Types
// ============================================================================

/// Three-way sentiment label.
///
/// Ordering is `Negative < Neutral < Positive`, which is also the column order
/// used by contingency tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    /// All labels in display order.
    pub const ALL: [SentimentLabel; 3] = [Self::Negative, Self::Neutral, Self::Positive];

    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
            Self::Positive => "POSITIVE",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = UnknownSentimentLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEGATIVE" => Ok(Self::Negative),
            "NEUTRAL" => Ok(Self::Neutral),
            "POSITIVE" => Ok(Self::Positive),
            _ => Err(UnknownSentimentLabel(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown sentiment label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sentiment label: {0}")]
pub struct UnknownSentimentLabel(pub String);

/// Sentiment of one comment: label plus model confidence in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub score: f32,
}

impl Sentiment {
    /// The sentiment given to empty text without consulting a model.
    #[must_use]
    pub const fn neutral_empty() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.0,
        }
    }
}

// ============================================================================
// Normalization and Clustering Types
// ============================================================================

/// Output of the text normalizer for a single comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedText {
    /// Lowercased text without URLs, mentions, hashtags or punctuation.
    pub cleaned_text: String,
    /// Lemmas of the cleaned text, stopwords removed, in text order.
    pub lemma_tokens: Vec<String>,
    /// Emoji characters of the raw text in order of appearance.
    pub emojis: Vec<String>,
    /// Hashtag bodies (without `#`) of the raw text in order of appearance.
    pub hashtags: Vec<String>,
}

impl NormalizedText {
    /// The text handed to the embedding model: lemmas joined by single spaces.
    #[must_use]
    pub fn lemma_text(&self) -> String {
        self.lemma_tokens.join(" ")
    }
}

/// Theme and sub-theme of a record.
///
/// `subtheme_id` only has meaning within `theme_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThemeAssignment {
    pub theme_id: usize,
    pub subtheme_id: usize,
}

/// Ordinal display labels for themes and their sub-themes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeLabels {
    /// `"Theme 0"`, `"Theme 1"`, ...
    pub themes: Vec<String>,
    /// One list of `"Sub-theme j"` labels per theme.
    pub subthemes: Vec<Vec<String>>,
}

impl ThemeLabels {
    /// Builds labels for `n_themes` themes with `n_subthemes` sub-themes each.
    #[must_use]
    pub fn ordinal(n_themes: usize, n_subthemes: usize) -> Self {
        let themes = (0..n_themes).map(theme_label).collect();
        let subthemes = (0..n_themes)
            .map(|_| (0..n_subthemes).map(subtheme_label).collect())
            .collect();
        Self { themes, subthemes }
    }
}

/// Display label of a theme id.
#[must_use]
pub fn theme_label(theme_id: usize) -> String {
    format!("Theme {}", theme_id)
}

/// Display label of a sub-theme id.
#[must_use]
pub fn subtheme_label(subtheme_id: usize) -> String {
    format!("Sub-theme {}", subtheme_id)
}

// ============================================================================
// Core Domain Types
// ============================================================================

/// A raw input row before any processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRow {
    /// Zero-based index of the row in the uploaded table.
    pub id: RecordId,
    /// Comment text, if the cell was present.
    pub text: Option<String>,
    /// Raw date cell, if a date column was selected.
    pub date: Option<String>,
}

impl CommentRow {
    /// Creates a row with text and no date.
    pub fn new(row: usize, text: impl Into<String>) -> Self {
        Self {
            id: RecordId::from_row(row),
            text: Some(text.into()),
            date: None,
        }
    }

    /// Attaches a raw date cell.
    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Returns the text if it is present and not blank.
    pub fn usable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// One fully analysed comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub raw_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub cleaned_text: String,
    pub lemma_tokens: Vec<String>,
    pub emojis: Vec<String>,
    pub hashtags: Vec<String>,
    pub embedding: Vec<f32>,
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: f32,
    pub theme_id: usize,
    pub subtheme_id: usize,
}

impl Record {
    /// Assembles a record from the outputs of every pipeline stage.
    pub fn assemble(
        id: RecordId,
        raw_text: String,
        date: Option<String>,
        normalized: NormalizedText,
        embedding: Vec<f32>,
        sentiment: Sentiment,
        assignment: ThemeAssignment,
    ) -> Self {
        Self {
            id,
            raw_text,
            date,
            cleaned_text: normalized.cleaned_text,
            lemma_tokens: normalized.lemma_tokens,
            emojis: normalized.emojis,
            hashtags: normalized.hashtags,
            embedding,
            sentiment_label: sentiment.label,
            sentiment_score: sentiment.score,
            theme_id: assignment.theme_id,
            subtheme_id: assignment.subtheme_id,
        }
    }

    /// Returns the theme assignment of this record.
    pub fn assignment(&self) -> ThemeAssignment {
        ThemeAssignment {
            theme_id: self.theme_id,
            subtheme_id: self.subtheme_id,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_is_transparent() {
        let id = RecordId::from_row(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        assert_eq!(id.row(), 7);
        assert_eq!(id.to_string(), "row-7");
    }

    #[test]
    fn sentiment_label_serializes_upper_case() {
        let json = serde_json::to_string(&SentimentLabel::Positive).unwrap();
        assert_eq!(json, "\"POSITIVE\"");
        let parsed: SentimentLabel = serde_json::from_str("\"NEGATIVE\"").unwrap();
        assert_eq!(parsed, SentimentLabel::Negative);
    }

    #[test]
    fn sentiment_label_fromstr() {
        assert_eq!("neutral".parse::<SentimentLabel>(), Ok(SentimentLabel::Neutral));
        assert!("mixed".parse::<SentimentLabel>().is_err());
    }

    #[test]
    fn sentiment_label_order() {
        assert!(SentimentLabel::Negative < SentimentLabel::Neutral);
        assert!(SentimentLabel::Neutral < SentimentLabel::Positive);
    }

    #[test]
    fn ordinal_labels() {
        let labels = ThemeLabels::ordinal(2, 3);
        assert_eq!(labels.themes, vec!["Theme 0", "Theme 1"]);
        assert_eq!(labels.subthemes.len(), 2);
        assert_eq!(labels.subthemes[1], vec!["Sub-theme 0", "Sub-theme 1", "Sub-theme 2"]);
    }

    #[test]
    fn comment_row_usable_text() {
        assert_eq!(CommentRow::new(0, "ok").usable_text(), Some("ok"));
        assert_eq!(CommentRow::new(1, "   ").usable_text(), None);
        let missing = CommentRow {
            id: RecordId(2),
            text: None,
            date: None,
        };
        assert_eq!(missing.usable_text(), None);
    }

    #[test]
    fn record_assemble_copies_every_stage() {
        let normalized = NormalizedText {
            cleaned_text: "super produit".into(),
            lemma_tokens: vec!["super".into(), "produit".into()],
            emojis: vec!["😀".into()],
            hashtags: vec!["promo".into()],
        };
        let record = Record::assemble(
            RecordId(3),
            "Super produit 😀 #promo".into(),
            Some("2024-01-02".into()),
            normalized,
            vec![0.5, 0.5],
            Sentiment {
                label: SentimentLabel::Positive,
                score: 0.9,
            },
            ThemeAssignment {
                theme_id: 1,
                subtheme_id: 2,
            },
        );

        assert_eq!(record.lemma_tokens, vec!["super", "produit"]);
        assert_eq!(record.sentiment_label, SentimentLabel::Positive);
        assert_eq!(
            record.assignment(),
            ThemeAssignment {
                theme_id: 1,
                subtheme_id: 2
            }
        );
    }

    #[test]
    fn record_without_date_omits_field() {
        let record = Record::assemble(
            RecordId(0),
            "x".into(),
            None,
            NormalizedText::default(),
            vec![],
            Sentiment::neutral_empty(),
            ThemeAssignment {
                theme_id: 0,
                subtheme_id: 0,
            },
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("\"date\""));
    }
}
