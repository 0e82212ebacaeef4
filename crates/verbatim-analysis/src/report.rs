//! Aggregate summaries over analysed records.
//!
//! The [`Report`] holds every table the presentation layer draws from:
//! sentiment distribution, theme and sub-theme histograms, the theme x
//! sentiment contingency table, keyword/hashtag/emoji frequencies and the
//! daily sentiment trend. Tables are keyed by plain values so any charting
//! layer can render them directly.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use verbatim_core::{Record, SentimentLabel};

/// Default number of examples returned by [`examples_containing`].
pub const DEFAULT_EXAMPLE_LIMIT: usize = 15;

/// Date-only formats accepted for temporal aggregation.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Date-time formats accepted for temporal aggregation.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// One row of a frequency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: usize,
}

/// Number of records in one (theme, sub-theme) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSubthemeCount {
    pub theme_id: usize,
    pub subtheme_id: usize,
    pub count: usize,
}

/// One row of the theme x sentiment contingency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSentimentRow {
    pub theme_id: usize,
    /// Count per label; all three labels are present.
    pub counts: BTreeMap<SentimentLabel, usize>,
}

/// Records of one sentiment on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalCount {
    pub day: NaiveDate,
    pub sentiment: SentimentLabel,
    pub count: usize,
}

/// Aggregated view of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub total_records: usize,
    /// Count per sentiment label; all three labels are present.
    pub sentiment_counts: BTreeMap<SentimentLabel, usize>,
    pub theme_counts: BTreeMap<usize, usize>,
    /// Count per sub-theme id across all themes.
    pub subtheme_counts: BTreeMap<usize, usize>,
    pub theme_subtheme_counts: Vec<ThemeSubthemeCount>,
    pub theme_sentiment: Vec<ThemeSentimentRow>,
    pub lemma_frequencies: Vec<FrequencyEntry>,
    pub hashtag_frequencies: Vec<FrequencyEntry>,
    pub emoji_frequencies: Vec<FrequencyEntry>,
    /// Daily counts per sentiment, sorted by day then label.
    pub temporal: Vec<TemporalCount>,
    /// Records whose date could not be parsed (excluded from `temporal`).
    pub unparsed_dates: usize,
}

impl Default for Report {
    fn default() -> Self {
        ReportAssembler::new().assemble(&[])
    }
}

impl Report {
    /// Count of one sentiment label.
    pub fn sentiment_count(&self, label: SentimentLabel) -> usize {
        self.sentiment_counts.get(&label).copied().unwrap_or(0)
    }
}

/// Builds [`Report`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportAssembler {
    /// Cap on each frequency table (`None` keeps every value).
    max_frequency_entries: Option<usize>,
}

impl ReportAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only the `limit` most frequent values of each frequency table.
    pub fn with_frequency_limit(mut self, limit: usize) -> Self {
        self.max_frequency_entries = Some(limit);
        self
    }

    /// Aggregates `records`.
    pub fn assemble(&self, records: &[Record]) -> Report {
        let mut sentiment_counts = empty_sentiment_counts();
        let mut theme_counts = BTreeMap::new();
        let mut subtheme_counts = BTreeMap::new();
        let mut cells: BTreeMap<(usize, usize), usize> = BTreeMap::new();
        let mut theme_sentiment: BTreeMap<usize, BTreeMap<SentimentLabel, usize>> =
            BTreeMap::new();
        let mut temporal: BTreeMap<(NaiveDate, SentimentLabel), usize> = BTreeMap::new();
        let mut unparsed_dates = 0;

        for record in records {
            *sentiment_counts.entry(record.sentiment_label).or_insert(0) += 1;
            *theme_counts.entry(record.theme_id).or_insert(0) += 1;
            *subtheme_counts.entry(record.subtheme_id).or_insert(0) += 1;
            *cells
                .entry((record.theme_id, record.subtheme_id))
                .or_insert(0) += 1;
            *theme_sentiment
                .entry(record.theme_id)
                .or_insert_with(empty_sentiment_counts)
                .entry(record.sentiment_label)
                .or_insert(0) += 1;

            if let Some(raw) = record.date.as_deref() {
                match parse_day(raw) {
                    Some(day) => *temporal.entry((day, record.sentiment_label)).or_insert(0) += 1,
                    None => unparsed_dates += 1,
                }
            }
        }

        if unparsed_dates > 0 {
            tracing::debug!(unparsed_dates, "Excluded unparseable dates from temporal counts");
        }

        Report {
            total_records: records.len(),
            sentiment_counts,
            theme_counts,
            subtheme_counts,
            theme_subtheme_counts: cells
                .into_iter()
                .map(|((theme_id, subtheme_id), count)| ThemeSubthemeCount {
                    theme_id,
                    subtheme_id,
                    count,
                })
                .collect(),
            theme_sentiment: theme_sentiment
                .into_iter()
                .map(|(theme_id, counts)| ThemeSentimentRow { theme_id, counts })
                .collect(),
            lemma_frequencies: self.frequencies(records.iter().map(|r| &r.lemma_tokens)),
            hashtag_frequencies: self.frequencies(records.iter().map(|r| &r.hashtags)),
            emoji_frequencies: self.frequencies(records.iter().map(|r| &r.emojis)),
            temporal: temporal
                .into_iter()
                .map(|((day, sentiment), count)| TemporalCount {
                    day,
                    sentiment,
                    count,
                })
                .collect(),
            unparsed_dates,
        }
    }

    fn frequencies<'a>(&self, lists: impl Iterator<Item = &'a Vec<String>>) -> Vec<FrequencyEntry> {
        let mut table = frequency_table(lists.flatten().map(String::as_str));
        if let Some(limit) = self.max_frequency_entries {
            table.truncate(limit);
        }
        table
    }
}

/// Counts values by exact match, most frequent first; ties keep the order
/// of first appearance.
pub fn frequency_table<'a>(values: impl Iterator<Item = &'a str>) -> Vec<FrequencyEntry> {
    // value -> (count, first position)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, value) in values.enumerate() {
        counts.entry(value).or_insert((0, position)).0 += 1;
    }

    let mut entries: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(value, (count, first))| (value, count, first))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    entries
        .into_iter()
        .map(|(value, count, _)| FrequencyEntry {
            value: value.to_string(),
            count,
        })
        .collect()
}

fn empty_sentiment_counts() -> BTreeMap<SentimentLabel, usize> {
    SentimentLabel::ALL.iter().map(|&label| (label, 0)).collect()
}

/// Parses the calendar day of a raw date cell.
///
/// Accepts RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]`, `YYYY/MM/DD` and
/// day-first `DD/MM/YYYY`. Returns `None` for anything else.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

// ============================================================================
// Exploration
// ============================================================================

/// Token list a record can be searched by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Lemma,
    Hashtag,
    Emoji,
}

impl Facet {
    /// The tokens of `record` for this facet.
    pub fn values<'a>(&self, record: &'a Record) -> &'a [String] {
        match self {
            Self::Lemma => &record.lemma_tokens,
            Self::Hashtag => &record.hashtags,
            Self::Emoji => &record.emojis,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lemma => "lemma",
            Self::Hashtag => "hashtag",
            Self::Emoji => "emoji",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown facet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown facet '{0}' (expected lemma, hashtag or emoji)")]
pub struct UnknownFacet(pub String);

impl FromStr for Facet {
    type Err = UnknownFacet;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lemma" | "lemmas" | "word" => Ok(Self::Lemma),
            "hashtag" | "hashtags" => Ok(Self::Hashtag),
            "emoji" | "emojis" => Ok(Self::Emoji),
            _ => Err(UnknownFacet(s.to_string())),
        }
    }
}

/// Returns up to `limit` records, in row order, whose `facet` list contains
/// `value` exactly.
pub fn examples_containing<'a>(
    records: &'a [Record],
    facet: Facet,
    value: &str,
    limit: usize,
) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|record| facet.values(record).iter().any(|v| v == value))
        .take(limit)
        .collect()
}
