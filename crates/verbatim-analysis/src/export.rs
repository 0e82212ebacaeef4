//! Downloadable exports of an analysis.
//!
//! - [`to_csv`]: one line per record, spreadsheet friendly
//! - [`to_text_report`]: short plain-text summary with themes and a preview
//!   of the comments

use verbatim_core::{Record, ThemeLabels};

use crate::error::{AnalysisError, AnalysisResult};

/// Columns of the CSV export, in order.
pub const CSV_COLUMNS: &[&str] = &[
    "row",
    "comment",
    "date",
    "cleaned_text",
    "lemmas",
    "emojis",
    "hashtags",
    "sentiment",
    "sentiment_score",
    "theme",
    "subtheme",
];

/// Number of comments shown in the text report preview.
pub const PREVIEW_COMMENTS: usize = 10;

/// Characters kept per previewed comment.
pub const PREVIEW_CHARS: usize = 100;

/// Title line of the text report.
pub const REPORT_TITLE: &str = "Semantic analysis report";

/// Writes one CSV line per record. List fields are space-joined.
pub fn to_csv(records: &[Record]) -> AnalysisResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS).map_err(export_error)?;

    for record in records {
        let row = record.id.row().to_string();
        let lemmas = record.lemma_tokens.join(" ");
        let emojis = record.emojis.join(" ");
        let hashtags = record.hashtags.join(" ");
        let score = format!("{:.4}", record.sentiment_score);
        let theme = record.theme_id.to_string();
        let subtheme = record.subtheme_id.to_string();

        writer
            .write_record([
                row.as_str(),
                record.raw_text.as_str(),
                record.date.as_deref().unwrap_or(""),
                record.cleaned_text.as_str(),
                lemmas.as_str(),
                emojis.as_str(),
                hashtags.as_str(),
                record.sentiment_label.as_str(),
                score.as_str(),
                theme.as_str(),
                subtheme.as_str(),
            ])
            .map_err(export_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AnalysisError::Export(e.to_string()))
}

/// Renders the plain-text report: title, theme labels, sub-theme labels and
/// a preview of the first comments.
pub fn to_text_report(records: &[Record], labels: &ThemeLabels) -> String {
    let mut out = format!("{}\n\nDetected themes:\n", REPORT_TITLE);
    for theme in &labels.themes {
        out.push_str(&format!("- {}\n", theme));
    }

    out.push_str("\nSub-themes:\n");
    for subtheme in labels.subthemes.iter().flatten() {
        out.push_str(&format!("  * {}\n", subtheme));
    }

    out.push_str("\nComment preview:\n");
    for record in records.iter().take(PREVIEW_COMMENTS) {
        out.push_str(&format!("- {}...\n", preview(&record.raw_text)));
    }

    out
}

/// First [`PREVIEW_CHARS`] characters with line breaks flattened.
fn preview(text: &str) -> String {
    text.chars()
        .take(PREVIEW_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

fn export_error(err: csv::Error) -> AnalysisError {
    AnalysisError::Export(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use verbatim_core::{NormalizedText, RecordId, Sentiment, SentimentLabel, ThemeAssignment};

    fn record(row: usize, text: &str) -> Record {
        Record::assemble(
            RecordId::from_row(row),
            text.to_string(),
            Some("2024-05-01".into()),
            NormalizedText {
                cleaned_text: "super produit".into(),
                lemma_tokens: vec!["super".into(), "produit".into()],
                emojis: vec!["😀".into()],
                hashtags: vec!["promo".into(), "top".into()],
            },
            vec![0.1, 0.2],
            Sentiment {
                label: SentimentLabel::Positive,
                score: 0.875,
            },
            ThemeAssignment {
                theme_id: 2,
                subtheme_id: 1,
            },
        )
    }

    #[test]
    fn csv_has_header_and_one_line_per_record() {
        let bytes = to_csv(&[record(3, "Super produit, 😀 #promo #top")]).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());

        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, CSV_COLUMNS);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(&row[0], "3");
        assert_eq!(&row[1], "Super produit, 😀 #promo #top");
        assert_eq!(&row[2], "2024-05-01");
        assert_eq!(&row[4], "super produit");
        assert_eq!(&row[6], "promo top");
        assert_eq!(&row[7], "POSITIVE");
        assert_eq!(&row[8], "0.8750");
        assert_eq!(&row[9], "2");
        assert_eq!(&row[10], "1");
    }

    #[test]
    fn csv_of_nothing_is_just_the_header() {
        let bytes = to_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn text_report_sections() {
        let labels = ThemeLabels::ordinal(2, 2);
        let report = to_text_report(&[record(0, "Bien reçu\nmerci")], &labels);

        assert!(report.starts_with(REPORT_TITLE));
        assert!(report.contains("- Theme 0\n"));
        assert!(report.contains("- Theme 1\n"));
        assert_eq!(report.matches("  * Sub-theme 1\n").count(), 2);
        assert!(report.contains("- Bien reçu merci...\n"));
    }

    #[test]
    fn text_report_layout() {
        let labels = ThemeLabels::ordinal(1, 2);
        let report = to_text_report(&[record(0, "Top")], &labels);

        let expected = format!(
            "{}\n\nDetected themes:\n- Theme 0\n\nSub-themes:\n  * Sub-theme 0\n  * Sub-theme 1\n\nComment preview:\n- Top...\n",
            REPORT_TITLE
        );
        assert_eq!(report, expected);
    }

    #[test]
    fn text_report_preview_is_bounded() {
        let labels = ThemeLabels::ordinal(1, 1);
        let long = "x".repeat(250);
        let records: Vec<Record> = (0..12).map(|i| record(i, &long)).collect();
        let report = to_text_report(&records, &labels);

        let previews: Vec<&str> = report.lines().filter(|l| l.starts_with("- x")).collect();
        assert_eq!(previews.len(), PREVIEW_COMMENTS);
        assert_eq!(previews[0].len(), 2 + PREVIEW_CHARS + 3);
    }
}
