//! Uploaded tables.
//!
//! The analyst uploads a spreadsheet exported as CSV and picks the column
//! holding the comments. Row indices are kept so every record traces back to
//! its line in the upload.

use std::io::Read;

use verbatim_core::{CommentRow, RecordId};

use crate::error::InputError;

/// Column used for dates when none is named explicitly.
pub const DEFAULT_DATE_COLUMN: &str = "date";

const BOM: char = '\u{feff}';

/// A headered table of string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Parses a headered CSV document.
    ///
    /// Rows may be shorter or longer than the header; missing cells read as
    /// absent. A leading byte-order mark is ignored.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, InputError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches(BOM) } else { h };
                h.trim().to_string()
            })
            .collect();

        if headers.iter().all(String::is_empty) {
            return Err(InputError::Malformed("missing header row".into()));
        }

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        tracing::debug!(columns = headers.len(), rows = rows.len(), "Parsed CSV table");
        Ok(Self { headers, rows })
    }

    /// Builds a table from headers and rows.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by exact (trimmed) name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h == name)
    }

    /// Extracts comment rows.
    ///
    /// `text_column` must exist. `date_column` is optional: when `None`, a
    /// column named `date` is used if present; a named but absent date
    /// column means no dates.
    pub fn comment_rows(
        &self,
        text_column: &str,
        date_column: Option<&str>,
    ) -> Result<Vec<CommentRow>, InputError> {
        let text_index =
            self.column_index(text_column)
                .ok_or_else(|| InputError::MissingColumn {
                    column: text_column.to_string(),
                    available: self.headers.clone(),
                })?;

        let date_index = match date_column {
            Some(name) => {
                let index = self.column_index(name);
                if index.is_none() {
                    tracing::warn!(column = name, "Date column not found, ignoring dates");
                }
                index
            }
            None => self.column_index(DEFAULT_DATE_COLUMN),
        };

        Ok(self
            .rows
            .iter()
            .enumerate()
            .map(|(row, cells)| CommentRow {
                id: RecordId::from_row(row),
                text: cells.get(text_index).cloned(),
                date: date_index
                    .and_then(|i| cells.get(i))
                    .filter(|d| !d.trim().is_empty())
                    .cloned(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "id,commentaire,date\n\
                          1,Très bon produit,2024-01-05\n\
                          2,,2024-01-06\n\
                          3,\"Livraison lente, colis abîmé\",\n";

    #[test]
    fn parses_headers_and_rows() {
        let table = Table::from_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.headers(), &["id", "commentaire", "date"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn comment_rows_keep_row_index() {
        let table = Table::from_csv(SAMPLE.as_bytes()).unwrap();
        let rows = table.comment_rows("commentaire", None).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id, RecordId(0));
        assert_eq!(rows[0].text.as_deref(), Some("Très bon produit"));
        assert_eq!(rows[0].date.as_deref(), Some("2024-01-05"));
        assert_eq!(rows[1].usable_text(), None);
        assert_eq!(rows[2].id, RecordId(2));
        assert_eq!(rows[2].text.as_deref(), Some("Livraison lente, colis abîmé"));
        assert_eq!(rows[2].date, None);
    }

    #[test]
    fn missing_text_column() {
        let table = Table::from_csv(SAMPLE.as_bytes()).unwrap();
        let err = table.comment_rows("avis", None).unwrap_err();
        match err {
            InputError::MissingColumn { column, available } => {
                assert_eq!(column, "avis");
                assert_eq!(available, vec!["id", "commentaire", "date"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn absent_date_column_means_no_dates() {
        let table = Table::from_csv(SAMPLE.as_bytes()).unwrap();
        let rows = table.comment_rows("commentaire", Some("jour")).unwrap();
        assert!(rows.iter().all(|r| r.date.is_none()));
    }

    #[test]
    fn strips_bom_and_tolerates_ragged_rows() {
        let data = "\u{feff}texte,note\nbien,5\ncourt\n";
        let table = Table::from_csv(data.as_bytes()).unwrap();
        assert_eq!(table.headers()[0], "texte");

        let rows = table.comment_rows("texte", None).unwrap();
        assert_eq!(rows[1].text.as_deref(), Some("court"));
    }

    #[test]
    fn short_row_has_no_text() {
        let table = Table::new(
            vec!["a".into(), "b".into()],
            vec![vec!["x".into()]],
        );
        let rows = table.comment_rows("b", None).unwrap();
        assert_eq!(rows[0].text, None);
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let data: &[u8] = b"texte\n\xff\xfe\n";
        let err = Table::from_csv(data)
            .and_then(|t| t.comment_rows("texte", None))
            .unwrap_err();
        assert!(matches!(err, InputError::Malformed(_)));
    }

    #[test]
    fn empty_document_is_malformed() {
        assert!(matches!(
            Table::from_csv("".as_bytes()),
            Err(InputError::Malformed(_))
        ));
    }
}
