//! CSV storage for the raw and labeled datasets.
//!
//! The raw dataset is written one row at a time: the header once when the
//! collector starts (truncating any previous file), then each record is
//! appended by reopening the file, writing and flushing. A crash therefore
//! never loses a row that was already reported as written.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{Result, XhError};
use crate::model::{LabeledRecord, Record};

/// Header of the collector output.
pub const RAW_HEADER: [&str; 7] = [
    "Nro_Tweet",
    "Query",
    "Usuario",
    "Texto",
    "Data de Criacao",
    "Retweets",
    "Likes",
];

/// Column holding the post text.
pub const TEXT_COLUMN: &str = "Texto";
/// Column holding the originating query term.
pub const QUERY_COLUMN: &str = "Query";

/// Header of the preprocessor output.
pub const LABELED_HEADER: [&str; 3] = ["texto_limpo", "sentimento", "Query"];

/// Append-only writer for the raw dataset.
#[derive(Debug)]
pub struct RecordWriter {
    path: PathBuf,
    rows_written: u64,
}

impl RecordWriter {
    /// Create (or truncate) the dataset file and write the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parent directory cannot be
    /// created.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| XhError::path_error("create directory", parent, e))?;
            }
        }
        let file =
            File::create(&path).map_err(|e| XhError::path_error("create dataset", &path, e))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(RAW_HEADER)?;
        writer.flush()?;

        Ok(Self {
            path,
            rows_written: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records appended through this writer.
    #[must_use]
    pub const fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Append one record and flush it to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn append(&mut self, record: &Record) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| XhError::path_error("append to", &self.path, e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record([
            record.index.to_string(),
            record.query.clone(),
            record.author_name.clone(),
            record.text.clone(),
            record.created_at.clone(),
            record.retweet_count.to_string(),
            record.favorite_count.to_string(),
        ])?;
        writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }
}

/// A raw dataset row reduced to the fields the preprocessor needs.
///
/// `None` means the cell was absent or empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub text: Option<String>,
    pub query: Option<String>,
}

/// Load the text and query columns of a raw dataset.
///
/// Columns are located by header name. Short rows are tolerated; their
/// missing cells read as `None`.
///
/// # Errors
///
/// Returns [`XhError::InputNotFound`] if the file does not exist and
/// [`XhError::MissingColumn`] if either required column is absent.
pub fn read_raw_rows(path: &Path) -> Result<Vec<RawRow>> {
    if !path.exists() {
        return Err(XhError::input_not_found(path));
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| XhError::missing_column(name, path))
    };
    let text_idx = position(TEXT_COLUMN)?;
    let query_idx = position(QUERY_COLUMN)?;

    let non_empty = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_string);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(RawRow {
            text: non_empty(record.get(text_idx)),
            query: non_empty(record.get(query_idx)),
        });
    }
    Ok(rows)
}

/// Write the labeled dataset, replacing any previous file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_labeled(path: &Path, records: &[LabeledRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| XhError::path_error("create directory", parent, e))?;
        }
    }
    let file = File::create(path).map_err(|e| XhError::path_error("create dataset", path, e))?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(LABELED_HEADER)?;
    for record in records {
        writer.write_record([
            record.clean_text.as_str(),
            record.sentiment.dataset_label(),
            record.query.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sentiment;
    use tempfile::TempDir;

    fn record(index: u64, text: &str) -> Record {
        Record {
            index,
            query: "Flamengo".to_string(),
            author_name: "Ana, a torcedora".to_string(),
            text: text.to_string(),
            created_at: "Wed Jan 08 12:00:00 +0000 2025".to_string(),
            retweet_count: 1,
            favorite_count: 2,
        }
    }

    #[test]
    fn header_written_once_and_rows_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw.csv");

        let mut writer = RecordWriter::create(&path).unwrap();
        writer.append(&record(1, "primeiro\nlinha \"dois\"")).unwrap();
        writer.append(&record(2, "segundo")).unwrap();
        assert_eq!(writer.rows_written(), 2);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), RAW_HEADER);

        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.len() == RAW_HEADER.len()));
        assert_eq!(&rows[0][3], "primeiro\nlinha \"dois\"");
        assert_eq!(&rows[0][2], "Ana, a torcedora");
        assert_eq!(&rows[1][0], "2");
    }

    #[test]
    fn create_truncates_previous_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(&path, "old,content\n1,2\n").unwrap();

        RecordWriter::create(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("Nro_Tweet,Query"));
    }

    #[test]
    fn read_raw_rows_marks_empty_cells_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(
            &path,
            "Nro_Tweet,Query,Usuario,Texto\n1,Gremio,ana,Bom dia\n2,,bia,Oi\n3,Gremio,caio,\n4,Gremio\n",
        )
        .unwrap();

        let rows = read_raw_rows(&path).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].text.as_deref(), Some("Bom dia"));
        assert_eq!(rows[1].query, None);
        assert_eq!(rows[2].text, None);
        assert_eq!(rows[3].text, None);
        assert_eq!(rows[3].query.as_deref(), Some("Gremio"));
    }

    #[test]
    fn read_raw_rows_requires_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(&path, "Nro_Tweet,Texto\n1,Oi\n").unwrap();

        match read_raw_rows(&path) {
            Err(XhError::MissingColumn { column, .. }) => assert_eq!(column, "Query"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            read_raw_rows(&dir.path().join("missing.csv")),
            Err(XhError::InputNotFound { .. })
        ));
    }

    #[test]
    fn write_labeled_uses_dataset_labels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("labeled.csv");
        let records = vec![
            LabeledRecord {
                clean_text: "Que jogo!".to_string(),
                sentiment: Sentiment::Positive,
                query: "Palmeiras".to_string(),
            },
            LabeledRecord {
                clean_text: String::new(),
                sentiment: Sentiment::Neutral,
                query: "Gremio".to_string(),
            },
        ];
        write_labeled(&path, &records).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "texto_limpo,sentimento,Query");
        assert_eq!(lines[1], "Que jogo!,Positivo,Palmeiras");
        assert_eq!(lines[2], ",Neutro,Gremio");
    }
}
