use std::io::Write;

use camino::Utf8Path;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::error::MirrorError;
use crate::normalize::normalize_column;

/// A fully parsed CSV table held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

impl Table {
    /// Parses the whole body up front so nothing is written for a body that
    /// turns out to be malformed halfway through.
    pub fn parse(body: &[u8]) -> Result<Self, MirrorError> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(body);
        let headers = reader
            .headers()
            .map_err(|err| MirrorError::CsvParse(err.to_string()))?
            .clone();
        if headers.is_empty() {
            return Err(MirrorError::EmptyCsv);
        }
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| MirrorError::CsvParse(err.to_string()))?;
        Ok(Self { headers, rows })
    }

    pub fn normalize_headers(mut self) -> Self {
        self.headers = self
            .headers
            .iter()
            .map(normalize_column)
            .collect::<StringRecord>();
        self
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, MirrorError> {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer
            .write_record(&self.headers)
            .map_err(|err| MirrorError::CsvParse(err.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|err| MirrorError::CsvParse(err.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|err| MirrorError::CsvParse(err.to_string()))
    }

    /// Writes the table to `destination` through a temp file in the same
    /// directory, replacing any existing file.
    pub fn write_atomic(&self, destination: &Utf8Path) -> Result<(), MirrorError> {
        let bytes = self.to_csv_bytes()?;
        let write_err = |message: String| MirrorError::CsvWrite {
            path: destination.to_string(),
            message,
        };
        let parent = destination
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let mut temp = tempfile::Builder::new()
            .prefix(".cms-mirror")
            .suffix(".csv.tmp")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| write_err(err.to_string()))?;
        temp.write_all(&bytes)
            .map_err(|err| write_err(err.to_string()))?;
        temp.flush().map_err(|err| write_err(err.to_string()))?;
        temp.persist(destination.as_std_path())
            .map_err(|err| write_err(err.error.to_string()))?;
        Ok(())
    }
}
