use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{DatasetId, parse_http_date};
use crate::error::MirrorError;

/// Persisted record of the last run whose timestamp was advanced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(default)]
    pub last_run_timestamp: Option<String>,
}

/// Reads and writes the single run metadata file.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: Utf8PathBuf,
}

impl MetadataStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the stored timestamp, `None` when no metadata file exists.
    ///
    /// Unparseable content, or a timestamp that is not an HTTP-date, is an
    /// error rather than a silent full refresh.
    pub fn load(&self) -> Result<Option<String>, MirrorError> {
        let content = match fs::read_to_string(self.path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(MirrorError::MetadataRead {
                    path: self.path.to_string(),
                    message: err.to_string(),
                });
            }
        };
        let metadata: RunMetadata =
            serde_json::from_str(&content).map_err(|err| MirrorError::MetadataParse {
                path: self.path.to_string(),
                message: err.to_string(),
            })?;
        if let Some(timestamp) = &metadata.last_run_timestamp
            && parse_http_date(timestamp).is_none()
        {
            return Err(MirrorError::MetadataParse {
                path: self.path.to_string(),
                message: format!("last_run_timestamp is not an HTTP-date: {timestamp:?}"),
            });
        }
        Ok(metadata.last_run_timestamp)
    }

    /// Overwrites the metadata file with `timestamp`.
    pub fn save(&self, timestamp: &str) -> Result<(), MirrorError> {
        let metadata = RunMetadata {
            last_run_timestamp: Some(timestamp.to_string()),
        };
        let content = serde_json::to_vec_pretty(&metadata)
            .map_err(|err| MirrorError::MetadataWrite(err.to_string()))?;
        write_bytes_atomic(&self.path, &content)
            .map_err(|err| MirrorError::MetadataWrite(err.to_string()))
    }
}

/// Directory holding one `{id}.csv` per mirrored dataset.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: Utf8PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn dataset_path(&self, id: &DatasetId) -> Utf8PathBuf {
        self.root.join(id.file_name())
    }

    pub fn ensure(&self) -> Result<(), MirrorError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| MirrorError::Filesystem(format!("create {}: {err}", self.root)))
    }
}

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        fs::create_dir_all(parent.as_std_path())?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(tmp_path.as_std_path(), content)?;
    fs::rename(tmp_path.as_std_path(), path.as_std_path())
}
