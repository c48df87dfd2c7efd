use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MirrorError {
    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("invalid dataset id: {0:?}")]
    InvalidDatasetId(String),

    #[error("catalog entry has neither id nor identifier")]
    MissingDatasetId,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("catalog unavailable: {0}")]
    #[diagnostic(help("the catalog response was not a JSON array of dataset descriptors"))]
    CatalogFormat(String),

    #[error("catalog returned no datasets for topic {0:?}")]
    EmptyCatalog(String),

    #[error("dataset request failed: {0}")]
    DatasetHttp(String),

    #[error("failed to parse CSV: {0}")]
    CsvParse(String),

    #[error("empty CSV body")]
    EmptyCsv,

    #[error("failed to write CSV to {path}: {message}")]
    CsvWrite { path: String, message: String },

    #[error("failed to read run metadata at {path}: {message}")]
    MetadataRead { path: String, message: String },

    #[error("malformed run metadata at {path}: {message}")]
    #[diagnostic(help("fix or delete the metadata file to start a full refresh"))]
    MetadataParse { path: String, message: String },

    #[error("failed to write run metadata: {0}")]
    MetadataWrite(String),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("{failed} of {total} datasets failed; run timestamp not advanced")]
    DatasetsFailed { failed: usize, total: usize },
}
