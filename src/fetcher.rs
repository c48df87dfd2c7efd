use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::IF_MODIFIED_SINCE;
use tracing::{debug, info, warn};

use crate::csv_table::Table;
use crate::domain::{DatasetDescriptor, DatasetId, ProcessResult, SkipReason};
use crate::error::MirrorError;
use crate::http;
use crate::store::OutputDir;

/// Downloads one dataset and rewrites it into the output directory.
///
/// Implementations never fail outward: every problem becomes
/// [`ProcessResult::Failed`], so a call can run on a worker thread without
/// its error escaping the pool.
pub trait DatasetFetcher: Send + Sync {
    fn fetch(&self, descriptor: &DatasetDescriptor, since: Option<&str>) -> ProcessResult;
}

#[derive(Clone)]
pub struct HttpDatasetFetcher {
    client: Client,
    output: OutputDir,
}

impl HttpDatasetFetcher {
    pub fn new(output: OutputDir, timeout: Duration) -> Result<Self, MirrorError> {
        let client = http::build_client(timeout).map_err(http::client_error)?;
        Ok(Self { client, output })
    }

    fn download(
        &self,
        id: &DatasetId,
        url: &str,
        since: Option<&str>,
    ) -> Result<ProcessResult, MirrorError> {
        let mut request = self.client.get(url);
        if let Some(since) = since {
            request = request.header(IF_MODIFIED_SINCE, since);
        }

        let start = Instant::now();
        let response = request
            .send()
            .map_err(|err| MirrorError::DatasetHttp(err.to_string()))?;
        let status = response.status();
        debug!(dataset = %id, %status, latency_ms = start.elapsed().as_millis() as u64, "dataset response");

        match status {
            StatusCode::NOT_MODIFIED => Ok(ProcessResult::Skipped {
                reason: SkipReason::NotModified,
            }),
            StatusCode::OK => {
                let body = response
                    .bytes()
                    .map_err(|err| MirrorError::DatasetHttp(err.to_string()))?;
                let table = Table::parse(&body)?.normalize_headers();
                self.output.ensure()?;
                let path = self.output.dataset_path(id);
                table.write_atomic(&path)?;
                Ok(ProcessResult::Updated {
                    path: path.to_string(),
                    rows: table.rows.len(),
                })
            }
            other => Ok(ProcessResult::failed(format!(
                "unexpected status {}",
                other.as_u16()
            ))),
        }
    }
}

impl DatasetFetcher for HttpDatasetFetcher {
    fn fetch(&self, descriptor: &DatasetDescriptor, since: Option<&str>) -> ProcessResult {
        let id = &descriptor.id;
        let Some(url) = descriptor.download_url() else {
            debug!(dataset = %id, "no download URL");
            return ProcessResult::Skipped {
                reason: SkipReason::NoUrl,
            };
        };

        let result = self
            .download(id, url, since)
            .unwrap_or_else(|err| ProcessResult::failed(err.to_string()));
        match &result {
            ProcessResult::Updated { path, rows } => {
                info!(dataset = %id, path = %path, rows, "dataset updated")
            }
            ProcessResult::Skipped { reason } => {
                info!(dataset = %id, %reason, "dataset skipped")
            }
            ProcessResult::Failed { reason } => {
                warn!(dataset = %id, url, %reason, "dataset failed")
            }
        }
        result
    }
}
