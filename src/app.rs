use std::time::{Duration, Instant};

use chrono::Utc;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::CatalogClient;
use crate::config::ResolvedConfig;
use crate::domain::{DatasetDescriptor, ProcessResult, http_date};
use crate::error::MirrorError;
use crate::fetcher::DatasetFetcher;
use crate::store::{MetadataStore, OutputDir};

#[derive(Debug, Clone, Serialize)]
pub struct DatasetOutcome {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub result: ProcessResult,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub topic: String,
    pub started_at: String,
    pub previous_timestamp: Option<String>,
    pub items: Vec<DatasetOutcome>,
    pub metadata_advanced: bool,
}

impl RunReport {
    pub fn updated(&self) -> usize {
        self.items.iter().filter(|item| item.result.is_updated()).count()
    }

    pub fn skipped(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.result, ProcessResult::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|item| item.result.is_failed()).count()
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    fn phase(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            elapsed: None,
        }
    }
}

/// Receives progress while a run is in flight. Called from worker threads.
pub trait ProgressSink: Send + Sync {
    fn event(&self, event: ProgressEvent);
}

/// Runs one mirror pass: metadata, catalog, parallel fetch, metadata.
pub struct App<C: CatalogClient, F: DatasetFetcher> {
    catalog: C,
    fetcher: F,
    metadata: MetadataStore,
    output: OutputDir,
    topic: String,
    workers: usize,
}

impl<C: CatalogClient, F: DatasetFetcher> App<C, F> {
    pub fn new(config: &ResolvedConfig, catalog: C, fetcher: F) -> Self {
        Self {
            catalog,
            fetcher,
            metadata: MetadataStore::new(config.metadata_path.clone()),
            output: OutputDir::new(config.output_dir.clone()),
            topic: config.topic.clone(),
            workers: config.workers,
        }
    }

    /// Fails without touching the metadata file when the catalog is
    /// unreachable, unparseable or empty. Otherwise returns a report, and the
    /// stored timestamp moves to this run's start only if no dataset failed.
    pub fn run(&self, sink: &dyn ProgressSink) -> Result<RunReport, MirrorError> {
        let previous = self.metadata.load()?;
        let started_at = http_date(Utc::now());
        match &previous {
            Some(timestamp) => info!(%timestamp, "previous run found"),
            None => info!("no previous run; fetching everything"),
        }
        sink.event(ProgressEvent::phase(format!(
            "phase=Resolve; last run {}",
            previous.as_deref().unwrap_or("never")
        )));

        self.output.ensure()?;

        sink.event(ProgressEvent::phase(format!(
            "phase=Catalog; searching topic {:?}",
            self.topic
        )));
        let descriptors = self.catalog.search(&self.topic)?;
        if descriptors.is_empty() {
            return Err(MirrorError::EmptyCatalog(self.topic.clone()));
        }
        info!(count = descriptors.len(), topic = %self.topic, "catalog resolved");

        let items = self.fetch_all(&descriptors, previous.as_deref(), sink)?;

        let failed = items.iter().filter(|item| item.result.is_failed()).count();
        let metadata_advanced = if failed == 0 {
            self.metadata.save(&started_at)?;
            info!(timestamp = %started_at, path = %self.metadata.path(), "run timestamp advanced");
            sink.event(ProgressEvent::phase(format!(
                "phase=Store; last run set to {started_at}"
            )));
            true
        } else {
            warn!(
                failed,
                total = items.len(),
                "datasets failed; keeping previous run timestamp"
            );
            sink.event(ProgressEvent::phase(format!(
                "phase=Store; {failed} failed, last run timestamp kept"
            )));
            false
        };

        Ok(RunReport {
            topic: self.topic.clone(),
            started_at,
            previous_timestamp: previous,
            items,
            metadata_advanced,
        })
    }

    /// Fetches every descriptor on a pool of `workers` threads and waits for
    /// all of them before returning.
    fn fetch_all(
        &self,
        descriptors: &[DatasetDescriptor],
        since: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<DatasetOutcome>, MirrorError> {
        let threads = self.workers.min(descriptors.len()).max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("cms-mirror-worker-{index}"))
            .build()
            .map_err(|err| MirrorError::WorkerPool(err.to_string()))?;

        sink.event(ProgressEvent::phase(format!(
            "phase=Fetch; {} datasets on {threads} workers",
            descriptors.len()
        )));

        let items = pool.install(|| {
            descriptors
                .par_iter()
                .map(|descriptor| {
                    let start = Instant::now();
                    let result = self.fetcher.fetch(descriptor, since);
                    let elapsed = start.elapsed();
                    sink.event(ProgressEvent {
                        message: format!("{}: {result}", descriptor.id),
                        elapsed: Some(elapsed),
                    });
                    DatasetOutcome {
                        id: descriptor.id.to_string(),
                        title: descriptor.title().map(str::to_string),
                        result,
                        elapsed_ms: elapsed.as_millis() as u64,
                    }
                })
                .collect::<Vec<_>>()
        });
        Ok(items)
    }
}
