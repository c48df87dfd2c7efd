use std::collections::HashSet;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::DatasetDescriptor;
use crate::error::MirrorError;
use crate::http;

pub trait CatalogClient: Send + Sync {
    fn search(&self, topic: &str) -> Result<Vec<DatasetDescriptor>, MirrorError>;
}

#[derive(Clone)]
pub struct CatalogHttpClient {
    client: Client,
    base_url: String,
}

impl CatalogHttpClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MirrorError> {
        let client = http::build_client(timeout).map_err(http::client_error)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

impl CatalogClient for CatalogHttpClient {
    fn search(&self, topic: &str) -> Result<Vec<DatasetDescriptor>, MirrorError> {
        let start = Instant::now();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("theme", topic)])
            .send()
            .map_err(|err| MirrorError::CatalogHttp(err.to_string()))?;
        debug!(
            status = %response.status(),
            latency_ms = start.elapsed().as_millis() as u64,
            "catalog response"
        );

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = http::status_message(response, "catalog request failed");
            return Err(MirrorError::CatalogStatus { status, message });
        }

        let body: Value = response
            .json()
            .map_err(|err| MirrorError::CatalogFormat(err.to_string()))?;
        parse_descriptors(body)
    }
}

/// Turns a catalog response body into descriptors.
///
/// Anything other than a JSON array is an error. Array elements that do not
/// describe a usable dataset are logged and dropped, as are later entries
/// repeating an id already seen, since each id owns exactly one output file.
pub fn parse_descriptors(body: Value) -> Result<Vec<DatasetDescriptor>, MirrorError> {
    let Value::Array(items) = body else {
        return Err(MirrorError::CatalogFormat(format!(
            "expected a JSON array, got {}",
            json_kind(&body)
        )));
    };

    let mut seen = HashSet::new();
    let mut descriptors = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<DatasetDescriptor>(item) {
            Ok(descriptor) if !seen.insert(descriptor.id.clone()) => {
                warn!(index, dataset = %descriptor.id, "ignoring duplicate catalog entry")
            }
            Ok(descriptor) => descriptors.push(descriptor),
            Err(err) => warn!(index, error = %err, "ignoring unusable catalog entry"),
        }
    }
    Ok(descriptors)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
