use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MirrorError;

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Identifier of a remote dataset. Doubles as the output file stem, so it is
/// restricted to values that stay inside the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.0)
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatasetId {
    type Err = MirrorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && trimmed != "."
            && trimmed != ".."
            && !trimmed
                .chars()
                .any(|ch| matches!(ch, '/' | '\\' | '\0') || ch.is_control());
        if !is_valid {
            return Err(MirrorError::InvalidDatasetId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Catalog entry as it appears on the wire. `id` and `identifier` may both be
/// present; `id` wins.
#[derive(Debug, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    identifier: Option<String>,
    #[serde(rename = "downloadURL", default)]
    download_url: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// One entry of the catalog search response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct DatasetDescriptor {
    pub id: DatasetId,
    pub download_url: Option<String>,
    pub extra: Map<String, Value>,
}

impl TryFrom<RawDescriptor> for DatasetDescriptor {
    type Error = MirrorError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .or(raw.identifier)
            .ok_or(MirrorError::MissingDatasetId)?
            .parse()?;
        Ok(Self {
            id,
            download_url: raw.download_url,
            extra: raw.extra,
        })
    }
}

impl DatasetDescriptor {
    pub fn new(id: DatasetId, download_url: Option<String>) -> Self {
        Self {
            id,
            download_url,
            extra: Map::new(),
        }
    }

    /// The download location, treating a blank string as absent.
    pub fn download_url(&self) -> Option<&str> {
        self.download_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.extra.get("title").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    #[serde(rename = "no URL")]
    NoUrl,
    #[serde(rename = "not modified")]
    NotModified,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoUrl => write!(f, "no URL"),
            SkipReason::NotModified => write!(f, "not modified"),
        }
    }
}

/// Outcome of processing a single dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProcessResult {
    Skipped { reason: SkipReason },
    Updated { path: String, rows: usize },
    Failed { reason: String },
}

impl ProcessResult {
    pub fn failed(reason: impl Into<String>) -> Self {
        ProcessResult::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ProcessResult::Failed { .. })
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, ProcessResult::Updated { .. })
    }
}

impl fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessResult::Skipped { reason } => write!(f, "skipped ({reason})"),
            ProcessResult::Updated { path, rows } => write!(f, "updated {path} ({rows} rows)"),
            ProcessResult::Failed { reason } => write!(f, "failed ({reason})"),
        }
    }
}

/// Formats `at` as an RFC 1123 HTTP-date, e.g. `Wed, 21 Oct 2015 07:28:00 GMT`.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
