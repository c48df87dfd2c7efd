use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::MirrorError;

pub const DEFAULT_CONFIG_FILE: &str = "cms-mirror.json";
pub const DEFAULT_CATALOG_URL: &str = "https://data.cms.gov/provider-data/api/1/search";
pub const DEFAULT_TOPIC: &str = "Hospitals";
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_METADATA_FILE: &str = "run_metadata.json";
pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const SCHEMA_VERSION: u32 = 1;

/// On-disk configuration. Every field is optional; missing values fall back
/// to the built-in defaults.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub catalog_url: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub metadata_path: Option<String>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub catalog_url: Option<String>,
    pub topic: Option<String>,
    pub output_dir: Option<String>,
    pub metadata_path: Option<String>,
    pub workers: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub catalog_url: String,
    pub topic: String,
    pub output_dir: Utf8PathBuf,
    pub metadata_path: Utf8PathBuf,
    pub workers: usize,
    pub request_timeout: Duration,
}

impl ResolvedConfig {
    pub fn with_paths(output_dir: Utf8PathBuf, metadata_path: Utf8PathBuf) -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            output_dir,
            metadata_path,
            workers: DEFAULT_WORKERS,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, MirrorError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default(), overrides);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| MirrorError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| MirrorError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, MirrorError> {
        let schema_version = config.schema_version.unwrap_or(SCHEMA_VERSION);
        if schema_version != SCHEMA_VERSION {
            return Err(MirrorError::InvalidConfig(format!(
                "unsupported schema_version {schema_version} (expected {SCHEMA_VERSION})"
            )));
        }

        let catalog_url = overrides
            .catalog_url
            .or(config.catalog_url)
            .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());
        reqwest::Url::parse(&catalog_url)
            .map_err(|err| MirrorError::InvalidConfig(format!("catalog_url {catalog_url}: {err}")))?;

        let topic = overrides
            .topic
            .or(config.topic)
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        if topic.trim().is_empty() {
            return Err(MirrorError::InvalidConfig("topic must not be empty".to_string()));
        }

        let output_dir = Utf8PathBuf::from(
            overrides
                .output_dir
                .or(config.output_dir)
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
        );
        let metadata_path = overrides
            .metadata_path
            .or(config.metadata_path)
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| output_dir.join(DEFAULT_METADATA_FILE));

        let workers = overrides
            .workers
            .or(config.workers)
            .unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(MirrorError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }

        let timeout_secs = overrides
            .request_timeout_secs
            .or(config.request_timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(MirrorError::InvalidConfig(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            catalog_url,
            topic,
            output_dir,
            metadata_path,
            workers,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_when_empty() {
        let resolved =
            ConfigLoader::resolve_config(Config::default(), ConfigOverrides::default()).unwrap();
        assert_eq!(resolved.catalog_url, DEFAULT_CATALOG_URL);
        assert_eq!(resolved.topic, "Hospitals");
        assert_eq!(resolved.output_dir, Utf8PathBuf::from("data"));
        assert_eq!(
            resolved.metadata_path,
            Utf8PathBuf::from("data/run_metadata.json")
        );
        assert_eq!(resolved.workers, 5);
        assert_eq!(resolved.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn overrides_win_over_file() {
        let config: Config =
            serde_json::from_str(r#"{"workers": 2, "topic": "Nursing homes", "output_dir": "out"}"#)
                .unwrap();
        let overrides = ConfigOverrides {
            workers: Some(8),
            ..ConfigOverrides::default()
        };
        let resolved = ConfigLoader::resolve_config(config, overrides).unwrap();
        assert_eq!(resolved.workers, 8);
        assert_eq!(resolved.topic, "Nursing homes");
        assert_eq!(resolved.metadata_path, Utf8PathBuf::from("out/run_metadata.json"));
    }

    #[test]
    fn rejects_zero_workers() {
        let overrides = ConfigOverrides {
            workers: Some(0),
            ..ConfigOverrides::default()
        };
        let err = ConfigLoader::resolve_config(Config::default(), overrides).unwrap_err();
        assert_matches!(err, MirrorError::InvalidConfig(_));
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let config: Config = serde_json::from_str(r#"{"schema_version": 2}"#).unwrap();
        let err = ConfigLoader::resolve_config(config, ConfigOverrides::default()).unwrap_err();
        assert_matches!(err, MirrorError::InvalidConfig(message) if message.contains("schema_version"));
    }

    #[test]
    fn rejects_bad_catalog_url() {
        let overrides = ConfigOverrides {
            catalog_url: Some("not a url".to_string()),
            ..ConfigOverrides::default()
        };
        let err = ConfigLoader::resolve_config(Config::default(), overrides).unwrap_err();
        assert_matches!(err, MirrorError::InvalidConfig(_));
    }
}
