use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::MirrorError;

pub fn user_agent() -> String {
    format!("cms-mirror/{}", env!("CARGO_PKG_VERSION"))
}

/// Blocking client with the crate's user agent and a per-request timeout.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&user_agent()).unwrap_or(HeaderValue::from_static("cms-mirror")),
    );
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
}

pub(crate) fn status_message(response: reqwest::blocking::Response, fallback: &str) -> String {
    response
        .text()
        .ok()
        .map(|text| text.chars().take(512).collect::<String>())
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

pub(crate) fn client_error(err: reqwest::Error) -> MirrorError {
    MirrorError::HttpClient(err.to_string())
}
