use std::sync::LazyLock;

use regex::Regex;

static SEPARATOR_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Maps a free-form column label to a lowercase, underscore-delimited
/// identifier. Total: every input, including the empty string, has an output.
///
/// Only ASCII letters and digits survive; every maximal run of anything else
/// (whitespace, punctuation, `_`, non-ASCII) collapses into one underscore and
/// underscores at either end are dropped.
pub fn normalize_column(label: &str) -> String {
    let lowered = label.to_ascii_lowercase();
    SEPARATOR_RUN
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}
