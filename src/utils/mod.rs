//! Utility functions and helpers.

pub mod http;

use std::sync::OnceLock;

use regex::Regex;

static NON_ALPHANUMERIC: OnceLock<Regex> = OnceLock::new();

/// Lower-case, hyphen-separated form of `text` suitable for a URL path segment.
pub fn slugify(text: &str) -> String {
    let pattern =
        NON_ALPHANUMERIC.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid slug pattern"));
    pattern
        .replace_all(&text.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Join a site origin and an absolute path without doubling the slash.
pub fn join_site_url(site_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        site_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
