//! Helpers for sanitizing data before it reaches log lines and span fields.
//!
//! Logs are meant to be shareable when reporting problems, so catalog API keys
//! and full library paths are kept out of them.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Masks the value of any `api_key` query parameter in a URL.
///
/// - `https://api.themoviedb.org/3/search/tv?api_key=abc&query=x` →
///   `https://api.themoviedb.org/3/search/tv?api_key=****&query=x`
/// - URLs without a key are returned unchanged.
pub fn redact_api_key(url: &str) -> String {
    let Some(query_start) = url.find('?') else {
        return url.to_string();
    };
    let (base, query) = url.split_at(query_start + 1);

    let params: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if name.eq_ignore_ascii_case("api_key") => format!("{}=****", name),
            _ => pair.to_string(),
        })
        .collect();

    format!("{}{}", base, params.join("&"))
}

/// Returns a short deterministic hash of a path, for correlating log lines
/// without printing the path.
pub fn hash_path(path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
