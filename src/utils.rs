use once_cell::sync::Lazy;
use regex::Regex;

static HTTP_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^http://").unwrap());
static HTTPS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https://").unwrap());
static TRAILING_SLASH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"/+$").unwrap());

pub(crate) fn is_ws_url(url: &str) -> bool {
    url.find(':').is_some_and(|colon_idx| {
        let scheme = &url[..colon_idx].to_ascii_lowercase();
        matches!(scheme.as_str(), "ws" | "wss" | "http" | "https") && url.len() > colon_idx + 3
    })
}

pub(crate) fn is_http_url(url: &str) -> bool {
    (HTTP_REGEX.is_match(url) || HTTPS_REGEX.is_match(url)) && is_ws_url(url)
}

/// Maps `http(s)://` to `ws(s)://`, leaving websocket urls untouched.
pub(crate) fn http_to_ws(http_url: &str) -> String {
    let replaced_http = HTTP_REGEX.replace(http_url, "ws://");
    let replaced_https = HTTPS_REGEX.replace(&replaced_http, "wss://");
    String::from(replaced_https)
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = TRAILING_SLASH_REGEX.replace(base, "");
    format!("{base}/{}", path.trim_start_matches('/'))
}
