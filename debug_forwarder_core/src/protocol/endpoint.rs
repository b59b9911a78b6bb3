/**
 * URL rules for streaming collector endpoints.
 *
 * A collector may expose a streaming (SSE) endpoint at `/sse` next to the
 * plain POST endpoint at `/debug-data`. Two decisions depend on the shape
 * of the configured `serverUrl`:
 *
 * - whether the streaming listener should start (`is_stream_endpoint`), and
 * - where a failed POST is retried (`legacy_fallback_url`).
 *
 * Neither function validates the URL. A malformed URL simply fails to match.
 */
use super::constants::LEGACY_POST_PATH;

/// Path suffix that marks a streaming endpoint.
const STREAM_SUFFIX: &str = "/sse";

/**
 * Returns `true` when the URL path ends in `/sse` (optionally followed by a
 * single trailing slash) immediately before an optional query string.
 *
 * ```ignore
 * assert!(is_stream_endpoint("http://h/sse"));
 * assert!(is_stream_endpoint("http://h/sse/?x=1"));
 * assert!(!is_stream_endpoint("http://h/sse2"));
 * ```
 */
pub fn is_stream_endpoint(url: &str) -> bool {
    let path = match url.find('?') {
        Some(idx) => &url[..idx],
        None => url,
    };
    let path = path.strip_suffix('/').unwrap_or(path);
    path.ends_with(STREAM_SUFFIX)
}

/**
 * Rewrites a URL ending in `/sse` or `/sse/` to the legacy POST endpoint on
 * the same host, e.g. `http://h:8001/sse/` → `http://h:8001/debug-data`.
 *
 * Returns `None` when the URL does not end with either suffix. A query
 * string disqualifies the URL: the suffix must be the very end.
 */
pub fn legacy_fallback_url(url: &str) -> Option<String> {
    let base = url
        .strip_suffix("/sse/")
        .or_else(|| url.strip_suffix(STREAM_SUFFIX))?;
    Some(format!("{base}{LEGACY_POST_PATH}"))
}
