//! Long-lived cache headers for served artifacts.

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};
use fever_core::mime::DEFAULT_CONTENT_TYPE;

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// `Expires`, `Cache-Control`, `Content-Type` and `Content-Length` for an
/// artifact of `raw_len` bytes.
pub fn cache_headers(content_type: &str, raw_len: u64, max_age_secs: u64) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(4);
    headers.insert(header::EXPIRES, expires(Utc::now(), max_age_secs));
    headers.insert(header::CACHE_CONTROL, cache_control(max_age_secs));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(raw_len));
    headers
}

pub fn cache_control(max_age_secs: u64) -> HeaderValue {
    HeaderValue::from_str(&format!("max-age={max_age_secs}, public"))
        .unwrap_or_else(|_| HeaderValue::from_static("public"))
}

/// HTTP date `max_age_secs` after `now`, saturating at the latest
/// representable date.
pub fn expires(now: DateTime<Utc>, max_age_secs: u64) -> HeaderValue {
    let at = i64::try_from(max_age_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let text = at.format(HTTP_DATE).to_string();
    HeaderValue::from_str(&text).unwrap_or_else(|_| HeaderValue::from_static("0"))
}
