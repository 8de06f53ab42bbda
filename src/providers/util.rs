//! Helpers shared across HTTP-backed providers.

use crate::errors::ConfigError;
use crate::types::DeliveryResult;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use std::time::Duration;

/// Builds the HTTP client a provider uses for its whole lifetime.
///
/// The client owns a connection pool, so clones of a provider share
/// connections and concurrent sends never serialize on each other.
pub(crate) fn default_http_client(timeout: Duration) -> Result<ClientWithMiddleware, ConfigError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(ClientBuilder::new(client).build())
}

/// Converts a transport-level failure into a delivery result.
///
/// Timeouts get the well-known `"timeout"` error code so callers can match
/// on them; everything else keeps the transport error text.
pub(crate) fn request_failure(err: reqwest_middleware::Error) -> DeliveryResult {
    match &err {
        reqwest_middleware::Error::Reqwest(inner) if inner.is_timeout() => {
            DeliveryResult::fail_with_code(format!("request timed out: {err}"), "timeout")
        }
        _ => DeliveryResult::fail(format!("request failed: {err}")),
    }
}

/// Truncates `value` to at most `max_chars` characters, never splitting a
/// code point.
pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
