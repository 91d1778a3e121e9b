//! Request forwarding to the running llama-server.
//!
//! Bodies are streamed back as they arrive, so SSE completions reach the
//! client token by token. Status and end-to-end headers are passed through
//! unchanged.

use axum::body::Body;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures_util::TryStreamExt;
use reqwest::Client;
use tracing::{debug, error};

use crate::error::HttpError;

/// Headers that must not cross the proxy.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    // Recomputed by the client for the new hop
    "host",
    "content-length",
];

/// Check if a header should be forwarded.
pub(crate) fn should_forward_header(name: &str) -> bool {
    !HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

fn filtered(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| should_forward_header(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Send `body` to `upstream_url` and stream the answer back.
pub async fn forward(
    client: &Client,
    method: Method,
    upstream_url: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    debug!(url = %upstream_url, %method, "Forwarding request");

    let upstream = client
        .request(method, upstream_url)
        .headers(filtered(headers))
        .body(body)
        .send()
        .await
        .map_err(|e| {
            error!(url = %upstream_url, error = %e, "Failed to reach llama-server");
            HttpError::BadGateway(format!("Upstream request failed: {e}"))
        })?;

    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let response_headers = filtered(upstream.headers());
    let stream = upstream.bytes_stream().map_err(std::io::Error::other);

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_forward_header() {
        assert!(should_forward_header("accept"));
        assert!(should_forward_header("content-type"));
        assert!(should_forward_header("authorization"));
        assert!(should_forward_header("x-custom-header"));

        assert!(!should_forward_header("Connection"));
        assert!(!should_forward_header("host"));
        assert!(!should_forward_header("Content-Length"));
        assert!(!should_forward_header("transfer-encoding"));
    }

    #[test]
    fn test_filtered_keeps_end_to_end_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert("connection", "keep-alive".parse().unwrap());
        headers.insert("content-length", "12".parse().unwrap());

        let out = filtered(&headers);
        assert_eq!(out.len(), 1);
        assert_eq!(out["content-type"], "application/json");
    }
}
