//! Header sanitization for both directions of the relay.

use axum::http::header::{ACCEPT_ENCODING, CONTENT_LENGTH, HOST};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Headers that only apply to a single connection and are never relayed.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove every hop-by-hop header in place.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// Build the header set for an outbound attempt.
///
/// Starts from the inbound headers, drops hop-by-hop headers,
/// `Accept-Encoding` (the relay decides compression) and `Content-Length`
/// (the rewritten body has its own length), then points `Host` at the
/// upstream and records the original host and scheme in `X-Forwarded-*`.
/// Credentials such as `Authorization` pass through untouched.
pub fn outbound_headers(
    inbound: &HeaderMap,
    upstream_authority: &str,
    forwarded_host: Option<&str>,
    forwarded_proto: &str,
) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(ACCEPT_ENCODING);
    headers.remove(CONTENT_LENGTH);
    headers.remove(HOST);

    if let Ok(value) = HeaderValue::from_str(upstream_authority) {
        headers.insert(HOST, value);
    }
    if let Some(value) = forwarded_host.and_then(|host| HeaderValue::from_str(host).ok()) {
        headers.insert(HeaderName::from_static("x-forwarded-host"), value);
    }
    if let Ok(value) = HeaderValue::from_str(forwarded_proto) {
        headers.insert(HeaderName::from_static("x-forwarded-proto"), value);
    }
    headers
}

/// Upstream response headers as relayed to the caller.
///
/// `Content-Length` is always dropped; buffered responses recompute it and
/// streamed responses are sent chunked.
pub fn relayed_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(CONTENT_LENGTH);
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};

    fn inbound() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer sk-test"));
        headers.insert("x-api-key", HeaderValue::from_static("key-123"));
        headers.insert(HOST, HeaderValue::from_static("relay.local:8080"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, br"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("17"));
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("proxy-connection", HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("te", HeaderValue::from_static("trailers"));
        headers.insert("upgrade", HeaderValue::from_static("h2c"));
        headers.insert("proxy-authorization", HeaderValue::from_static("Basic Zm9v"));
        headers
    }

    #[test]
    fn test_outbound_strips_hop_by_hop_and_encoding() {
        let headers = outbound_headers(&inbound(), "api.example.com", Some("relay.local:8080"), "http");

        for name in HOP_BY_HOP_HEADERS {
            assert!(!headers.contains_key(*name), "{name} should be stripped");
        }
        assert!(!headers.contains_key(ACCEPT_ENCODING));
        assert!(!headers.contains_key(CONTENT_LENGTH));
    }

    #[test]
    fn test_outbound_rewrites_host_and_forwarding_headers() {
        let headers = outbound_headers(&inbound(), "api.example.com:8443", Some("relay.local:8080"), "http");

        assert_eq!(headers.get(HOST).unwrap(), "api.example.com:8443");
        assert_eq!(headers.get("x-forwarded-host").unwrap(), "relay.local:8080");
        assert_eq!(headers.get("x-forwarded-proto").unwrap(), "http");
    }

    #[test]
    fn test_outbound_keeps_credentials_and_content_type() {
        let headers = outbound_headers(&inbound(), "api.example.com", None, "http");

        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer sk-test");
        assert_eq!(headers.get("x-api-key").unwrap(), "key-123");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(!headers.contains_key("x-forwarded-host"));
    }

    #[test]
    fn test_relayed_response_headers() {
        let mut upstream = HeaderMap::new();
        upstream.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
        upstream.insert(CONTENT_LENGTH, HeaderValue::from_static("64"));
        upstream.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        upstream.insert("x-request-id", HeaderValue::from_static("req-1"));

        let headers = relayed_response_headers(&upstream);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/event-stream");
        assert_eq!(headers.get("x-request-id").unwrap(), "req-1");
        assert!(!headers.contains_key(CONTENT_LENGTH));
        assert!(!headers.contains_key("transfer-encoding"));
    }
}
