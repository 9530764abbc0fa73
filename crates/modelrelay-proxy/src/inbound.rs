//! Reading the caller's request.

use axum::body::Body;
use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Uri};
use modelrelay_core::RequestPayload;
use tracing::debug;

use crate::error::RelayError;

/// The parts of the inbound request every attempt is built from.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl InboundRequest {
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        }
    }

    /// The host the caller addressed, from `Host` or the request target.
    pub fn forwarded_host(&self) -> Option<&str> {
        self.headers
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| self.uri.authority().map(|authority| authority.as_str()))
    }

    /// The scheme the caller used; plain `http` unless the target says otherwise.
    pub fn forwarded_proto(&self) -> &str {
        self.uri.scheme_str().unwrap_or("http")
    }
}

/// Read the whole body and decode it as a JSON object.
pub async fn read_payload(body: Body) -> Result<RequestPayload, RelayError> {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.map_err(|e| {
        debug!(error = %e, "Failed to read request body");
        RelayError::UnreadableBody
    })?;

    if bytes.is_empty() {
        return Err(RelayError::EmptyBody);
    }

    RequestPayload::from_slice(&bytes).map_err(|e| {
        debug!(error = %e, "Request body is not a JSON object");
        RelayError::InvalidJson
    })
}
