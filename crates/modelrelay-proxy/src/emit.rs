//! Writing upstream responses back to the caller.
//!
//! A buffered response is replayed with a recomputed `Content-Length`. A
//! streamed response is copied frame by frame as the upstream produces it;
//! once its headers are out the relay is committed and a later upstream
//! failure only ends the stream early. A caller that disconnects mid-stream
//! drops the body, which drops the upstream response with it.

use axum::body::Body;
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream::BoxStream};
use tracing::warn;

use crate::headers::relayed_response_headers;

/// Largest frame written to the caller at once.
pub const STREAM_CHUNK_SIZE: usize = 32 * 1024;

/// A fully read upstream response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    /// Read the remainder of an upstream response into memory.
    pub async fn read(response: reqwest::Response) -> reqwest::Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let mut headers = relayed_response_headers(&self.headers);
        if !self.body.is_empty() {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        }

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}

/// Relay an upstream response whose body has not been read yet.
pub fn streaming_response(upstream: reqwest::Response, model: String) -> Response {
    let status = upstream.status();
    let headers = relayed_response_headers(upstream.headers());
    let frames = relay_frames(upstream.bytes_stream(), model);

    let mut response = Response::new(Body::from_stream(frames));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

struct FrameState<E> {
    upstream: BoxStream<'static, Result<Bytes, E>>,
    pending: Bytes,
    model: String,
}

/// Re-frame an upstream byte stream into chunks of at most
/// [`STREAM_CHUNK_SIZE`], each handed to the body as soon as it arrives.
///
/// The output never yields an error. A failed upstream read is logged and the
/// output simply ends. Dropping the output drops `upstream`.
pub fn relay_frames<S, E>(
    upstream: S,
    model: String,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = FrameState {
        upstream: upstream.boxed(),
        pending: Bytes::new(),
        model,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if !state.pending.is_empty() {
                let len = state.pending.len().min(STREAM_CHUNK_SIZE);
                let frame = state.pending.split_to(len);
                return Some((Ok::<_, std::io::Error>(frame), state));
            }

            match state.upstream.next().await {
                Some(Ok(chunk)) => state.pending = chunk,
                Some(Err(e)) => {
                    warn!(model = %state.model, error = %e, "Upstream stream broke after commit");
                    return None;
                }
                None => return None,
            }
        }
    })
}
