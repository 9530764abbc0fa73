//! Shared fixtures for relay integration tests.
//!
//! [`MockUpstream`] is a tiny OpenAI-shaped server on an ephemeral port that
//! records every request and answers according to a per-model closure. Every
//! answer carries an [`UPSTREAM_MODEL_HEADER`] naming the model it was for.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use modelrelay_core::{RawRelaySettings, RelaySettings};
use modelrelay_proxy::{CHAT_COMPLETIONS_PATH, RelayState};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Response header set by the mock to the model it answered for.
pub const UPSTREAM_MODEL_HEADER: &str = "x-upstream-model";

/// One request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Recorded {
    pub fn model(&self) -> &str {
        self.body["model"].as_str().unwrap_or("")
    }
}

/// How the mock answers one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, Value),
    Empty(u16),
    Delayed(Duration, Box<Reply>),
    /// 200 event stream that finishes normally.
    Stream(Vec<&'static str>),
    /// 200 event stream that drops the connection after the chunks.
    StreamThenAbort(Vec<&'static str>),
    /// 200 event stream whose headers and first chunk go out at once, with a
    /// pause before each later chunk.
    SlowStream(Duration, Vec<&'static str>),
}

type Behavior = Arc<dyn Fn(&str) -> Reply + Send + Sync>;

#[derive(Clone)]
struct MockState {
    behavior: Behavior,
    calls: Arc<Mutex<Vec<Recorded>>>,
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<Recorded>>>,
    cancel: CancellationToken,
}

impl MockUpstream {
    pub async fn start(behavior: impl Fn(&str) -> Reply + Send + Sync + 'static) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            behavior: Arc::new(behavior),
            calls: Arc::clone(&calls),
        };
        let app = Router::new().fallback(handle).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
                .unwrap();
        });

        Self {
            addr,
            calls,
            cancel,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    /// Models requested so far, in arrival order.
    pub fn models(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.model().to_string()).collect()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn handle(State(state): State<MockState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let recorded = Recorded {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
    };
    let model = recorded.model().to_string();
    state.calls.lock().unwrap().push(recorded);

    let mut reply = (state.behavior)(&model);
    let mut response = loop {
        match reply {
            Reply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
            Reply::Json(status, value) => {
                break (StatusCode::from_u16(status).unwrap(), axum::Json(value)).into_response();
            }
            Reply::Empty(status) => break StatusCode::from_u16(status).unwrap().into_response(),
            Reply::Stream(chunks) => break event_stream(chunks, false),
            Reply::StreamThenAbort(chunks) => break event_stream(chunks, true),
            Reply::SlowStream(gap, chunks) => break slow_event_stream(gap, chunks),
        }
    };
    if let Ok(value) = HeaderValue::from_str(&model) {
        response.headers_mut().insert(UPSTREAM_MODEL_HEADER, value);
    }
    response
}

fn slow_event_stream(gap: Duration, chunks: Vec<&'static str>) -> Response {
    let data = stream::iter(chunks.into_iter().enumerate()).then(move |(index, chunk)| async move {
        if index > 0 {
            tokio::time::sleep(gap).await;
        }
        Ok::<_, std::io::Error>(Bytes::from_static(chunk.as_bytes()))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(data))
        .unwrap()
}

fn event_stream(chunks: Vec<&'static str>, abort: bool) -> Response {
    let data = stream::iter(
        chunks
            .into_iter()
            .map(|chunk| Ok::<_, std::io::Error>(Bytes::from_static(chunk.as_bytes())))
            .collect::<Vec<_>>(),
    );
    let body = if abort {
        // The pause lets the chunks reach the wire before the connection dies.
        let failure = stream::once(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err::<Bytes, _>(std::io::Error::other("upstream aborted"))
        });
        Body::from_stream(data.chain(failure))
    } else {
        Body::from_stream(data)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/event-stream")
        .body(body)
        .unwrap()
}

/// A relay server running on an ephemeral port.
pub struct Relay {
    pub addr: SocketAddr,
    cancel: CancellationToken,
}

impl Relay {
    pub async fn start(raw: &RawRelaySettings) -> Self {
        let settings = RelaySettings::from_raw(raw).unwrap();
        let state = RelayState::new(settings).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        tokio::spawn(modelrelay_proxy::serve(listener, state, cancel.clone()));
        Self { addr, cancel }
    }

    pub fn url(&self) -> String {
        format!("http://{}{CHAT_COMPLETIONS_PATH}", self.addr)
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Settings pointing at `base_url` with the given fallback list.
pub fn settings(base_url: &str, fallback_models: &str) -> RawRelaySettings {
    RawRelaySettings {
        base_url: base_url.to_string(),
        fallback_models: fallback_models.to_string(),
        ..RawRelaySettings::default()
    }
}

/// A local address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
