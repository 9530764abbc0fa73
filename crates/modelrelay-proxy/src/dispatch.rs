//! A single upstream attempt.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::emit::CachedResponse;
use crate::error::{AttemptError, AttemptFailure, Cancelled};
use crate::headers::outbound_headers;
use crate::inbound::InboundRequest;
use crate::target::{upstream_authority, upstream_url};
use crate::transport::UpstreamClients;

/// What a successful dispatch hands back.
#[derive(Debug)]
pub enum Dispatched {
    /// Streaming attempt: headers are in, the body is still on the wire.
    Headers(reqwest::Response),
    /// Non-streaming attempt: the response was read in full.
    Complete(CachedResponse),
}

/// Everything one attempt needs.
#[derive(Debug)]
pub struct Attempt<'a> {
    pub inbound: &'a InboundRequest,
    pub upstream: &'a Url,
    pub body: Vec<u8>,
    /// Zero means no deadline.
    pub timeout: Duration,
    pub streaming: bool,
}

/// Send one attempt upstream.
///
/// A non-streaming attempt is bounded by its timeout end to end, including
/// the body read. A streaming attempt bounds only the wait for response
/// headers and runs on a dedicated non-pooled client; with a zero timeout it
/// uses the pooled client. Cancellation wins over everything else.
pub async fn dispatch(
    attempt: Attempt<'_>,
    clients: &UpstreamClients,
    cancel: &CancellationToken,
) -> Result<Dispatched, AttemptFailure> {
    let Attempt {
        inbound,
        upstream,
        body,
        timeout,
        streaming,
    } = attempt;

    let url = upstream_url(upstream, &inbound.uri);
    let headers = outbound_headers(
        &inbound.headers,
        upstream_authority(upstream),
        inbound.forwarded_host(),
        inbound.forwarded_proto(),
    );

    if streaming {
        let (client, header_timeout) = if timeout.is_zero() {
            (clients.pooled().clone(), Duration::ZERO)
        } else {
            let transport = clients
                .stream_transport(timeout)
                .map_err(AttemptError::Client)?;
            (transport.client, transport.header_timeout)
        };

        let send = client
            .request(inbound.method.clone(), url)
            .headers(headers)
            .body(body)
            .send();
        let response = until_cancelled(
            cancel,
            within(header_timeout, async {
                send.await.map_err(AttemptError::Transport)
            }),
        )
        .await?;
        return Ok(Dispatched::Headers(response));
    }

    let send = clients
        .pooled()
        .request(inbound.method.clone(), url)
        .headers(headers)
        .body(body)
        .send();
    let cached = until_cancelled(
        cancel,
        within(timeout, async {
            let response = send.await.map_err(AttemptError::Transport)?;
            CachedResponse::read(response)
                .await
                .map_err(AttemptError::Body)
        }),
    )
    .await?;
    Ok(Dispatched::Complete(cached))
}

/// Read a streaming attempt's body in full so it can be classified and replayed.
///
/// No deadline applies here; only cancellation stops it.
pub async fn buffer(
    response: reqwest::Response,
    cancel: &CancellationToken,
) -> Result<CachedResponse, AttemptFailure> {
    until_cancelled(cancel, async {
        CachedResponse::read(response)
            .await
            .map_err(AttemptError::Body)
    })
    .await
}

/// Bound a future by a deadline; a zero deadline leaves it unbounded.
async fn within<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, AttemptError>>,
) -> Result<T, AttemptError> {
    if timeout.is_zero() {
        return fut.await;
    }
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or(Err(AttemptError::TimedOut(timeout)))
}

async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, AttemptError>>,
) -> Result<T, AttemptFailure> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Cancelled.into()),
        result = fut => result.map_err(AttemptFailure::from),
    }
}
