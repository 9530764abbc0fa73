//! The fallback loop.
//!
//! Candidates are tried strictly in plan order, one at a time. Each attempt
//! ends in one of four ways:
//!
//! - transport failure: remembered, next candidate
//! - success: relayed, done
//! - terminal status: relayed verbatim, done
//! - retryable status: remembered as the latest response, next candidate
//!
//! When the plan runs out, the latest retryable response is replayed if there
//! is one; otherwise the caller gets `502 upstream error`. Cancellation ends
//! the loop immediately with no response at all.

use axum::response::{IntoResponse, Response};
use modelrelay_core::{Outcome, RequestPayload, classify_status, plan_attempts};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatch::{Attempt, Dispatched, buffer, dispatch};
use crate::emit::{CachedResponse, streaming_response};
use crate::error::{AttemptError, AttemptFailure, Cancelled, RelayError};
use crate::inbound::InboundRequest;
use crate::state::RelayState;

/// Run the fallback loop for one decoded request.
///
/// Returns the response to send, or [`Cancelled`] when the caller went away
/// and nothing should be written.
pub async fn relay(
    state: &RelayState,
    inbound: &InboundRequest,
    payload: &RequestPayload,
    cancel: &CancellationToken,
) -> Result<Response, Cancelled> {
    let settings = state.settings();

    let Some(primary) = payload.model() else {
        return Ok(RelayError::MissingModel.into_response());
    };
    let plan = plan_attempts(primary, &settings.fallback_models);
    if plan.is_empty() {
        return Ok(RelayError::NoModelAvailable.into_response());
    }

    let streaming = payload.is_stream();
    let attempts = plan.len();
    let mut last_response: Option<CachedResponse> = None;
    let mut last_error: Option<AttemptError> = None;

    for (index, model) in plan.iter().enumerate() {
        let attempt = index + 1;
        let body = match payload.with_model(model) {
            Ok(body) => body,
            Err(e) => {
                error!(model = %model, error = %e, "Failed to re-encode request body");
                return Ok(RelayError::PayloadUnrepresentable.into_response());
            }
        };
        let timeout = settings.timeouts.timeout_for(index, model);

        debug!(
            model = %model,
            attempt,
            attempts,
            streaming,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "Dispatching upstream attempt"
        );

        let dispatched = dispatch(
            Attempt {
                inbound,
                upstream: &settings.upstream,
                body,
                timeout,
                streaming,
            },
            state.clients(),
            cancel,
        )
        .await;

        let cached = match dispatched {
            Ok(Dispatched::Complete(cached)) => Ok(cached),
            Ok(Dispatched::Headers(response)) => {
                let status = response.status().as_u16();
                if classify_status(status, &settings.no_retry) == Outcome::Success {
                    info!(model = %model, attempt, attempts, status, "Streaming upstream response");
                    return Ok(streaming_response(response, model.clone()));
                }
                buffer(response, cancel).await
            }
            Err(failure) => Err(failure),
        };

        let (outcome, cached) = match cached {
            Ok(cached) => (
                classify_status(cached.status.as_u16(), &settings.no_retry),
                Ok(cached),
            ),
            Err(AttemptFailure::Cancelled(cancelled)) => {
                info!(model = %model, attempt, attempts, "Request cancelled by caller");
                return Err(cancelled);
            }
            Err(AttemptFailure::Failed(e)) => (Outcome::TransportError, Err(e)),
        };

        match cached {
            Ok(cached) if !outcome.is_retryable() => {
                let status = cached.status.as_u16();
                info!(model = %model, attempt, attempts, status, %outcome, "Relaying upstream response");
                return Ok(cached.into_response());
            }
            Ok(cached) => {
                let status = cached.status.as_u16();
                warn!(model = %model, attempt, attempts, status, %outcome, "Upstream attempt not usable");
                last_response = Some(cached);
            }
            Err(e) => {
                warn!(model = %model, attempt, attempts, %outcome, error = %e, "Upstream attempt failed");
                last_error = Some(e);
            }
        }
    }

    if let Some(cached) = last_response {
        warn!(
            attempts,
            status = cached.status.as_u16(),
            "All candidates exhausted; replaying last upstream response"
        );
        return Ok(cached.into_response());
    }

    match last_error {
        Some(e) => error!(attempts, error = %e, "All upstream attempts failed"),
        None => error!(attempts, "All upstream attempts failed"),
    }
    Ok(RelayError::UpstreamExhausted.into_response())
}
