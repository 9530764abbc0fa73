//! Axum HTTP server for the relay.
//!
//! Exactly one route is served. Every method on it is relayed; any other path
//! gets a bare 404.

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::any,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::inbound::{InboundRequest, read_payload};
use crate::retry::relay;
use crate::state::RelayState;

/// The only path the relay answers on.
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Status reported when the caller disconnected before a response was chosen.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Build the relay router.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route(CHAT_COMPLETIONS_PATH, any(chat_completions))
        .fallback(not_found)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the relay on a pre-bound listener until `cancel` fires.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve(
    listener: TcpListener,
    state: RelayState,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(
        upstream = %state.settings().upstream,
        fallbacks = state.settings().fallback_models.len(),
        "Relay listening on {addr}"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Relay server shut down");
    Ok(())
}

async fn chat_completions(State(state): State<RelayState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let payload = match read_payload(body).await {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };
    let inbound = InboundRequest::from_parts(&parts);

    // Fires if this future is dropped before a response is chosen.
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let result = relay(&state, &inbound, &payload, &cancel).await;
    let _ = guard.disarm();

    result.unwrap_or_else(|cancelled| {
        debug!(error = %cancelled, "Dropping cancelled request");
        let status = StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_GATEWAY);
        status.into_response()
    })
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
