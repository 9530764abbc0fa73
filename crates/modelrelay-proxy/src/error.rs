//! Relay error types and their HTTP mappings.
//!
//! [`RelayError`] covers the responses the relay produces itself. Upstream
//! responses, even failed ones, are never turned into a `RelayError`; they are
//! forwarded verbatim.

use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Errors the relay reports to the caller with its own JSON body.
///
/// The `Display` text is the client-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("empty request body")]
    EmptyBody,

    #[error("invalid request body")]
    UnreadableBody,

    #[error("invalid json body")]
    InvalidJson,

    #[error("model is required")]
    MissingModel,

    #[error("no model available")]
    NoModelAvailable,

    /// The payload could not be re-serialized with a substituted model.
    #[error("invalid json body")]
    PayloadUnrepresentable,

    /// Every candidate failed and none produced a usable response.
    #[error("upstream error")]
    UpstreamExhausted,
}

impl RelayError {
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::UnreadableBody | Self::MissingModel | Self::NoModelAvailable => {
                StatusCode::BAD_REQUEST
            }
            Self::EmptyBody | Self::InvalidJson | Self::PayloadUnrepresentable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::UpstreamExhausted => StatusCode::BAD_GATEWAY,
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Why a single upstream attempt failed at the transport level.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// A per-attempt streaming client could not be built.
    #[error("failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connecting or sending failed, or the request could not be built.
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The attempt ran past its deadline.
    #[error("upstream attempt timed out after {0:?}")]
    TimedOut(Duration),

    /// Headers arrived but the body could not be read.
    #[error("failed to read upstream body: {0}")]
    Body(#[source] reqwest::Error),
}

/// The caller went away; the request is abandoned without a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request cancelled by caller")]
pub struct Cancelled;

/// How an attempt ended when it produced no upstream response.
#[derive(Debug, Error)]
pub enum AttemptFailure {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error(transparent)]
    Failed(#[from] AttemptError),
}
