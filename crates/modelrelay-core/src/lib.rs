//! Core domain types for modelrelay.
//!
//! This crate holds everything the relay decides without touching the
//! network: how a request body is read and rewritten, which models are tried
//! in which order, how long each attempt may take, and how an upstream status
//! is classified. The HTTP adapter lives in `modelrelay-proxy`.

pub mod outcome;
pub mod payload;
pub mod planner;
pub mod policy;
pub mod settings;

pub use outcome::{Outcome, classify_status};
pub use payload::{MODEL_KEY, PayloadError, RequestPayload, STREAM_KEY};
pub use planner::plan_attempts;
pub use policy::{DEFAULT_NO_RETRY_STATUS_CODES, DEFAULT_TIMEOUT, NoRetryStatusSet, TimeoutPolicy};
pub use settings::{
    DEFAULT_BASE_URL, DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT, RawRelaySettings, RelaySettings,
    SettingsError, parse_duration,
};
