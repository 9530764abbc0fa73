//! Classification of a single upstream attempt.

use std::fmt;

use crate::policy::NoRetryStatusSet;

/// What one upstream attempt produced.
///
/// Caller cancellation is not an outcome; it aborts the whole request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Connect, timeout or body-read failure. Recorded for diagnostics only.
    TransportError,
    /// A 2xx status.
    Success,
    /// A status configured to never be retried.
    TerminalStatus,
    /// Any other status; the next candidate is tried.
    RetryableStatus,
}

impl Outcome {
    /// Whether the retry loop moves on to the next candidate.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TransportError | Self::RetryableStatus)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportError => write!(f, "transport_error"),
            Self::Success => write!(f, "success"),
            Self::TerminalStatus => write!(f, "terminal_status"),
            Self::RetryableStatus => write!(f, "retryable_status"),
        }
    }
}

/// Classify an upstream HTTP status.
///
/// 2xx is checked first, so a success code listed in the no-retry set still
/// counts as success.
pub fn classify_status(status: u16, no_retry: &NoRetryStatusSet) -> Outcome {
    if (200..300).contains(&status) {
        Outcome::Success
    } else if no_retry.contains(status) {
        Outcome::TerminalStatus
    } else {
        Outcome::RetryableStatus
    }
}
