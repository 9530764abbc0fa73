//! Per-attempt timeout resolution and the no-retry status set.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Default global timeout for an attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Status codes that terminate the retry loop when no override is configured.
pub const DEFAULT_NO_RETRY_STATUS_CODES: &[u16] = &[400];

/// Resolves how long a single attempt may take.
///
/// A zero duration means the attempt has no deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Timeout for the primary attempt, and the last resort for fallbacks.
    pub default_timeout: Duration,
    /// Timeout for every fallback attempt without its own override. Zero = unset.
    pub fallback_default_timeout: Duration,
    /// Per-model overrides, consulted for fallback attempts only.
    pub fallback_timeouts: HashMap<String, Duration>,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            fallback_default_timeout: Duration::ZERO,
            fallback_timeouts: HashMap::new(),
        }
    }
}

impl TimeoutPolicy {
    /// Timeout for attempt `index` against `model`.
    ///
    /// Attempt 0 is the originally requested model and always gets the global
    /// default, even when the fallback map names the same model. Later
    /// attempts use the per-model override if present, else the fallback-wide
    /// default if set, else the global default.
    pub fn timeout_for(&self, index: usize, model: &str) -> Duration {
        if index == 0 {
            return self.default_timeout;
        }
        if let Some(timeout) = self.fallback_timeouts.get(model) {
            return *timeout;
        }
        if !self.fallback_default_timeout.is_zero() {
            return self.fallback_default_timeout;
        }
        self.default_timeout
    }
}

/// Upstream statuses that are returned to the caller without trying further candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoRetryStatusSet(BTreeSet<u16>);

impl NoRetryStatusSet {
    pub fn new(codes: impl IntoIterator<Item = u16>) -> Self {
        Self(codes.into_iter().collect())
    }

    pub fn contains(&self, status: u16) -> bool {
        self.0.contains(&status)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

impl Default for NoRetryStatusSet {
    fn default() -> Self {
        Self::new(DEFAULT_NO_RETRY_STATUS_CODES.iter().copied())
    }
}
