//! Relay settings and the string parsers behind them.
//!
//! Settings arrive as raw strings (command line or environment) and are
//! turned into a read-only [`RelaySettings`] once at startup. List-valued
//! settings are lenient: a bad entry is logged and skipped. Only an unusable
//! upstream URL or listen port is fatal.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::policy::{DEFAULT_TIMEOUT, NoRetryStatusSet, TimeoutPolicy};

/// Default upstream base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default listen host.
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Settings validation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("upstream base URL {url:?} is invalid: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("upstream base URL {0:?} must use http or https")]
    UnsupportedScheme(String),

    #[error("upstream base URL {0:?} has no host")]
    MissingHost(String),

    #[error("listen port {0:?} is not a valid port number")]
    InvalidPort(String),
}

/// Unparsed settings, as collected from flags or environment variables.
///
/// Blank values fall back to the documented defaults.
#[derive(Debug, Clone, Default)]
pub struct RawRelaySettings {
    pub base_url: String,
    pub host: String,
    pub port: String,
    pub default_timeout: String,
    pub fallback_default_timeout: String,
    pub fallback_models: String,
    pub fallback_timeouts: String,
    pub no_retry_status_codes: String,
}

/// Read-only relay configuration shared by every request.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Upstream base URL; its path and query prefix every outbound request.
    pub upstream: Url,
    /// Host the relay listens on.
    pub listen_host: String,
    /// Port the relay listens on.
    pub listen_port: u16,
    /// Ordered fallback models tried after the requested one.
    pub fallback_models: Vec<String>,
    /// Per-attempt timeout resolution.
    pub timeouts: TimeoutPolicy,
    /// Upstream statuses that end the retry loop.
    pub no_retry: NoRetryStatusSet,
}

impl RelaySettings {
    /// Build settings from raw strings.
    pub fn from_raw(raw: &RawRelaySettings) -> Result<Self, SettingsError> {
        let base_url = non_blank(&raw.base_url).unwrap_or(DEFAULT_BASE_URL);
        let no_retry = non_blank(&raw.no_retry_status_codes)
            .map_or_else(NoRetryStatusSet::default, parse_status_code_set);

        Ok(Self {
            upstream: parse_upstream_url(base_url)?,
            listen_host: non_blank(&raw.host)
                .unwrap_or(DEFAULT_LISTEN_HOST)
                .to_string(),
            listen_port: non_blank(&raw.port).map_or(Ok(DEFAULT_LISTEN_PORT), parse_listen_port)?,
            fallback_models: parse_model_list(&raw.fallback_models),
            timeouts: TimeoutPolicy {
                default_timeout: duration_setting(
                    "default_timeout",
                    &raw.default_timeout,
                    DEFAULT_TIMEOUT,
                ),
                fallback_default_timeout: duration_setting(
                    "fallback_default_timeout",
                    &raw.fallback_default_timeout,
                    Duration::ZERO,
                ),
                fallback_timeouts: parse_timeout_map(&raw.fallback_timeouts),
            },
            no_retry,
        })
    }

    /// Address to bind, as `host:port`.
    pub fn listen_addr(&self) -> String {
        if self.listen_host.contains(':') && !self.listen_host.starts_with('[') {
            format!("[{}]:{}", self.listen_host, self.listen_port)
        } else {
            format!("{}:{}", self.listen_host, self.listen_port)
        }
    }
}

fn non_blank(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn duration_setting(name: &str, raw: &str, default: Duration) -> Duration {
    let Some(value) = non_blank(raw) else {
        return default;
    };
    parse_duration(value).unwrap_or_else(|| {
        warn!(setting = name, value, ?default, "Invalid duration, using default");
        default
    })
}

/// Parse and validate the upstream base URL.
pub fn parse_upstream_url(raw: &str) -> Result<Url, SettingsError> {
    let url = Url::parse(raw.trim()).map_err(|e| SettingsError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SettingsError::UnsupportedScheme(raw.to_string()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(SettingsError::MissingHost(raw.to_string()));
    }
    Ok(url)
}

/// Parse a listen port, accepting both `8080` and `:8080`.
pub fn parse_listen_port(raw: &str) -> Result<u16, SettingsError> {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix(':')
        .unwrap_or(trimmed)
        .parse::<u16>()
        .map_err(|_| SettingsError::InvalidPort(raw.to_string()))
}

/// Parse a comma-separated model list, dropping blank entries.
pub fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `model=duration` pairs separated by commas.
///
/// Malformed pairs and unparseable durations are logged and skipped.
pub fn parse_timeout_map(raw: &str) -> HashMap<String, Duration> {
    let mut out = HashMap::new();
    for item in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let Some((model, value)) = item.split_once('=') else {
            warn!(pair = item, "Invalid fallback timeout pair");
            continue;
        };
        let (model, value) = (model.trim(), value.trim());
        if model.is_empty() || value.is_empty() {
            warn!(pair = item, "Invalid fallback timeout pair");
            continue;
        }
        match parse_duration(value) {
            Some(timeout) => {
                out.insert(model.to_string(), timeout);
            }
            None => warn!(model, value, "Invalid fallback timeout value"),
        }
    }
    out
}

/// Parse a comma-separated list of HTTP status codes.
///
/// An input with no valid codes yields an empty set, which retries every
/// non-2xx status.
pub fn parse_status_code_set(raw: &str) -> NoRetryStatusSet {
    NoRetryStatusSet::new(
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .filter_map(|item| match item.parse::<u16>() {
                Ok(code) => Some(code),
                Err(_) => {
                    warn!(code = item, "Invalid status code");
                    None
                }
            }),
    )
}

/// Parse a duration such as `30s`, `1m30s`, `1.5s`, `250ms` or `2h`.
///
/// A bare integer is a number of seconds. A well-formed negative value parses
/// as [`Duration::ZERO`], which every timeout treats as "no deadline".
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    if let Some(magnitude) = raw.strip_prefix('-') {
        return parse_duration_magnitude(magnitude).map(|_| Duration::ZERO);
    }
    parse_duration_magnitude(raw.strip_prefix('+').unwrap_or(raw))
}

fn parse_duration_magnitude(raw: &str) -> Option<Duration> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = raw;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let number: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total_nanos += number * nanos_per_unit;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let nanos = total_nanos.round() as u64;
    Some(Duration::from_nanos(nanos))
}
