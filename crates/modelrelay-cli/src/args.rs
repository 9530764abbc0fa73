//! Flag definitions.

use clap::Parser;
use modelrelay_core::RawRelaySettings;

/// Chat-completions relay with ordered model fallback.
#[derive(Debug, Parser)]
#[command(name = "modelrelay", version, about)]
pub struct Args {
    /// Upstream base URL (http or https)
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub base_url: Option<String>,

    /// Interface to listen on
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on; a leading ':' is accepted
    #[arg(long, env = "PORT")]
    pub port: Option<String>,

    /// Timeout for the requested model, e.g. 60s, 1m30s or 45
    #[arg(long, env = "DEFAULT_TIMEOUT")]
    pub default_timeout: Option<String>,

    /// Timeout for fallback models without their own entry; 0 uses --default-timeout
    #[arg(long, env = "FALLBACK_DEFAULT_TIMEOUT")]
    pub fallback_default_timeout: Option<String>,

    /// Comma-separated fallback models, tried in order
    #[arg(long, env = "FALLBACK_MODELS")]
    pub fallback_models: Option<String>,

    /// Per-model fallback timeouts as model=duration pairs, comma-separated
    #[arg(long, env = "FALLBACK_TIMEOUTS")]
    pub fallback_timeouts: Option<String>,

    /// Comma-separated upstream statuses that are returned without falling back
    #[arg(long, env = "NO_RETRY_STATUS_CODES")]
    pub no_retry_status_codes: Option<String>,
}

impl Args {
    /// Unset flags become blank strings, which select the defaults.
    pub fn into_raw(self) -> RawRelaySettings {
        RawRelaySettings {
            base_url: self.base_url.unwrap_or_default(),
            host: self.host.unwrap_or_default(),
            port: self.port.unwrap_or_default(),
            default_timeout: self.default_timeout.unwrap_or_default(),
            fallback_default_timeout: self.fallback_default_timeout.unwrap_or_default(),
            fallback_models: self.fallback_models.unwrap_or_default(),
            fallback_timeouts: self.fallback_timeouts.unwrap_or_default(),
            no_retry_status_codes: self.no_retry_status_codes.unwrap_or_default(),
        }
    }
}
