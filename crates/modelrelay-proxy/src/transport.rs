//! HTTP clients used to reach the upstream.
//!
//! Non-streaming attempts and streaming attempts without a deadline share a
//! single pooled client. A streaming attempt with a deadline gets a client
//! built from a copy of the shared template with keep-alive turned off, so its
//! connection is never returned to the pool after the stream ends.

use std::time::Duration;

use reqwest::Client;

/// Connection settings shared by every client the relay builds.
#[derive(Debug, Clone)]
pub struct TransportTemplate {
    /// Upper bound on connection establishment.
    pub connect_timeout: Option<Duration>,
    /// TCP keepalive probe interval.
    pub tcp_keepalive: Option<Duration>,
    /// How long an idle pooled connection is kept.
    pub pool_idle_timeout: Option<Duration>,
    /// Idle connections kept per host when keep-alive is on.
    pub pool_max_idle_per_host: usize,
    /// Whether finished connections go back to the pool.
    pub keep_alive: bool,
}

impl Default for TransportTemplate {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(30)),
            tcp_keepalive: Some(Duration::from_secs(30)),
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 10,
            keep_alive: true,
        }
    }
}

impl TransportTemplate {
    /// Build a client from these settings.
    pub fn build(&self) -> reqwest::Result<Client> {
        let idle_per_host = if self.keep_alive {
            self.pool_max_idle_per_host
        } else {
            0
        };

        let mut builder = Client::builder()
            .tcp_keepalive(self.tcp_keepalive)
            .pool_idle_timeout(self.pool_idle_timeout)
            .pool_max_idle_per_host(idle_per_host);
        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        builder.build()
    }

    /// A copy of this template for one streaming attempt.
    ///
    /// Keep-alive is off and connecting may not take longer than the header
    /// deadline. The shared template is left as is.
    #[must_use]
    pub fn for_stream_attempt(&self, header_timeout: Duration) -> Self {
        let connect_timeout = self
            .connect_timeout
            .map_or(header_timeout, |current| current.min(header_timeout));
        Self {
            connect_timeout: Some(connect_timeout),
            keep_alive: false,
            ..self.clone()
        }
    }
}

/// The pooled client plus the template per-attempt clients are cut from.
#[derive(Debug, Clone)]
pub struct UpstreamClients {
    pooled: Client,
    template: TransportTemplate,
}

/// A dedicated client for one streaming attempt and its header deadline.
#[derive(Debug)]
pub struct StreamTransport {
    pub client: Client,
    pub header_timeout: Duration,
}

impl UpstreamClients {
    pub fn new(template: TransportTemplate) -> reqwest::Result<Self> {
        Ok(Self {
            pooled: template.build()?,
            template,
        })
    }

    pub const fn pooled(&self) -> &Client {
        &self.pooled
    }

    pub const fn template(&self) -> &TransportTemplate {
        &self.template
    }

    /// Build a non-pooling client for a streaming attempt.
    pub fn stream_transport(&self, header_timeout: Duration) -> reqwest::Result<StreamTransport> {
        let client = self.template.for_stream_attempt(header_timeout).build()?;
        Ok(StreamTransport {
            client,
            header_timeout,
        })
    }
}
