//! Shared state handed to every request handler.

use std::sync::Arc;

use modelrelay_core::RelaySettings;

use crate::transport::{TransportTemplate, UpstreamClients};

/// Settings and upstream clients, cheap to clone per request.
///
/// Both halves are read-only after startup.
#[derive(Debug, Clone)]
pub struct RelayState {
    settings: Arc<RelaySettings>,
    clients: Arc<UpstreamClients>,
}

impl RelayState {
    /// Build state with the default transport settings.
    pub fn new(settings: RelaySettings) -> reqwest::Result<Self> {
        Self::with_transport(settings, TransportTemplate::default())
    }

    pub fn with_transport(
        settings: RelaySettings,
        template: TransportTemplate,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            settings: Arc::new(settings),
            clients: Arc::new(UpstreamClients::new(template)?),
        })
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    pub fn clients(&self) -> &UpstreamClients {
        &self.clients
    }
}
