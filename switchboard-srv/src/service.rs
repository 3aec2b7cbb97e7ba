//! Controller host wiring.

use std::sync::Arc;

use tracing::info;

use switchboard_core::{Broadcaster, Controller, Endpoint, SwitchError};

use crate::config::ServerConfig;
use crate::media::SimulatedMediaServer;

/// A running controller in front of a [`SimulatedMediaServer`].
#[derive(Debug)]
pub struct SwitchService {
    controller: Controller,
    media: Arc<SimulatedMediaServer>,
}

impl SwitchService {
    /// Bind the configured endpoint and start serving.
    pub async fn start(config: &ServerConfig) -> Result<Self, SwitchError> {
        Self::start_on(config, &config.endpoint()?).await
    }

    /// Like [`start`](Self::start) with an explicit endpoint, for command
    /// line overrides.
    pub async fn start_on(config: &ServerConfig, endpoint: &Endpoint) -> Result<Self, SwitchError> {
        let hub = Broadcaster::new();
        let media = Arc::new(SimulatedMediaServer::new(&config.media, hub.clone()));
        let controller = Controller::start_with(endpoint, media.clone(), hub).await?;
        info!(
            endpoint = %controller.local_endpoint(),
            previews = config.media.preview_ports.len(),
            "switch service ready"
        );
        Ok(Self { controller, media })
    }

    pub fn local_endpoint(&self) -> &Endpoint {
        self.controller.local_endpoint()
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn media(&self) -> &SimulatedMediaServer {
        &self.media
    }

    pub async fn shutdown(&self) {
        self.controller.shutdown().await;
    }
}
