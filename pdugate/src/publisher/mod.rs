//! Hub-side publishers.
//!
//! A publisher owns one hub transport connection, projects the shared
//! registry into the hub's discovery/state schema and feeds inbound
//! control messages to the command router. New hub integrations add a
//! variant here.

pub mod hass;
pub mod hass_mqtt;

use std::sync::Arc;

use pdugate_common::error::Result;
use pdugate_common::registry::DeviceRegistry;

use crate::config::PublisherConfig;
use crate::publisher::hass_mqtt::HassMqttPublisher;
use crate::router::CommandRouter;

/// Closed set of publisher implementations, selected by config tag.
pub enum Publisher {
    HassMqtt(HassMqttPublisher),
}

impl Publisher {
    /// Build a publisher from its configuration.
    pub fn from_config(
        config: PublisherConfig,
        registry: Arc<DeviceRegistry>,
        router: CommandRouter,
    ) -> Self {
        match config {
            PublisherConfig::HassMqtt(config) => {
                Self::HassMqtt(HassMqttPublisher::new(config, registry, router))
            }
        }
    }

    /// Publisher type name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HassMqtt(_) => "hass_mqtt",
        }
    }

    /// Run the publisher until aborted. An error here is a startup
    /// failure and fatal to this publisher only.
    pub async fn run(self) -> Result<()> {
        match self {
            Self::HassMqtt(publisher) => publisher.run().await,
        }
    }
}
