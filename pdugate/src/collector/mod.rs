//! Vendor-side collectors.
//!
//! A collector owns one vendor transport connection, normalizes its
//! telemetry into the shared registry and relays commands handed to it
//! by the command router. New vendor integrations add a variant here,
//! not an ad hoc conditional.

pub mod frame;
pub mod yespeed;

use std::sync::Arc;

use tokio::sync::mpsc;

use pdugate_common::device::Command;
use pdugate_common::error::Result;
use pdugate_common::registry::DeviceRegistry;

use crate::config::CollectorConfig;
use crate::collector::yespeed::YespeedMqttCollector;

/// Closed set of collector implementations, selected by config tag.
pub enum Collector {
    YespeedMqtt(YespeedMqttCollector),
}

impl Collector {
    /// Build a collector from its configuration.
    pub fn from_config(
        config: CollectorConfig,
        registry: Arc<DeviceRegistry>,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        match config {
            CollectorConfig::Mqtt(config) => {
                Self::YespeedMqtt(YespeedMqttCollector::new(config, registry, commands))
            }
        }
    }

    /// Collector type name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::YespeedMqtt(_) => "yespeed_mqtt",
        }
    }

    /// Run the collector until aborted. An error here is a startup
    /// failure and fatal to this collector only.
    pub async fn run(self) -> Result<()> {
        match self {
            Self::YespeedMqtt(collector) => collector.run().await,
        }
    }
}
