//! Home Assistant MQTT publisher.
//!
//! Three concurrent loops share one hub connection:
//! - the config cycle re-advertises every known node after a warm-up
//!   delay and then on a slow period,
//! - the state cycle publishes aggregated live readings on a fast
//!   period,
//! - the ingress loop drives the MQTT event loop and feeds inbound
//!   control messages to the command router.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS};
use tracing::{debug, info, warn};

use pdugate_common::error::Result;
use pdugate_common::mqtt;
use pdugate_common::registry::DeviceRegistry;
use pdugate_common::topic;

use crate::config::HassPublisherConfig;
use crate::publisher::hass;
use crate::router::CommandRouter;

pub struct HassMqttPublisher {
    config: HassPublisherConfig,
    registry: Arc<DeviceRegistry>,
    router: CommandRouter,
}

impl HassMqttPublisher {
    pub fn new(
        config: HassPublisherConfig,
        registry: Arc<DeviceRegistry>,
        router: CommandRouter,
    ) -> Self {
        Self {
            config,
            registry,
            router,
        }
    }

    /// Run the publisher until the task is aborted.
    pub async fn run(self) -> Result<()> {
        let (client, eventloop) = mqtt::connect(&self.config.mqtt);
        client
            .subscribe(topic::COMMAND_PATTERN, QoS::AtLeastOnce)
            .await?;

        info!(
            broker = %self.config.mqtt.host,
            config_interval = self.config.config_interval_secs,
            state_interval = self.config.state_interval_secs,
            "Home Assistant publisher started"
        );

        // The three loops are independent: a slow config publish for
        // one node never delays the state cycle or command ingress.
        tokio::join!(
            self.config_loop(&client),
            self.state_loop(&client),
            self.ingress_loop(&client, eventloop),
        );

        Ok(())
    }

    /// Periodic discovery re-advertisement.
    async fn config_loop(&self, client: &AsyncClient) {
        // Slow start: let telemetry populate the registry before the
        // first advertisement.
        tokio::time::sleep(Duration::from_secs(self.config.warmup_secs)).await;

        let interval = Duration::from_secs(self.config.config_interval_secs);
        loop {
            self.publish_config(client).await;
            tokio::time::sleep(interval).await;
        }
    }

    /// Periodic live-state publication.
    async fn state_loop(&self, client: &AsyncClient) {
        let interval = Duration::from_secs(self.config.state_interval_secs);
        loop {
            self.publish_state(client).await;
            tokio::time::sleep(interval).await;
        }
    }

    /// Drive the MQTT event loop and route inbound control messages.
    async fn ingress_loop(&self, client: &AsyncClient, mut eventloop: EventLoop) {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let commands = CommandRouter::decode(&publish.topic, &publish.payload);
                    if !commands.is_empty() {
                        debug!(topic = %publish.topic, count = commands.len(), "Dispatching commands");
                        self.router.dispatch(commands);
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    debug!("Connected to hub broker");
                    if let Err(e) = client
                        .subscribe(topic::COMMAND_PATTERN, QoS::AtLeastOnce)
                        .await
                    {
                        warn!(error = %e, "Resubscribe failed");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Hub MQTT connection error, retrying");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    }

    /// Publish one discovery document per known node, retained.
    ///
    /// A failed publish for one node is logged and does not stop the
    /// cycle for the others.
    async fn publish_config(&self, client: &AsyncClient) {
        for node_id in self.registry.nodes() {
            let entries = self.registry.devices(&node_id);
            if entries.is_empty() {
                continue;
            }

            let message = hass::build_discovery_message(&self.config.device, &node_id, &entries);
            let payload = match serde_json::to_vec(&message) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(node = %node_id, error = %e, "Failed to encode discovery document");
                    continue;
                }
            };

            let config_topic = topic::config_topic(&node_id);
            match client
                .publish(&config_topic, QoS::AtMostOnce, true, payload)
                .await
            {
                Ok(()) => debug!(
                    node = %node_id,
                    entities = message.components.len(),
                    "Published discovery config"
                ),
                Err(e) => warn!(topic = %config_topic, error = %e, "Failed to publish config"),
            }
        }
    }

    /// Publish one aggregated state document per known node, retained.
    async fn publish_state(&self, client: &AsyncClient) {
        for node_id in self.registry.nodes() {
            let entries = self.registry.devices(&node_id);
            if entries.is_empty() {
                continue;
            }

            let payload = match serde_json::to_vec(&hass::build_state_payload(&entries)) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(node = %node_id, error = %e, "Failed to encode state payload");
                    continue;
                }
            };

            let state_topic = topic::state_topic(&node_id);
            match client
                .publish(&state_topic, QoS::AtMostOnce, true, payload)
                .await
            {
                Ok(()) => debug!(node = %node_id, outlets = entries.len(), "Published state"),
                Err(e) => warn!(topic = %state_topic, error = %e, "Failed to publish state"),
            }
        }
    }
}
