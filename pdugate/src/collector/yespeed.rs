//! Yespeed PDU telemetry collector over MQTT.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, Packet, QoS};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use pdugate_common::device::Command;
use pdugate_common::error::Result;
use pdugate_common::mqtt;
use pdugate_common::registry::DeviceRegistry;
use pdugate_common::topic;

use crate::collector::frame;
use crate::config::YespeedCollectorConfig;

/// Collector ingesting Yespeed device-group telemetry and relaying
/// hub commands back to the vendor broker.
pub struct YespeedMqttCollector {
    config: YespeedCollectorConfig,
    registry: Arc<DeviceRegistry>,
    commands: mpsc::Receiver<Command>,
}

impl YespeedMqttCollector {
    pub fn new(
        config: YespeedCollectorConfig,
        registry: Arc<DeviceRegistry>,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        Self {
            config,
            registry,
            commands,
        }
    }

    /// Run the collector until the task is aborted.
    ///
    /// Telemetry ingress and command relay share one connection;
    /// reconnection after transient failures is the event loop's
    /// concern, resubscription ours.
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            registry,
            mut commands,
        } = self;

        let (client, mut eventloop) = mqtt::connect(&config.mqtt);
        client.subscribe(&config.topic, QoS::AtLeastOnce).await?;

        info!(
            broker = %config.mqtt.host,
            topic = %config.topic,
            "Yespeed collector started"
        );

        // Nodes this collector has seen telemetry from. Commands for
        // other nodes belong to another collector and are dropped here.
        let mut seen_nodes: HashSet<String> = HashSet::new();

        loop {
            tokio::select! {
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        handle_frame(&registry, &publish.topic, &publish.payload, &mut seen_nodes);
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        debug!("Connected to vendor broker");
                        if let Err(e) = client.subscribe(&config.topic, QoS::AtLeastOnce).await {
                            warn!(error = %e, "Resubscribe failed");
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Vendor MQTT connection error, retrying");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                },
                Some(command) = commands.recv() => {
                    relay_command(&client, &seen_nodes, command).await;
                }
            }
        }
    }
}

/// Parse one telemetry frame and write its outlets into the registry.
/// A malformed frame is dropped whole; no partial state is written.
fn handle_frame(
    registry: &DeviceRegistry,
    topic: &str,
    payload: &[u8],
    seen_nodes: &mut HashSet<String>,
) {
    let node_id = topic::node_from_telemetry_topic(topic);

    let frame = match frame::parse_frame(payload) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(topic, error = %e, "Dropping unparseable telemetry frame");
            return;
        }
    };

    seen_nodes.insert(node_id.clone());

    let devices = frame::normalize(&node_id, &frame);
    debug!(node = %node_id, outlets = devices.len(), "Telemetry frame normalized");
    for device in devices {
        let device_id = device.device_id.clone();
        registry.upsert(&node_id, &device_id, device);
    }
}

/// Relay a hub command to the vendor broker.
///
/// Part of the fan-out-and-filter dispatch: every collector receives
/// every command and acts only on nodes it owns.
async fn relay_command(client: &AsyncClient, seen_nodes: &HashSet<String>, command: Command) {
    if !seen_nodes.contains(&command.node_id) {
        debug!(node = %command.node_id, "Command for a node this collector does not own");
        return;
    }

    if command.command_type != "switch" {
        debug!(kind = %command.command_type, "Unsupported command type, ignoring");
        return;
    }

    let Ok(outlet_id) = command.device_id.parse::<u32>() else {
        warn!(device = %command.device_id, "Non-numeric outlet ID in command, ignoring");
        return;
    };

    let on = if command.value == "ON" { 1 } else { 0 };
    let payload = serde_json::json!({ "id": outlet_id, "on": on }).to_string();
    let downlink = topic::vendor_command_topic(&command.node_id);

    match client
        .publish(&downlink, QoS::AtLeastOnce, false, payload)
        .await
    {
        Ok(()) => info!(
            node = %command.node_id,
            outlet = outlet_id,
            value = %command.value,
            "Relayed switch command"
        ),
        Err(e) => warn!(topic = %downlink, error = %e, "Failed to relay command"),
    }
}
