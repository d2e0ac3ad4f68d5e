//! Command routing from the hub side back to collectors.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use pdugate_common::device::Command;
use pdugate_common::topic;

/// Fans hub-issued commands out to every registered collector.
///
/// There is no node-to-collector ownership index: each collector
/// receives every command and filters by the nodes it has seen. At
/// this scale the wasted work is cheaper than maintaining the index.
#[derive(Debug, Clone, Default)]
pub struct CommandRouter {
    senders: Vec<mpsc::Sender<Command>>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collector, returning the receiving end of its
    /// command channel. Must be called for every collector before the
    /// router is handed to publishers.
    pub fn register(&mut self) -> mpsc::Receiver<Command> {
        let (tx, rx) = mpsc::channel(32);
        self.senders.push(tx);
        rx
    }

    /// Number of registered collectors.
    pub fn collectors(&self) -> usize {
        self.senders.len()
    }

    /// Decode an inbound control message into commands.
    ///
    /// Returns nothing when the topic is not addressed to this gateway
    /// or the payload is not a JSON object. Payload keys that do not
    /// decompose into exactly three underscore-delimited parts are
    /// skipped, never fatal.
    pub fn decode(topic: &str, payload: &[u8]) -> Vec<Command> {
        let Some(node_id) = topic::node_from_command_topic(topic) else {
            debug!(topic, "Control message not addressed to this gateway");
            return Vec::new();
        };

        let fields: Value = match serde_json::from_slice(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(topic, error = %e, "Dropping unparseable command payload");
                return Vec::new();
            }
        };
        let Some(fields) = fields.as_object() else {
            warn!(topic, "Command payload is not an object, dropping");
            return Vec::new();
        };

        let mut commands = Vec::new();
        for (key, value) in fields {
            let Some((device_id, kind)) = topic::parse_component_key(key) else {
                debug!(key, "Skipping unrecognized command key");
                continue;
            };

            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };

            commands.push(Command {
                node_id: node_id.clone(),
                device_id: device_id.to_string(),
                command_type: kind.to_string(),
                value,
            });
        }

        commands
    }

    /// Broadcast commands to every registered collector.
    ///
    /// Never blocks: the caller is an MQTT event loop that must keep
    /// polling. A collector whose channel is full or closed loses the
    /// command; the hub converges via the next state cycle.
    pub fn dispatch(&self, commands: Vec<Command>) {
        for command in commands {
            for sender in &self.senders {
                if let Err(e) = sender.try_send(command.clone()) {
                    warn!(error = %e, "Dropping command, collector channel unavailable");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_switch_command() {
        let commands = CommandRouter::decode(
            "homeassistant/device/yespeed_pdu_A1/set",
            br#"{"switch_12_switch": "OFF"}"#,
        );

        assert_eq!(
            commands,
            vec![Command {
                node_id: "A1".to_string(),
                device_id: "12".to_string(),
                command_type: "switch".to_string(),
                value: "OFF".to_string(),
            }]
        );
    }

    #[test]
    fn test_decode_skips_short_keys() {
        let commands = CommandRouter::decode(
            "homeassistant/device/yespeed_pdu_A1/set",
            br#"{"switch_12": "ON", "switch_3_switch": "ON"}"#,
        );

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].device_id, "3");
    }

    #[test]
    fn test_decode_ignores_foreign_topics() {
        let commands = CommandRouter::decode(
            "homeassistant/device/zigbee_bulb/set",
            br#"{"switch_1_switch": "ON"}"#,
        );

        assert!(commands.is_empty());
    }

    #[test]
    fn test_decode_drops_malformed_payload() {
        let commands = CommandRouter::decode(
            "homeassistant/device/yespeed_pdu_A1/set",
            b"{not json",
        );

        assert!(commands.is_empty());
    }

    #[test]
    fn test_decode_coerces_non_string_values() {
        let commands = CommandRouter::decode(
            "homeassistant/device/yespeed_pdu_A1/set",
            br#"{"switch_2_switch": 1}"#,
        );

        assert_eq!(commands[0].value, "1");
    }

    fn command() -> Command {
        Command {
            node_id: "A1".to_string(),
            device_id: "1".to_string(),
            command_type: "switch".to_string(),
            value: "ON".to_string(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_fans_out_to_all_collectors() {
        let mut router = CommandRouter::new();
        let mut rx_a = router.register();
        let mut rx_b = router.register();
        assert_eq!(router.collectors(), 2);

        let command = command();
        router.dispatch(vec![command.clone()]);

        assert_eq!(rx_a.recv().await, Some(command.clone()));
        assert_eq!(rx_b.recv().await, Some(command));
    }

    #[test]
    fn test_dispatch_never_blocks_on_full_channel() {
        let mut router = CommandRouter::new();
        let mut rx = router.register();

        // One command more than the channel holds. The overflow is
        // dropped; dispatch returns instead of stalling the caller.
        router.dispatch(vec![command(); 33]);

        let mut delivered = 0;
        while rx.try_recv().is_ok() {
            delivered += 1;
        }
        assert_eq!(delivered, 32);
    }
}
