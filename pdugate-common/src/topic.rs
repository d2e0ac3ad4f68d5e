//! Topic addressing scheme for both transport sides.
//!
//! The vendor side speaks the Yespeed PDU telemetry convention:
//!
//! ```text
//! /yespeed/pdu/yespeed/<node>/out/1000000    (telemetry, inbound)
//! /yespeed/pdu/yespeed/<node>/in/1000000     (commands, outbound)
//! ```
//!
//! The hub side speaks the Home Assistant MQTT discovery convention:
//!
//! ```text
//! homeassistant/device/yespeed_pdu_<node>/config   (retained discovery)
//! homeassistant/device/yespeed_pdu_<node>/state    (retained live state)
//! homeassistant/device/yespeed_pdu_<node>/set      (commands, inbound)
//! ```
//!
//! These strings are a compatibility contract with the hub and the
//! vendor firmware and must be reproduced bit-exact.

/// Prefix identifying this gateway's devices on the discovery side.
pub const DISCOVERY_PREFIX: &str = "yespeed_pdu_";

/// Subscription pattern for vendor telemetry frames.
pub const TELEMETRY_PATTERN: &str = "/yespeed/pdu/yespeed/+/out/1000000";

/// Subscription pattern for hub-issued commands.
pub const COMMAND_PATTERN: &str = "homeassistant/device/+/set";

/// Discovery config topic for a node.
pub fn config_topic(node_id: &str) -> String {
    format!("homeassistant/device/{}{}/config", DISCOVERY_PREFIX, node_id)
}

/// Live-state topic for a node.
pub fn state_topic(node_id: &str) -> String {
    format!("homeassistant/device/{}{}/state", DISCOVERY_PREFIX, node_id)
}

/// Command topic for a node, advertised in the discovery document.
pub fn command_topic(node_id: &str) -> String {
    format!("homeassistant/device/{}{}/set", DISCOVERY_PREFIX, node_id)
}

/// Vendor-side downlink topic a relayed command is published to.
pub fn vendor_command_topic(node_id: &str) -> String {
    format!("/yespeed/pdu/yespeed/{}/in/1000000", node_id)
}

/// Extract the node identity from a vendor telemetry topic.
///
/// The node is the 5th of 7 slash-delimited segments (the leading `/`
/// produces an empty first segment). Any other shape yields the
/// `"unknown"` sentinel rather than failing the message.
///
/// # Example
/// ```
/// use pdugate_common::topic::node_from_telemetry_topic;
///
/// assert_eq!(node_from_telemetry_topic("/yespeed/pdu/yespeed/A1/out/1000000"), "A1");
/// assert_eq!(node_from_telemetry_topic("bad/topic"), "unknown");
/// ```
pub fn node_from_telemetry_topic(topic: &str) -> String {
    let parts: Vec<&str> = topic.split('/').collect();
    if parts.len() == 7 {
        parts[4].to_string()
    } else {
        "unknown".to_string()
    }
}

/// Extract the node identity from a hub command topic.
///
/// Returns `None` when the topic's device segment does not carry the
/// gateway's discovery prefix: the message is addressed to some other
/// integration and is not ours to handle.
///
/// # Example
/// ```
/// use pdugate_common::topic::node_from_command_topic;
///
/// assert_eq!(
///     node_from_command_topic("homeassistant/device/yespeed_pdu_A1/set"),
///     Some("A1".to_string())
/// );
/// assert_eq!(node_from_command_topic("homeassistant/device/other_thing/set"), None);
/// ```
pub fn node_from_command_topic(topic: &str) -> Option<String> {
    let parts: Vec<&str> = topic.split('/').collect();
    if parts.len() != 4 || parts[0] != "homeassistant" || parts[1] != "device" || parts[3] != "set"
    {
        return None;
    }
    parts[2]
        .strip_prefix(DISCOVERY_PREFIX)
        .map(|node| node.to_string())
}

/// Entity key for one outlet measurement, also used as the entity's
/// unique ID: `switch_<device>_<kind>`.
pub fn component_key(device_id: &str, kind: &str) -> String {
    format!("switch_{}_{}", device_id, kind)
}

/// Key of one outlet's block in the aggregated state payload.
pub fn state_key(device_id: &str) -> String {
    format!("switch_{}", device_id)
}

/// Hub-side object ID for an entity: `yespeed_pdu_<node>_<key>`.
pub fn object_id(node_id: &str, component_key: &str) -> String {
    format!("{}{}_{}", DISCOVERY_PREFIX, node_id, component_key)
}

/// Decompose a command payload key into `(device_id, kind)`.
///
/// Only keys with exactly three underscore-delimited parts are
/// recognized; anything else is skipped by the caller.
pub fn parse_component_key(key: &str) -> Option<(&str, &str)> {
    let mut parts = key.split('_');
    let (first, device, kind) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || first != "switch" {
        return None;
    }
    Some((device, kind))
}
