//! Home Assistant MQTT discovery schema and payload builders.
//!
//! Every entity key, unique ID and topic is a deterministic function
//! of `(prefix, node, device, kind)`: re-advertising an unchanged node
//! is byte-identical and never creates duplicate hub-side entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pdugate_common::device::PduDevice;
use pdugate_common::registry::RegistryEntry;
use pdugate_common::topic;

use crate::config::DeviceInfoConfig;

/// A device-level discovery document, advertising one PDU node as a
/// composite device with one switch and four sensors per outlet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryMessage {
    pub device: DeviceInfo,
    pub origin: OriginInfo,
    /// Entity definitions, keyed by entity key. A sorted map keeps
    /// repeated serialization byte-identical.
    pub components: BTreeMap<String, Component>,
    pub command_topic: String,
    pub state_topic: String,
    pub qos: i32,
}

/// Physical device metadata shown in the hub's device registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub configuration_url: String,
    pub identifiers: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: String,
    pub serial_number: String,
}

/// Identifies the integration that produced a discovery document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginInfo {
    pub name: String,
    pub sw_version: String,
    pub support_url: String,
}

/// One discovery entity: a switch or a sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Entity key within the components map; not serialized itself.
    #[serde(skip)]
    pub key: String,

    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_template: Option<String>,

    // switch-only fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimistic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_off: Option<String>,
}

impl Component {
    fn empty(key: String, platform: &str) -> Self {
        Self {
            key,
            platform: platform.to_string(),
            device_class: None,
            name: None,
            object_id: None,
            state_class: None,
            unique_id: None,
            unit_of_measurement: None,
            value_template: None,
            optimistic: None,
            payload_on: None,
            payload_off: None,
            state_on: None,
            state_off: None,
        }
    }
}

/// One outlet's block in the aggregated state payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutletState {
    /// "ON" or "OFF".
    pub switch: String,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub energy: f64,
}

/// The sensor kinds advertised per outlet: (kind, unit, state_class).
const SENSOR_KINDS: [(&str, &str, Option<&str>); 4] = [
    ("voltage", "V", None),
    ("current", "A", None),
    ("power", "W", None),
    ("energy", "kWh", Some("total_increasing")),
];

/// Build the five discovery entities for one outlet: a switch plus
/// voltage, current, power and energy sensors.
pub fn build_components(node_id: &str, device: &PduDevice) -> Vec<Component> {
    let mut result = Vec::with_capacity(1 + SENSOR_KINDS.len());
    let state_key = topic::state_key(&device.device_id);

    let switch_key = topic::component_key(&device.device_id, "switch");
    let mut switch = Component::empty(switch_key.clone(), "switch");
    switch.name = Some(device.name.clone());
    switch.object_id = Some(topic::object_id(node_id, &switch_key));
    switch.unique_id = Some(switch_key);
    switch.value_template = Some(format!("{{{{ value_json.{}.switch }}}}", state_key));
    switch.optimistic = Some(false);
    switch.payload_on = Some("ON".to_string());
    switch.payload_off = Some("OFF".to_string());
    switch.state_on = Some("ON".to_string());
    switch.state_off = Some("OFF".to_string());
    result.push(switch);

    for (kind, unit, state_class) in SENSOR_KINDS {
        let key = topic::component_key(&device.device_id, kind);
        let mut sensor = Component::empty(key.clone(), "sensor");
        sensor.device_class = Some(kind.to_string());
        sensor.name = Some(format!("{} {}", device.name, kind));
        sensor.object_id = Some(topic::object_id(node_id, &key));
        sensor.state_class = state_class.map(str::to_string);
        sensor.unique_id = Some(key);
        sensor.unit_of_measurement = Some(unit.to_string());
        sensor.value_template = Some(format!("{{{{ value_json.{}.{} }}}}", state_key, kind));
        result.push(sensor);
    }

    result
}

/// Build the discovery document for one node, covering every device
/// the registry currently reports for it.
pub fn build_discovery_message(
    info: &DeviceInfoConfig,
    node_id: &str,
    entries: &[RegistryEntry],
) -> DiscoveryMessage {
    let mut components = BTreeMap::new();
    for entry in entries {
        for component in build_components(node_id, &entry.state) {
            components.insert(component.key.clone(), component);
        }
    }

    DiscoveryMessage {
        device: DeviceInfo {
            configuration_url: info.configuration_url.clone(),
            identifiers: node_id.to_string(),
            name: info.name.clone(),
            manufacturer: info.manufacturer.clone(),
            model: info.model.clone(),
            sw_version: info.sw_version.clone(),
            serial_number: info.serial_number.clone(),
        },
        origin: OriginInfo {
            name: "pdugate".to_string(),
            sw_version: env!("CARGO_PKG_VERSION").to_string(),
            support_url: info.configuration_url.clone(),
        },
        components,
        command_topic: topic::command_topic(node_id),
        state_topic: topic::state_topic(node_id),
        qos: 0,
    }
}

/// Build the compact per-node state payload: a map from
/// `switch_<device>` to the outlet's current readings.
pub fn build_state_payload(entries: &[RegistryEntry]) -> BTreeMap<String, OutletState> {
    entries
        .iter()
        .map(|entry| {
            let device = &entry.state;
            (
                topic::state_key(&device.device_id),
                OutletState {
                    switch: if device.on { "ON" } else { "OFF" }.to_string(),
                    voltage: device.voltage,
                    current: device.current,
                    power: device.power,
                    energy: device.energy,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use pdugate_common::device::DeviceType;

    fn entry(node: &str, id: &str, on: bool) -> RegistryEntry {
        RegistryEntry {
            last_seen: Instant::now(),
            device_type: DeviceType::Pdu,
            state: PduDevice {
                node_id: node.to_string(),
                device_id: id.to_string(),
                name: format!("outlet {}", id),
                on,
                voltage: 220.5,
                current: 1.2,
                power: 150.0,
                energy: 3.4,
                factor: 0.0,
                frequency: 50.0,
            },
        }
    }

    #[test]
    fn test_five_components_per_outlet_with_unique_keys() {
        let entries = vec![entry("A1", "1", true), entry("A1", "2", false), entry("A1", "3", true)];
        let message = build_discovery_message(&DeviceInfoConfig::default(), "A1", &entries);

        assert_eq!(message.components.len(), 5 * entries.len());
        assert!(message.components.contains_key("switch_2_switch"));
        assert!(message.components.contains_key("switch_2_voltage"));
        assert!(message.components.contains_key("switch_2_current"));
        assert!(message.components.contains_key("switch_2_power"));
        assert!(message.components.contains_key("switch_2_energy"));
    }

    #[test]
    fn test_discovery_topics_and_templates() {
        let entries = vec![entry("A1", "3", true)];
        let message = build_discovery_message(&DeviceInfoConfig::default(), "A1", &entries);

        assert_eq!(message.command_topic, "homeassistant/device/yespeed_pdu_A1/set");
        assert_eq!(message.state_topic, "homeassistant/device/yespeed_pdu_A1/state");

        let voltage = &message.components["switch_3_voltage"];
        assert_eq!(voltage.platform, "sensor");
        assert_eq!(voltage.device_class.as_deref(), Some("voltage"));
        assert_eq!(voltage.unit_of_measurement.as_deref(), Some("V"));
        assert_eq!(
            voltage.value_template.as_deref(),
            Some("{{ value_json.switch_3.voltage }}")
        );
        assert_eq!(
            voltage.object_id.as_deref(),
            Some("yespeed_pdu_A1_switch_3_voltage")
        );

        let energy = &message.components["switch_3_energy"];
        assert_eq!(energy.state_class.as_deref(), Some("total_increasing"));
    }

    #[test]
    fn test_switch_component_fields() {
        let components = build_components("A1", &entry("A1", "12", true).state);
        let switch = &components[0];

        assert_eq!(switch.platform, "switch");
        assert_eq!(switch.unique_id.as_deref(), Some("switch_12_switch"));
        assert_eq!(switch.payload_on.as_deref(), Some("ON"));
        assert_eq!(switch.payload_off.as_deref(), Some("OFF"));
        assert_eq!(switch.optimistic, Some(false));
        assert_eq!(
            switch.value_template.as_deref(),
            Some("{{ value_json.switch_12.switch }}")
        );
    }

    #[test]
    fn test_idempotent_readvertisement() {
        let entries = vec![entry("A1", "1", true), entry("A1", "2", false)];
        let info = DeviceInfoConfig::default();

        let first = serde_json::to_vec(&build_discovery_message(&info, "A1", &entries)).unwrap();
        let second = serde_json::to_vec(&build_discovery_message(&info, "A1", &entries)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_state_payload_shape() {
        let entries = vec![entry("A1", "1", true), entry("A1", "2", false)];
        let payload = build_state_payload(&entries);

        assert_eq!(payload.len(), 2);
        assert_eq!(payload["switch_1"].switch, "ON");
        assert_eq!(payload["switch_2"].switch, "OFF");
        assert_eq!(payload["switch_1"].voltage, 220.5);
        assert_eq!(payload["switch_1"].energy, 3.4);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["switch_1"]["power"], 150.0);
    }
}
