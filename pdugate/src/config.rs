//! Gateway configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use pdugate_common::config::{LoggingConfig, load_config};
use pdugate_common::error::{Error, Result};
use pdugate_common::mqtt::MqttConfig;
use pdugate_common::topic;

/// Complete gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Vendor-side collectors. At least one is required.
    pub collectors: Vec<CollectorConfig>,

    /// Hub-side publishers. At least one is required.
    pub publishers: Vec<PublisherConfig>,

    /// Registry policy.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Load configuration from a JSON5 file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: GatewayConfig = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.collectors.is_empty() {
            return Err(Error::Config(
                "At least one collector is required".to_string(),
            ));
        }
        if self.publishers.is_empty() {
            return Err(Error::Config(
                "At least one publisher is required".to_string(),
            ));
        }
        for publisher in &self.publishers {
            let PublisherConfig::HassMqtt(hass) = publisher;
            if hass.config_interval_secs == 0 || hass.state_interval_secs == 0 {
                return Err(Error::Config(
                    "Publisher intervals must be > 0".to_string(),
                ));
            }
        }
        if self.registry.eviction.enabled && self.registry.eviction.ttl_secs == 0 {
            return Err(Error::Config(
                "registry.eviction.ttl_secs must be > 0 when eviction is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Collector variants, selected by the `type` tag.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CollectorConfig {
    /// Yespeed PDU telemetry over MQTT.
    Mqtt(YespeedCollectorConfig),
}

/// Configuration for the Yespeed MQTT collector.
#[derive(Debug, Clone, Deserialize)]
pub struct YespeedCollectorConfig {
    /// Vendor broker connection.
    pub mqtt: MqttConfig,

    /// Telemetry subscription pattern.
    #[serde(default = "default_telemetry_topic")]
    pub topic: String,
}

fn default_telemetry_topic() -> String {
    topic::TELEMETRY_PATTERN.to_string()
}

/// Publisher variants, selected by the `type` tag.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PublisherConfig {
    /// Home Assistant MQTT discovery publisher.
    HassMqtt(HassPublisherConfig),
}

/// Configuration for the Home Assistant MQTT publisher.
#[derive(Debug, Clone, Deserialize)]
pub struct HassPublisherConfig {
    /// Hub broker connection.
    pub mqtt: MqttConfig,

    /// Delay before the first discovery publish, letting telemetry
    /// populate the registry (default: 20).
    #[serde(default = "default_warmup")]
    pub warmup_secs: u64,

    /// Discovery config re-publish period in seconds (default: 300).
    #[serde(default = "default_config_interval")]
    pub config_interval_secs: u64,

    /// Live-state publish period in seconds (default: 15).
    #[serde(default = "default_state_interval")]
    pub state_interval_secs: u64,

    /// Device metadata advertised in discovery documents.
    #[serde(default)]
    pub device: DeviceInfoConfig,
}

fn default_warmup() -> u64 {
    20
}

fn default_config_interval() -> u64 {
    300
}

fn default_state_interval() -> u64 {
    15
}

/// Hardware metadata advertised to the hub.
///
/// Defaults match the Yespeed YS-NT6835 unit this gateway was written
/// against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfoConfig {
    #[serde(default = "default_device_name")]
    pub name: String,

    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_sw_version")]
    pub sw_version: String,

    #[serde(default)]
    pub configuration_url: String,

    #[serde(default)]
    pub serial_number: String,
}

fn default_device_name() -> String {
    "PDU".to_string()
}

fn default_manufacturer() -> String {
    "Yespeed".to_string()
}

fn default_model() -> String {
    "YS-NT6835".to_string()
}

fn default_sw_version() -> String {
    "OCF 3.0 r29.66".to_string()
}

impl Default for DeviceInfoConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            manufacturer: default_manufacturer(),
            model: default_model(),
            sw_version: default_sw_version(),
            configuration_url: String::new(),
            serial_number: String::new(),
        }
    }
}

/// Registry policy settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    /// TTL-based staleness eviction.
    #[serde(default)]
    pub eviction: EvictionConfig,
}

/// Staleness eviction policy.
///
/// Both variants of this gateway's design exist in the field, one with
/// eviction active and one without, so the policy is configurable
/// rather than fixed.
#[derive(Debug, Clone, Deserialize)]
pub struct EvictionConfig {
    /// Whether stale entries are removed at all (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Staleness threshold in seconds (default: 3600).
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// Sweep period in seconds (default: 3600).
    #[serde(default = "default_ttl")]
    pub sweep_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_ttl() -> u64 {
    3600
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl(),
            sweep_interval_secs: default_ttl(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdugate_common::config::parse_config;

    #[test]
    fn test_parse_minimal_config() {
        let json5 = r#"
        {
            collectors: [
                { type: "mqtt", mqtt: { host: "pdu.local", client_id: "pdugate-collector" } },
            ],
            publishers: [
                { type: "hass_mqtt", mqtt: { host: "hass.local", client_id: "pdugate-publisher" } },
            ],
        }
        "#;

        let config: GatewayConfig = parse_config(json5).unwrap();
        config.validate().unwrap();

        let CollectorConfig::Mqtt(collector) = &config.collectors[0];
        assert_eq!(collector.mqtt.host, "pdu.local");
        assert_eq!(collector.topic, "/yespeed/pdu/yespeed/+/out/1000000");

        let PublisherConfig::HassMqtt(publisher) = &config.publishers[0];
        assert_eq!(publisher.warmup_secs, 20);
        assert_eq!(publisher.config_interval_secs, 300);
        assert_eq!(publisher.state_interval_secs, 15);
        assert_eq!(publisher.device.manufacturer, "Yespeed");

        assert!(config.registry.eviction.enabled);
        assert_eq!(config.registry.eviction.ttl_secs, 3600);
    }

    #[test]
    fn test_unknown_component_type_is_rejected() {
        let json5 = r#"
        {
            collectors: [
                { type: "modbus", mqtt: { host: "pdu.local", client_id: "c" } },
            ],
            publishers: [],
        }
        "#;

        assert!(parse_config::<GatewayConfig>(json5).is_err());
    }

    #[test]
    fn test_validate_requires_collector_and_publisher() {
        let json5 = r#"
        {
            collectors: [],
            publishers: [],
        }
        "#;

        let config: GatewayConfig = parse_config(json5).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_eviction_can_be_disabled() {
        let json5 = r#"
        {
            collectors: [
                { type: "mqtt", mqtt: { host: "pdu.local", client_id: "c" } },
            ],
            publishers: [
                { type: "hass_mqtt", mqtt: { host: "hass.local", client_id: "p" } },
            ],
            registry: { eviction: { enabled: false } },
        }
        "#;

        let config: GatewayConfig = parse_config(json5).unwrap();
        config.validate().unwrap();
        assert!(!config.registry.eviction.enabled);
    }

    #[test]
    fn test_validate_zero_interval() {
        let json5 = r#"
        {
            collectors: [
                { type: "mqtt", mqtt: { host: "pdu.local", client_id: "c" } },
            ],
            publishers: [
                { type: "hass_mqtt", mqtt: { host: "hass.local", client_id: "p" }, state_interval_secs: 0 },
            ],
        }
        "#;

        let config: GatewayConfig = parse_config(json5).unwrap();
        assert!(config.validate().is_err());
    }
}
