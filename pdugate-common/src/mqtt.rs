//! MQTT connection configuration and setup.
//!
//! Connection reliability (keep-alive, reconnection, session state) is
//! the client library's contract: `rumqttc`'s event loop reconnects on
//! its own as long as it keeps being polled.

use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use serde::{Deserialize, Serialize};

/// MQTT broker connection settings, shared by collectors and publishers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker hostname or IP address.
    pub host: String,

    /// Broker port (default: 1883).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Client identifier presented to the broker.
    pub client_id: String,

    /// Keep-alive interval in seconds (default: 60).
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,

    /// Optional username.
    #[serde(default)]
    pub username: Option<String>,

    /// Optional password.
    #[serde(default)]
    pub password: Option<String>,
}

fn default_port() -> u16 {
    1883
}

fn default_keepalive() -> u64 {
    60
}

/// Build an MQTT client and its event loop from a configuration.
///
/// The returned event loop must be polled continuously for the client
/// to make progress; each component owns and drives its own loop.
pub fn connect(config: &MqttConfig) -> (AsyncClient, EventLoop) {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(config.keepalive_secs));

    if let (Some(user), Some(pass)) = (&config.username, &config.password) {
        options.set_credentials(user, pass);
    }

    AsyncClient::new(options, 64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_parse_minimal_config() {
        let json5 = r#"
        {
            host: "broker.local",
            client_id: "pdugate-test",
        }
        "#;

        let config: MqttConfig = parse_config(json5).unwrap();

        assert_eq!(config.host, "broker.local");
        assert_eq!(config.port, 1883);
        assert_eq!(config.keepalive_secs, 60);
        assert!(config.username.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let json5 = r#"
        {
            host: "192.168.1.10",
            port: 8883,
            client_id: "pdugate",
            keepalive_secs: 30,
            username: "gateway",
            password: "secret",
        }
        "#;

        let config: MqttConfig = parse_config(json5).unwrap();

        assert_eq!(config.port, 8883);
        assert_eq!(config.keepalive_secs, 30);
        assert_eq!(config.username.as_deref(), Some("gateway"));
        assert_eq!(config.password.as_deref(), Some("secret"));
    }
}
