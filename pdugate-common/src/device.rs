//! Canonical device model shared by collectors and publishers.

use serde::{Deserialize, Serialize};

/// Device classes admitted by the registry keying scheme.
///
/// Only PDU outlets exist today; the tag is kept so future classes can
/// share the registry without breaking existing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Pdu,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdu => "pdu",
        }
    }
}

/// Normalized state of one switchable, individually metered outlet.
///
/// `(node_id, device_id)` uniquely identifies a device across the
/// registry's lifetime. `voltage`, `factor` and `frequency` are shared
/// across the vendor device group the outlet belongs to; the remaining
/// readings are per outlet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PduDevice {
    /// Physical PDU gateway/unit identity (externally assigned, stable).
    pub node_id: String,
    /// Outlet identity, unique within the node.
    pub device_id: String,
    /// Human-readable label.
    pub name: String,
    /// Switch state.
    pub on: bool,
    /// Instantaneous voltage (V).
    pub voltage: f64,
    /// Instantaneous current (A).
    pub current: f64,
    /// Instantaneous active power (W).
    pub power: f64,
    /// Cumulative energy counter (kWh).
    pub energy: f64,
    /// Power factor.
    pub factor: f64,
    /// Grid frequency (Hz).
    pub frequency: f64,
}

/// A control command decoded from the hub side, addressed to one outlet.
///
/// Commands are transient: produced by the command router, consumed at
/// most once per collector, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub node_id: String,
    pub device_id: String,
    /// Command kind, e.g. "switch".
    pub command_type: String,
    /// Opaque command payload, e.g. "ON" / "OFF".
    pub value: String,
}
