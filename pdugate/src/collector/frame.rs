//! Vendor telemetry frame parsing and normalization.
//!
//! A Yespeed telemetry frame describes one or more device groups, each
//! holding a set of sub-devices (outlets). Group-level readings
//! (voltage, frequency, power factor) are shared by every outlet in
//! the group; the remaining readings are per outlet.

use serde::Deserialize;

use pdugate_common::device::PduDevice;

/// A decoded telemetry frame.
#[derive(Debug, Deserialize)]
pub struct DeviceGroupFrame {
    #[serde(default)]
    pub devices: Vec<DeviceGroup>,
}

/// One vendor device group. Unknown vendor fields are tolerated and
/// ignored.
#[derive(Debug, Deserialize)]
pub struct DeviceGroup {
    /// Group identifier, 1-based.
    #[serde(default)]
    pub id: i64,

    #[serde(default)]
    pub name: String,

    /// Group voltage, as a protocol string.
    #[serde(default)]
    pub voltage: String,

    /// Group total current.
    #[serde(default, rename = "tcurrent")]
    pub total_current: String,

    /// Group frequency.
    #[serde(default, rename = "freq")]
    pub frequency: String,

    /// Group power factor.
    #[serde(default)]
    pub factor: String,

    #[serde(default)]
    pub energy: String,

    /// Outlets within this group.
    #[serde(default, rename = "subdevs")]
    pub sub_devices: Vec<SubDevice>,
}

/// One outlet within a device group.
#[derive(Debug, Deserialize)]
pub struct SubDevice {
    /// Outlet identifier, 1-based within the group.
    #[serde(default)]
    pub id: i64,

    /// Switch state: 1 is on, 0 is off.
    #[serde(default)]
    pub on: i64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub current: String,

    #[serde(default)]
    pub power: String,

    #[serde(default)]
    pub energy: String,
}

/// Decode a raw vendor payload into a telemetry frame.
///
/// The payload as received is a bare `"devices": [...]` sequence with
/// no enclosing object; the object boundary is restored before
/// structured decoding.
pub fn parse_frame(payload: &[u8]) -> serde_json::Result<DeviceGroupFrame> {
    let mut framed = Vec::with_capacity(payload.len() + 2);
    framed.push(b'{');
    framed.extend_from_slice(payload);
    framed.push(b'}');
    serde_json::from_slice(&framed)
}

/// Parse a vendor numeric string.
///
/// Individual malformed fields are common in noisy telemetry and must
/// not suppress the rest of the record: they normalize to zero.
pub fn parse_metric(value: &str) -> f64 {
    value.parse().unwrap_or(0.0)
}

/// Reconstruct the flat, stable outlet numbering from the vendor's
/// two-level group/sub-device addressing.
///
/// Discovery entity IDs are derived from this number, so the formula
/// must stay fixed for entities to survive gateway restarts.
pub fn global_device_id(group_id: i64, group_size: usize, sub_id: i64) -> i64 {
    (group_id - 1) * group_size as i64 + sub_id
}

/// Normalize a telemetry frame into canonical per-outlet records.
pub fn normalize(node_id: &str, frame: &DeviceGroupFrame) -> Vec<PduDevice> {
    let mut devices = Vec::new();

    for group in &frame.devices {
        let voltage = parse_metric(&group.voltage);
        let frequency = parse_metric(&group.frequency);
        let factor = parse_metric(&group.factor);
        let group_size = group.sub_devices.len();

        for sub in &group.sub_devices {
            let device_id = global_device_id(group.id, group_size, sub.id);
            devices.push(PduDevice {
                node_id: node_id.to_string(),
                device_id: device_id.to_string(),
                name: sub.name.clone(),
                on: sub.on == 1,
                voltage,
                current: parse_metric(&sub.current),
                power: parse_metric(&sub.power),
                energy: parse_metric(&sub.energy),
                factor,
                frequency,
            });
        }
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    // A realistic frame as seen on the wire: no enclosing braces,
    // vendor passthrough fields present.
    const FRAME: &str = r#""devices":[{"id":1,"vid":2,"type":1,"slave":0,"name":"pdu-a","voltage":"220.5","tcurrent":"2.4","power":300,"freq":"50.0","factor":"0","energy":"12.5","thresmask":0,"hw":1,"subdevs":[{"id":1,"type":1,"on":0,"name":"outlet 1","icon":"","current":"0","power":"0","energy":"1.1","who":"web","act":"off","tim":"","det":""},{"id":2,"type":1,"on":1,"name":"outlet 2","icon":"","current":"1.2","power":"150","energy":"3.4"}]}]"#;

    #[test]
    fn test_parse_frame_repairs_framing() {
        let frame = parse_frame(FRAME.as_bytes()).unwrap();

        assert_eq!(frame.devices.len(), 1);
        let group = &frame.devices[0];
        assert_eq!(group.id, 1);
        assert_eq!(group.voltage, "220.5");
        assert_eq!(group.frequency, "50.0");
        assert_eq!(group.sub_devices.len(), 2);
    }

    #[test]
    fn test_parse_frame_rejects_malformed_json() {
        assert!(parse_frame(b"\"devices\":[{").is_err());
        assert!(parse_frame(b"not json at all").is_err());
    }

    #[test]
    fn test_global_device_id_formula() {
        // (group - 1) * group_size + sub
        assert_eq!(global_device_id(1, 2, 2), 2);
        assert_eq!(global_device_id(2, 8, 3), 11);
        assert_eq!(global_device_id(3, 4, 1), 9);
    }

    #[test]
    fn test_normalize_scenario() {
        let frame = parse_frame(FRAME.as_bytes()).unwrap();
        let devices = normalize("A1", &frame);

        assert_eq!(devices.len(), 2);

        let second = &devices[1];
        assert_eq!(second.node_id, "A1");
        assert_eq!(second.device_id, "2");
        assert_eq!(second.name, "outlet 2");
        assert!(second.on);
        assert_eq!(second.voltage, 220.5);
        assert_eq!(second.current, 1.2);
        assert_eq!(second.power, 150.0);
        assert_eq!(second.energy, 3.4);
        assert_eq!(second.factor, 0.0);
        assert_eq!(second.frequency, 50.0);
    }

    #[test]
    fn test_normalize_is_stable() {
        let frame = parse_frame(FRAME.as_bytes()).unwrap();
        let first = normalize("A1", &frame);
        let second = normalize("A1", &frame);

        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_numeric_field_yields_zero() {
        assert_eq!(parse_metric("not-a-number"), 0.0);
        assert_eq!(parse_metric(""), 0.0);
        assert_eq!(parse_metric("220.5"), 220.5);
    }

    #[test]
    fn test_group_fields_shared_across_outlets() {
        let frame = parse_frame(FRAME.as_bytes()).unwrap();
        let devices = normalize("A1", &frame);

        assert_eq!(devices[0].voltage, devices[1].voltage);
        assert_eq!(devices[0].frequency, devices[1].frequency);
        assert_eq!(devices[0].factor, devices[1].factor);
        // Per-outlet fields differ.
        assert_ne!(devices[0].current, devices[1].current);
    }
}
