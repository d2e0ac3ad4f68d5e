//! Concurrent, TTL-aware in-memory store of last-known device state.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::device::{DeviceType, PduDevice};

/// One registry cell: last-known canonical state plus freshness metadata.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Timestamp of the most recent successful write.
    pub last_seen: Instant,
    /// Device class tag. Never changes once set for a key.
    pub device_type: DeviceType,
    /// The canonical device payload.
    pub state: PduDevice,
}

/// Shared device registry mapping `(node, device)` to last-known state.
///
/// The registry exclusively owns its entries; callers always receive
/// clones. A single reader/writer lock guards the whole map: any number
/// of concurrent reads, or one exclusive write, never both. Expected
/// cardinality is tens to low hundreds of devices, so the global
/// critical section stays trivially short.
///
/// Every public operation is atomic in isolation; no transaction spans
/// two operations. Writes to the same key are linearized by the lock
/// (last writer wins), with no ordering promised across keys.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    entries: RwLock<HashMap<(String, String), RegistryEntry>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `(node_id, device_id)`,
    /// refreshing `last_seen` to the current time.
    ///
    /// A write carrying a device type different from the existing
    /// entry's is a data-corruption condition: it is logged and
    /// dropped, leaving the entry untouched.
    pub fn upsert(&self, node_id: &str, device_id: &str, state: PduDevice) {
        self.upsert_at(node_id, device_id, state, Instant::now());
    }

    fn upsert_at(&self, node_id: &str, device_id: &str, state: PduDevice, now: Instant) {
        let mut entries = self.entries.write();
        match entries.get_mut(&(node_id.to_string(), device_id.to_string())) {
            Some(entry) => {
                if entry.device_type != DeviceType::Pdu {
                    warn!(
                        node = node_id,
                        device = device_id,
                        existing = entry.device_type.as_str(),
                        "Rejected write: device type changed, dropping"
                    );
                    return;
                }
                entry.last_seen = now;
                entry.state = state;
            }
            None => {
                debug!(node = node_id, device = device_id, "New device tracked");
                entries.insert(
                    (node_id.to_string(), device_id.to_string()),
                    RegistryEntry {
                        last_seen: now,
                        device_type: DeviceType::Pdu,
                        state,
                    },
                );
            }
        }
    }

    /// Snapshot of all distinct node IDs currently tracked.
    ///
    /// No ordering guarantee.
    pub fn nodes(&self) -> HashSet<String> {
        self.entries
            .read()
            .keys()
            .map(|(node, _)| node.clone())
            .collect()
    }

    /// Snapshot of all device entries under a node.
    ///
    /// Empty for unknown nodes.
    pub fn devices(&self, node_id: &str) -> Vec<RegistryEntry> {
        self.entries
            .read()
            .iter()
            .filter(|((node, _), _)| node == node_id)
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Remove every entry whose `last_seen + ttl` lies strictly before
    /// `now`. An entry aged exactly `ttl` is kept.
    ///
    /// Designed to run from a periodic sweep, not per-write, to bound
    /// lock contention.
    pub fn evict_stale(&self, now: Instant, ttl: Duration) {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.last_seen + ttl >= now);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, "Evicted stale registry entries");
        }
    }

    /// Number of tracked devices, across all nodes.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
