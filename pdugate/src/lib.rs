//! MQTT gateway bridging Yespeed PDU telemetry to Home Assistant.
//!
//! Collectors ingest vendor device-group telemetry and normalize it
//! into the shared device registry; publishers project the registry
//! into Home Assistant MQTT discovery and state topics and route
//! hub-issued commands back to the collectors.
//!
//! ```text
//! vendor MQTT ──▶ collector ──▶ registry ──▶ publisher ──▶ hub MQTT
//! vendor MQTT ◀── collector ◀── router   ◀── publisher ◀── hub MQTT
//! ```

pub mod collector;
pub mod config;
pub mod publisher;
pub mod router;
pub mod runner;
