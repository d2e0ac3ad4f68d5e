//! Yespeed PDU to Home Assistant MQTT gateway.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use pdugate_common::config::LoggingConfig;
use pdugate_common::init_tracing;
use pdugate_common::registry::DeviceRegistry;

use pdugate::collector::Collector;
use pdugate::config::GatewayConfig;
use pdugate::publisher::Publisher;
use pdugate::router::CommandRouter;
use pdugate::runner::{GatewayRunner, eviction_sweep};

/// Bridge Yespeed PDU telemetry to Home Assistant over MQTT.
#[derive(Parser, Debug)]
#[command(name = "pdugate")]
#[command(about = "Yespeed PDU to Home Assistant MQTT gateway", long_about = None)]
struct Args {
    /// Path to the configuration file (JSON5 format).
    #[arg(short, long, default_value = "gateway.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = GatewayConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let log_config = match &args.log_level {
        Some(level) => LoggingConfig {
            level: level.clone(),
            ..config.logging.clone()
        },
        None => config.logging.clone(),
    };
    init_tracing(&log_config).context("Failed to initialize tracing")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        collectors = config.collectors.len(),
        publishers = config.publishers.len(),
        "Starting pdugate"
    );

    // The registry is the only mutable state shared across tasks; it
    // is injected explicitly, never process-global.
    let registry = Arc::new(DeviceRegistry::new());

    let mut runner = GatewayRunner::new();

    // Collectors register with the router first so every publisher
    // sees the complete fan-out set.
    let mut router = CommandRouter::new();
    let mut collectors = Vec::new();
    for collector_config in config.collectors {
        let commands = router.register();
        collectors.push(Collector::from_config(
            collector_config,
            registry.clone(),
            commands,
        ));
    }

    tracing::debug!(collectors = router.collectors(), "Command router wired");

    for (index, collector) in collectors.into_iter().enumerate() {
        let name = format!("collector-{}-{}", index, collector.name());
        runner.spawn_component(name, collector.run());
    }

    for (index, publisher_config) in config.publishers.into_iter().enumerate() {
        let publisher = Publisher::from_config(publisher_config, registry.clone(), router.clone());
        let name = format!("publisher-{}-{}", index, publisher.name());
        runner.spawn_component(name, publisher.run());
    }

    if config.registry.eviction.enabled {
        runner.spawn(eviction_sweep(registry.clone(), config.registry.eviction));
    }

    runner.run().await
}
