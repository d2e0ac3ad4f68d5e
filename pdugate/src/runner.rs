//! Gateway lifecycle management.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};

use pdugate_common::registry::DeviceRegistry;

use crate::config::EvictionConfig;

/// Owns every spawned gateway task and handles graceful shutdown.
///
/// Components run until SIGINT/ctrl_c: the runner then aborts all
/// tasks, allowing briefly for in-flight publishes to settle. No new
/// cycle starts after the signal is observed.
pub struct GatewayRunner {
    tasks: Vec<JoinHandle<()>>,
}

impl GatewayRunner {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Spawn a worker task.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(tokio::spawn(future));
    }

    /// Spawn a collector/publisher task.
    ///
    /// A startup error is fatal to that component only: it is logged
    /// and the remaining components keep running.
    pub fn spawn_component<F, E>(&mut self, name: String, future: F)
    where
        F: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        self.tasks.push(tokio::spawn(async move {
            if let Err(e) = future.await {
                error!(component = %name, error = %e, "Component failed");
            }
        }));
    }

    /// Run until ctrl_c, then abort every task.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(tasks = self.tasks.len(), "Gateway running. Press Ctrl+C to stop.");

        signal::ctrl_c().await?;

        info!("Received shutdown signal");

        for task in &self.tasks {
            task.abort();
        }

        // Let in-flight publishes settle.
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("Goodbye!");

        Ok(())
    }
}

impl Default for GatewayRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic staleness sweep over the shared registry.
///
/// Spawned only when eviction is enabled in the registry policy.
pub async fn eviction_sweep(registry: Arc<DeviceRegistry>, config: EvictionConfig) {
    let ttl = Duration::from_secs(config.ttl_secs);
    let interval = Duration::from_secs(config.sweep_interval_secs);

    info!(ttl_secs = config.ttl_secs, "Registry eviction sweep started");

    loop {
        tokio::time::sleep(interval).await;
        registry.evict_stale(Instant::now(), ttl);
    }
}
