//! Binary runner utilities
//!
//! Standard startup/shutdown banners, a status heartbeat and Ctrl+C handling
//! for long-running binaries.

use std::time::Duration;
use tracing::info;

/// Configuration for running a binary application
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the binary (for logging)
    pub name: String,
    /// Heartbeat interval in seconds
    pub heartbeat_interval_secs: u64,
}

impl RunConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            heartbeat_interval_secs: 60,
        }
    }

    pub fn with_heartbeat(mut self, secs: u64) -> Self {
        self.heartbeat_interval_secs = secs;
        self
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }
}

/// Trait for long-running binaries
pub trait BinaryRunner {
    /// Start the application's work; returns once it is running
    async fn start(&mut self) -> anyhow::Result<()>;

    /// Periodic status report
    fn heartbeat(&self);

    /// Release everything before exit; returns optional stats for the banner
    fn stop(&mut self) -> Option<String>;

    fn config(&self) -> &RunConfig;

    fn print_banner(&self) {
        let config = self.config();
        info!("");
        info!("========================================");
        info!("Starting {}", config.name);
        info!("Press Ctrl+C to stop");
        info!("========================================");
        info!("");
    }

    fn print_shutdown(&self, stats: Option<&str>) {
        let config = self.config();
        info!("");
        info!("========================================");
        info!("{} stopped gracefully", config.name);
        if let Some(stats) = stats {
            info!("{}", stats);
        }
        info!("========================================");
    }

    /// Start, heartbeat until Ctrl+C, then stop
    async fn execute(&mut self) -> anyhow::Result<()> {
        self.print_banner();
        self.start().await?;

        let mut heartbeat = tokio::time::interval(self.config().heartbeat_interval());
        heartbeat.tick().await;
        loop {
            tokio::select! {
                _ = heartbeat.tick() => self.heartbeat(),
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        let stats = self.stop();
        self.print_shutdown(stats.as_deref());
        Ok(())
    }
}
