//! World Watch
//!
//! Connects to every realtime channel of the simulation backend and logs
//! what flows through them: raw events for the points, environment and
//! events channels, semantic events for the agents channel.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use worldsim_realtime::bin_common::{load_config_from_env, BinaryRunner, ConfigType, RunConfig};
use worldsim_realtime::livewire::Subscription;
use worldsim_realtime::simworld::logging::init_tracing_with_level;
use worldsim_realtime::simworld::{
    new_registry, BubbleTiming, Endpoint, Envelope, EventKind, RealtimeConfig, SemanticEvent,
    SemanticFeed, WorldRegistry,
};

struct WorldWatch {
    run_config: RunConfig,
    registry: WorldRegistry,
    received: Arc<AtomicU64>,
    subscriptions: Vec<Subscription>,
    semantic: Option<SemanticFeed>,
}

impl WorldWatch {
    fn new(config: &RealtimeConfig) -> Self {
        Self {
            run_config: RunConfig::new("World Watch"),
            registry: new_registry(config),
            received: Arc::new(AtomicU64::new(0)),
            subscriptions: Vec::new(),
            semantic: None,
        }
    }

    /// Log every raw event of `endpoint`
    fn watch_raw(&mut self, endpoint: Endpoint) {
        let channel = self.registry.get(endpoint.path());
        for kind in EventKind::ALL {
            if kind.is_lifecycle() {
                continue;
            }
            let received = Arc::clone(&self.received);
            self.subscriptions.push(channel.on(kind, move |envelope: &Envelope| {
                received.fetch_add(1, Ordering::Relaxed);
                info!(channel = %endpoint, kind = %envelope.kind, "{}", envelope.data);
                Ok(())
            }));
        }
    }

    /// Log connection lifecycle of `endpoint`
    fn watch_lifecycle(&mut self, endpoint: Endpoint) {
        let channel = self.registry.get(endpoint.path());
        for kind in [EventKind::ConnectionOpen, EventKind::ConnectionClose, EventKind::ConnectionError] {
            self.subscriptions.push(channel.on(kind, move |_| {
                match kind {
                    EventKind::ConnectionError => warn!(channel = %endpoint, "Connection error"),
                    _ => info!(channel = %endpoint, event = %kind, "Lifecycle"),
                }
                Ok(())
            }));
        }
    }
}

impl BinaryRunner for WorldWatch {
    async fn start(&mut self) -> Result<()> {
        for endpoint in Endpoint::ALL {
            self.watch_lifecycle(endpoint);
            // agents are logged as semantic events
            if endpoint != Endpoint::Agents {
                self.watch_raw(endpoint);
            }
        }

        let received = Arc::clone(&self.received);
        self.semantic = Some(SemanticFeed::with_callback(
            &self.registry,
            BubbleTiming::default(),
            move |event| {
                received.fetch_add(1, Ordering::Relaxed);
                log_semantic(&event);
            },
            true,
        ));

        for endpoint in Endpoint::ALL {
            self.registry.connect(endpoint.path());
        }
        info!("Watching {} channels on {}", self.registry.channel_count(), self.registry.base_url());
        Ok(())
    }

    fn heartbeat(&self) {
        let mut statuses: Vec<_> = self.registry.statuses().into_iter().collect();
        statuses.sort_by(|a, b| a.0.cmp(&b.0));
        for (channel, state) in statuses {
            info!("Heartbeat: {} is {}", channel, state);
        }
        info!("Heartbeat: {} events received", self.received.load(Ordering::Relaxed));
    }

    fn stop(&mut self) -> Option<String> {
        self.semantic = None;
        self.subscriptions.clear();
        self.registry.disconnect_all();
        Some(format!(
            "Total events received: {}",
            self.received.load(Ordering::Relaxed)
        ))
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }
}

fn log_semantic(event: &SemanticEvent) {
    match event {
        SemanticEvent::AgentsReplaced(agents) => info!("Roster replaced: {} agents", agents.len()),
        SemanticEvent::AgentAdded(agent) => info!("Agent {} ({}) joined", agent.name, agent.id),
        SemanticEvent::AgentRemoved { agent_id } => info!("Agent {} left", agent_id),
        SemanticEvent::AgentPositioned { agent_id, x, y } => {
            info!("Agent {} moved to ({:.1}, {:.1})", agent_id, x, y)
        }
        SemanticEvent::MoodChanged { agent_id, mood } => info!("Agent {} feels {}", agent_id, mood),
        SemanticEvent::Bubble(bubble) => info!(
            agent_id = bubble.agent_id,
            delay_ms = bubble.delay.as_millis() as u64,
            "Bubble: {}",
            bubble.text
        ),
        SemanticEvent::DialogueLine(line) => {
            info!("{} -> {}: {}", line.speaker, line.target, line.text)
        }
        SemanticEvent::WeatherChanged(weather) => info!("Weather is now {}", weather),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = load_config_from_env(ConfigType::Realtime);
    let config = RealtimeConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    init_tracing_with_level(&config.log_level);
    config.log();

    let mut app = WorldWatch::new(&config);
    app.execute().await
}
