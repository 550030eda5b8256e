//! StatPulse Agent - keeps local stats in step with statshub
//!
//! - Pulls aggregate usage stats every minute into the local state store
//! - Pushes this instance's counters and host gauges every five minutes
//! - Stops cleanly on Ctrl-C, waiting for in-flight ticks

mod config;

use anyhow::{Context, Result};
use config::AgentConfig;
use statpulse_core::{
    BroadcastNotifier, FetchTask, HttpStatsClient, PublishTask, Scheduler, SystemMetricsSampler,
};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("statpulse=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Log change notifications until the notifier is dropped
fn spawn_event_logger(mut events: broadcast::Receiver<statpulse_core::SyncEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!("sync {} at {}", event.path.as_str(), event.at),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event logger lagged, skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("StatPulse Agent v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = AgentConfig::load()
        .await
        .context("Failed to load agent configuration")?;
    info!(
        "Instance {} reporting to {}",
        config.instance.instance_id, config.statshub.base_url
    );

    let state = Arc::new(config.build_state());
    let client =
        Arc::new(HttpStatsClient::new(&config.statshub).context("Failed to build statshub client")?);
    let notifier = Arc::new(BroadcastNotifier::default());
    // takes a baseline CPU sample, which blocks briefly
    let sampler = tokio::task::spawn_blocking(SystemMetricsSampler::new)
        .await
        .context("Failed to initialise system metrics sampler")?;
    info!("Sampling host metrics on {:?} platform", sampler.platform());
    let sampler = Arc::new(sampler);
    spawn_event_logger(notifier.subscribe());

    let fetch = FetchTask::new(client.clone(), state.clone(), notifier.clone());
    let publish = PublishTask::new(client, state, sampler);
    let mut scheduler = Scheduler::new(Arc::new(fetch), Arc::new(publish), config.schedule);

    scheduler.start().context("Failed to start stats scheduler")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    scheduler.stop().await;
    info!("StatPulse Agent stopped");
    Ok(())
}
