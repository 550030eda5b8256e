//! Fixed-rate timers for the fetch and publish tasks
//!
//! Each task runs on its own spawned timer loop, so a slow publish never
//! delays a fetch. Inside one loop a tick is awaited before the next one is
//! taken, so ticks of the same task never overlap. A tick that overruns its
//! period is followed by one catch-up tick, then the timer rejoins the
//! `t0 + n * period` grid; missed ticks are dropped rather than replayed.

use crate::config::ScheduleConfig;
use crate::error::Result;
use crate::tasks::PeriodicTask;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct Scheduler {
    fetch: Arc<dyn PeriodicTask>,
    publish: Arc<dyn PeriodicTask>,
    config: ScheduleConfig,
    cancel: CancellationToken,
    timers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(
        fetch: Arc<dyn PeriodicTask>,
        publish: Arc<dyn PeriodicTask>,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            fetch,
            publish,
            config,
            cancel: CancellationToken::new(),
            timers: Vec::new(),
        }
    }

    /// Start both timers. Must be called from within a tokio runtime.
    ///
    /// Fetch fires right away, publish only after the initial delay.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            warn!("Stats scheduler already running");
            return Ok(());
        }
        self.config.validate()?;

        self.cancel = CancellationToken::new();
        let now = Instant::now();

        self.timers.push(spawn_timer(
            self.fetch.clone(),
            now,
            self.config.fetch_interval(),
            self.cancel.clone(),
        ));
        self.timers.push(spawn_timer(
            self.publish.clone(),
            now + self.config.publish_initial_delay(),
            self.config.publish_interval(),
            self.cancel.clone(),
        ));

        info!(
            "Stats scheduler started (fetch every {}s, publish every {}s after {}s)",
            self.config.fetch_interval_secs,
            self.config.publish_interval_secs,
            self.config.publish_initial_delay_secs
        );
        Ok(())
    }

    /// Stop both timers and wait for in-flight ticks, up to the shutdown
    /// grace period. Ticks still running after that are abandoned.
    pub async fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.cancel.cancel();

        let timers = std::mem::take(&mut self.timers);
        let aborts: Vec<_> = timers.iter().map(|t| t.abort_handle()).collect();
        let grace = self.config.shutdown_grace();

        match tokio::time::timeout(grace, join_all(timers)).await {
            Ok(_) => info!("Stats scheduler stopped"),
            Err(_) => {
                warn!(
                    "Unable to await termination of stats timers within {}s, abandoning them",
                    grace.as_secs()
                );
                for abort in aborts {
                    abort.abort();
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        !self.timers.is_empty()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn spawn_timer(
    task: Arc<dyn PeriodicTask>,
    start: Instant,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval_at(start, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }
            run_tick(task.as_ref()).await;
        }

        debug!("{} timer stopped", task.name());
    })
}

/// Run one tick; a panic is logged and swallowed so the timer keeps going
async fn run_tick(task: &dyn PeriodicTask) {
    debug!("{} tick", task.name());
    if let Err(panic) = AssertUnwindSafe(task.tick()).catch_unwind().await {
        error!("{} tick panicked: {}", task.name(), panic_message(panic.as_ref()));
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}
