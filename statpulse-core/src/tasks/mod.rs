//! Periodic jobs driven by the scheduler
//!
//! - `FetchTask`: pull aggregate stats from statshub into shared state
//! - `PublishTask`: push this instance's stats (plus system gauges) to statshub
//!
//! `tick()` never fails: each task logs its own errors and the next tick
//! simply tries again.

mod fetch;
mod publish;

pub use fetch::{FetchTask, COUNTRY_DIMENSION};
pub use publish::PublishTask;

use async_trait::async_trait;

#[async_trait]
pub trait PeriodicTask: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn tick(&self);
}
