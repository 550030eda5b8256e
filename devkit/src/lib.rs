/*!
# StatPulse DevKit - test doubles and helpers

Makes it easy to exercise the stats tasks without a statshub server:
- Mock statshub client recording publishes
- Fixture builders for aggregate payloads and host probes
- A harness wiring tasks and scheduler against in-memory state
*/

pub mod fixtures;
pub mod mock_client;
pub mod test_utils;

pub use fixtures::{gauges, AggregateBuilder, FixedProbe};
pub use mock_client::{MockStatsClient, PublishedStats};
pub use test_utils::{init_tracing, TestHarness};
