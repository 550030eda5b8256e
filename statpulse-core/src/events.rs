//! Change notifications for observers of the shared state (UI sync etc.)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Which part of the state changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncPath {
    GlobalStats,
    Regions,
}

impl SyncPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPath::GlobalStats => "globalStats",
            SyncPath::Regions => "regions",
        }
    }
}

/// Current value of a state path, as announced to observers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    pub path: SyncPath,
    pub payload: serde_json::Value,
    pub at: DateTime<Utc>,
}

impl SyncEvent {
    pub fn new(path: SyncPath, payload: serde_json::Value) -> Self {
        Self {
            path,
            payload,
            at: Utc::now(),
        }
    }
}

pub trait ChangeNotifier: Send + Sync {
    fn sync(&self, event: SyncEvent);
}

/// Fan-out notifier on a tokio broadcast channel
#[derive(Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<SyncEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn sync(&self, event: SyncEvent) {
        // Err only means nobody is listening right now
        let _ = self.sender.send(event);
    }
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn sync(&self, _event: SyncEvent) {}
}
