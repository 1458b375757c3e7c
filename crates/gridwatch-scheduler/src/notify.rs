//! Event history: in-memory ring buffer of recently detected events.
//! Nothing here is persisted; a restart starts with an empty history.

use std::collections::VecDeque;

use gridwatch_core::Event;
use tokio::sync::RwLock;

/// Default number of events kept.
pub const HISTORY_CAPACITY: usize = 100;

pub struct EventHistory {
    capacity: usize,
    events: RwLock<VecDeque<Event>>,
}

impl EventHistory {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: RwLock::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Record events in detection order, evicting the oldest when full.
    pub async fn record(&self, events: &[Event]) {
        if events.is_empty() {
            return;
        }
        let mut buf = self.events.write().await;
        for event in events {
            if buf.len() == self.capacity {
                buf.pop_front();
            }
            buf.push_back(event.clone());
        }
    }

    /// Up to `limit` most recent events, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<Event> {
        self.events.read().await.iter().rev().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new()
    }
}
