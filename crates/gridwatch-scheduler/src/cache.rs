//! Status cache: latest known `PlatformStatus` per platform.
//! At most one entry per platform; writes never move a platform back in time.

use std::collections::HashMap;

use gridwatch_core::{PlatformId, PlatformStatus};
use tokio::sync::RwLock;

/// Result of a cache write.
#[derive(Debug, Clone, PartialEq)]
pub enum CachePut {
    /// Written. `previous` is what the write replaced.
    Stored { previous: Option<PlatformStatus> },
    /// Dropped: the cached status was fetched later than the incoming one.
    Stale,
}

#[derive(Default)]
pub struct StatusCache {
    entries: RwLock<HashMap<PlatformId, PlatformStatus>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, platform: PlatformId) -> Option<PlatformStatus> {
        self.entries.read().await.get(&platform).cloned()
    }

    /// Replace the cached status for `status.platform`.
    ///
    /// Read-old and write-new happen under one write lock, so concurrent
    /// pollers of the same platform each see a distinct `previous`.
    pub async fn put(&self, status: PlatformStatus) -> CachePut {
        let mut entries = self.entries.write().await;
        if let Some(cached) = entries.get(&status.platform)
            && cached.fetched_at > status.fetched_at
        {
            tracing::debug!(
                "⏪ Dropping stale {} status ({} < {})",
                status.platform,
                status.fetched_at,
                cached.fetched_at
            );
            return CachePut::Stale;
        }
        let previous = entries.insert(status.platform, status);
        CachePut::Stored { previous }
    }

    /// All cached statuses, in platform order.
    pub async fn snapshot(&self) -> Vec<PlatformStatus> {
        let entries = self.entries.read().await;
        let mut all: Vec<_> = entries.values().cloned().collect();
        all.sort_by_key(|s| s.platform);
        all
    }
}
