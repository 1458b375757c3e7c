//! Monitor: one fetch → parse → put → diff → dispatch pipeline per platform.
//!
//! Used by both the periodic scheduler and on-demand chat queries, so an
//! on-demand refresh records and delivers the same events a scheduled poll
//! would have.

use std::sync::Arc;

use futures::future::join_all;
use gridwatch_core::{Event, GridWatchError, PlatformAdapter, PlatformId, PlatformStatus, Result};

use crate::cache::{CachePut, StatusCache};
use crate::diff::diff;
use crate::dispatch::{DispatchFailure, Dispatcher};
use crate::notify::EventHistory;
use crate::subscribers::SubscriberRegistry;

/// What a single poll of one platform did.
#[derive(Debug)]
pub enum PollOutcome {
    /// New status cached; `events` were detected and dispatched.
    Updated {
        status: PlatformStatus,
        events: Vec<Event>,
        delivered: usize,
        failures: Vec<DispatchFailure>,
    },
    /// Fetched status was older than the cached one and was dropped.
    Stale { status: PlatformStatus },
    /// Adapter or parser failed; cache untouched.
    Failed { platform: PlatformId, error: GridWatchError },
}

impl PollOutcome {
    pub fn platform(&self) -> PlatformId {
        match self {
            PollOutcome::Updated { status, .. } | PollOutcome::Stale { status } => status.platform,
            PollOutcome::Failed { platform, .. } => *platform,
        }
    }

    pub fn events(&self) -> &[Event] {
        match self {
            PollOutcome::Updated { events, .. } => events,
            _ => &[],
        }
    }
}

pub struct Monitor {
    adapters: Vec<Arc<dyn PlatformAdapter>>,
    cache: Arc<StatusCache>,
    registry: Arc<SubscriberRegistry>,
    history: Arc<EventHistory>,
    dispatcher: Option<Dispatcher>,
}

impl Monitor {
    /// `adapters` should hold exactly the enabled platforms.
    pub fn new(
        adapters: Vec<Arc<dyn PlatformAdapter>>,
        cache: Arc<StatusCache>,
        registry: Arc<SubscriberRegistry>,
        history: Arc<EventHistory>,
    ) -> Self {
        Self {
            adapters,
            cache,
            registry,
            history,
            dispatcher: None,
        }
    }

    /// Deliver detected events through `dispatcher`. Without one, events are
    /// only recorded in the history.
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn cache(&self) -> &Arc<StatusCache> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn history(&self) -> &Arc<EventHistory> {
        &self.history
    }

    /// Enabled platforms, in registration order.
    pub fn platforms(&self) -> Vec<PlatformId> {
        self.adapters.iter().map(|a| a.platform()).collect()
    }

    pub fn is_enabled(&self, platform: PlatformId) -> bool {
        self.adapter(platform).is_some()
    }

    fn adapter(&self, platform: PlatformId) -> Option<&Arc<dyn PlatformAdapter>> {
        self.adapters.iter().find(|a| a.platform() == platform)
    }

    /// Poll every enabled platform concurrently.
    pub async fn poll_all(&self) -> Vec<PollOutcome> {
        join_all(self.adapters.iter().map(|a| self.poll_platform(a.as_ref()))).await
    }

    /// Run the full pipeline for one adapter.
    pub async fn poll_platform(&self, adapter: &dyn PlatformAdapter) -> PollOutcome {
        let platform = adapter.platform();

        let raw = match adapter.fetch().await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("⚠️ {platform} unavailable: {e}");
                return PollOutcome::Failed {
                    platform,
                    error: GridWatchError::adapter(platform, e),
                };
            }
        };

        let status = match gridwatch_platforms::parse(platform, &raw) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("⚠️ Could not parse {platform} output: {e}");
                return PollOutcome::Failed {
                    platform,
                    error: e.into(),
                };
            }
        };

        let previous = match self.cache.put(status.clone()).await {
            CachePut::Stored { previous } => previous,
            CachePut::Stale => return PollOutcome::Stale { status },
        };

        let events = diff(platform, previous.as_ref(), &status);
        tracing::debug!(
            "📊 {platform}: running={} events={}",
            status.running,
            events.len()
        );
        self.history.record(&events).await;

        let mut delivered = 0;
        let mut failures = Vec::new();
        if let Some(dispatcher) = &self.dispatcher
            && !events.is_empty()
        {
            let subscribers = self.registry.enabled_subscribers().await;
            // Sequential per event so each subscriber sees events in diff order.
            for event in &events {
                let report = dispatcher.dispatch(event, &subscribers).await;
                delivered += report.delivered;
                failures.extend(report.failures);
            }
        }

        PollOutcome::Updated {
            status,
            events,
            delivered,
            failures,
        }
    }

    /// On-demand poll of one platform. Returns the freshest known status.
    pub async fn refresh(&self, platform: PlatformId) -> Result<PlatformStatus> {
        let adapter = self
            .adapter(platform)
            .ok_or(GridWatchError::PlatformDisabled(platform))?;

        match self.poll_platform(adapter.as_ref()).await {
            PollOutcome::Updated { status, .. } => Ok(status),
            PollOutcome::Stale { status } => Ok(self.cache.get(platform).await.unwrap_or(status)),
            PollOutcome::Failed { error, .. } => Err(error),
        }
    }
}
