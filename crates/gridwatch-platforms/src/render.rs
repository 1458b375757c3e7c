//! Render Network adapter: process detection plus optional JSON counters.

use std::time::Duration;

use async_trait::async_trait;
use gridwatch_core::config::RenderConfig;
use gridwatch_core::{AdapterError, PlatformAdapter, PlatformId, RawOutput};

use crate::worker::{fetch_counters, find_worker_process, within, worker_document};

pub struct RenderAdapter {
    patterns: Vec<String>,
    status_url: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl RenderAdapter {
    pub fn new(config: &RenderConfig, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            patterns: vec![config.process_pattern.clone()],
            status_url: Some(config.status_url.clone()).filter(|u| !u.is_empty()),
            client,
            timeout,
        }
    }

    async fn collect(&self) -> Result<RawOutput, AdapterError> {
        let process = find_worker_process(&self.patterns, self.timeout).await?;

        // Counters are only meaningful while the worker is up.
        let counters = match (&process, &self.status_url) {
            (Some(_), Some(url)) => Some(fetch_counters(&self.client, url, None, self.timeout).await?),
            _ => None,
        };

        Ok(RawOutput::Json(worker_document(
            process.as_deref(),
            counters.as_ref(),
            None,
        )))
    }
}

#[async_trait]
impl PlatformAdapter for RenderAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::Render
    }

    async fn fetch(&self) -> Result<RawOutput, AdapterError> {
        within(self.timeout, self.collect()).await
    }
}
