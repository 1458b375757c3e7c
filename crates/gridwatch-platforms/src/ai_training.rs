//! AI-training providers adapter (Together.ai, Akash Network).
//!
//! One worker process serves both providers; the enabled flags from config
//! are reported alongside so the status block can list active providers.

use std::time::Duration;

use async_trait::async_trait;
use gridwatch_core::config::AiTrainingConfig;
use gridwatch_core::{AdapterError, PlatformAdapter, PlatformId, RawOutput};
use serde_json::json;

use crate::worker::{fetch_counters, find_worker_process, within, worker_document};

pub struct AiTrainingAdapter {
    search_terms: Vec<String>,
    together_ai_enabled: bool,
    akash_enabled: bool,
    status_url: Option<String>,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl AiTrainingAdapter {
    pub fn new(config: &AiTrainingConfig, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            search_terms: config.process_search_terms.clone(),
            together_ai_enabled: config.together_ai_enabled,
            akash_enabled: config.akash_enabled,
            status_url: Some(config.status_url.clone()).filter(|u| !u.is_empty()),
            api_key: config.api_key.clone(),
            client,
            timeout,
        }
    }

    async fn collect(&self) -> Result<RawOutput, AdapterError> {
        let process = find_worker_process(&self.search_terms, self.timeout).await?;
        let state = if process.is_some() { "running" } else { "stopped" };

        let counters = match (&process, &self.status_url) {
            (Some(_), Some(url)) => {
                Some(fetch_counters(&self.client, url, Some(&self.api_key), self.timeout).await?)
            }
            _ => None,
        };

        let platforms = json!({
            "together_ai": { "enabled": self.together_ai_enabled, "status": state },
            "akash": { "enabled": self.akash_enabled, "status": state },
        });

        Ok(RawOutput::Json(worker_document(
            process.as_deref(),
            counters.as_ref(),
            Some(platforms),
        )))
    }
}

#[async_trait]
impl PlatformAdapter for AiTrainingAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::AiTraining
    }

    async fn fetch(&self) -> Result<RawOutput, AdapterError> {
        within(self.timeout, self.collect()).await
    }
}
