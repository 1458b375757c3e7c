//! # GridWatch Platforms
//!
//! One `PlatformAdapter` per supported worker platform plus the parser that
//! turns their raw output into `PlatformStatus` records.
//!
//! ```text
//! GolemAdapter       golemsp status        → RawOutput::Text ┐
//! RenderAdapter      pgrep + HTTP counters → RawOutput::Json ├→ parser::parse → PlatformStatus
//! AiTrainingAdapter  pgrep + HTTP counters → RawOutput::Json ┘
//! ```
//!
//! New platforms are added by implementing `PlatformAdapter` and registering
//! the adapter in [`create_adapters`].

pub mod ai_training;
pub mod golem;
pub mod numeric;
pub mod parser;
pub mod process;
pub mod render;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use gridwatch_core::{GridWatchConfig, PlatformAdapter, PlatformId};

pub use parser::parse;

/// Build adapters for every platform enabled in `config`.
pub fn create_adapters(config: &GridWatchConfig) -> Vec<Arc<dyn PlatformAdapter>> {
    let timeout = Duration::from_secs(config.monitoring.adapter_timeout_secs);
    let client = reqwest::Client::new();

    config
        .enabled_platforms()
        .into_iter()
        .map(|platform| -> Arc<dyn PlatformAdapter> {
            match platform {
                PlatformId::Golem => Arc::new(golem::GolemAdapter::new(&config.golem, timeout)),
                PlatformId::Render => Arc::new(render::RenderAdapter::new(&config.render, client.clone(), timeout)),
                PlatformId::AiTraining => Arc::new(ai_training::AiTrainingAdapter::new(
                    &config.ai_training,
                    client.clone(),
                    timeout,
                )),
            }
        })
        .collect()
}
