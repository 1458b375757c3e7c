//! Golem provider adapter: runs `golemsp status`.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use gridwatch_core::config::GolemConfig;
use gridwatch_core::{AdapterError, PlatformAdapter, PlatformId, RawOutput};

use crate::process::{ensure_executable, locate_binary, run_bounded};

const BINARY: &str = "golemsp";

/// Install locations checked after `PATH`.
fn common_install_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/local/bin"),
        PathBuf::from("/usr/bin"),
        PathBuf::from("/opt/golemsp/bin"),
        PathBuf::from(shellexpand::tilde("~/.local/bin").to_string()),
    ]
}

pub struct GolemAdapter {
    binary_path: Option<PathBuf>,
    timeout: Duration,
}

impl GolemAdapter {
    pub fn new(config: &GolemConfig, timeout: Duration) -> Self {
        let binary_path = if config.binary_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(shellexpand::tilde(&config.binary_path).to_string()))
        };
        Self { binary_path, timeout }
    }

    fn resolve_binary(&self) -> Result<PathBuf, AdapterError> {
        let path = locate_binary(BINARY, self.binary_path.as_deref(), &common_install_dirs())?;
        ensure_executable(&path)?;
        Ok(path)
    }
}

#[async_trait]
impl PlatformAdapter for GolemAdapter {
    fn platform(&self) -> PlatformId {
        PlatformId::Golem
    }

    async fn fetch(&self) -> Result<RawOutput, AdapterError> {
        let binary = self.resolve_binary()?;
        tracing::debug!("⚙️ Running {} status", binary.display());

        let out = run_bounded(&binary, &["status"], self.timeout).await?;
        if out.success() {
            Ok(RawOutput::Text(out.stdout))
        } else {
            Err(out.into_failure())
        }
    }
}
