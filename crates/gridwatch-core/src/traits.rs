//! Seams between the monitoring core and its collaborators.

use async_trait::async_trait;

use crate::error::{AdapterError, Result};
use crate::types::{PlatformId, RawOutput, ReplyKeyboard, UserId};

/// Invokes one platform's external status source.
///
/// Implementations are stateless between calls and must bound every
/// invocation with a timeout; a hung tool is reported as
/// `AdapterError::Timeout`, never awaited forever.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> PlatformId;

    async fn fetch(&self) -> std::result::Result<RawOutput, AdapterError>;
}

/// Outbound side of a chat transport.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn name(&self) -> &str;

    async fn send_message(&self, user_id: UserId, text: &str, keyboard: Option<&ReplyKeyboard>) -> Result<()>;

    /// Show a "typing…" indicator. Best effort.
    async fn send_typing(&self, _user_id: UserId) -> Result<()> {
        Ok(())
    }
}
