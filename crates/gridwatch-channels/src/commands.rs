//! Chat command routing: maps incoming text to a formatted reply.
//!
//! Every status query goes through `Monitor::refresh`, so events detected
//! on demand are recorded and dispatched like scheduled ones. Failures
//! become "unavailable" or "disabled" replies, never raw errors.

use std::sync::Arc;

use futures::future::join_all;
use gridwatch_core::{IncomingMessage, PlatformId, ReplyKeyboard, UserId};
use gridwatch_scheduler::Monitor;

use crate::format;

pub const STATUS_BUTTON: &str = "Check GolemSP Status";

/// Events shown by `/history`.
const HISTORY_LIMIT: usize = 10;

/// Persistent keyboard attached to every reply.
pub fn reply_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::new(vec![vec![STATUS_BUTTON.to_string()]])
}

/// Parsed chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Status(PlatformId),
    All,
    /// `None` asks for the current setting.
    Notify(Option<bool>),
    History,
    Unknown,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text == STATUS_BUTTON {
            return Command::Status(PlatformId::Golem);
        }

        let mut parts = text.split_whitespace();
        let Some(head) = parts.next() else {
            return Command::Unknown;
        };
        // "/status@my_bot" in group chats
        let name = head.split('@').next().unwrap_or(head).to_lowercase();

        match name.as_str() {
            "/start" => Command::Start,
            "/help" => Command::Help,
            "/status" | "/golem" => Command::Status(PlatformId::Golem),
            "/render" => Command::Status(PlatformId::Render),
            "/ai" => Command::Status(PlatformId::AiTraining),
            "/all" => Command::All,
            "/subscribe" => Command::Notify(Some(true)),
            "/unsubscribe" => Command::Notify(Some(false)),
            "/notify" => match parts.next().map(str::to_lowercase).as_deref() {
                Some("on") => Command::Notify(Some(true)),
                Some("off") => Command::Notify(Some(false)),
                _ => Command::Notify(None),
            },
            "/history" => Command::History,
            _ => Command::Unknown,
        }
    }

    /// Commands that run an adapter and deserve a typing indicator.
    pub fn fetches_status(&self) -> bool {
        matches!(self, Command::Status(_) | Command::All)
    }
}

/// Outgoing reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<ReplyKeyboard>,
}

impl Reply {
    fn with_keyboard(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(reply_keyboard()),
        }
    }
}

pub struct CommandRouter {
    monitor: Arc<Monitor>,
    allowed_chat_ids: Vec<i64>,
}

impl CommandRouter {
    pub fn new(monitor: Arc<Monitor>, allowed_chat_ids: Vec<i64>) -> Self {
        Self {
            monitor,
            allowed_chat_ids,
        }
    }

    /// An empty allow-list serves everyone.
    pub fn is_allowed(&self, chat_id: UserId) -> bool {
        self.allowed_chat_ids.is_empty() || self.allowed_chat_ids.contains(&chat_id)
    }

    /// Reply for `msg`, or `None` when the chat is not allowed.
    ///
    /// Any message from an allowed chat registers it as a subscriber; an
    /// existing preference is kept.
    pub async fn handle(&self, msg: &IncomingMessage) -> Option<Reply> {
        if !self.is_allowed(msg.chat_id) {
            tracing::debug!("🚫 Ignoring message from chat {}", msg.chat_id);
            return None;
        }
        self.monitor.registry().register(msg.chat_id).await;
        let command = Command::parse(&msg.content);
        tracing::debug!("💬 {} from {}: {:?}", msg.channel, msg.chat_id, command);
        Some(self.execute(command, msg.chat_id).await)
    }

    pub async fn execute(&self, command: Command, chat_id: UserId) -> Reply {
        match command {
            Command::Start => {
                self.monitor.registry().register(chat_id).await;
                Reply::with_keyboard(format::WELCOME)
            }
            Command::Help => Reply::with_keyboard(format::HELP),
            Command::Status(platform) => Reply::with_keyboard(self.platform_reply(platform).await),
            Command::All => Reply::with_keyboard(self.summary().await),
            Command::Notify(Some(enabled)) => {
                self.monitor.registry().set_enabled(chat_id, enabled).await;
                Reply::with_keyboard(if enabled {
                    "🔔 Notifications enabled."
                } else {
                    "🔕 Notifications disabled."
                })
            }
            Command::Notify(None) => {
                let state = if self.monitor.registry().is_enabled(chat_id).await {
                    "on"
                } else {
                    "off"
                };
                Reply::with_keyboard(format!("Notifications are *{state}*. Use /notify on or /notify off."))
            }
            Command::History => {
                let events = self.monitor.history().recent(HISTORY_LIMIT).await;
                Reply::with_keyboard(format::history(&events))
            }
            Command::Unknown => Reply::with_keyboard(format::HINT),
        }
    }

    async fn platform_reply(&self, platform: PlatformId) -> String {
        if !self.monitor.is_enabled(platform) {
            return format::disabled(platform);
        }
        match self.monitor.refresh(platform).await {
            Ok(status) => format::platform_status(&status),
            Err(e) => format::unavailable(platform, &e),
        }
    }

    async fn summary(&self) -> String {
        let platforms = self.monitor.platforms();
        if platforms.is_empty() {
            return "⚪ No platforms are enabled.".into();
        }

        let results = join_all(platforms.iter().map(|&p| self.monitor.refresh(p))).await;
        platforms
            .iter()
            .zip(results)
            .map(|(platform, result)| match result {
                Ok(status) => format::summary_line(&status),
                Err(_) => format!("❌ *{platform}*: unavailable"),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
