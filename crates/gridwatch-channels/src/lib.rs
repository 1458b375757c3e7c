//! # GridWatch Channels
//!
//! Chat side of GridWatch: the Telegram transport, command routing and
//! message formatting.

pub mod commands;
pub mod format;
pub mod telegram;

pub use commands::{Command, CommandRouter, Reply};
pub use telegram::TelegramChannel;
