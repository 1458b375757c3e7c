//! # GridWatch Core
//!
//! Shared vocabulary for the GridWatch workspace: platform identifiers,
//! normalized status records, events, the adapter and chat-transport traits,
//! the error taxonomy and the configuration snapshot.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::GridWatchConfig;
pub use error::{AdapterError, GridWatchError, ParseError, Result};
pub use traits::{ChatTransport, PlatformAdapter};
pub use types::{
    Event, EventKind, FieldValue, IncomingMessage, PlatformId, PlatformStatus, RawOutput, ReplyKeyboard,
    Subscriber, UserId,
};
