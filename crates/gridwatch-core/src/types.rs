//! Core data model: platforms, normalized status records, events, subscribers
//! and chat messages.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat-level user identifier (Telegram chat id).
pub type UserId = i64;

/// Supported worker platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformId {
    /// Golem compute-sharing node (`golemsp`).
    Golem,
    /// Render Network worker.
    Render,
    /// AI-training providers (Together.ai, Akash Network).
    AiTraining,
}

impl PlatformId {
    pub const ALL: [PlatformId; 3] = [PlatformId::Golem, PlatformId::Render, PlatformId::AiTraining];

    /// Stable lowercase key used in config and commands.
    pub fn key(&self) -> &'static str {
        match self {
            PlatformId::Golem => "golem",
            PlatformId::Render => "render",
            PlatformId::AiTraining => "ai_training",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlatformId::Golem => "GolemSP",
            PlatformId::Render => "Render Network",
            PlatformId::AiTraining => "AI Training",
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for PlatformId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "golem" | "golemsp" => Ok(PlatformId::Golem),
            "render" | "render_network" | "render-network" => Ok(PlatformId::Render),
            "ai" | "ai_training" | "ai-training" | "together" | "akash" => Ok(PlatformId::AiTraining),
            other => Err(format!(
                "unknown platform '{other}' (expected golem, render or ai_training)"
            )),
        }
    }
}

/// Well-known field names inside `PlatformStatus::fields`.
pub mod fields {
    pub const VERSION: &str = "version";
    pub const NODE_NAME: &str = "node_name";
    pub const SUBNET: &str = "subnet";
    pub const WALLET_ADDRESS: &str = "wallet_address";
    pub const NETWORK: &str = "network";
    pub const PROCESS: &str = "process";
    pub const ACTIVE_PLATFORMS: &str = "active_platforms";
    /// Cumulative processed job count.
    pub const JOBS_PROCESSED: &str = "jobs_processed";
    /// Jobs currently running.
    pub const JOBS_IN_PROGRESS: &str = "jobs_in_progress";
    pub const JOBS_LAST_HOUR: &str = "jobs_last_hour";
    /// Total earnings / wallet balance.
    pub const EARNINGS: &str = "earnings";
    pub const PENDING_EARNINGS: &str = "pending_earnings";
    pub const ISSUED: &str = "issued";
}

/// A single normalized field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    /// Field missing from output or present but unparseable.
    Unavailable,
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, FieldValue::Unavailable)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Unavailable => f.write_str("unavailable"),
        }
    }
}

static UNAVAILABLE: FieldValue = FieldValue::Unavailable;

/// Normalized snapshot of one platform at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformStatus {
    pub platform: PlatformId,
    pub fetched_at: DateTime<Utc>,
    pub running: bool,
    pub fields: BTreeMap<String, FieldValue>,
}

impl PlatformStatus {
    pub fn new(platform: PlatformId, running: bool) -> Self {
        Self {
            platform,
            fetched_at: Utc::now(),
            running,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    pub fn with_field(mut self, name: &str, value: FieldValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_string(), value);
    }

    /// Field value; missing fields read as `Unavailable`.
    pub fn field(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&UNAVAILABLE)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.field(name).as_number()
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).as_text()
    }
}

/// Raw output returned by a platform adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput {
    Text(String),
    Json(serde_json::Value),
}

/// Kind of detected change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NewJob,
    JobCompleted,
    PaymentUpdate,
    /// Worker switched between running and stopped.
    StatusChange,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::NewJob => write!(f, "new job"),
            EventKind::JobCompleted => write!(f, "job completed"),
            EventKind::PaymentUpdate => write!(f, "payment update"),
            EventKind::StatusChange => write!(f, "status change"),
        }
    }
}

/// A detected, notifiable change for one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub platform: PlatformId,
    pub kind: EventKind,
    pub summary: String,
    /// Numeric delta (jobs, earnings) where meaningful.
    pub magnitude: Option<f64>,
    pub detected_at: DateTime<Utc>,
}

impl Event {
    pub fn new(platform: PlatformId, kind: EventKind, summary: impl Into<String>, magnitude: Option<f64>) -> Self {
        Self {
            platform,
            kind,
            summary: summary.into(),
            magnitude,
            detected_at: Utc::now(),
        }
    }
}

/// A user with a notification preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub user_id: UserId,
    pub notifications_enabled: bool,
}

/// Persistent reply keyboard attached to outgoing chat messages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
    pub resize: bool,
    pub one_time: bool,
}

impl ReplyKeyboard {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows,
            resize: true,
            one_time: false,
        }
    }
}

/// Incoming chat message, already stripped of transport details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub channel: String,
    /// Chat to reply to.
    pub chat_id: UserId,
    pub sender_name: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
