//! Chat message formatting (Telegram Markdown).
//!
//! Values from external tools go inside code spans with backticks removed;
//! free text goes through `escape_markdown`.

use chrono::{DateTime, Utc};
use gridwatch_core::types::fields;
use gridwatch_core::{Event, FieldValue, GridWatchError, PlatformId, PlatformStatus};
use gridwatch_scheduler::dispatch::escape_markdown;

pub const WELCOME: &str = "Welcome to GolemSP Status Bot!\n\n\
Use the button below to check the current status of GolemSP, or send /status command.\n\n\
You are subscribed to job and payment notifications. Send /help for all commands.";

pub const HELP: &str = "*Commands*\n\
/status - GolemSP status\n\
/render - Render Network status\n\
/ai - AI training status\n\
/all - one-line summary of every enabled platform\n\
/notify on|off - job and payment notifications\n\
/history - recent events\n\
/help - this message";

pub const HINT: &str = "Please use the button below or send /status to check GolemSP status.";

/// Full status block for any platform.
pub fn platform_status(status: &PlatformStatus) -> String {
    match status.platform {
        PlatformId::Golem => golem_status(status),
        PlatformId::Render | PlatformId::AiTraining => worker_status(status),
    }
}

/// GolemSP status in three sections: service, wallet, tasks.
pub fn golem_status(status: &PlatformStatus) -> String {
    let mut out = vec!["⚙️ *GolemSP Status*".to_string(), String::new()];

    out.push("*Service Status*".into());
    out.push(format!("• Service: {}", running_label(status.running)));
    for (label, field) in [
        ("Version", fields::VERSION),
        ("Node Name", fields::NODE_NAME),
        ("Subnet", fields::SUBNET),
    ] {
        if status.fields.contains_key(field) {
            out.push(format!("• {label}: {}", code(status.field(field))));
        }
    }

    out.push(String::new());
    out.push("💰 *Wallet*".into());
    if let Some(address) = status.text(fields::WALLET_ADDRESS) {
        out.push(format!("• Address: `{}`", strip_ticks(address)));
    }
    if let Some(network) = status.text(fields::NETWORK) {
        out.push(format!("• Network: `{}`", strip_ticks(network)));
    }
    out.push(format!("• Total: {}", amount(status.field(fields::EARNINGS), "GLM", 4)));
    if status.number(fields::PENDING_EARNINGS).is_some_and(|p| p > 0.0) {
        out.push(format!("• Pending: {}", amount(status.field(fields::PENDING_EARNINGS), "GLM", 4)));
    }

    out.push(String::new());
    out.push("📋 *Tasks*".into());
    out.push(format!("• Last 1h processed: {}", code(status.field(fields::JOBS_LAST_HOUR))));
    out.push(format!("• In progress: {}", code(status.field(fields::JOBS_IN_PROGRESS))));
    out.push(format!("• Total processed: {}", code(status.field(fields::JOBS_PROCESSED))));

    out.push(String::new());
    out.push(last_updated(status.fetched_at));
    out.join("\n")
}

/// Render Network / AI-training worker block.
pub fn worker_status(status: &PlatformStatus) -> String {
    let (title, unit) = match status.platform {
        PlatformId::Render => ("🎨 *Render Network Status*", "RENDER"),
        _ => ("🤖 *AI Training Platform Status*", ""),
    };

    let mut out = vec![title.to_string(), String::new()];
    out.push(format!("• Worker Status: {}", running_label(status.running)));
    if status.platform == PlatformId::AiTraining {
        let platforms = status.text(fields::ACTIVE_PLATFORMS).unwrap_or("None configured");
        out.push(format!("• Active Platforms: `{}`", strip_ticks(platforms)));
    }
    out.push(format!("• Active Jobs: {}", code(status.field(fields::JOBS_IN_PROGRESS))));
    out.push(format!("• Completed Jobs: {}", code(status.field(fields::JOBS_PROCESSED))));
    out.push(format!("• Total Earnings: {}", amount(status.field(fields::EARNINGS), unit, 6)));
    if status.number(fields::PENDING_EARNINGS).is_some_and(|p| p > 0.0) {
        out.push(format!(
            "• Pending Earnings: {}",
            amount(status.field(fields::PENDING_EARNINGS), unit, 6)
        ));
    }

    out.push(String::new());
    out.push(last_updated(status.fetched_at));
    out.join("\n")
}

/// One line per platform for `/all`.
pub fn summary_line(status: &PlatformStatus) -> String {
    let dot = if status.running { "🟢" } else { "🔴" };
    format!(
        "{dot} *{}*: jobs {} · in progress {} · earnings {}",
        status.platform,
        status.field(fields::JOBS_PROCESSED),
        status.field(fields::JOBS_IN_PROGRESS),
        match status.field(fields::EARNINGS) {
            FieldValue::Number(n) => format!("{n:.2}"),
            other => other.to_string(),
        }
    )
}

/// Reply for a platform whose poll failed.
pub fn unavailable(platform: PlatformId, error: &GridWatchError) -> String {
    let reason = match error {
        GridWatchError::Adapter { source, .. } => source.to_string(),
        other => other.to_string(),
    };
    format!("❌ {platform} status unavailable:\n\n`{}`", strip_ticks(&reason))
}

/// Reply for a platform that is not enabled in config.
pub fn disabled(platform: PlatformId) -> String {
    format!("⚪ {platform} monitoring is disabled.")
}

/// Recent events, newest first.
pub fn history(events: &[Event]) -> String {
    if events.is_empty() {
        return "📭 No events recorded yet.".into();
    }
    let mut out = vec!["🗂️ *Recent events*".to_string(), String::new()];
    for event in events {
        out.push(format!(
            "• `{}` {}: {}",
            event.detected_at.format("%m-%d %H:%M"),
            event.platform,
            escape_markdown(&event.summary)
        ));
    }
    out.join("\n")
}

fn running_label(running: bool) -> &'static str {
    if running { "🟢 Running" } else { "🔴 Stopped" }
}

fn last_updated(at: DateTime<Utc>) -> String {
    format!("🕒 Last updated: `{}`", at.format("%Y-%m-%d %H:%M:%S UTC"))
}

fn code(value: &FieldValue) -> String {
    format!("`{}`", strip_ticks(&value.to_string()))
}

fn amount(value: &FieldValue, unit: &str, precision: usize) -> String {
    match value {
        FieldValue::Number(n) if unit.is_empty() => format!("`{n:.precision$}`"),
        FieldValue::Number(n) => format!("`{n:.precision$} {unit}`"),
        other => code(other),
    }
}

fn strip_ticks(s: &str) -> String {
    s.replace('`', "'")
}
