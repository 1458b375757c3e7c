//! Diff engine: turns two successive statuses of one platform into events.
//!
//! Rules are applied independently and emitted in a fixed order:
//! `NewJob`, `JobCompleted`, `PaymentUpdate`, `StatusChange`.
//! A field that is `Unavailable` on either side is not comparable and never
//! produces an event.

use gridwatch_core::types::fields;
use gridwatch_core::{Event, EventKind, FieldValue, PlatformId, PlatformStatus};

/// Compare `previous` and `current` for `platform`.
///
/// Returns no events on cold start (`previous` is `None`) or when either
/// status belongs to another platform.
pub fn diff(platform: PlatformId, previous: Option<&PlatformStatus>, current: &PlatformStatus) -> Vec<Event> {
    let Some(previous) = previous else {
        return Vec::new();
    };
    if previous.platform != platform || current.platform != platform {
        tracing::warn!(
            "⚠️ Refusing to diff {} against {} / {}",
            platform,
            previous.platform,
            current.platform
        );
        return Vec::new();
    }

    let mut events = Vec::new();

    if let Some((before, after)) = numeric_pair(previous, current, fields::JOBS_PROCESSED)
        && after > before
    {
        let delta = after - before;
        events.push(Event::new(
            platform,
            EventKind::NewJob,
            format!("{} new {} processed (total {})", count(delta), plural(delta, "job"), count(after)),
            Some(delta),
        ));
    }

    if let Some((before, after)) = numeric_pair(previous, current, fields::JOBS_IN_PROGRESS)
        && after < before
    {
        let delta = before - after;
        events.push(Event::new(
            platform,
            EventKind::JobCompleted,
            format!(
                "{} {} completed ({} still in progress)",
                count(delta),
                plural(delta, "job"),
                count(after)
            ),
            Some(delta),
        ));
    }

    if let Some((before, after)) = numeric_pair(previous, current, fields::EARNINGS)
        && after > before
    {
        let delta = after - before;
        events.push(Event::new(
            platform,
            EventKind::PaymentUpdate,
            format!("Earnings increased by {delta:.2} (total {after:.2})"),
            Some(delta),
        ));
    }

    if previous.running != current.running {
        let summary = if current.running {
            "Worker is running again"
        } else {
            "Worker stopped"
        };
        events.push(Event::new(platform, EventKind::StatusChange, summary, None));
    }

    events
}

fn numeric_pair(previous: &PlatformStatus, current: &PlatformStatus, field: &str) -> Option<(f64, f64)> {
    match (previous.field(field), current.field(field)) {
        (FieldValue::Number(a), FieldValue::Number(b)) => Some((*a, *b)),
        _ => None,
    }
}

fn count(n: f64) -> String {
    FieldValue::Number(n).to_string()
}

fn plural(n: f64, word: &str) -> String {
    if n == 1.0 { word.to_string() } else { format!("{word}s") }
}
