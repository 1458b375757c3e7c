//! Status parser: raw adapter output → normalized `PlatformStatus`.
//!
//! Text output (`golemsp status` boxes, `Key: value` lines) is reduced to
//! key/value pairs and mapped through an alias table. JSON output follows the
//! worker document shape produced by the Render and AI-training adapters.
//! Each field is parsed on its own: a malformed value becomes
//! `FieldValue::Unavailable`. Only a missing or unrecognisable running
//! indicator fails the whole record.

use gridwatch_core::types::fields;
use gridwatch_core::{FieldValue, ParseError, PlatformId, PlatformStatus, RawOutput};
use serde_json::Value;

use crate::numeric::parse_number;

/// Keys that carry the running/stopped indicator.
const RUNNING_KEYS: &[&str] = &["status", "service", "worker status", "state"];

#[derive(Clone, Copy)]
enum Kind {
    Text,
    Number,
}

/// field name, value kind, accepted (normalized) keys.
const FIELD_ALIASES: &[(&str, Kind, &[&str])] = &[
    (fields::VERSION, Kind::Text, &["version"]),
    (fields::NODE_NAME, Kind::Text, &["node name", "node"]),
    (fields::SUBNET, Kind::Text, &["subnet"]),
    (fields::NETWORK, Kind::Text, &["network"]),
    (
        fields::JOBS_PROCESSED,
        Kind::Number,
        &["jobs processed", "total processed", "completed jobs", "jobs completed"],
    ),
    (
        fields::JOBS_IN_PROGRESS,
        Kind::Number,
        &["jobs in progress", "last 1h in progress", "active jobs"],
    ),
    (fields::JOBS_LAST_HOUR, Kind::Number, &["last 1h processed"]),
    (
        fields::EARNINGS,
        Kind::Number,
        &["wallet balance", "earnings", "total earnings", "amount (total)", "balance"],
    ),
    (fields::PENDING_EARNINGS, Kind::Number, &["pending", "pending earnings"]),
    (fields::ISSUED, Kind::Number, &["issued"]),
];

/// Parse adapter output for `platform`.
pub fn parse(platform: PlatformId, raw: &RawOutput) -> Result<PlatformStatus, ParseError> {
    match raw {
        RawOutput::Text(text) => parse_text(platform, text),
        RawOutput::Json(value) => parse_json(platform, value),
    }
}

/// Parse semi-structured `key: value` / box-drawn column output.
pub fn parse_text(platform: PlatformId, text: &str) -> Result<PlatformStatus, ParseError> {
    let pairs = extract_pairs(text);

    let running_value = lookup(&pairs, RUNNING_KEYS).ok_or(ParseError::MissingRunningState { platform })?;
    let running = parse_running(platform, running_value)?;

    let mut status = PlatformStatus::new(platform, running);
    for &(field, kind, keys) in FIELD_ALIASES {
        match (kind, lookup(&pairs, keys)) {
            (Kind::Number, value) => status.set(field, number_field(value)),
            (Kind::Text, Some(value)) => status.set(field, FieldValue::Text(value.to_string())),
            (Kind::Text, None) => {}
        }
    }

    if let Some(address) = text
        .lines()
        .map(strip_box)
        .find(|l| l.starts_with("0x") && !l.contains(char::is_whitespace))
    {
        status.set(fields::WALLET_ADDRESS, FieldValue::Text(address.to_string()));
    }

    Ok(status)
}

/// Parse a worker JSON document:
/// `{ worker: {status, process}, jobs: {active, completed},
///    earnings: {total, pending}, platforms: {together_ai, akash} }`.
pub fn parse_json(platform: PlatformId, value: &Value) -> Result<PlatformStatus, ParseError> {
    if !value.is_object() {
        return Err(ParseError::WrongFormat {
            platform,
            expected: "JSON object",
        });
    }

    let running_value = value
        .pointer("/worker/status")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingRunningState { platform })?;
    let running = parse_running(platform, running_value)?;

    let mut status = PlatformStatus::new(platform, running);

    if let Some(process) = value.pointer("/worker/process").and_then(Value::as_str) {
        status.set(fields::PROCESS, FieldValue::Text(process.to_string()));
    }

    status.set(fields::JOBS_IN_PROGRESS, json_number(value.pointer("/jobs/active")));
    status.set(fields::JOBS_PROCESSED, json_number(value.pointer("/jobs/completed")));
    status.set(fields::EARNINGS, json_number(value.pointer("/earnings/total")));
    status.set(fields::PENDING_EARNINGS, json_number(value.pointer("/earnings/pending")));

    if let Some(platforms) = value.get("platforms").and_then(Value::as_object) {
        let enabled = |key: &str| {
            platforms
                .get(key)
                .and_then(|p| p.get("enabled"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };
        let mut active = Vec::new();
        if enabled("together_ai") {
            active.push("Together.ai");
        }
        if enabled("akash") {
            active.push("Akash Network");
        }
        let label = if active.is_empty() {
            "None configured".to_string()
        } else {
            active.join(", ")
        };
        status.set(fields::ACTIVE_PLATFORMS, FieldValue::Text(label));
    }

    Ok(status)
}

/// Reduce text output to normalized `(key, value)` pairs, in order.
pub fn extract_pairs(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(strip_box)
        .filter_map(split_pair)
        .map(|(k, v)| (normalize_key(k), v.trim().to_string()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect()
}

fn lookup<'a>(pairs: &'a [(String, String)], keys: &[&str]) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| keys.contains(&k.as_str()))
        .map(|(_, v)| v.as_str())
}

fn strip_box(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_whitespace() || matches!(c, '│' | '┌' | '┐' | '└' | '┘' | '├' | '┤' | '─' | '|'))
}

/// Split on whichever comes first: a `:` or a run of two or more spaces.
fn split_pair(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':');
    let gap = line.find("  ");
    let at = match (colon, gap) {
        (Some(c), Some(g)) => c.min(g),
        (Some(c), None) => c,
        (None, Some(g)) => g,
        (None, None) => return None,
    };
    let (key, rest) = line.split_at(at);
    let value = rest.strip_prefix(':').unwrap_or(rest);
    Some((key, value))
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// The state is the leading word of the value, after an optional `is`, and
/// `not` negates it. Trailing detail (`running (last down 2h ago)`) is ignored.
fn parse_running(platform: PlatformId, value: &str) -> Result<bool, ParseError> {
    const STOPPED: &[&str] = &["stopped", "inactive", "offline", "down", "dead"];
    const RUNNING: &[&str] = &["running", "active", "online", "started", "up"];

    let lower = value.to_lowercase();
    let mut words = lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).peekable();
    if words.peek() == Some(&"is") {
        words.next();
    }
    let negated = words.peek() == Some(&"not");
    if negated {
        words.next();
    }

    let state = match words.next() {
        Some(w) if RUNNING.contains(&w) => Some(true),
        Some(w) if STOPPED.contains(&w) => Some(false),
        _ => None,
    };
    match state {
        Some(running) => Ok(running != negated),
        None => Err(ParseError::UnrecognisedRunningState {
            platform,
            value: value.to_string(),
        }),
    }
}

fn number_field(value: Option<&str>) -> FieldValue {
    value
        .and_then(parse_number)
        .map(FieldValue::Number)
        .unwrap_or(FieldValue::Unavailable)
}

fn json_number(value: Option<&Value>) -> FieldValue {
    match value {
        Some(Value::Number(n)) => n.as_f64().map(FieldValue::Number).unwrap_or(FieldValue::Unavailable),
        Some(Value::String(s)) => number_field(Some(s.as_str())),
        _ => FieldValue::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GOLEM_STATUS: &str = "\
┌────────────────────────────────────────────────┐
│  Status                                      │
│                                                │
│  Service    is running                       │
│  Version    0.17.6                             │
│  Commit     a98d28015                          │
│  Date       2025-10-04                         │
│  Build      1122                               │
│                                                │
│  Node Name  tan-territory                      │
│  Subnet     public                             │
│  VM         invalid environment              │
│                                                │
│  Driver     Ok                               │
├────────────────────────────────────────────────┤
│  Wallet                                      │
│  0x34874a4904cad46fab709b57fabef0589a0fd075  │
│                                                │
│  network                mainnet              │
│  amount (total)         1,250.5 GLM            │
│      (on-chain)         0 GLM                  │
│      (polygon)          0 GLM                  │
│                                                │
│  pending                0 GLM (0)              │
│  issued                 0 GLM (0)              │
├────────────────────────────────────────────────┤
│  Tasks                                       │
│                                                │
│  last 1h processed     2                       │
│  last 1h in progress   1                       │
│  total processed       37                      │
│  (including failures)                          │
└────────────────────────────────────────────────┘";

    #[test]
    fn test_parse_golem_box_output() {
        let status = parse_text(PlatformId::Golem, GOLEM_STATUS).unwrap();
        assert!(status.running);
        assert_eq!(status.text(fields::VERSION), Some("0.17.6"));
        assert_eq!(status.text(fields::NODE_NAME), Some("tan-territory"));
        assert_eq!(status.text(fields::SUBNET), Some("public"));
        assert_eq!(status.text(fields::NETWORK), Some("mainnet"));
        assert_eq!(
            status.text(fields::WALLET_ADDRESS),
            Some("0x34874a4904cad46fab709b57fabef0589a0fd075")
        );
        assert_eq!(status.number(fields::EARNINGS), Some(1250.5));
        assert_eq!(status.number(fields::PENDING_EARNINGS), Some(0.0));
        assert_eq!(status.number(fields::JOBS_PROCESSED), Some(37.0));
        assert_eq!(status.number(fields::JOBS_IN_PROGRESS), Some(1.0));
        assert_eq!(status.number(fields::JOBS_LAST_HOUR), Some(2.0));
    }

    #[test]
    fn test_golem_not_running() {
        let status = parse_text(PlatformId::Golem, "│  Service    is not running   │").unwrap();
        assert!(!status.running);
    }

    #[test]
    fn test_key_value_lines() {
        let status = parse_text(
            PlatformId::Golem,
            "Status: running\nJobs processed: 12\nWallet balance: 45.00",
        )
        .unwrap();
        assert!(status.running);
        assert_eq!(status.number(fields::JOBS_PROCESSED), Some(12.0));
        assert_eq!(status.number(fields::EARNINGS), Some(45.0));
    }

    #[test]
    fn test_missing_earnings_is_partial_not_failure() {
        let status = parse_text(PlatformId::Golem, "Status: running\nJobs processed: 7").unwrap();
        assert_eq!(status.number(fields::JOBS_PROCESSED), Some(7.0));
        assert_eq!(status.fields.get(fields::EARNINGS), Some(&FieldValue::Unavailable));
    }

    #[test]
    fn test_malformed_numeric_field_isolated() {
        let status = parse_text(
            PlatformId::Golem,
            "Status: running\nJobs processed: lots\nWallet balance: $1,000.25",
        )
        .unwrap();
        assert_eq!(status.field(fields::JOBS_PROCESSED), &FieldValue::Unavailable);
        assert_eq!(status.number(fields::EARNINGS), Some(1000.25));
    }

    #[test]
    fn test_missing_running_indicator_fails() {
        let err = parse_text(PlatformId::Golem, "Jobs processed: 12\nWallet balance: 45.00").unwrap_err();
        assert_eq!(err, ParseError::MissingRunningState { platform: PlatformId::Golem });

        let err = parse_text(PlatformId::Golem, "Status: ???").unwrap_err();
        assert!(matches!(err, ParseError::UnrecognisedRunningState { .. }));
    }

    #[test]
    fn test_running_state_uses_leading_word() {
        let running = |v: &str| parse_running(PlatformId::Golem, v);
        assert_eq!(running("running (last down 2h ago)"), Ok(true));
        assert_eq!(running("Active, 0 nodes offline"), Ok(true));
        assert_eq!(running("is running"), Ok(true));
        assert_eq!(running("is not running"), Ok(false));
        assert_eq!(running("offline since 3h (was running)"), Ok(false));
        assert_eq!(running("● stopped"), Ok(false));
        assert!(running("unknown").is_err());

        let status = parse_text(PlatformId::Golem, "Status: running (last down 2h ago)\nJobs processed: 3").unwrap();
        assert!(status.running);
    }

    #[test]
    fn test_colon_inside_value_kept() {
        let pairs = extract_pairs("Last seen: 2025-10-04 12:30:00\nDate       2025-10-04 12:00");
        assert_eq!(pairs[0], ("last seen".to_string(), "2025-10-04 12:30:00".to_string()));
        assert_eq!(pairs[1], ("date".to_string(), "2025-10-04 12:00".to_string()));
    }

    #[test]
    fn test_parse_worker_json() {
        let doc = json!({
            "worker": {"status": "running", "process": "1234 render-worker"},
            "jobs": {"active": 2, "completed": "1,024"},
            "earnings": {"total": 12.5, "pending": null},
            "platforms": {"together_ai": {"enabled": true}, "akash": {"enabled": false}}
        });
        let status = parse_json(PlatformId::AiTraining, &doc).unwrap();
        assert!(status.running);
        assert_eq!(status.text(fields::PROCESS), Some("1234 render-worker"));
        assert_eq!(status.number(fields::JOBS_IN_PROGRESS), Some(2.0));
        assert_eq!(status.number(fields::JOBS_PROCESSED), Some(1024.0));
        assert_eq!(status.number(fields::EARNINGS), Some(12.5));
        assert_eq!(status.field(fields::PENDING_EARNINGS), &FieldValue::Unavailable);
        assert_eq!(status.text(fields::ACTIVE_PLATFORMS), Some("Together.ai"));
    }

    #[test]
    fn test_worker_json_without_counters() {
        let doc = json!({"worker": {"status": "stopped", "process": null}});
        let status = parse(PlatformId::Render, &RawOutput::Json(doc)).unwrap();
        assert!(!status.running);
        assert_eq!(status.field(fields::JOBS_PROCESSED), &FieldValue::Unavailable);
        assert_eq!(status.field(fields::EARNINGS), &FieldValue::Unavailable);
        assert_eq!(status.text(fields::PROCESS), None);
    }

    #[test]
    fn test_worker_json_requires_status() {
        let err = parse_json(PlatformId::Render, &json!({"jobs": {"active": 1}})).unwrap_err();
        assert_eq!(err, ParseError::MissingRunningState { platform: PlatformId::Render });

        let err = parse_json(PlatformId::Render, &json!([1, 2])).unwrap_err();
        assert!(matches!(err, ParseError::WrongFormat { .. }));
    }
}
