use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

/// One JSON object per line on stderr.
#[derive(Clone, Debug, Serialize)]
pub struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    pub timestamp_ms: u64,
    #[serde(rename = "timestampIso")]
    pub timestamp_iso: String,
    pub level: String,
    pub event: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    pub details: Value,
}

impl StructuredLogLine {
    pub fn new(
        level: &str,
        event: &str,
        session_id: &str,
        seed: Option<u32>,
        tick: Option<u64>,
        details: Value,
    ) -> Self {
        Self {
            timestamp_ms: now_ms(),
            timestamp_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: level.to_string(),
            event: event.to_string(),
            session_id: session_id.to_string(),
            seed,
            tick,
            details,
        }
    }
}

pub fn emit_log(
    level: &str,
    event: &str,
    session_id: &str,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let line = StructuredLogLine::new(level, event, session_id, seed, tick, details);
    match serde_json::to_string(&line) {
        Ok(text) => eprintln!("{text}"),
        Err(err) => eprintln!("[log] failed to serialize {event}: {err}"),
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

pub fn default_session_id(prefix: &str, seed: u32, timestamp_ms: u64) -> String {
    format!("{prefix}-{seed}-{timestamp_ms}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn log_line_serializes_camel_case_and_skips_missing_fields() {
        let line = StructuredLogLine::new(
            "info",
            "session_started",
            "sim-1-2",
            None,
            Some(3),
            json!({"score": 0}),
        );
        let value = serde_json::to_value(&line).expect("log line serializes");
        assert_eq!(value["level"], "info");
        assert_eq!(value["sessionId"], "sim-1-2");
        assert_eq!(value["tick"], 3);
        assert_eq!(value["details"]["score"], 0);
        assert!(value.get("seed").is_none());
        assert!(value["timestampIso"]
            .as_str()
            .is_some_and(|iso| iso.ends_with('Z')));
    }

    #[test]
    fn default_session_id_contains_seed_and_timestamp() {
        assert_eq!(default_session_id("sim", 42, 123456789), "sim-42-123456789");
    }
}
