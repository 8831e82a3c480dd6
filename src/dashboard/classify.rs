//! Decodes device telemetry into typed events.
//!
//! The door controller publishes loosely structured JSON (and the
//! occasional bare string) on its log, ack, and status topics. Payload
//! shapes overlap, so classification checks variants in a fixed order
//! and the first match wins: system and error frames, then command
//! echoes, acks, status, RFID results, RFID scans, door transitions,
//! motion, bell, free-form messages, and finally generic fallbacks.

use serde_json::Value;

/// Last path segment of the topic a frame arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    Sys,
    Err,
    Cmd,
    Ack,
    Status,
    Log,
    Other(String),
}

impl Topic {
    pub fn from_leaf(leaf: &str) -> Self {
        match leaf.to_ascii_lowercase().as_str() {
            "sys" => Self::Sys,
            "err" => Self::Err,
            "cmd" => Self::Cmd,
            "ack" => Self::Ack,
            "status" => Self::Status,
            "log" => Self::Log,
            other => Self::Other(other.to_string()),
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Sys => "sys".to_string(),
            Self::Err => "err".to_string(),
            Self::Cmd => "cmd".to_string(),
            Self::Ack => "ack".to_string(),
            Self::Status => "status".to_string(),
            Self::Log => "log".to_string(),
            Self::Other(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    System { text: String },
    Error { text: String },
    CommandEcho {
        cmd: String,
        id: Option<String>,
        duration_ms: Option<u64>,
    },
    Ack { ok: bool, message: Option<String> },
    Status { online: bool },
    RfidResult { uid: String, valid: bool },
    RfidScan { uid: Option<String> },
    DoorOpened { method: Option<String> },
    DoorClosed,
    Motion,
    Bell,
    Message { text: String },
    /// JSON on the log topic that matched no known shape.
    DeviceLog { summary: String },
    /// Anything else: JSON summarized, text truncated.
    Unrecognized { topic: String, summary: String },
}

/// Human-readable rendering of an event for the live feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub icon: &'static str,
    pub title: String,
    pub desc: String,
}

const RAW_TEXT_LIMIT: usize = 100;

pub fn classify(topic: &Topic, payload: &str) -> DeviceEvent {
    let parsed: Option<Value> = serde_json::from_str(payload).ok();
    let obj = parsed.as_ref().and_then(Value::as_object);

    match topic {
        Topic::Sys => {
            return DeviceEvent::System {
                text: payload.to_string(),
            };
        }
        Topic::Err => {
            return DeviceEvent::Error {
                text: payload.to_string(),
            };
        }
        Topic::Cmd => {
            if let Some(obj) = obj {
                return DeviceEvent::CommandEcho {
                    cmd: str_field(obj, "cmd").unwrap_or_else(|| "COMMAND".to_string()),
                    id: str_field(obj, "id"),
                    duration_ms: obj.get("durationMs").and_then(Value::as_u64),
                };
            }
        }
        Topic::Ack => {
            if let Some(obj) = obj {
                return DeviceEvent::Ack {
                    ok: obj.get("ok").and_then(Value::as_bool).unwrap_or(false),
                    message: str_field(obj, "message"),
                };
            }
        }
        Topic::Status => {
            if let Some(obj) = obj {
                let status = str_field(obj, "status").unwrap_or_else(|| "UNKNOWN".to_string());
                return DeviceEvent::Status {
                    online: status == "ONLINE",
                };
            }
        }
        Topic::Log => {
            if let Some(obj) = obj {
                return classify_log_object(obj);
            }
            return DeviceEvent::Message {
                text: payload.to_string(),
            };
        }
        Topic::Other(_) => {}
    }

    match obj {
        Some(obj) => DeviceEvent::Unrecognized {
            topic: topic.label(),
            summary: summarize_fields(obj),
        },
        None => DeviceEvent::Unrecognized {
            topic: topic.label(),
            summary: truncate(payload, RAW_TEXT_LIMIT),
        },
    }
}

fn classify_log_object(obj: &serde_json::Map<String, Value>) -> DeviceEvent {
    // An RFID verdict carries both uid and status; a bare uid (or an
    // explicit RFID_SCAN type) is just a scan sighting.
    if let (Some(uid), Some(status)) = (str_field(obj, "uid"), str_field(obj, "status")) {
        return DeviceEvent::RfidResult {
            uid,
            valid: status == "VALID",
        };
    }
    let kind = str_field(obj, "type");
    if kind.as_deref() == Some("RFID_SCAN") || obj.contains_key("uid") {
        return DeviceEvent::RfidScan {
            uid: str_field(obj, "uid"),
        };
    }

    match str_field(obj, "event").as_deref() {
        Some("DOOR_OPENED") => {
            return DeviceEvent::DoorOpened {
                method: str_field(obj, "method"),
            };
        }
        Some("DOOR_CLOSED") => return DeviceEvent::DoorClosed,
        Some("MOTION") => return DeviceEvent::Motion,
        Some("BELL") => return DeviceEvent::Bell,
        _ => {}
    }
    if obj.get("motion").is_some_and(truthy) {
        return DeviceEvent::Motion;
    }
    if obj.get("bell").is_some_and(truthy) {
        return DeviceEvent::Bell;
    }

    if let Some(text) = str_field(obj, "message").or_else(|| str_field(obj, "msg")) {
        return DeviceEvent::Message { text };
    }

    DeviceEvent::DeviceLog {
        summary: summarize_fields(obj),
    }
}

impl DeviceEvent {
    pub fn render(&self) -> LogLine {
        match self {
            Self::System { text } => LogLine {
                icon: "bolt",
                title: "System".to_string(),
                desc: text.clone(),
            },
            Self::Error { text } => LogLine {
                icon: "times-circle",
                title: "Error".to_string(),
                desc: text.clone(),
            },
            Self::CommandEcho {
                cmd,
                id,
                duration_ms,
            } => {
                let icon = match cmd.as_str() {
                    "UNLOCK" => "lock-open",
                    "LOCK" => "lock",
                    "PING" => "signal",
                    "BUZZ" => "bell",
                    _ => "paper-plane",
                };
                let title = match cmd.as_str() {
                    "UNLOCK" => "Unlock command sent".to_string(),
                    "LOCK" => "Lock command sent".to_string(),
                    "PING" => "Connectivity check".to_string(),
                    "BUZZ" => "Buzzer triggered".to_string(),
                    other => format!("Command {other}"),
                };
                // Only the short suffix of a request id is useful to a reader.
                let short_id = id
                    .as_deref()
                    .and_then(|i| i.rsplit('_').next())
                    .unwrap_or("N/A");
                let mut desc = format!("ID: {short_id}");
                if let Some(ms) = duration_ms {
                    desc.push_str(&format!(" • Duration: {ms}ms"));
                }
                LogLine { icon, title, desc }
            }
            Self::Ack { ok, message } => LogLine {
                icon: if *ok { "check-circle" } else { "exclamation-triangle" },
                title: if *ok {
                    "Acknowledged".to_string()
                } else {
                    "Acknowledgement failed".to_string()
                },
                desc: message
                    .clone()
                    .unwrap_or_else(|| "Device processed the request".to_string()),
            },
            Self::Status { online } => LogLine {
                icon: "circle",
                title: "Device status".to_string(),
                desc: if *online {
                    "Device is online".to_string()
                } else {
                    "Device is offline".to_string()
                },
            },
            Self::RfidResult { uid, valid } => LogLine {
                icon: if *valid { "check-circle" } else { "times-circle" },
                title: if *valid {
                    "Card accepted".to_string()
                } else {
                    "Card rejected".to_string()
                },
                desc: format!("UID: {uid}"),
            },
            Self::RfidScan { uid } => LogLine {
                icon: "id-card",
                title: "RFID scan".to_string(),
                desc: format!("UID: {}", uid.as_deref().unwrap_or("unknown")),
            },
            Self::DoorOpened { method } => LogLine {
                icon: "door-open",
                title: "Door opened".to_string(),
                desc: method
                    .as_deref()
                    .map_or_else(|| "Door was opened".to_string(), |m| format!("Method: {m}")),
            },
            Self::DoorClosed => LogLine {
                icon: "door-closed",
                title: "Door closed".to_string(),
                desc: "Door has been closed".to_string(),
            },
            Self::Motion => LogLine {
                icon: "walking",
                title: "Motion detected".to_string(),
                desc: "Someone is approaching".to_string(),
            },
            Self::Bell => LogLine {
                icon: "bell",
                title: "Doorbell".to_string(),
                desc: "Someone rang the bell".to_string(),
            },
            Self::Message { text } => LogLine {
                icon: "file-alt",
                title: "Device log".to_string(),
                desc: text.clone(),
            },
            Self::DeviceLog { summary } => LogLine {
                icon: "clipboard",
                title: "Device log".to_string(),
                desc: summary.clone(),
            },
            Self::Unrecognized { topic, summary } => LogLine {
                icon: "envelope",
                title: topic.clone(),
                desc: summary.clone(),
            },
        }
    }
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Key-value summary for payloads with no dedicated rendering.
/// Timestamps are noise in a live feed and are skipped.
fn summarize_fields(obj: &serde_json::Map<String, Value>) -> String {
    let parts: Vec<String> = obj
        .iter()
        .filter(|(key, _)| key.as_str() != "ts" && key.as_str() != "timestamp")
        .map(|(key, value)| {
            let label = match key.as_str() {
                "uid" => "UID",
                "status" => "Status",
                "cmd" => "Command",
                "ok" => "Success",
                "message" | "msg" => "Message",
                "event" => "Event",
                "type" => "Type",
                "id" => "ID",
                "durationMs" => "Duration",
                other => other,
            };
            let rendered = match value {
                Value::Bool(true) => "Yes".to_string(),
                Value::Bool(false) => "No".to_string(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{label}: {rendered}")
        })
        .collect();

    if parts.is_empty() {
        "No data".to_string()
    } else {
        parts.join(" • ")
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfid_verdict_takes_precedence_over_scan() {
        let event = classify(
            &Topic::Log,
            r#"{"type":"RFID_SCAN","uid":"04A1B2C3","status":"VALID"}"#,
        );
        assert_eq!(
            event,
            DeviceEvent::RfidResult {
                uid: "04A1B2C3".to_string(),
                valid: true,
            }
        );
    }

    #[test]
    fn invalid_status_renders_rejection() {
        let event = classify(&Topic::Log, r#"{"uid":"04A1B2C3","status":"DENIED"}"#);
        let line = event.render();
        assert_eq!(line.title, "Card rejected");
        assert_eq!(line.desc, "UID: 04A1B2C3");
    }

    #[test]
    fn bare_uid_is_a_scan() {
        let event = classify(&Topic::Log, r#"{"uid":"04A1B2C3"}"#);
        assert_eq!(
            event,
            DeviceEvent::RfidScan {
                uid: Some("04A1B2C3".to_string()),
            }
        );
    }

    #[test]
    fn door_and_motion_events() {
        assert_eq!(
            classify(&Topic::Log, r#"{"event":"DOOR_OPENED","method":"RFID"}"#),
            DeviceEvent::DoorOpened {
                method: Some("RFID".to_string()),
            }
        );
        assert_eq!(
            classify(&Topic::Log, r#"{"event":"DOOR_CLOSED"}"#),
            DeviceEvent::DoorClosed
        );
        assert_eq!(classify(&Topic::Log, r#"{"motion":true}"#), DeviceEvent::Motion);
        assert_eq!(classify(&Topic::Log, r#"{"bell":true}"#), DeviceEvent::Bell);
    }

    #[test]
    fn message_field_beats_generic_summary() {
        let event = classify(&Topic::Log, r#"{"msg":"rebooting","ts":12345}"#);
        assert_eq!(
            event,
            DeviceEvent::Message {
                text: "rebooting".to_string(),
            }
        );
    }

    #[test]
    fn generic_log_skips_timestamps_and_maps_booleans() {
        let event = classify(&Topic::Log, r#"{"armed":true,"ts":99,"zone":"front"}"#);
        let DeviceEvent::DeviceLog { summary } = event else {
            panic!("expected generic device log");
        };
        assert!(summary.contains("armed: Yes"));
        assert!(summary.contains("zone: front"));
        assert!(!summary.contains("99"));
    }

    #[test]
    fn ack_and_status_frames() {
        assert_eq!(
            classify(&Topic::Ack, r#"{"ok":true,"message":"done"}"#),
            DeviceEvent::Ack {
                ok: true,
                message: Some("done".to_string()),
            }
        );
        assert_eq!(
            classify(&Topic::Status, r#"{"status":"ONLINE"}"#),
            DeviceEvent::Status { online: true }
        );
        assert_eq!(
            classify(&Topic::Status, r#"{"status":"OFFLINE"}"#),
            DeviceEvent::Status { online: false }
        );
    }

    #[test]
    fn command_echo_renders_short_id_and_duration() {
        let event = classify(
            &Topic::Cmd,
            r#"{"id":"req_1755600000000_427","cmd":"UNLOCK","durationMs":2000}"#,
        );
        let line = event.render();
        assert_eq!(line.title, "Unlock command sent");
        assert_eq!(line.desc, "ID: 427 • Duration: 2000ms");
    }

    #[test]
    fn raw_text_on_unknown_topic_is_truncated() {
        let long = "x".repeat(150);
        let event = classify(&Topic::Other("debug".to_string()), &long);
        let DeviceEvent::Unrecognized { topic, summary } = event else {
            panic!("expected unrecognized");
        };
        assert_eq!(topic, "debug");
        assert_eq!(summary.len(), 103);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn sys_and_err_pass_payload_through() {
        assert_eq!(
            classify(&Topic::Sys, "boot complete"),
            DeviceEvent::System {
                text: "boot complete".to_string(),
            }
        );
        assert_eq!(
            classify(&Topic::Err, "sensor fault"),
            DeviceEvent::Error {
                text: "sensor fault".to_string(),
            }
        );
    }
}
