//! Persisted event log records.
//!
//! A record on disk is `{"ts": <ms>, "type": <kind>, "payload": <json>}`. Known
//! kinds decode into typed payloads; anything else (an unknown `type`, or a
//! payload that does not match its kind's schema exactly) is kept as an opaque
//! record and written back unchanged, so older and newer writers can share one
//! log.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::scenario::ScenarioOption;
use crate::team::{ChatMessage, Marker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    Choice,
    Marker,
    Chat,
    Status,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Choice => "scenario_choice",
            Self::Marker => "marker",
            Self::Chat => "chat",
            Self::Status => "status",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scenario_choice" => Some(Self::Choice),
            "marker" => Some(Self::Marker),
            "chat" => Some(Self::Chat),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChoicePayload {
    pub scenario_id: String,
    pub step_id: String,
    pub option: ScenarioOption,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkerPayload {
    pub marker: Marker,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogPayload {
    Choice(ChoicePayload),
    Marker(MarkerPayload),
    Chat(ChatMessage),
    Status(StatusPayload),
    /// Passed through verbatim: unknown kind or unrecognised payload shape.
    Opaque { kind: String, payload: Value },
}

impl LogPayload {
    /// Decode `payload` according to `kind`, falling back to an opaque record.
    pub fn from_parts(kind: &str, payload: Value) -> Self {
        let typed = match LogKind::parse(kind) {
            Some(LogKind::Choice) => decode_exact(&payload).map(Self::Choice),
            Some(LogKind::Marker) => decode_exact(&payload).map(Self::Marker),
            Some(LogKind::Chat) => decode_exact(&payload).map(Self::Chat),
            Some(LogKind::Status) => decode_exact(&payload).map(Self::Status),
            None => None,
        };

        typed.unwrap_or_else(|| Self::Opaque {
            kind: kind.to_string(),
            payload,
        })
    }

    /// `None` for opaque records.
    pub fn kind(&self) -> Option<LogKind> {
        match self {
            Self::Choice(_) => Some(LogKind::Choice),
            Self::Marker(_) => Some(LogKind::Marker),
            Self::Chat(_) => Some(LogKind::Chat),
            Self::Status(_) => Some(LogKind::Status),
            Self::Opaque { .. } => None,
        }
    }

    /// The `type` string as persisted.
    pub fn type_label(&self) -> &str {
        match self {
            Self::Opaque { kind, .. } => kind,
            typed => typed.kind().map(LogKind::as_str).unwrap_or_default(),
        }
    }

    pub fn to_value(&self) -> Value {
        let encoded = match self {
            Self::Choice(payload) => serde_json::to_value(payload),
            Self::Marker(payload) => serde_json::to_value(payload),
            Self::Chat(payload) => serde_json::to_value(payload),
            Self::Status(payload) => serde_json::to_value(payload),
            Self::Opaque { payload, .. } => return payload.clone(),
        };
        encoded.unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLogEvent", into = "RawLogEvent")]
pub struct LogEvent {
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    pub payload: LogPayload,
}

impl LogEvent {
    pub fn new(ts: i64, payload: LogPayload) -> Self {
        Self { ts, payload }
    }

    pub fn choice(ts: i64, payload: ChoicePayload) -> Self {
        Self::new(ts, LogPayload::Choice(payload))
    }

    pub fn marker(ts: i64, marker: Marker) -> Self {
        Self::new(ts, LogPayload::Marker(MarkerPayload { marker }))
    }

    pub fn chat(ts: i64, message: ChatMessage) -> Self {
        Self::new(ts, LogPayload::Chat(message))
    }

    pub fn status(ts: i64, payload: StatusPayload) -> Self {
        Self::new(ts, LogPayload::Status(payload))
    }

    pub fn kind(&self) -> Option<LogKind> {
        self.payload.kind()
    }

    pub fn type_label(&self) -> &str {
        self.payload.type_label()
    }
}

#[derive(Serialize, Deserialize)]
struct RawLogEvent {
    ts: Number,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl TryFrom<RawLogEvent> for LogEvent {
    type Error = String;

    fn try_from(raw: RawLogEvent) -> Result<Self, Self::Error> {
        let ts = match raw.ts.as_i64() {
            Some(ts) => ts,
            None => match raw.ts.as_f64() {
                Some(ts) if ts.is_finite() => ts as i64,
                _ => return Err(format!("ts out of range: {}", raw.ts)),
            },
        };

        Ok(Self {
            ts,
            payload: LogPayload::from_parts(&raw.kind, raw.payload),
        })
    }
}

impl From<LogEvent> for RawLogEvent {
    fn from(event: LogEvent) -> Self {
        let kind = event.payload.type_label().to_string();
        let payload = match event.payload {
            LogPayload::Opaque { payload, .. } => payload,
            typed => typed.to_value(),
        };
        Self {
            ts: Number::from(event.ts),
            kind,
            payload,
        }
    }
}

/// Decode only when re-encoding reproduces the same document; otherwise the
/// caller keeps the raw value so no field is lost on rewrite.
fn decode_exact<T>(payload: &Value) -> Option<T>
where
    T: DeserializeOwned + Serialize,
{
    let decoded: T = serde_json::from_value(payload.clone()).ok()?;
    let reencoded = serde_json::to_value(&decoded).ok()?;
    same_document(&reencoded, payload).then_some(decoded)
}

/// Structural equality where `50` and `50.0` are the same number.
fn same_document(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b || a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_document(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| same_document(x, y)))
        }
        _ => left == right,
    }
}
