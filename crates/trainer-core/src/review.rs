//! After-action review: raw replay of this origin's event log.

use std::sync::Arc;

use chrono::{Local, TimeZone};
use contracts::LogEvent;

use crate::event_log::EventLog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEntry {
    pub when: String,
    pub kind: String,
    /// Pretty-printed payload JSON.
    pub payload: String,
}

pub struct ReviewView {
    log: Arc<dyn EventLog>,
    events: Vec<LogEvent>,
}

impl ReviewView {
    pub fn open(log: Arc<dyn EventLog>) -> Self {
        let events = log.read_all();
        Self { log, events }
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Re-read the log, picking up events written since the view opened.
    pub fn refresh(&mut self) {
        self.events = self.log.read_all();
    }

    pub fn clear(&mut self) {
        self.log.clear();
        self.events.clear();
    }

    pub fn entries(&self) -> Vec<ReviewEntry> {
        self.entries_in(&Local)
    }

    pub fn entries_in<Tz>(&self, tz: &Tz) -> Vec<ReviewEntry>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        self.events
            .iter()
            .map(|event| ReviewEntry {
                when: format_timestamp(event.ts, tz),
                kind: event.type_label().to_string(),
                payload: serde_json::to_string_pretty(&event.payload.to_value())
                    .unwrap_or_else(|_| "null".to_string()),
            })
            .collect()
    }
}

impl std::fmt::Debug for ReviewView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewView")
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

pub fn format_timestamp<Tz>(ts_ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match tz.timestamp_millis_opt(ts_ms).single() {
        Some(when) => when.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts_ms.to_string(),
    }
}
