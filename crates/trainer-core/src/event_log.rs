//! Append-only event log persisted as one JSON array under a fixed key.
//!
//! Every failure stops here: a broken or missing storage area reads as an
//! empty log and writes become no-ops. The most recent failure is kept for
//! diagnostics.

use std::sync::Mutex;

use contracts::{LogEvent, LOG_STORAGE_KEY};
use serde_json::Value;
use tracing::{debug, warn};

use crate::storage::{StorageArea, StorageError};

/// Read/append/clear view of the log that producers and the review screen use.
pub trait EventLog: Send + Sync {
    /// Adds `event` at the end. Never fails from the caller's point of view.
    fn append(&self, event: &LogEvent);
    /// Events in insertion order; empty when storage is empty or unreadable.
    fn read_all(&self) -> Vec<LogEvent>;
    fn clear(&self);
}

#[derive(Debug)]
pub struct EventLogStore<S> {
    storage: S,
    key: String,
    last_error: Mutex<Option<String>>,
}

impl<S: StorageArea> EventLogStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, LOG_STORAGE_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            last_error: Mutex::new(None),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    pub fn append_checked(&self, event: &LogEvent) -> Result<(), StorageError> {
        // Read-modify-write: concurrent writers from other tabs can overwrite
        // each other; the last write wins.
        let mut records = match self.storage.get_item(&self.key)? {
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Array(records)) => records,
                _ => Vec::new(),
            },
            None => Vec::new(),
        };

        let encoded = serde_json::to_value(event).map_err(StorageError::backend)?;
        records.push(encoded);

        let serialized =
            serde_json::to_string(&Value::Array(records)).map_err(StorageError::backend)?;
        self.storage.set_item(&self.key, &serialized)
    }

    pub fn read_all_checked(&self) -> Result<Vec<LogEvent>, StorageError> {
        let Some(raw) = self.storage.get_item(&self.key)? else {
            return Ok(Vec::new());
        };

        let records = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(records)) => records,
            Ok(_) => {
                debug!(key = %self.key, "log value is not an array, reading as empty");
                return Ok(Vec::new());
            }
            Err(err) => {
                debug!(key = %self.key, error = %err, "log value is not json, reading as empty");
                return Ok(Vec::new());
            }
        };

        let mut events = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<LogEvent>(record) {
                Ok(event) => events.push(event),
                Err(err) => debug!(index, error = %err, "skipping malformed log record"),
            }
        }
        Ok(events)
    }

    pub fn clear_checked(&self) -> Result<(), StorageError> {
        self.storage.remove_item(&self.key)
    }

    fn record_failure(&self, operation: &str, err: &StorageError) {
        warn!(key = %self.key, operation, error = %err, "event log storage failure ignored");
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = Some(format!("{operation}: {err}"));
        }
    }
}

impl<S: StorageArea> EventLog for EventLogStore<S> {
    fn append(&self, event: &LogEvent) {
        if let Err(err) = self.append_checked(event) {
            self.record_failure("append", &err);
        }
    }

    fn read_all(&self) -> Vec<LogEvent> {
        self.read_all_checked().unwrap_or_else(|err| {
            self.record_failure("read", &err);
            Vec::new()
        })
    }

    fn clear(&self) {
        if let Err(err) = self.clear_checked() {
            self.record_failure("clear", &err);
        }
    }
}
