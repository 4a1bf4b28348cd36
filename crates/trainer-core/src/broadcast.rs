//! Same-origin fan-out channel between tabs.
//!
//! A publish reaches every other subscriber of the topic; the publishing tab
//! never receives its own frame. Delivery is fire-and-forget: no ordering
//! across tabs, no acknowledgement, no deduplication.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use contracts::ChannelMessage;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, warn};

const DEFAULT_CAPACITY: usize = 1024;

/// Identity of one tab on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(u64);

impl TabId {
    pub fn random() -> Self {
        Self(rand::random())
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug)]
pub enum ChannelError {
    Unavailable(String),
    Encode(serde_json::Error),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "channel unavailable: {reason}"),
            Self::Encode(err) => write!(f, "channel encode error: {err}"),
        }
    }
}

impl std::error::Error for ChannelError {}

impl From<serde_json::Error> for ChannelError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Receiving end of a subscription. Dropping it unsubscribes.
pub trait Inbox: Send {
    /// Messages from other tabs delivered since the previous drain, in arrival order.
    fn drain(&mut self) -> Vec<ChannelMessage>;
}

pub trait BroadcastPort: Send + Sync {
    fn publish(
        &self,
        topic: &str,
        origin: TabId,
        message: &ChannelMessage,
    ) -> Result<(), ChannelError>;

    fn subscribe(&self, topic: &str, subscriber: TabId) -> Result<Box<dyn Inbox>, ChannelError>;
}

#[derive(Debug, Clone)]
struct Frame {
    origin: TabId,
    body: Arc<str>,
}

/// In-process hub: one `tokio` broadcast channel per topic. Frames travel as
/// JSON text, so every tab decodes its own copy.
#[derive(Debug)]
pub struct LocalHub {
    topics: Mutex<HashMap<String, broadcast::Sender<Frame>>>,
    capacity: usize,
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Frame> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl BroadcastPort for LocalHub {
    fn publish(
        &self,
        topic: &str,
        origin: TabId,
        message: &ChannelMessage,
    ) -> Result<(), ChannelError> {
        let body: Arc<str> = serde_json::to_string(message)?.into();
        // An error here only means nobody is listening.
        let delivered = self
            .sender(topic)
            .send(Frame { origin, body })
            .unwrap_or(0);
        debug!(topic, origin = %origin, delivered, "frame published");
        Ok(())
    }

    fn subscribe(&self, topic: &str, subscriber: TabId) -> Result<Box<dyn Inbox>, ChannelError> {
        let rx = self.sender(topic).subscribe();
        Ok(Box::new(LocalInbox {
            topic: topic.to_string(),
            subscriber,
            rx,
        }))
    }
}

struct LocalInbox {
    topic: String,
    subscriber: TabId,
    rx: broadcast::Receiver<Frame>,
}

impl Inbox for LocalInbox {
    fn drain(&mut self) -> Vec<ChannelMessage> {
        let mut messages = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(frame) => {
                    if frame.origin == self.subscriber {
                        continue;
                    }
                    match serde_json::from_str::<ChannelMessage>(&frame.body) {
                        Ok(message) => messages.push(message),
                        Err(err) => {
                            warn!(topic = %self.topic, error = %err, "dropping undecodable frame")
                        }
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "tab lagged behind the channel");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        messages
    }
}

/// Channel for environments without cross-tab messaging.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineChannel;

impl BroadcastPort for OfflineChannel {
    fn publish(
        &self,
        _topic: &str,
        _origin: TabId,
        _message: &ChannelMessage,
    ) -> Result<(), ChannelError> {
        Err(ChannelError::Unavailable("no broadcast channel".to_string()))
    }

    fn subscribe(&self, _topic: &str, _subscriber: TabId) -> Result<Box<dyn Inbox>, ChannelError> {
        Err(ChannelError::Unavailable("no broadcast channel".to_string()))
    }
}
