//! Team session of one tab: shared marker board plus role chat.
//!
//! Local actions apply to this tab's view at once, go out on the channel to
//! the other tabs, and are appended to the local event log. Frames received
//! from other tabs only update the view; they are not logged here.

use contracts::{ChannelMessage, ChatMessage, LogEvent, Marker, Role, StatusPayload};
use tracing::{debug, warn};

use crate::broadcast::{ChannelError, Inbox, TabId};
use crate::Services;

pub const BOARD_MIN: f64 = 0.0;
pub const BOARD_MAX: f64 = 100.0;

pub struct TeamSession {
    tab: TabId,
    topic: String,
    role: Role,
    markers: Vec<Marker>,
    chat: Vec<ChatMessage>,
    inbox: Option<Box<dyn Inbox>>,
    services: Services,
    next_seq: u64,
    last_error: Option<String>,
}

impl TeamSession {
    /// Subscribe to `topic` and announce the join in the local log. A missing
    /// channel leaves the session working in local-only mode.
    pub fn join(services: &Services, tab: TabId, topic: impl Into<String>, role: Role) -> Self {
        let topic = topic.into();
        let (inbox, last_error) = match services.channel.subscribe(&topic, tab) {
            Ok(inbox) => (Some(inbox), None),
            Err(err) => {
                warn!(
                    topic = %topic,
                    tab = %tab,
                    error = %err,
                    "team channel unavailable, staying local"
                );
                (None, Some(err.to_string()))
            }
        };

        services.log.append(&LogEvent::status(
            services.now_ms(),
            StatusPayload {
                status: "team_joined".to_string(),
                scenario_id: None,
                detail: Some(serde_json::json!({
                    "role": role.as_str(),
                    "tab": tab.to_string(),
                })),
            },
        ));
        debug!(
            topic = %topic,
            tab = %tab,
            role = %role,
            connected = inbox.is_some(),
            "joined team session"
        );

        Self {
            tab,
            topic,
            role,
            markers: Vec::new(),
            chat: Vec::new(),
            inbox,
            services: services.clone(),
            next_seq: 0,
            last_error,
        }
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn chat(&self) -> &[ChatMessage] {
        &self.chat
    }

    /// True while subscribed to the channel.
    pub fn is_connected(&self) -> bool {
        self.inbox.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Drop a marker at percentage coordinates. Coordinates are clamped into
    /// the board; non-finite input is ignored.
    pub fn drop_marker(&mut self, x: f64, y: f64) -> Option<&Marker> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }

        let marker = Marker {
            id: self.next_id(),
            x: x.clamp(BOARD_MIN, BOARD_MAX),
            y: y.clamp(BOARD_MIN, BOARD_MAX),
        };
        self.markers.push(marker.clone());
        self.publish(ChannelMessage::Marker {
            marker: marker.clone(),
        });
        self.services
            .log
            .append(&LogEvent::marker(self.services.now_ms(), marker));

        self.markers.last()
    }

    /// Send a chat line as the current role. Blank text is ignored.
    pub fn send_chat(&mut self, text: &str) -> Option<&ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let now = self.services.now_ms();
        let message = ChatMessage {
            id: self.next_id(),
            from: self.role.as_str().to_string(),
            text: text.to_string(),
            ts: now,
        };
        self.chat.push(message.clone());
        self.publish(ChannelMessage::Chat {
            msg: message.clone(),
        });
        self.services.log.append(&LogEvent::chat(now, message));

        self.chat.last()
    }

    /// Apply frames that arrived from other tabs. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let Some(inbox) = self.inbox.as_mut() else {
            return 0;
        };

        let incoming = inbox.drain();
        let applied = incoming.len();
        for message in incoming {
            match message {
                ChannelMessage::Marker { marker } => self.markers.push(marker),
                ChannelMessage::Chat { msg } => self.chat.push(msg),
            }
        }
        applied
    }

    /// Detach from the channel. Frames sent afterwards never reach this tab.
    pub fn leave(mut self) {
        self.inbox = None;
        debug!(topic = %self.topic, tab = %self.tab, "left team session");
    }

    fn publish(&mut self, message: ChannelMessage) {
        if let Err(err) = self
            .services
            .channel
            .publish(&self.topic, self.tab, &message)
        {
            self.record_channel_failure(err);
        }
    }

    fn record_channel_failure(&mut self, err: ChannelError) {
        warn!(
            topic = %self.topic,
            tab = %self.tab,
            error = %err,
            "team broadcast failed, kept local"
        );
        self.last_error = Some(err.to_string());
    }

    fn next_id(&mut self) -> String {
        self.next_seq += 1;
        format!("{}-{}-{}", self.services.now_ms(), self.tab, self.next_seq)
    }
}

impl std::fmt::Debug for TeamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamSession")
            .field("tab", &self.tab)
            .field("topic", &self.topic)
            .field("role", &self.role)
            .field("markers", &self.markers.len())
            .field("chat", &self.chat.len())
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use contracts::{LogKind, LogPayload, TEAM_CHANNEL_NAME};

    use super::*;
    use crate::broadcast::{LocalHub, OfflineChannel};
    use crate::clock::ManualClock;
    use crate::event_log::{EventLog, EventLogStore};
    use crate::storage::MemoryStorage;

    fn services_with(channel: Arc<dyn crate::broadcast::BroadcastPort>) -> Services {
        Services::new(
            Arc::new(EventLogStore::new(MemoryStorage::new())),
            Arc::new(ManualClock::new(42_000)),
            channel,
        )
    }

    #[test]
    fn marker_is_visible_locally_at_once_and_remotely_after_pump() {
        let hub: Arc<LocalHub> = Arc::new(LocalHub::new());
        let mut a = TeamSession::join(
            &services_with(hub.clone()),
            TabId::from_raw(1),
            TEAM_CHANNEL_NAME,
            Role::Leader,
        );
        let mut b = TeamSession::join(
            &services_with(hub),
            TabId::from_raw(2),
            TEAM_CHANNEL_NAME,
            Role::Trainee,
        );

        a.drop_marker(50.0, 50.0).expect("marker dropped");
        assert_eq!(a.markers().len(), 1);
        assert!(b.markers().is_empty());

        assert_eq!(b.pump(), 1);
        assert_eq!(b.markers().len(), 1);
        assert_eq!((b.markers()[0].x, b.markers()[0].y), (50.0, 50.0));

        assert_eq!(a.pump(), 0);
        assert_eq!(a.markers().len(), 1);
    }

    #[test]
    fn chat_carries_role_and_trims_text() {
        let hub: Arc<LocalHub> = Arc::new(LocalHub::new());
        let mut a = TeamSession::join(
            &services_with(hub.clone()),
            TabId::from_raw(1),
            "t",
            Role::Comms,
        );
        let mut b =
            TeamSession::join(&services_with(hub), TabId::from_raw(2), "t", Role::Trainee);

        assert!(a.send_chat("   ").is_none());
        let sent = a.send_chat("  radio check  ").expect("sent").clone();
        assert_eq!(sent.text, "radio check");
        assert_eq!(sent.from, "Comms");

        a.set_role(Role::Instructor);
        a.send_chat("switching roles");

        b.pump();
        let from: Vec<&str> = b.chat().iter().map(|msg| msg.from.as_str()).collect();
        assert_eq!(from, vec!["Comms", "Instructor"]);
    }

    #[test]
    fn fractional_marker_arrives_bit_exact_and_is_logged_unchanged() {
        let hub: Arc<LocalHub> = Arc::new(LocalHub::new());
        let log_a = Arc::new(EventLogStore::new(MemoryStorage::new()));
        let clock = Arc::new(ManualClock::new(7));
        let mut a = TeamSession::join(
            &Services::new(log_a.clone(), clock.clone(), hub.clone()),
            TabId::from_raw(1),
            "t",
            Role::Leader,
        );
        let mut b = TeamSession::join(&services_with(hub), TabId::from_raw(2), "t", Role::Trainee);

        let (x, y) = (39.430133835633676, 0.1 + 0.2);
        let sent = a.drop_marker(x, y).expect("marker dropped").clone();
        b.pump();

        let received = &b.markers()[0];
        assert_eq!(received.x.to_bits(), x.to_bits());
        assert_eq!(received.y.to_bits(), y.to_bits());
        assert_eq!(received, &sent);

        let logged = log_a.read_all();
        assert_eq!(logged.last(), Some(&LogEvent::marker(7, sent)));
    }

    #[test]
    fn local_actions_are_logged_remote_ones_are_not() {
        let hub: Arc<LocalHub> = Arc::new(LocalHub::new());
        let log_a = Arc::new(EventLogStore::new(MemoryStorage::new()));
        let log_b = Arc::new(EventLogStore::new(MemoryStorage::new()));
        let clock = Arc::new(ManualClock::new(7));
        let mut a = TeamSession::join(
            &Services::new(log_a.clone(), clock.clone(), hub.clone()),
            TabId::from_raw(1),
            "t",
            Role::Leader,
        );
        let mut b = TeamSession::join(
            &Services::new(log_b.clone(), clock, hub),
            TabId::from_raw(2),
            "t",
            Role::Trainee,
        );

        a.drop_marker(1.0, 2.0);
        a.send_chat("go");
        b.pump();

        let kinds: Vec<Option<LogKind>> = log_a.read_all().iter().map(LogEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![Some(LogKind::Status), Some(LogKind::Marker), Some(LogKind::Chat)]
        );
        assert_eq!(log_b.read_all().len(), 1);
        assert_eq!(b.markers().len(), 1);
        assert_eq!(b.chat().len(), 1);
    }

    #[test]
    fn offline_channel_keeps_local_state() {
        let services = services_with(Arc::new(OfflineChannel));
        let mut session = TeamSession::join(&services, TabId::from_raw(1), "t", Role::Trainee);

        assert!(!session.is_connected());
        assert!(session.drop_marker(10.0, 10.0).is_some());
        assert_eq!(session.markers().len(), 1);
        assert_eq!(session.pump(), 0);
        assert!(session.last_error().is_some());
    }

    #[test]
    fn coordinates_are_clamped_and_nan_ignored() {
        let services = services_with(Arc::new(LocalHub::new()));
        let mut session = TeamSession::join(&services, TabId::from_raw(1), "t", Role::Trainee);

        let marker = session.drop_marker(-5.0, 140.0).expect("clamped").clone();
        assert_eq!((marker.x, marker.y), (0.0, 100.0));
        assert!(session.drop_marker(f64::NAN, 3.0).is_none());
        assert_eq!(session.markers().len(), 1);
    }

    #[test]
    fn ids_are_unique_within_a_tab() {
        let services = services_with(Arc::new(LocalHub::new()));
        let mut session = TeamSession::join(&services, TabId::from_raw(1), "t", Role::Trainee);
        let first = session.drop_marker(1.0, 1.0).expect("m1").id.clone();
        let second = session.drop_marker(1.0, 1.0).expect("m2").id.clone();
        assert_ne!(first, second);
    }

    #[test]
    fn leaving_detaches_from_hub() {
        let hub: Arc<LocalHub> = Arc::new(LocalHub::new());
        let services = services_with(hub.clone());
        let session = TeamSession::join(&services, TabId::from_raw(1), "t", Role::Trainee);
        assert_eq!(hub.subscriber_count("t"), 1);
        session.leave();
        assert_eq!(hub.subscriber_count("t"), 0);
    }

    #[test]
    fn join_is_logged_with_role() {
        let log = Arc::new(EventLogStore::new(MemoryStorage::new()));
        let services = Services::new(
            log.clone(),
            Arc::new(ManualClock::new(1)),
            Arc::new(LocalHub::new()),
        );
        let _session = TeamSession::join(&services, TabId::from_raw(3), "t", Role::Comms);

        let events = log.read_all();
        match &events[0].payload {
            LogPayload::Status(status) => {
                assert_eq!(status.status, "team_joined");
                let role = status.detail.as_ref().and_then(|detail| detail.get("role"));
                assert_eq!(role, Some(&serde_json::json!("Comms")));
            }
            other => panic!("expected status payload, got {other:?}"),
        }
    }
}
