//! Decision trainer core: scenario playback, the local event log, team board
//! sync between tabs, and the presentation shell that routes between them.
//!
//! Platform primitives sit behind ports so the logic can run against real
//! backends or deterministic fakes:
//! - [`storage::StorageArea`] stands in for the per-origin key/value store,
//! - [`broadcast::BroadcastPort`] for the same-origin tab channel,
//! - [`clock::Clock`] and [`clock::Ticker`] for wall time and the countdown.

use std::sync::Arc;

pub mod broadcast;
pub mod catalog;
pub mod clock;
pub mod event_log;
pub mod library;
pub mod player;
pub mod review;
pub mod scenarios;
pub mod shell;
pub mod storage;
pub mod team;

pub use broadcast::{BroadcastPort, ChannelError, Inbox, LocalHub, OfflineChannel, TabId};
pub use catalog::{CatalogError, ScenarioCatalog};
pub use clock::{Clock, ClockTicker, Countdown, ManualClock, SystemClock, Ticker};
pub use event_log::{EventLog, EventLogStore};
pub use library::{LibraryEntry, LibraryFilter, LibraryView};
pub use player::{Advance, PlaybackError, PlaybackState, ScenarioPlayer, ScoreCard, StepView};
pub use review::{ReviewEntry, ReviewView};
pub use shell::{MenuItem, Mode, Shell};
pub use storage::{MemoryStorage, StorageArea, StorageError};
pub use team::TeamSession;

/// Ports shared by every view of one tab.
#[derive(Clone)]
pub struct Services {
    pub log: Arc<dyn EventLog>,
    pub clock: Arc<dyn Clock>,
    pub channel: Arc<dyn BroadcastPort>,
    pub tick_interval_ms: u64,
}

impl Services {
    pub fn new(
        log: Arc<dyn EventLog>,
        clock: Arc<dyn Clock>,
        channel: Arc<dyn BroadcastPort>,
    ) -> Self {
        Self {
            log,
            clock,
            channel,
            tick_interval_ms: 1_000,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval_ms: u64) -> Self {
        self.tick_interval_ms = tick_interval_ms.max(1);
        self
    }

    /// A fresh countdown ticker driven by this tab's clock.
    pub fn ticker(&self) -> Box<dyn Ticker> {
        Box::new(ClockTicker::new(self.clock.clone(), self.tick_interval_ms))
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("tick_interval_ms", &self.tick_interval_ms)
            .finish_non_exhaustive()
    }
}
