use std::sync::Arc;

use contracts::{ChatMessage, LogEvent, Marker, Role, TrainerConfig, TEAM_CHANNEL_NAME};
use proptest::prelude::*;
use trainer_core::{
    Advance, Countdown, EventLog, EventLogStore, LocalHub, ManualClock, MemoryStorage, Mode,
    OfflineChannel, PlaybackError, ScenarioCatalog, ScenarioPlayer, Services, Shell, StorageArea,
    TabId, TeamSession,
};

struct Harness {
    log: Arc<EventLogStore<MemoryStorage>>,
    clock: Arc<ManualClock>,
    services: Services,
}

fn harness() -> Harness {
    let log = Arc::new(EventLogStore::new(MemoryStorage::new()));
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let services = Services::new(log.clone(), clock.clone(), Arc::new(OfflineChannel));
    Harness {
        log,
        clock,
        services,
    }
}

fn scenario_ids() -> Vec<String> {
    ScenarioCatalog::builtin()
        .scenarios()
        .map(|scenario| scenario.id.clone())
        .collect()
}

#[test]
fn score_for_100_40_100_20_is_65_percent() {
    let h = harness();
    let scenario = ScenarioCatalog::builtin()
        .shared("ooda-loop-trainer")
        .expect("builtin");
    let mut player = ScenarioPlayer::start(scenario, &h.services);

    let mut last = None;
    for option in [0, 1, 0, 2] {
        player.select_option(option).expect("select");
        last = Some(player.advance().expect("advance"));
    }

    match last {
        Some(Advance::Finished(card)) => {
            assert_eq!((card.cumulative, card.max, card.percent), (260, 400, 65));
        }
        other => panic!("expected finished playback, got {other:?}"),
    }
}

#[test]
fn countdown_from_20_stops_at_zero() {
    let mut countdown = Countdown::new(Some(20));
    for _ in 0..20 {
        assert!(countdown.tick());
    }
    assert_eq!(countdown.remaining(), Some(0));
    for _ in 0..5 {
        assert!(!countdown.tick());
    }
    assert_eq!(countdown.remaining(), Some(0));
}

#[test]
fn player_countdown_follows_the_clock() {
    let h = harness();
    let scenario = ScenarioCatalog::builtin()
        .shared("ooda-loop-trainer")
        .expect("builtin");
    let mut player = ScenarioPlayer::start(scenario, &h.services);

    for _ in 0..20 {
        h.clock.advance_secs(1);
        player.pump();
    }
    assert_eq!(player.remaining(), Some(0));

    h.clock.advance_secs(30);
    player.pump();
    assert_eq!(player.remaining(), Some(0));
    assert!(player.can_select());
}

#[test]
fn read_all_on_empty_or_corrupt_storage_is_empty() {
    let storage = Arc::new(MemoryStorage::new());
    let log = EventLogStore::new(storage.clone());
    assert!(log.read_all().is_empty());

    for corrupt in ["", "nul", "{\"a\":1}", "42", "[1, 2"] {
        storage.set_item(log.key(), corrupt).expect("seed");
        assert!(log.read_all().is_empty(), "value {corrupt:?} should read empty");
    }
}

#[test]
fn marker_from_tab_a_reaches_tab_b_without_self_echo() {
    let hub = Arc::new(LocalHub::new());
    let services_for = || {
        Services::new(
            Arc::new(EventLogStore::new(MemoryStorage::new())),
            Arc::new(ManualClock::new(0)),
            hub.clone(),
        )
    };
    let mut a = TeamSession::join(
        &services_for(),
        TabId::from_raw(0xa),
        TEAM_CHANNEL_NAME,
        Role::Leader,
    );
    let mut b = TeamSession::join(
        &services_for(),
        TabId::from_raw(0xb),
        TEAM_CHANNEL_NAME,
        Role::Trainee,
    );

    a.drop_marker(50.0, 50.0);
    assert_eq!(a.markers().len(), 1);

    b.pump();
    a.pump();
    assert!(b
        .markers()
        .iter()
        .any(|marker| marker.x == 50.0 && marker.y == 50.0));
    assert_eq!(a.markers().len(), 1);

    a.drop_marker(12.345678901234567, 87.65432109876543);
    b.pump();
    assert_eq!(b.markers(), a.markers());
}

#[test]
fn catalog_lookup_known_and_unknown() {
    let catalog = ScenarioCatalog::builtin();
    let found = catalog.get("ooda-loop-trainer").expect("known id");
    assert_eq!(found.id, "ooda-loop-trainer");
    assert_eq!(found.steps.len(), 4);
    assert!(catalog.get("no-such-scenario").is_none());
}

#[test]
fn two_tabs_share_storage_but_review_their_own_actions() {
    let storage = Arc::new(MemoryStorage::new());
    let hub = Arc::new(LocalHub::new());
    let config = TrainerConfig::default();
    let open_tab = |raw: u64| {
        let services = Services::new(
            Arc::new(EventLogStore::new(storage.clone())),
            Arc::new(ManualClock::new(raw as i64)),
            hub.clone(),
        );
        Shell::new(
            services,
            Arc::new(ScenarioCatalog::builtin()),
            TabId::from_raw(raw),
            &config,
        )
    };
    let mut a = open_tab(1);
    let mut b = open_tab(2);

    a.enter(Mode::Team);
    b.enter(Mode::Team);
    a.team_mut().expect("team").send_chat("all units hold");
    b.poll();
    assert_eq!(b.team().map(|team| team.chat().len()), Some(1));

    b.back();
    b.enter(Mode::Review);
    let kinds: Vec<String> = b
        .review()
        .expect("review")
        .entries()
        .into_iter()
        .map(|entry| entry.kind)
        .collect();
    // Both joins and a's chat; b never logs the chat it received.
    assert_eq!(kinds, vec!["status", "status", "chat"]);
}

proptest! {
    #[test]
    fn first_selection_sticks(
        scenario_idx in 0_usize..3,
        first in 0_usize..4,
        later in proptest::collection::vec(0_usize..6, 1..6),
    ) {
        let h = harness();
        let ids = scenario_ids();
        let scenario = ScenarioCatalog::builtin()
            .shared(&ids[scenario_idx % ids.len()])
            .expect("builtin");
        let option_count = scenario.steps[0].options.len();
        let first = first % option_count;

        let mut player = ScenarioPlayer::start(scenario, &h.services);
        player.select_option(first).expect("first selection");

        for option in later {
            prop_assert_eq!(
                player.select_option(option).map(|option| option.score),
                Err(PlaybackError::AlreadySelected)
            );
            prop_assert_eq!(player.state().and_then(|state| state.selected), Some(first));
        }
        prop_assert_eq!(h.log.read_all().len(), 1);
    }

    #[test]
    fn advance_requires_a_selection(scenario_idx in 0_usize..3, answered in 0_usize..4) {
        let h = harness();
        let ids = scenario_ids();
        let scenario = ScenarioCatalog::builtin()
            .shared(&ids[scenario_idx % ids.len()])
            .expect("builtin");
        let answered = answered.min(scenario.steps.len() - 1);

        let mut player = ScenarioPlayer::start(scenario, &h.services);
        for _ in 0..answered {
            player.select_option(0).expect("select");
            player.advance().expect("advance");
        }

        prop_assert_eq!(player.advance(), Err(PlaybackError::NoSelection));
        prop_assert_eq!(player.step_index(), Some(answered));
    }

    #[test]
    fn countdown_never_goes_negative(limit in 0_u32..60, ticks in 0_u32..200) {
        let mut countdown = Countdown::new(Some(limit));
        let applied = countdown.tick_n(ticks);
        prop_assert_eq!(applied, ticks.min(limit));
        prop_assert_eq!(countdown.remaining(), Some(limit.saturating_sub(ticks)));
    }

    #[test]
    fn append_read_clear(
        texts in proptest::collection::vec("[a-zA-Z0-9 ]{0,24}", 1..8),
        x in 0.0_f64..=100.0,
        y in 0.0_f64..=100.0,
    ) {
        let log = EventLogStore::new(MemoryStorage::new());
        for (n, text) in texts.iter().enumerate() {
            let event = LogEvent::chat(
                n as i64,
                ChatMessage {
                    id: format!("c{n}"),
                    from: "Comms".to_string(),
                    text: text.clone(),
                    ts: n as i64,
                },
            );
            log.append(&event);
            let all = log.read_all();
            prop_assert_eq!(all.last(), Some(&event));
        }

        let marker = LogEvent::marker(
            99,
            Marker {
                id: "m".to_string(),
                x,
                y,
            },
        );
        log.append(&marker);
        let events = log.read_all();
        prop_assert_eq!(events.len(), texts.len() + 1);
        prop_assert_eq!(events.last(), Some(&marker));

        log.clear();
        prop_assert!(log.read_all().is_empty());
    }
}
