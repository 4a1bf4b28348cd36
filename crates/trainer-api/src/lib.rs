//! In-process facade wiring configuration to the storage area, the tab channel
//! and the clock. One `TrainerApp` plays the part of one browser origin; every
//! shell it opens is a tab of that origin.

mod persistence;

use std::sync::Arc;

use contracts::{Role, TrainerConfig};
use tracing::{info, warn};
use trainer_core::{
    Clock, EventLog, EventLogStore, LocalHub, MemoryStorage, ScenarioCatalog, Services, Shell,
    StorageArea, SystemClock, TabId,
};

pub use persistence::{PersistenceError, SqliteStorage};

pub const ENV_STORAGE_PATH: &str = "SECTRAIN_STORAGE_PATH";
pub const ENV_CHANNEL: &str = "SECTRAIN_CHANNEL";
pub const ENV_ROLE: &str = "SECTRAIN_ROLE";

/// Default config with the `SECTRAIN_*` environment overrides applied.
pub fn config_from_env() -> TrainerConfig {
    apply_overrides(TrainerConfig::default(), |name| std::env::var(name).ok())
}

/// Apply overrides looked up by variable name. Blank values are ignored, as
/// is a role name that does not parse.
pub fn apply_overrides(
    mut config: TrainerConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> TrainerConfig {
    let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(path) = non_blank(ENV_STORAGE_PATH) {
        config.storage_path = path;
    }
    if let Some(channel) = non_blank(ENV_CHANNEL) {
        config.channel_name = channel.trim().to_string();
    }
    if let Some(raw) = non_blank(ENV_ROLE) {
        match Role::parse(&raw) {
            Some(role) => config.default_role = role,
            None => warn!(value = %raw, "unknown role in {ENV_ROLE}, keeping default"),
        }
    }
    config
}

type SharedLog = EventLogStore<Arc<dyn StorageArea>>;

pub struct TrainerApp {
    config: TrainerConfig,
    catalog: Arc<ScenarioCatalog>,
    log: Arc<SharedLog>,
    hub: Arc<LocalHub>,
    clock: Arc<dyn Clock>,
    storage_error: Option<String>,
}

impl TrainerApp {
    /// Open the SQLite storage area named by the config. When it cannot be
    /// opened the app keeps running on an in-memory area and remembers why.
    pub fn from_config(config: TrainerConfig) -> Self {
        match SqliteStorage::open(&config.storage_path) {
            Ok(storage) => {
                info!(path = %config.storage_path, "storage area opened");
                Self::with_storage(config, Arc::new(storage), Arc::new(SystemClock))
            }
            Err(err) => {
                warn!(
                    path = %config.storage_path,
                    error = %err,
                    "storage area unavailable, falling back to memory"
                );
                let mut app = Self::in_memory(config);
                app.storage_error = Some(err.to_string());
                app
            }
        }
    }

    pub fn in_memory(config: TrainerConfig) -> Self {
        Self::with_storage(config, Arc::new(MemoryStorage::new()), Arc::new(SystemClock))
    }

    pub fn with_storage(
        config: TrainerConfig,
        storage: Arc<dyn StorageArea>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let log = Arc::new(EventLogStore::with_key(storage, config.log_key.clone()));
        Self {
            config,
            catalog: Arc::new(ScenarioCatalog::builtin()),
            log,
            hub: Arc::new(LocalHub::new()),
            clock,
            storage_error: None,
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<ScenarioCatalog> {
        &self.catalog
    }

    pub fn log(&self) -> Arc<dyn EventLog> {
        self.log.clone()
    }

    pub fn hub(&self) -> &Arc<LocalHub> {
        &self.hub
    }

    /// Why the configured storage could not be opened, if it could not.
    pub fn storage_error(&self) -> Option<&str> {
        self.storage_error.as_deref()
    }

    /// Most recent swallowed read/write failure of the event log.
    pub fn last_log_error(&self) -> Option<String> {
        self.log.last_error()
    }

    pub fn services(&self) -> Services {
        Services::new(self.log.clone(), self.clock.clone(), self.hub.clone())
            .with_tick_interval(self.config.tick_interval_ms)
    }

    /// A new tab with a random id, showing the menu.
    pub fn open_tab(&self) -> Shell {
        self.open_tab_as(TabId::random())
    }

    pub fn open_tab_as(&self, tab: TabId) -> Shell {
        Shell::new(self.services(), self.catalog.clone(), tab, &self.config)
    }
}

impl std::fmt::Debug for TrainerApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainerApp")
            .field("config", &self.config)
            .field("scenarios", &self.catalog.len())
            .field("storage_error", &self.storage_error)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use contracts::{LogKind, LOG_STORAGE_KEY};
    use trainer_core::{Advance, ManualClock, Mode};

    use super::*;

    fn temp_db_path(name: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();

        std::env::temp_dir().join(format!("sectrain_app_{name}_{nanos}.sqlite"))
    }

    fn remove_db(path: &std::path::Path) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(path.with_extension("sqlite-wal"));
        let _ = std::fs::remove_file(path.with_extension("sqlite-shm"));
    }

    #[test]
    fn overrides_apply_and_blank_values_are_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_STORAGE_PATH, "/tmp/custom.sqlite"),
            (ENV_CHANNEL, "   "),
            (ENV_ROLE, "comms"),
        ]);
        let config = apply_overrides(TrainerConfig::default(), |name| {
            vars.get(name).map(|value| value.to_string())
        });

        assert_eq!(config.storage_path, "/tmp/custom.sqlite");
        assert_eq!(config.channel_name, contracts::TEAM_CHANNEL_NAME);
        assert_eq!(config.default_role, Role::Comms);
    }

    #[test]
    fn unknown_role_keeps_default() {
        let config = apply_overrides(TrainerConfig::default(), |name| {
            (name == ENV_ROLE).then(|| "general".to_string())
        });
        assert_eq!(config.default_role, Role::Trainee);
    }

    #[test]
    fn unopenable_storage_falls_back_to_memory() {
        let missing_dir = temp_db_path("missing_dir");
        let config = TrainerConfig {
            storage_path: missing_dir
                .join("nested")
                .join("store.sqlite")
                .to_string_lossy()
                .into_owned(),
            ..TrainerConfig::default()
        };
        let app = TrainerApp::from_config(config);

        assert!(app.storage_error().is_some());
        let mut tab = app.open_tab();
        assert!(tab.enter(Mode::Team));
        assert_eq!(app.log().read_all().len(), 1);
    }

    #[test]
    fn solo_run_persists_to_sqlite_and_survives_reopen() {
        let db_path = temp_db_path("solo");
        let config = TrainerConfig {
            storage_path: db_path.to_string_lossy().into_owned(),
            ..TrainerConfig::default()
        };

        {
            let app = TrainerApp::from_config(config.clone());
            assert_eq!(app.storage_error(), None);
            let mut tab = app.open_tab();
            tab.enter(Mode::Solo);
            for step in 0..4 {
                tab.select_option(0).expect("select");
                let outcome = tab.advance().expect("advance");
                assert_eq!(step == 3, matches!(outcome, Advance::Finished(_)));
            }
        }

        let reopened = TrainerApp::from_config(config);
        let kinds: Vec<Option<LogKind>> = reopened
            .log()
            .read_all()
            .iter()
            .map(|event| event.kind())
            .collect();
        assert_eq!(kinds.len(), 5);
        assert_eq!(kinds[0], Some(LogKind::Choice));
        assert_eq!(kinds[4], Some(LogKind::Status));

        drop(reopened);
        remove_db(&db_path);
    }

    #[test]
    fn tabs_of_one_app_share_board_and_log() {
        let storage = Arc::new(MemoryStorage::new());
        let app = TrainerApp::with_storage(
            TrainerConfig::default(),
            storage.clone(),
            Arc::new(ManualClock::new(1_000)),
        );
        let mut a = app.open_tab_as(TabId::from_raw(1));
        let mut b = app.open_tab_as(TabId::from_raw(2));
        a.enter(Mode::Team);
        b.enter(Mode::Team);

        a.team_mut().expect("team").drop_marker(50.0, 50.0);
        assert!(b.poll());
        assert_eq!(b.team().map(|team| team.markers().len()), Some(1));

        assert!(storage
            .get_item(LOG_STORAGE_KEY)
            .expect("get")
            .is_some_and(|raw| raw.contains("\"type\":\"marker\"")));
    }
}
