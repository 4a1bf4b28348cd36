//! Cross-boundary contracts for the trainer: persisted log records, scenario
//! definitions, team board messages, and runtime configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod log;
pub mod scenario;
pub mod team;

pub use log::{ChoicePayload, LogEvent, LogKind, LogPayload, MarkerPayload, StatusPayload};
pub use scenario::{Difficulty, Phase, Scenario, ScenarioOption, ScenarioStep};
pub use team::{ChannelMessage, ChatMessage, Marker};

/// Storage key under which the JSON array of log records lives.
pub const LOG_STORAGE_KEY: &str = "sectrain_logs";
/// Name of the fan-out channel shared by every team tab.
pub const TEAM_CHANNEL_NAME: &str = "sectrain_team_session";
/// Scenario played by the solo practice mode.
pub const SOLO_SCENARIO_ID: &str = "ooda-loop-trainer";
/// Highest score a single option can award.
pub const MAX_OPTION_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Role {
    Leader,
    Instructor,
    #[default]
    Trainee,
    Comms,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Leader, Role::Instructor, Role::Trainee, Role::Comms];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Leader => "Leader",
            Self::Instructor => "Instructor",
            Self::Trainee => "Trainee",
            Self::Comms => "Comms",
        }
    }

    /// Case-insensitive parse of a role name.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainerConfig {
    /// SQLite file backing the storage area. One file plays the part of one origin.
    pub storage_path: String,
    pub channel_name: String,
    pub log_key: String,
    pub solo_scenario_id: String,
    #[serde(default)]
    pub default_role: Role,
    /// Countdown tick period. One tick removes one second from the step timer.
    pub tick_interval_ms: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            storage_path: "sectrain_storage.sqlite".to_string(),
            channel_name: TEAM_CHANNEL_NAME.to_string(),
            log_key: LOG_STORAGE_KEY.to_string(),
            solo_scenario_id: SOLO_SCENARIO_ID.to_string(),
            default_role: Role::default(),
            tick_interval_ms: 1_000,
        }
    }
}

impl fmt::Display for TrainerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "storage={} channel={} log_key={} solo={} role={} tick_ms={}",
            self.storage_path,
            self.channel_name,
            self.log_key,
            self.solo_scenario_id,
            self.default_role,
            self.tick_interval_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_ignores_case_and_whitespace() {
        assert_eq!(Role::parse(" leader "), Some(Role::Leader));
        assert_eq!(Role::parse("COMMS"), Some(Role::Comms));
        assert_eq!(Role::parse("medic"), None);
    }

    #[test]
    fn config_fills_missing_role_with_default() {
        let parsed: TrainerConfig = serde_json::from_str(
            r#"{
                "storage_path": "a.sqlite",
                "channel_name": "c",
                "log_key": "k",
                "solo_scenario_id": "s",
                "tick_interval_ms": 250
            }"#,
        )
        .expect("config without role");
        assert_eq!(parsed.default_role, Role::Trainee);
        assert_eq!(parsed.tick_interval_ms, 250);
    }
}
