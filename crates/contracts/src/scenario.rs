use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Phase {
    Observe,
    Orient,
    Decide,
    Act,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Observe => "Observe",
            Self::Orient => "Orient",
            Self::Decide => "Decide",
            Self::Act => "Act",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [Self::Beginner, Self::Intermediate, Self::Advanced]
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioOption {
    pub text: String,
    /// Relative usefulness, 0 to 100.
    pub score: u32,
    pub feedback: String,
}

impl ScenarioOption {
    pub fn new(text: impl Into<String>, score: u32, feedback: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score,
            feedback: feedback.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioStep {
    pub id: String,
    pub phase: Phase,
    pub prompt: String,
    /// Seconds available to answer. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    pub options: Vec<ScenarioOption>,
}

impl ScenarioStep {
    pub fn option(&self, index: usize) -> Option<&ScenarioOption> {
        self.options.get(index)
    }

    pub fn option_index_by_text(&self, text: &str) -> Option<usize> {
        self.options.iter().position(|option| option.text == text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scenario {
    pub id: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|own| own.eq_ignore_ascii_case(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_uses_camel_case_time_limit() {
        let step: ScenarioStep = serde_json::from_str(
            r#"{"id":"observe","phase":"Observe","prompt":"p","timeLimit":20,"options":[]}"#,
        )
        .expect("step parses");
        assert_eq!(step.time_limit, Some(20));

        let untimed: ScenarioStep =
            serde_json::from_str(r#"{"id":"x","phase":"Act","prompt":"p","options":[]}"#)
                .expect("untimed step parses");
        assert_eq!(untimed.time_limit, None);
        let encoded = serde_json::to_value(&untimed).expect("encode");
        assert!(encoded.get("timeLimit").is_none());
    }

    #[test]
    fn difficulty_parse_is_case_insensitive() {
        assert_eq!(Difficulty::parse("advanced"), Some(Difficulty::Advanced));
        assert_eq!(Difficulty::parse("expert"), None);
    }
}
