//! Scenario catalog: read-only registry of scenario definitions.
//!
//! The catalog is built once at startup and never mutated afterwards. Lookups
//! by id return `None` for unknown ids; views treat that as "nothing to show".

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use contracts::{Difficulty, Scenario, MAX_OPTION_SCORE};

use crate::scenarios::builtin_scenarios;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    DuplicateScenario(String),
    Invalid { scenario_id: String, issues: Vec<String> },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateScenario(id) => write!(f, "duplicate scenario id: {id}"),
            Self::Invalid {
                scenario_id,
                issues,
            } => write!(f, "invalid scenario {scenario_id}: {}", issues.join("; ")),
        }
    }
}

impl std::error::Error for CatalogError {}

#[derive(Debug, Default)]
pub struct ScenarioCatalog {
    scenarios: Vec<Arc<Scenario>>,
    by_id: BTreeMap<String, usize>,
}

impl ScenarioCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the scenarios shipped with the trainer.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for scenario in builtin_scenarios() {
            catalog.register(scenario);
        }
        catalog
    }

    pub fn from_scenarios(scenarios: Vec<Scenario>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for scenario in scenarios {
            catalog.try_register(scenario)?;
        }
        Ok(catalog)
    }

    /// Register a scenario definition. Panics on a duplicate or malformed one.
    pub fn register(&mut self, scenario: Scenario) {
        if let Err(err) = self.try_register(scenario) {
            panic!("{err}");
        }
    }

    pub fn try_register(&mut self, scenario: Scenario) -> Result<(), CatalogError> {
        if self.by_id.contains_key(&scenario.id) {
            return Err(CatalogError::DuplicateScenario(scenario.id));
        }

        let issues = validate_scenario(&scenario);
        if !issues.is_empty() {
            return Err(CatalogError::Invalid {
                scenario_id: scenario.id,
                issues,
            });
        }

        self.by_id.insert(scenario.id.clone(), self.scenarios.len());
        self.scenarios.push(Arc::new(scenario));
        Ok(())
    }

    /// All scenarios in registration order.
    pub fn scenarios(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter().map(|scenario| scenario.as_ref())
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn get(&self, scenario_id: &str) -> Option<&Scenario> {
        self.by_id
            .get(scenario_id)
            .map(|&idx| self.scenarios[idx].as_ref())
    }

    /// Shared handle for a player that outlives the borrow of the catalog.
    pub fn shared(&self, scenario_id: &str) -> Option<Arc<Scenario>> {
        self.by_id
            .get(scenario_id)
            .map(|&idx| self.scenarios[idx].clone())
    }

    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Scenario> + 'a {
        self.scenarios().filter(move |scenario| scenario.has_tag(tag))
    }

    pub fn with_difficulty(&self, difficulty: Difficulty) -> impl Iterator<Item = &Scenario> {
        self.scenarios()
            .filter(move |scenario| scenario.difficulty == difficulty)
    }

    /// Every distinct tag, sorted.
    pub fn tags(&self) -> Vec<&str> {
        self.scenarios
            .iter()
            .flat_map(|scenario| scenario.tags.iter().map(String::as_str))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Structural problems with a scenario definition; empty when it is usable.
pub fn validate_scenario(scenario: &Scenario) -> Vec<String> {
    let mut issues = Vec::new();

    if scenario.id.trim().is_empty() {
        issues.push("empty scenario id".to_string());
    }
    if scenario.steps.is_empty() {
        issues.push("scenario has no steps".to_string());
    }

    let mut tags = BTreeSet::new();
    for tag in &scenario.tags {
        if !tags.insert(tag.to_ascii_lowercase()) {
            issues.push(format!("duplicate tag {tag}"));
        }
    }

    let mut step_ids = BTreeSet::new();
    for step in &scenario.steps {
        if !step_ids.insert(step.id.as_str()) {
            issues.push(format!("duplicate step id {}", step.id));
        }
        if step.options.is_empty() {
            issues.push(format!("step {} has no options", step.id));
        }

        let mut texts = BTreeSet::new();
        for option in &step.options {
            if !texts.insert(option.text.as_str()) {
                issues.push(format!("step {} repeats option text {:?}", step.id, option.text));
            }
            if option.score > MAX_OPTION_SCORE {
                issues.push(format!(
                    "step {} option {:?} scores {} (max {MAX_OPTION_SCORE})",
                    step.id, option.text, option.score
                ));
            }
        }
    }

    issues
}
