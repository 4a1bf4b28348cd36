//! Scenario library: a filterable list of the catalog, and a player for the
//! entry the trainee opened.

use std::sync::Arc;

use contracts::{Difficulty, Scenario};
use tracing::{debug, warn};

use crate::catalog::ScenarioCatalog;
use crate::player::ScenarioPlayer;
use crate::Services;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryFilter {
    /// Case-insensitive tag match.
    pub tag: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl LibraryFilter {
    pub fn matches(&self, scenario: &Scenario) -> bool {
        let tag_ok = self.tag.as_deref().map_or(true, |tag| scenario.has_tag(tag));
        let level_ok = self
            .difficulty
            .map_or(true, |difficulty| scenario.difficulty == difficulty);
        tag_ok && level_ok
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_none() && self.difficulty.is_none()
    }
}

/// One row of the library list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub step_count: usize,
}

impl From<&Scenario> for LibraryEntry {
    fn from(scenario: &Scenario) -> Self {
        Self {
            id: scenario.id.clone(),
            title: scenario.title.clone(),
            summary: scenario.summary.clone(),
            difficulty: scenario.difficulty,
            tags: scenario.tags.clone(),
            step_count: scenario.step_count(),
        }
    }
}

pub struct LibraryView {
    catalog: Arc<ScenarioCatalog>,
    filter: LibraryFilter,
    player: Option<ScenarioPlayer>,
    services: Services,
}

impl LibraryView {
    pub fn new(catalog: Arc<ScenarioCatalog>, services: &Services) -> Self {
        Self {
            catalog,
            filter: LibraryFilter::default(),
            player: None,
            services: services.clone(),
        }
    }

    pub fn filter(&self) -> &LibraryFilter {
        &self.filter
    }

    pub fn set_tag(&mut self, tag: Option<&str>) {
        self.filter.tag = tag
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string);
    }

    pub fn set_difficulty(&mut self, difficulty: Option<Difficulty>) {
        self.filter.difficulty = difficulty;
    }

    pub fn clear_filter(&mut self) {
        self.filter = LibraryFilter::default();
    }

    /// Catalog entries passing the filter, in catalog order.
    pub fn entries(&self) -> Vec<LibraryEntry> {
        self.catalog
            .scenarios()
            .filter(|scenario| self.filter.matches(scenario))
            .map(LibraryEntry::from)
            .collect()
    }

    pub fn tags(&self) -> Vec<&str> {
        self.catalog.tags()
    }

    /// Start playing `scenario_id`, replacing any player already open.
    /// Returns false for an unknown id.
    pub fn open(&mut self, scenario_id: &str) -> bool {
        let Some(scenario) = self.catalog.shared(scenario_id) else {
            warn!(scenario_id, "library entry not found");
            return false;
        };
        debug!(scenario_id, "library scenario opened");
        self.player = Some(ScenarioPlayer::start(scenario, &self.services));
        true
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_some()
    }

    pub fn player(&self) -> Option<&ScenarioPlayer> {
        self.player.as_ref()
    }

    pub fn player_mut(&mut self) -> Option<&mut ScenarioPlayer> {
        self.player.as_mut()
    }

    /// Back to the list. Returns true when a player was open.
    pub fn close_player(&mut self) -> bool {
        self.player.take().is_some()
    }
}

impl std::fmt::Debug for LibraryView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryView")
            .field("filter", &self.filter)
            .field("player", &self.player)
            .finish_non_exhaustive()
    }
}
