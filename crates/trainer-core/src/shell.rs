//! Presentation shell of one tab: a menu and four self-contained screens.
//!
//! Entering a screen builds its view; leaving tears it down, which drops the
//! countdown ticker and the channel subscription with it. Every screen exits
//! back to the menu, except a player opened from the library, which returns to
//! the library list first.

use std::fmt;
use std::sync::Arc;

use contracts::{Role, ScenarioOption, TrainerConfig};
use tracing::{debug, warn};

use crate::broadcast::TabId;
use crate::catalog::ScenarioCatalog;
use crate::library::LibraryView;
use crate::player::{Advance, PlaybackError, ScenarioPlayer};
use crate::review::ReviewView;
use crate::team::TeamSession;
use crate::Services;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Menu,
    Solo,
    Team,
    Library,
    Review,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Solo => "solo",
            Self::Team => "team",
            Self::Library => "library",
            Self::Review => "review",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "menu" => Some(Self::Menu),
            "solo" => Some(Self::Solo),
            "team" => Some(Self::Team),
            "library" | "scenario" => Some(Self::Library),
            "review" | "aar" => Some(Self::Review),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub mode: Mode,
    pub title: &'static str,
    pub blurb: &'static str,
    pub action: &'static str,
}

pub const MENU: [MenuItem; 4] = [
    MenuItem {
        mode: Mode::Solo,
        title: "Solo Training",
        blurb: "Practice judgment and situational awareness in safe, scenario-based sessions.",
        action: "Start Solo",
    },
    MenuItem {
        mode: Mode::Team,
        title: "Team Coordination",
        blurb: "Simulate team communication using shared board and role-based chat (multi-tab).",
        action: "Join Team Session",
    },
    MenuItem {
        mode: Mode::Library,
        title: "Scenario Library",
        blurb: "Browse and run decision scenarios including OODA-focused training.",
        action: "Open Library",
    },
    MenuItem {
        mode: Mode::Review,
        title: "After Action Review",
        blurb: "Review logs of choices, markers, and chat from recent sessions.",
        action: "Open AAR",
    },
];

enum Screen {
    Menu,
    /// `None` when the solo scenario is missing from the catalog.
    Solo(Option<ScenarioPlayer>),
    Team(TeamSession),
    Library(LibraryView),
    Review(ReviewView),
}

impl Screen {
    fn mode(&self) -> Mode {
        match self {
            Self::Menu => Mode::Menu,
            Self::Solo(_) => Mode::Solo,
            Self::Team(_) => Mode::Team,
            Self::Library(_) => Mode::Library,
            Self::Review(_) => Mode::Review,
        }
    }
}

pub struct Shell {
    services: Services,
    catalog: Arc<ScenarioCatalog>,
    tab: TabId,
    role: Role,
    topic: String,
    solo_scenario_id: String,
    screen: Screen,
}

impl Shell {
    pub fn new(
        services: Services,
        catalog: Arc<ScenarioCatalog>,
        tab: TabId,
        config: &TrainerConfig,
    ) -> Self {
        Self {
            services,
            catalog,
            tab,
            role: config.default_role,
            topic: config.channel_name.clone(),
            solo_scenario_id: config.solo_scenario_id.clone(),
            screen: Screen::Menu,
        }
    }

    pub fn menu() -> &'static [MenuItem] {
        &MENU
    }

    pub fn mode(&self) -> Mode {
        self.screen.mode()
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Role for this tab; also applies to an open team session.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
        if let Screen::Team(session) = &mut self.screen {
            session.set_role(role);
        }
    }

    /// Open `mode` from the menu. Returns false when another screen is open.
    pub fn enter(&mut self, mode: Mode) -> bool {
        if !matches!(self.screen, Screen::Menu) {
            warn!(current = %self.mode(), requested = %mode, "leave the current screen first");
            return false;
        }

        self.screen = match mode {
            Mode::Menu => Screen::Menu,
            Mode::Solo => {
                let player = self
                    .catalog
                    .shared(&self.solo_scenario_id)
                    .map(|scenario| ScenarioPlayer::start(scenario, &self.services));
                if player.is_none() {
                    warn!(scenario_id = %self.solo_scenario_id, "solo scenario not in catalog");
                }
                Screen::Solo(player)
            }
            Mode::Team => Screen::Team(TeamSession::join(
                &self.services,
                self.tab,
                self.topic.clone(),
                self.role,
            )),
            Mode::Library => {
                Screen::Library(LibraryView::new(self.catalog.clone(), &self.services))
            }
            Mode::Review => Screen::Review(ReviewView::open(self.services.log.clone())),
        };
        debug!(tab = %self.tab, mode = %mode, "screen entered");
        true
    }

    /// Leave the current screen and return the mode now shown.
    pub fn back(&mut self) -> Mode {
        if let Screen::Library(library) = &mut self.screen {
            if library.close_player() {
                return Mode::Library;
            }
        }

        let previous = std::mem::replace(&mut self.screen, Screen::Menu);
        if let Screen::Team(session) = previous {
            session.leave();
        }
        Mode::Menu
    }

    /// Drive the open screen: countdown ticks for a player, remote frames for
    /// a team session. Returns true when anything visible changed.
    pub fn poll(&mut self) -> bool {
        if let Screen::Team(session) = &mut self.screen {
            return session.pump() > 0;
        }
        self.player_mut().map_or(false, |player| player.pump() > 0)
    }

    /// The player on screen, whether opened by solo mode or the library.
    pub fn player(&self) -> Option<&ScenarioPlayer> {
        match &self.screen {
            Screen::Solo(player) => player.as_ref(),
            Screen::Library(library) => library.player(),
            _ => None,
        }
    }

    pub fn player_mut(&mut self) -> Option<&mut ScenarioPlayer> {
        match &mut self.screen {
            Screen::Solo(player) => player.as_mut(),
            Screen::Library(library) => library.player_mut(),
            _ => None,
        }
    }

    pub fn select_option(&mut self, option_index: usize) -> Result<&ScenarioOption, PlaybackError> {
        self.player_mut()
            .ok_or(PlaybackError::Inactive)?
            .select_option(option_index)
    }

    /// Advance the player on screen. Finishing closes it: solo returns to the
    /// menu, a library player returns to the list.
    pub fn advance(&mut self) -> Result<Advance, PlaybackError> {
        let outcome = self
            .player_mut()
            .ok_or(PlaybackError::Inactive)?
            .advance()?;

        if let Advance::Finished(card) = outcome {
            debug!(tab = %self.tab, percent = card.percent, "scenario finished, leaving player");
            if let Screen::Library(library) = &mut self.screen {
                library.close_player();
            } else {
                self.screen = Screen::Menu;
            }
        }
        Ok(outcome)
    }

    pub fn team(&self) -> Option<&TeamSession> {
        match &self.screen {
            Screen::Team(session) => Some(session),
            _ => None,
        }
    }

    pub fn team_mut(&mut self) -> Option<&mut TeamSession> {
        match &mut self.screen {
            Screen::Team(session) => Some(session),
            _ => None,
        }
    }

    pub fn library(&self) -> Option<&LibraryView> {
        match &self.screen {
            Screen::Library(library) => Some(library),
            _ => None,
        }
    }

    pub fn library_mut(&mut self) -> Option<&mut LibraryView> {
        match &mut self.screen {
            Screen::Library(library) => Some(library),
            _ => None,
        }
    }

    pub fn review(&self) -> Option<&ReviewView> {
        match &self.screen {
            Screen::Review(review) => Some(review),
            _ => None,
        }
    }

    pub fn review_mut(&mut self) -> Option<&mut ReviewView> {
        match &mut self.screen {
            Screen::Review(review) => Some(review),
            _ => None,
        }
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("tab", &self.tab)
            .field("mode", &self.mode())
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
