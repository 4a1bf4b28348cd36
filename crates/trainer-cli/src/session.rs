//! Line-oriented driver for a set of tabs sharing one app.

use std::fmt::Write;

use contracts::{Difficulty, Role};
use tracing::debug;
use trainer_api::TrainerApp;
use trainer_core::{Advance, Mode, Shell, TabId};

use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    app: TrainerApp,
    tabs: Vec<Shell>,
    active: usize,
}

impl Session {
    pub fn new(app: TrainerApp) -> Self {
        let first = app.open_tab();
        Self {
            app,
            tabs: vec![first],
            active: 0,
        }
    }

    pub fn app(&self) -> &TrainerApp {
        &self.app
    }

    pub fn active(&self) -> &Shell {
        &self.tabs[self.active]
    }

    pub fn render_active(&self) -> String {
        render::screen(self.active())
    }

    /// Open another tab on the same app and switch to it.
    pub fn open_tab(&mut self, tab: Option<TabId>) -> usize {
        let shell = match tab {
            Some(tab) => self.app.open_tab_as(tab),
            None => self.app.open_tab(),
        };
        self.tabs.push(shell);
        self.active = self.tabs.len() - 1;
        debug!(tab = %self.tabs[self.active].tab(), count = self.tabs.len(), "tab opened");
        self.active
    }

    /// Poll every tab. Returns text worth showing for the active tab.
    pub fn tick(&mut self) -> Option<String> {
        let mut active_changed = false;
        for (idx, shell) in self.tabs.iter_mut().enumerate() {
            let changed = shell.poll();
            if idx == self.active {
                active_changed = changed;
            }
        }
        if !active_changed {
            return None;
        }

        let shell = self.active();
        if shell.team().is_some() {
            return Some(self.render_active());
        }
        let view = shell.player()?.view()?;
        let remaining = view.remaining?;
        (view.urgent || remaining == 0).then(|| render::timer(remaining, view.urgent))
    }

    pub fn handle(&mut self, line: &str) -> (Flow, String) {
        let line = line.trim();
        if line.is_empty() {
            return (Flow::Continue, self.render_active());
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let output = match word.to_ascii_lowercase().as_str() {
            "quit" | "exit" => return (Flow::Quit, "bye".to_string()),
            "help" | "?" => help(self.active().mode()),
            "show" => self.render_active(),
            "tabs" => self.list_tabs(),
            "tab" => self.switch_tab(rest),
            "role" => self.set_role(rest),
            "back" => {
                self.tabs[self.active].back();
                self.render_active()
            }
            other => self.mode_command(other, rest),
        };
        (Flow::Continue, output)
    }

    fn mode_command(&mut self, word: &str, rest: &str) -> String {
        let shell = &mut self.tabs[self.active];
        match shell.mode() {
            Mode::Menu => enter_from_menu(shell, word),
            _ if shell.player().is_some() => player_command(shell, word),
            Mode::Team => team_command(shell, word, rest),
            Mode::Library => library_command(shell, word, rest),
            Mode::Review => review_command(shell, word),
            Mode::Solo => unknown(word),
        }
    }

    fn list_tabs(&self) -> String {
        let mut out = String::new();
        for (idx, shell) in self.tabs.iter().enumerate() {
            let mark = if idx == self.active { "*" } else { " " };
            let _ = writeln!(
                out,
                "{mark} {}: tab {} [{}] as {}",
                idx + 1,
                shell.tab(),
                shell.mode(),
                shell.role()
            );
        }
        out.push_str("`tab new` opens another tab, `tab N` switches");
        out
    }

    fn switch_tab(&mut self, rest: &str) -> String {
        if rest.eq_ignore_ascii_case("new") {
            let idx = self.open_tab(None);
            return format!("opened tab {}\n{}", idx + 1, self.render_active());
        }
        match rest.parse::<usize>() {
            Ok(n) if (1..=self.tabs.len()).contains(&n) => {
                self.active = n - 1;
                self.render_active()
            }
            _ => format!("no tab {rest:?}; there are {} tabs", self.tabs.len()),
        }
    }

    fn set_role(&mut self, rest: &str) -> String {
        match Role::parse(rest) {
            Some(role) => {
                self.tabs[self.active].set_role(role);
                format!("role set to {role}")
            }
            None => {
                let names: Vec<&str> = Role::ALL.iter().map(|role| role.as_str()).collect();
                format!("unknown role {rest:?}; choose one of {}", names.join(", "))
            }
        }
    }
}

fn enter_from_menu(shell: &mut Shell, word: &str) -> String {
    let mode = word
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| Shell::menu().get(idx))
        .map(|item| item.mode)
        .or_else(|| Mode::parse(word));

    match mode {
        Some(mode) if mode != Mode::Menu => {
            shell.enter(mode);
            render::screen(shell)
        }
        _ => unknown(word),
    }
}

fn player_command(shell: &mut Shell, word: &str) -> String {
    if word == "next" || word == "n" {
        return match shell.advance() {
            Ok(Advance::Step(_)) => render::screen(shell),
            Ok(Advance::Finished(card)) => {
                format!("{}\n\n{}", render::finished(&card), render::screen(shell))
            }
            Err(err) => err.to_string(),
        };
    }

    let Some(index) = word.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) else {
        return unknown(word);
    };
    if let Err(err) = shell.select_option(index) {
        return err.to_string();
    }
    render::screen(shell)
}

fn team_command(shell: &mut Shell, word: &str, rest: &str) -> String {
    let Some(team) = shell.team_mut() else {
        return unknown(word);
    };
    match word {
        "marker" | "m" => {
            let coords: Result<Vec<f64>, _> =
                rest.split_whitespace().map(str::parse::<f64>).collect();
            let Ok(&[x, y]) = coords.as_deref() else {
                return "usage: marker X Y (percent, 0-100)".to_string();
            };
            if team.drop_marker(x, y).is_none() {
                return "coordinates must be numbers".to_string();
            }
        }
        "say" => {
            if team.send_chat(rest).is_none() {
                return "nothing to send".to_string();
            }
        }
        _ => return unknown(word),
    }
    render::screen(shell)
}

fn library_command(shell: &mut Shell, word: &str, rest: &str) -> String {
    let Some(library) = shell.library_mut() else {
        return unknown(word);
    };
    match word {
        "list" => {}
        "tag" => library.set_tag(Some(rest)),
        "level" => {
            if rest.is_empty() {
                library.set_difficulty(None);
            } else {
                match Difficulty::parse(rest) {
                    Some(difficulty) => library.set_difficulty(Some(difficulty)),
                    None => return format!("unknown level {rest:?}"),
                }
            }
        }
        "clear-filter" => library.clear_filter(),
        "open" => {
            let by_index = rest
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|idx| library.entries().get(idx).map(|entry| entry.id.clone()));
            let scenario_id = by_index.unwrap_or_else(|| rest.to_string());
            if !library.open(&scenario_id) {
                return format!("no scenario {scenario_id:?}");
            }
        }
        _ => return unknown(word),
    }
    render::screen(shell)
}

fn review_command(shell: &mut Shell, word: &str) -> String {
    let Some(review) = shell.review_mut() else {
        return unknown(word);
    };
    match word {
        "refresh" => review.refresh(),
        "clear" => review.clear(),
        _ => return unknown(word),
    }
    render::screen(shell)
}

fn unknown(word: &str) -> String {
    format!("unknown command {word:?}; type `help`")
}

fn help(mode: Mode) -> String {
    let specific = match mode {
        Mode::Menu => "1-4 or solo|team|library|review  open a mode",
        Mode::Solo => "N  choose option N; next  advance",
        Mode::Team => "marker X Y  drop a marker; say TEXT  send chat",
        Mode::Library => {
            "list; open N|ID; tag T; level L; clear-filter; in a scenario: N, next"
        }
        Mode::Review => "refresh  re-read the log; clear  delete all events",
    };
    format!(
        "{specific}\nshow  redraw; back  leave screen; role NAME; tabs; tab new|N; quit"
    )
}
