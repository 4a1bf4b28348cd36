//! Scenario playback state machine.
//!
//! Playback walks the steps of one scenario forward only. Each step accepts
//! exactly one option; advancing requires that selection and either enters
//! the next step or finishes playback. A timed step counts down once per tick
//! and stops at zero without selecting or advancing on its own.

use std::fmt;
use std::sync::Arc;

use contracts::{
    ChoicePayload, LogEvent, Phase, Scenario, ScenarioOption, ScenarioStep, StatusPayload,
    MAX_OPTION_SCORE,
};
use serde_json::json;
use tracing::debug;

use crate::clock::{Countdown, Ticker};
use crate::Services;

/// Remaining seconds at or below which the timer is shown as urgent.
pub const URGENT_REMAINING_SECS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackError {
    AlreadySelected,
    NoSelection,
    UnknownOption(usize),
    Finished,
    /// No scenario is open on the current screen.
    Inactive,
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySelected => f.write_str("an option is already selected for this step"),
            Self::NoSelection => f.write_str("select an option before advancing"),
            Self::UnknownOption(index) => write!(f, "no option at index {index}"),
            Self::Finished => f.write_str("playback has finished"),
            Self::Inactive => f.write_str("no scenario is being played"),
        }
    }
}

impl std::error::Error for PlaybackError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Step(usize),
    Finished,
}

/// Snapshot of the active step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    pub step_index: usize,
    pub selected: Option<usize>,
    pub remaining: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreCard {
    pub cumulative: u32,
    pub max: u32,
    /// `cumulative / max` as a rounded percentage.
    pub percent: u32,
}

impl ScoreCard {
    fn new(cumulative: u32, max: u32) -> Self {
        let percent = if max == 0 {
            0
        } else {
            // Round half up, matching Math.round for non-negative values.
            let (cumulative, max) = (u64::from(cumulative), u64::from(max));
            let rounded = (cumulative * 200 + max) / (2 * max);
            u32::try_from(rounded).unwrap_or(u32::MAX)
        };
        Self {
            cumulative,
            max,
            percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Step(usize),
    Finished(ScoreCard),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub text: String,
    pub selected: bool,
}

/// Everything a screen needs to draw the active step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub title: String,
    pub summary: String,
    /// One-based position of the step.
    pub position: usize,
    pub step_count: usize,
    pub phase: Phase,
    pub prompt: String,
    pub remaining: Option<u32>,
    pub urgent: bool,
    pub options: Vec<OptionView>,
    pub feedback: Option<String>,
    pub step_score: Option<u32>,
    pub percent: u32,
    pub can_advance: bool,
    pub advance_label: &'static str,
}

pub struct ScenarioPlayer {
    scenario: Arc<Scenario>,
    cursor: Cursor,
    selections: Vec<Option<usize>>,
    countdown: Countdown,
    ticker: Box<dyn Ticker>,
    services: Services,
}

impl ScenarioPlayer {
    pub fn start(scenario: Arc<Scenario>, services: &Services) -> Self {
        let ticker = services.ticker();
        Self::with_ticker(scenario, services, ticker)
    }

    pub fn with_ticker(
        scenario: Arc<Scenario>,
        services: &Services,
        mut ticker: Box<dyn Ticker>,
    ) -> Self {
        let (cursor, countdown) = match scenario.steps.first() {
            Some(first) => (Cursor::Step(0), Countdown::new(first.time_limit)),
            None => (Cursor::Finished, Countdown::default()),
        };
        ticker.reset();
        debug!(scenario_id = %scenario.id, steps = scenario.steps.len(), "playback started");

        Self {
            selections: vec![None; scenario.steps.len()],
            scenario,
            cursor,
            countdown,
            ticker,
            services: services.clone(),
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn is_finished(&self) -> bool {
        self.cursor == Cursor::Finished
    }

    pub fn step_index(&self) -> Option<usize> {
        match self.cursor {
            Cursor::Step(index) => Some(index),
            Cursor::Finished => None,
        }
    }

    pub fn current_step(&self) -> Option<&ScenarioStep> {
        self.step_index().and_then(|index| self.scenario.steps.get(index))
    }

    pub fn state(&self) -> Option<PlaybackState> {
        self.step_index().map(|step_index| PlaybackState {
            step_index,
            selected: self.selections[step_index],
            remaining: self.countdown.remaining(),
        })
    }

    pub fn selected_option(&self) -> Option<&ScenarioOption> {
        let index = self.step_index()?;
        let chosen = self.selections[index]?;
        self.scenario.steps[index].options.get(chosen)
    }

    pub fn remaining(&self) -> Option<u32> {
        self.step_index().and(self.countdown.remaining())
    }

    pub fn can_select(&self) -> bool {
        matches!(self.cursor, Cursor::Step(index) if self.selections[index].is_none())
    }

    pub fn can_advance(&self) -> bool {
        matches!(self.cursor, Cursor::Step(index) if self.selections[index].is_some())
    }

    /// Record the choice for the current step and log it. A step keeps its
    /// first choice; later calls are rejected without changing anything.
    pub fn select_option(&mut self, option_index: usize) -> Result<&ScenarioOption, PlaybackError> {
        let Cursor::Step(step_index) = self.cursor else {
            return Err(PlaybackError::Finished);
        };
        if self.selections[step_index].is_some() {
            return Err(PlaybackError::AlreadySelected);
        }

        let step = &self.scenario.steps[step_index];
        let option = step
            .options
            .get(option_index)
            .ok_or(PlaybackError::UnknownOption(option_index))?;

        self.selections[step_index] = Some(option_index);
        self.services.log.append(&LogEvent::choice(
            self.services.now_ms(),
            ChoicePayload {
                scenario_id: self.scenario.id.clone(),
                step_id: step.id.clone(),
                option: option.clone(),
            },
        ));
        debug!(
            scenario_id = %self.scenario.id,
            step_id = %step.id,
            score = option.score,
            "option selected"
        );

        Ok(option)
    }

    pub fn select_option_by_text(&mut self, text: &str) -> Result<&ScenarioOption, PlaybackError> {
        let step = self.current_step().ok_or(PlaybackError::Finished)?;
        let index = step
            .option_index_by_text(text)
            .ok_or(PlaybackError::UnknownOption(step.options.len()))?;
        self.select_option(index)
    }

    /// Move past the current step once it has a selection.
    pub fn advance(&mut self) -> Result<Advance, PlaybackError> {
        let Cursor::Step(step_index) = self.cursor else {
            return Err(PlaybackError::Finished);
        };
        if self.selections[step_index].is_none() {
            return Err(PlaybackError::NoSelection);
        }

        let next = step_index + 1;
        if let Some(step) = self.scenario.steps.get(next) {
            self.cursor = Cursor::Step(next);
            self.countdown = Countdown::new(step.time_limit);
            self.ticker.reset();
            debug!(scenario_id = %self.scenario.id, step_id = %step.id, "step entered");
            return Ok(Advance::Step(next));
        }

        self.cursor = Cursor::Finished;
        self.countdown = Countdown::default();
        let card = self.score();
        self.services.log.append(&LogEvent::status(
            self.services.now_ms(),
            StatusPayload {
                status: "scenario_completed".to_string(),
                scenario_id: Some(self.scenario.id.clone()),
                detail: Some(json!({
                    "score": card.cumulative,
                    "max": card.max,
                    "percent": card.percent,
                })),
            },
        ));
        debug!(scenario_id = %self.scenario.id, percent = card.percent, "playback finished");
        Ok(Advance::Finished(card))
    }

    /// Apply one countdown tick. Returns true when the remaining time changed.
    pub fn tick(&mut self) -> bool {
        !self.is_finished() && self.countdown.tick()
    }

    /// Apply every tick the ticker has accumulated since the last call.
    pub fn pump(&mut self) -> u32 {
        let ticks = self.ticker.poll();
        if self.is_finished() {
            return 0;
        }
        self.countdown.tick_n(ticks)
    }

    /// Score over the steps reached so far, counting only answered steps.
    pub fn score(&self) -> ScoreCard {
        let reached = match self.cursor {
            Cursor::Step(index) => index + 1,
            Cursor::Finished => self.scenario.steps.len(),
        };

        let cumulative = self.selections[..reached]
            .iter()
            .zip(&self.scenario.steps)
            .filter_map(|(choice, step)| choice.and_then(|idx| step.options.get(idx)))
            .map(|option| option.score)
            .sum();

        let max = u32::try_from(reached)
            .unwrap_or(u32::MAX)
            .saturating_mul(MAX_OPTION_SCORE);
        ScoreCard::new(cumulative, max)
    }

    pub fn view(&self) -> Option<StepView> {
        let step_index = self.step_index()?;
        let step = &self.scenario.steps[step_index];
        let selected = self.selections[step_index];
        let chosen = selected.and_then(|idx| step.options.get(idx));
        let remaining = self.countdown.remaining();
        let last = step_index + 1 == self.scenario.steps.len();

        Some(StepView {
            title: self.scenario.title.clone(),
            summary: self.scenario.summary.clone(),
            position: step_index + 1,
            step_count: self.scenario.steps.len(),
            phase: step.phase,
            prompt: step.prompt.clone(),
            remaining,
            urgent: remaining.is_some_and(|left| left <= URGENT_REMAINING_SECS),
            options: step
                .options
                .iter()
                .enumerate()
                .map(|(idx, option)| OptionView {
                    text: option.text.clone(),
                    selected: selected == Some(idx),
                })
                .collect(),
            feedback: chosen.map(|option| option.feedback.clone()),
            step_score: chosen.map(|option| option.score),
            percent: self.score().percent,
            can_advance: chosen.is_some(),
            advance_label: if last { "Finish" } else { "Next step" },
        })
    }
}

impl fmt::Debug for ScenarioPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioPlayer")
            .field("scenario_id", &self.scenario.id)
            .field("cursor", &self.cursor)
            .field("selections", &self.selections)
            .field("countdown", &self.countdown)
            .finish_non_exhaustive()
    }
}
