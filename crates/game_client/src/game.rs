//! Game rules: levels, score decay and the four-tile layout of a round.

use std::time::Duration;

use rand::{seq::SliceRandom, Rng};

use crate::{images::DecodedImage, round::RoundResult};

pub const ROUND_BONUS: u32 = 200;
pub const DECAY_STEP: u32 = 10;
pub const DECAY_INTERVAL: Duration = Duration::from_millis(100);
pub const TILE_COUNT: usize = 4;

const IDLE_TITLE: &str = "Find or Lose";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Play,
    Stop,
}

/// Which round image a tile shows. `First` is the odd one out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSlot {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLayout {
    slots: [TileSlot; TILE_COUNT],
}

impl TileLayout {
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut slots = [
            TileSlot::First,
            TileSlot::Second,
            TileSlot::Second,
            TileSlot::Second,
        ];
        slots.shuffle(rng);
        Self { slots }
    }

    pub fn slots(&self) -> &[TileSlot; TILE_COUNT] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<TileSlot> {
        self.slots.get(index).copied()
    }

    pub fn odd_index(&self) -> usize {
        self.slots
            .iter()
            .position(|slot| *slot == TileSlot::First)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    /// The odd tile was picked; the session advanced a level and wants a new round.
    Correct,
    /// A repeated tile was picked; the session stopped.
    Wrong,
    Ignored,
}

struct PresentedRound {
    result: RoundResult,
    layout: TileLayout,
}

pub struct GameSession {
    state: GameState,
    level: u32,
    score: u32,
    presented: Option<PresentedRound>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSession {
    pub fn new() -> Self {
        Self {
            state: GameState::Stop,
            level: 0,
            score: 0,
            presented: None,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn layout(&self) -> Option<TileLayout> {
        self.presented.as_ref().map(|presented| presented.layout)
    }

    pub fn is_awaiting_round(&self) -> bool {
        self.state == GameState::Play && self.presented.is_none()
    }

    /// Starts the next level. The caller is expected to start a fetch round.
    pub fn play(&mut self) {
        self.state = GameState::Play;
        self.level += 1;
        self.score = self.score.saturating_add(ROUND_BONUS);
        self.presented = None;
    }

    pub fn stop(&mut self) {
        self.state = GameState::Stop;
        self.level = 0;
        self.score = 0;
        self.presented = None;
    }

    pub fn toggle(&mut self) -> GameState {
        match self.state {
            GameState::Play => self.stop(),
            GameState::Stop => self.play(),
        }
        self.state
    }

    /// Lays out `{first, second, second, second}` in random order.
    ///
    /// Returns false when the session is not waiting for a round.
    pub fn apply_round<R: Rng + ?Sized>(&mut self, result: RoundResult, rng: &mut R) -> bool {
        if !self.is_awaiting_round() {
            return false;
        }
        self.presented = Some(PresentedRound {
            result,
            layout: TileLayout::shuffled(rng),
        });
        true
    }

    /// One decay step. Returns whether the decay timer should keep running.
    pub fn tick(&mut self) -> bool {
        if self.state != GameState::Play || self.presented.is_none() {
            return false;
        }
        self.score = self.score.saturating_sub(DECAY_STEP);
        self.score > 0
    }

    pub fn guess(&mut self, index: usize) -> GuessOutcome {
        if self.state != GameState::Play {
            return GuessOutcome::Ignored;
        }
        let Some(slot) = self.layout().and_then(|layout| layout.slot(index)) else {
            return GuessOutcome::Ignored;
        };

        match slot {
            TileSlot::First => {
                self.play();
                GuessOutcome::Correct
            }
            TileSlot::Second => {
                self.stop();
                GuessOutcome::Wrong
            }
        }
    }

    /// Images in tile order, once a round has been applied.
    pub fn tiles(&self) -> Option<Vec<&DecodedImage>> {
        let presented = self.presented.as_ref()?;
        Some(
            presented
                .layout
                .slots()
                .iter()
                .map(|slot| match slot {
                    TileSlot::First => &presented.result.first,
                    TileSlot::Second => &presented.result.second,
                })
                .collect(),
        )
    }

    pub fn title(&self) -> String {
        match self.state {
            GameState::Play => format!("Level: {}", self.level),
            GameState::Stop => IDLE_TITLE.to_string(),
        }
    }

    pub fn score_label(&self) -> String {
        format!("Score: {}", self.score)
    }
}
