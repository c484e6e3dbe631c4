//! Glue between stdin commands, round events, and the game session.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use game_client::{
    GameSession, GameState, GuessOutcome, RoundEvent, RoundId, RoundOrchestrator,
};

use crate::commands::{Command, HELP};

pub struct GameController {
    session: GameSession,
    rounds: RoundOrchestrator,
    /// Round whose events are still wanted. Anything else in the channel is stale.
    current_round: Option<RoundId>,
    out_dir: PathBuf,
    decay_running: bool,
}

impl GameController {
    pub fn new(rounds: RoundOrchestrator, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            session: GameSession::new(),
            rounds,
            current_round: None,
            out_dir: out_dir.into(),
            decay_running: false,
        }
    }

    pub fn decay_running(&self) -> bool {
        self.decay_running
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Returns false once the player asked to quit.
    pub fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::TogglePlay => match self.session.toggle() {
                GameState::Play => self.begin_level(),
                GameState::Stop => self.end_game("Stopped."),
            },
            Command::Pick(index) => match self.session.guess(index) {
                GuessOutcome::Correct => {
                    println!("Found it!");
                    self.begin_level();
                }
                GuessOutcome::Wrong => self.end_game("Wrong tile, game over."),
                GuessOutcome::Ignored => println!("Nothing to pick right now. {HELP}"),
            },
            Command::Status => self.print_status(),
            Command::Help => println!("{HELP}"),
            Command::Quit => {
                self.rounds.cancel_round();
                self.current_round = None;
                return false;
            }
        }
        true
    }

    pub async fn handle_round_event(&mut self, event: RoundEvent) -> Result<()> {
        let round_id = match &event {
            RoundEvent::Succeeded { round_id, .. } | RoundEvent::Failed { round_id, .. } => {
                *round_id
            }
        };
        if self.current_round != Some(round_id) {
            tracing::debug!(%round_id, "dropping event from superseded round");
            return Ok(());
        }
        self.current_round = None;

        match event {
            RoundEvent::Succeeded { round_id, result } => {
                if !self.session.apply_round(result, &mut rand::rng()) {
                    tracing::debug!(%round_id, "ignoring round that arrived after stop");
                    return Ok(());
                }
                let paths = self.export_tiles().await?;
                self.decay_running = true;
                println!("{} | {}", self.session.title(), self.session.score_label());
                for (index, path) in paths.iter().enumerate() {
                    println!("  tile {}: {}", index + 1, path.display());
                }
                println!("Which tile is the odd one out?");
            }
            RoundEvent::Failed { round_id, error } => {
                tracing::error!(%round_id, code = error.code(), "round failed: {error}");
                self.end_game(&format!("Error: {error}"));
            }
        }
        Ok(())
    }

    pub fn tick(&mut self) {
        if !self.session.tick() {
            self.decay_running = false;
            if self.session.state() == GameState::Play {
                println!("{} (time is up, pick anyway)", self.session.score_label());
            }
        }
    }

    fn begin_level(&mut self) {
        self.decay_running = false;
        let round_id = self.rounds.start_round();
        self.current_round = Some(round_id);
        tracing::debug!(%round_id, level = self.session.level(), "requested round");
        println!(
            "{} | {} | loading images...",
            self.session.title(),
            self.session.score_label()
        );
    }

    fn end_game(&mut self, reason: &str) {
        self.rounds.cancel_round();
        self.current_round = None;
        self.session.stop();
        self.decay_running = false;
        println!("{reason} {} | {}", self.session.title(), self.session.score_label());
    }

    fn print_status(&self) {
        println!(
            "{} | {} | round: {:?}",
            self.session.title(),
            self.session.score_label(),
            self.rounds.state()
        );
    }

    async fn export_tiles(&self) -> Result<Vec<PathBuf>> {
        let Some(tiles) = self.session.tiles() else {
            return Ok(Vec::new());
        };

        let mut paths = Vec::with_capacity(tiles.len());
        for (index, tile) in tiles.into_iter().enumerate() {
            let png = tile
                .encode_png()
                .with_context(|| format!("failed to encode tile {}", index + 1))?;
            let path = tile_path(&self.out_dir, index);
            tokio::fs::write(&path, png)
                .await
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            paths.push(path);
        }
        Ok(paths)
    }
}

fn tile_path(out_dir: &Path, index: usize) -> PathBuf {
    out_dir.join(format!("tile_{}.png", index + 1))
}
