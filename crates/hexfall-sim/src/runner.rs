//! Match runner: one session played out by bots.

use hexfall_core::{
    Bot, BotDifficulty, GameAction, GameConfig, GameError, GameEvent, GameState, PlayerId,
    SetupError,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::summary::MatchSummary;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("could not start match: {0}")]
    Setup(#[from] SetupError),

    #[error("bot {player} has no valid action")]
    Stuck { player: PlayerId },

    #[error("bot {player} chose {action:?}: {source}")]
    InvalidAction {
        player: PlayerId,
        action: GameAction,
        #[source]
        source: GameError,
    },
}

/// A session plus one bot per seat.
pub struct MatchRunner {
    game: GameState,
    bots: Vec<Bot>,
    /// Main turns after which the match is abandoned
    max_turns: u32,
    actions: u64,
    disasters: u32,
}

impl MatchRunner {
    pub fn new(
        config: GameConfig,
        difficulty: BotDifficulty,
        max_turns: u32,
    ) -> Result<Self, RunnerError> {
        let game = GameState::new(config)?;
        let seed = game.seed();
        let bots = game
            .players
            .iter()
            .map(|p| Bot::with_seed(p.id, difficulty, seed.wrapping_add(u64::from(p.id))))
            .collect();

        Ok(Self {
            game,
            bots,
            max_turns,
            actions: 0,
            disasters: 0,
        })
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// Drain a pending rollout, or let the current bot act once
    pub fn step(&mut self) -> Result<Vec<GameEvent>, RunnerError> {
        let events = if self.game.is_phase_complete() {
            let player = self.game.current_player;
            let bot = &mut self.bots[usize::from(player) - 1];
            let action = bot.choose_action(&self.game).ok_or(RunnerError::Stuck { player })?;
            self.actions += 1;
            self.game
                .apply_action(player, action)
                .map_err(|source| RunnerError::InvalidAction { player, action, source })?
        } else {
            self.game.run_pending_steps()
        };

        for event in &events {
            match event {
                GameEvent::DisasterStarted { name, tiles, .. } => {
                    self.disasters += 1;
                    info!(
                        turn = self.game.turn_number,
                        disaster = %name,
                        tiles = tiles.len(),
                        "disaster"
                    );
                }
                GameEvent::GameWon { player, score } => {
                    info!(player, score, turn = self.game.turn_number, "winner");
                }
                other => debug!(event = ?other),
            }
        }
        Ok(events)
    }

    /// Play until someone wins or the turn limit is hit
    pub fn run(mut self) -> Result<MatchSummary, RunnerError> {
        while !self.game.is_finished() {
            if self.game.turn_number > self.max_turns {
                warn!(turns = self.max_turns, "turn limit reached, abandoning match");
                self.game.abandon();
                break;
            }
            self.step()?;
        }
        Ok(MatchSummary::from_game(&self.game, self.actions, self.disasters))
    }
}
