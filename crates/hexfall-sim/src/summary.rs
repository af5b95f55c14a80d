//! Match results as written to stdout.

use hexfall_core::{GameState, PlayerId};
use serde::{Deserialize, Serialize};

/// How a match ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Won { winner: PlayerId, name: String },
    TurnLimit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub settlements: usize,
    pub towns: usize,
    pub resources: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    pub seed: u64,
    pub turns: u32,
    pub actions: u64,
    pub disasters: u32,
    pub outcome: Outcome,
    pub players: Vec<PlayerSummary>,
}

impl MatchSummary {
    pub fn from_game(game: &GameState, actions: u64, disasters: u32) -> Self {
        let outcome = match game.get_winner().and_then(|id| game.get_player(id)) {
            Some(p) => Outcome::Won {
                winner: p.id,
                name: p.name.clone(),
            },
            None => Outcome::TurnLimit,
        };

        Self {
            seed: game.seed(),
            turns: game.turn_number,
            actions,
            disasters,
            outcome,
            players: game
                .players
                .iter()
                .map(|p| PlayerSummary {
                    id: p.id,
                    name: p.name.clone(),
                    score: p.score,
                    settlements: p.settlements.len(),
                    towns: p.towns.len(),
                    resources: p.resources.total(),
                })
                .collect(),
        }
    }

    pub fn winner(&self) -> Option<PlayerId> {
        match self.outcome {
            Outcome::Won { winner, .. } => Some(winner),
            Outcome::TurnLimit => None,
        }
    }
}
