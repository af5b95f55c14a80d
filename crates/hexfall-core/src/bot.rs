//! Bot players for Hexfall.
//!
//! Two difficulty levels:
//! - Easy: random valid moves
//! - Medium: basic heuristics (good numbers, hurt opponents, trade toward builds)

use crate::actions::GameAction;
use crate::board::{NodeId, NodeSpecialty, PlayerId, Resource, TileId};
use crate::game::GameState;
use crate::player::{costs, ResourceHand};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    Medium,
}

/// A bot player that can decide on actions
pub struct Bot {
    pub player_id: PlayerId,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

/// How often a dice number comes up out of 36
fn pips(dice: Option<u8>) -> i32 {
    match dice {
        Some(n) if (2..=12).contains(&n) && n != 7 => 6 - (7 - i32::from(n)).abs(),
        _ => 0,
    }
}

impl Bot {
    pub fn new(player_id: PlayerId, difficulty: BotDifficulty) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(player_id: PlayerId, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Choose an action from the valid actions
    pub fn choose_action(&mut self, game: &GameState) -> Option<GameAction> {
        let valid_actions = game.valid_actions(self.player_id);
        if valid_actions.is_empty() {
            return None;
        }

        match self.difficulty {
            BotDifficulty::Easy => self.choose_easy(&valid_actions),
            BotDifficulty::Medium => self.choose_medium(game, &valid_actions),
        }
    }

    /// Easy: Just pick a random valid action
    fn choose_easy(&mut self, actions: &[GameAction]) -> Option<GameAction> {
        actions.choose(&mut self.rng).copied()
    }

    /// Medium: Use basic heuristics
    fn choose_medium(&mut self, game: &GameState, actions: &[GameAction]) -> Option<GameAction> {
        if actions.contains(&GameAction::RollDice) {
            return Some(GameAction::RollDice);
        }

        // Preparation: best node, then any road next to it
        let spots: Vec<NodeId> = actions
            .iter()
            .filter_map(|a| match a {
                GameAction::PlaceSettlement(n) => Some(*n),
                _ => None,
            })
            .collect();
        if !spots.is_empty() {
            return self.best_node(game, &spots).map(GameAction::PlaceSettlement);
        }
        let prep_roads: Vec<&GameAction> = actions
            .iter()
            .filter(|a| matches!(a, GameAction::PlaceRoad(_)))
            .collect();
        if !prep_roads.is_empty() {
            return prep_roads.choose(&mut self.rng).map(|a| **a);
        }

        let bandit_spots: Vec<TileId> = actions
            .iter()
            .filter_map(|a| match a {
                GameAction::PlaceBandit(t) => Some(*t),
                _ => None,
            })
            .collect();
        if !bandit_spots.is_empty() {
            return self.best_bandit_tile(game, &bandit_spots).map(GameAction::PlaceBandit);
        }

        let build_spots: Vec<NodeId> = actions
            .iter()
            .filter_map(|a| match a {
                GameAction::BuildSettlement(n) => Some(*n),
                _ => None,
            })
            .collect();
        if !build_spots.is_empty() {
            return self.best_node(game, &build_spots).map(GameAction::BuildSettlement);
        }

        let towns: Vec<NodeId> = actions
            .iter()
            .filter_map(|a| match a {
                GameAction::BuildTown(n) => Some(*n),
                _ => None,
            })
            .collect();
        if !towns.is_empty() {
            return self.best_node(game, &towns).map(GameAction::BuildTown);
        }

        // Cards that pay off immediately
        for action in actions {
            match action {
                GameAction::PlayRoadBuilding | GameAction::PlayKnight => return Some(*action),
                _ => {}
            }
        }
        if let Some(action) = self.choose_monopoly(game, actions) {
            return Some(action);
        }
        if let Some(action) = self.choose_development(game, actions) {
            return Some(action);
        }

        // Build roads with 40% chance, always when they are free
        let roads: Vec<&GameAction> = actions
            .iter()
            .filter(|a| matches!(a, GameAction::BuildRoad(_)))
            .collect();
        let free_roads = game.get_player(self.player_id).map_or(0, |p| p.free_roads);
        if !roads.is_empty() && (free_roads > 0 || self.rng.gen_bool(0.4)) {
            return roads.choose(&mut self.rng).map(|a| **a);
        }

        // Buy dev cards with 30% chance
        if actions.contains(&GameAction::BuyDevelopmentCard) && self.rng.gen_bool(0.3) {
            return Some(GameAction::BuyDevelopmentCard);
        }

        if let Some(action) = self.choose_trade(game, actions) {
            return Some(action);
        }

        if actions.contains(&GameAction::EndTurn) {
            return Some(GameAction::EndTurn);
        }

        // Fallback to random
        actions.choose(&mut self.rng).copied()
    }

    /// Pick from the top 3 nodes with some randomness
    fn best_node(&mut self, game: &GameState, nodes: &[NodeId]) -> Option<NodeId> {
        let mut scored: Vec<(NodeId, i32)> =
            nodes.iter().map(|&n| (n, self.score_node(game, n))).collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        let top: Vec<NodeId> = scored.iter().take(3).map(|(n, _)| *n).collect();
        top.choose(&mut self.rng).copied()
    }

    /// Score a node based on the numbers around it
    fn score_node(&self, game: &GameState, node: NodeId) -> i32 {
        let n = game.board.node(node);
        let mut score: i32 = n
            .affected_tiles
            .iter()
            .map(|&t| game.board.tile(t))
            .filter(|t| !t.suppressed_by_disaster)
            .map(|t| pips(t.dice_number))
            .sum();
        if n.specialty != NodeSpecialty::None {
            score += 1;
        }
        score
    }

    fn best_bandit_tile(&self, game: &GameState, tiles: &[TileId]) -> Option<TileId> {
        tiles.iter().copied().max_by_key(|&t| self.score_bandit_tile(game, t))
    }

    /// Prefer busy numbers and opponents, avoid our own tiles
    fn score_bandit_tile(&self, game: &GameState, tile: TileId) -> i32 {
        let mut score = pips(game.board.tile(tile).dice_number) * 2;
        for player in game.board.players_on_tile(tile) {
            if player == self.player_id {
                score -= 20;
            } else {
                score += 5;
            }
        }
        score
    }

    /// Monopoly on whatever the opponents hold most of
    fn choose_monopoly(&self, game: &GameState, actions: &[GameAction]) -> Option<GameAction> {
        if !actions.iter().any(|a| matches!(a, GameAction::PlayMonopoly(_))) {
            return None;
        }
        let held = |resource: Resource| -> u32 {
            game.players
                .iter()
                .filter(|p| p.id != self.player_id)
                .map(|p| p.resources.get(resource))
                .sum()
        };
        let best = Resource::ALL.into_iter().max_by_key(|&r| held(r))?;
        (held(best) > 0).then_some(GameAction::PlayMonopoly(best))
    }

    /// Development card for the two resources we are furthest from
    fn choose_development(&self, game: &GameState, actions: &[GameAction]) -> Option<GameAction> {
        if !actions.iter().any(|a| matches!(a, GameAction::PlayDevelopment(..))) {
            return None;
        }
        let missing = self.missing_for(game, &costs::settlement());
        let first = missing.first().copied().unwrap_or(Resource::Ore);
        let second = missing.get(1).copied().unwrap_or(Resource::Wheat);
        Some(GameAction::PlayDevelopment(first, second))
    }

    /// Trade surplus for something a settlement or town still needs
    fn choose_trade(&self, game: &GameState, actions: &[GameAction]) -> Option<GameAction> {
        let mut wanted = self.missing_for(game, &costs::settlement());
        if wanted.is_empty() {
            wanted = self.missing_for(game, &costs::town());
        }
        let player = game.get_player(self.player_id)?;

        actions
            .iter()
            .filter_map(|a| match *a {
                GameAction::BankTrade { give, receive }
                    if wanted.contains(&receive) && !wanted.contains(&give) =>
                {
                    Some((player.resources.get(give), *a))
                }
                _ => None,
            })
            .max_by_key(|(surplus, _)| *surplus)
            .map(|(_, action)| action)
    }

    fn missing_for(&self, game: &GameState, cost: &ResourceHand) -> Vec<Resource> {
        let Some(player) = game.get_player(self.player_id) else {
            return Vec::new();
        };
        cost.iter()
            .filter(|&(resource, amount)| player.resources.get(resource) < amount)
            .map(|(resource, _)| resource)
            .collect()
    }
}
