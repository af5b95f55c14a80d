//! Player state and the resource economy.
//!
//! This module contains:
//! - ResourceHand, a fixed per-resource table of counts
//! - ConversionRates for trading with the bank
//! - Building costs
//! - The bandit discard rule
//! - Player struct with score, buildings and development cards

use crate::board::{NodeId, NodeSpecialty, PlayerId, Resource};
use crate::cards::DevelopmentCardKind;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Hands larger than this lose half their cards when a 7 is rolled
pub const BANDIT_HAND_LIMIT: u32 = 7;

/// Conversion rate when no specialty applies
pub const DEFAULT_CONVERSION_RATE: u32 = 4;

/// Player color for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerColor {
    Red,
    Blue,
    Orange,
    White,
}

impl PlayerColor {
    /// Color for a player id (ids start at 1)
    pub fn for_player(id: PlayerId) -> Self {
        match id.wrapping_sub(1) % 4 {
            0 => PlayerColor::Red,
            1 => PlayerColor::Blue,
            2 => PlayerColor::Orange,
            _ => PlayerColor::White,
        }
    }
}

/// Resource counts indexed by resource type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHand {
    counts: [u32; Resource::COUNT],
}

impl ResourceHand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand with explicit amounts, in `Resource::ALL` order
    pub fn with_amounts(wood: u32, clay: u32, wheat: u32, sheep: u32, ore: u32) -> Self {
        Self {
            counts: [wood, clay, wheat, sheep, ore],
        }
    }

    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        hand.add(resource, amount);
        hand
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn get(&self, resource: Resource) -> u32 {
        self.counts[resource.index()]
    }

    pub fn set(&mut self, resource: Resource, count: u32) {
        self.counts[resource.index()] = count;
    }

    pub fn add(&mut self, resource: Resource, amount: u32) {
        self.counts[resource.index()] += amount;
    }

    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        Resource::ALL.iter().all(|&r| self.get(r) >= cost.get(r))
    }

    /// Pay a cost, returning false (and changing nothing) if it is not affordable
    pub fn try_subtract(&mut self, cost: &ResourceHand) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for resource in Resource::ALL {
            self.counts[resource.index()] -= cost.get(resource);
        }
        true
    }

    /// Remove one unit of `resource` if any is held
    pub fn remove_one(&mut self, resource: Resource) -> bool {
        let count = &mut self.counts[resource.index()];
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// Drop one random card: shuffle the resource order and take the first type held
    pub fn discard_random<R: Rng>(&mut self, rng: &mut R) -> Option<Resource> {
        let mut order = Resource::ALL;
        order.shuffle(rng);
        let resource = order.into_iter().find(|&r| self.get(r) > 0)?;
        self.remove_one(resource);
        Some(resource)
    }

    /// Apply the bandit rule: above the limit, lose half the hand rounded up
    pub fn bandit_discard<R: Rng>(&mut self, rng: &mut R) -> Vec<Resource> {
        let total = self.total();
        if total <= BANDIT_HAND_LIMIT {
            return Vec::new();
        }
        let to_discard = (total + 1) / 2;
        (0..to_discard).filter_map(|_| self.discard_random(rng)).collect()
    }

    /// Non-zero entries
    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        Resource::ALL
            .into_iter()
            .map(|r| (r, self.get(r)))
            .filter(|(_, count)| *count > 0)
    }
}

impl Index<Resource> for ResourceHand {
    type Output = u32;

    fn index(&self, resource: Resource) -> &u32 {
        &self.counts[resource.index()]
    }
}

/// How many units of a resource the bank wants for one unit of another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRates {
    rates: [u32; Resource::COUNT],
}

impl ConversionRates {
    pub fn new(base: u32) -> Self {
        Self {
            rates: [base; Resource::COUNT],
        }
    }

    pub fn rate(&self, resource: Resource) -> u32 {
        self.rates[resource.index()]
    }

    /// Lower rates for a specialty node the player just built on
    pub fn apply_specialty(&mut self, specialty: NodeSpecialty) {
        match specialty {
            NodeSpecialty::None => {}
            NodeSpecialty::ReducedTrading => {
                for rate in &mut self.rates {
                    *rate = (*rate).min(3);
                }
            }
            NodeSpecialty::Resource(resource) => {
                let rate = &mut self.rates[resource.index()];
                *rate = (*rate).min(2);
            }
        }
    }
}

impl Default for ConversionRates {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERSION_RATE)
    }
}

/// Building costs
pub mod costs {
    use super::ResourceHand;

    /// 1 wood, 1 clay
    pub fn road() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 0, 0)
    }

    /// 1 wood, 1 clay, 1 wheat, 1 sheep
    pub fn settlement() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 1, 1, 0)
    }

    /// 2 wheat, 3 ore
    pub fn town() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 2, 0, 3)
    }

    /// 1 wheat, 1 sheep, 1 ore
    pub fn development_card() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 1, 1, 1)
    }
}

/// A single player's state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: PlayerColor,
    pub resources: ResourceHand,
    pub conversion_rates: ConversionRates,
    pub score: u32,
    pub settlements: Vec<NodeId>,
    pub towns: Vec<NodeId>,
    /// Development cards that can be played
    pub dev_cards: Vec<DevelopmentCardKind>,
    /// Cards bought this turn, playable from the next turn on
    pub dev_cards_bought_this_turn: Vec<DevelopmentCardKind>,
    /// Roads left to place for free from a road building card
    pub free_roads: u8,
}

impl Player {
    pub fn new(id: PlayerId, name: String, base_rate: u32) -> Self {
        Self {
            id,
            name,
            color: PlayerColor::for_player(id),
            resources: ResourceHand::new(),
            conversion_rates: ConversionRates::new(base_rate),
            score: 0,
            settlements: Vec::new(),
            towns: Vec::new(),
            dev_cards: Vec::new(),
            dev_cards_bought_this_turn: Vec::new(),
            free_roads: 0,
        }
    }

    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        self.resources.can_afford(cost)
    }

    /// Whether a card of this kind is held and was not bought this turn
    pub fn has_playable_card(&self, kind: DevelopmentCardKind) -> bool {
        kind.is_playable() && self.dev_cards.contains(&kind)
    }

    /// Remove a playable card from the hand
    pub fn take_card(&mut self, kind: DevelopmentCardKind) -> bool {
        if !kind.is_playable() {
            return false;
        }
        match self.dev_cards.iter().position(|&c| c == kind) {
            Some(index) => {
                self.dev_cards.remove(index);
                true
            }
            None => false,
        }
    }

    /// Cards bought this turn become playable
    pub fn end_turn(&mut self) {
        self.dev_cards.append(&mut self.dev_cards_bought_this_turn);
        self.free_roads = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_hand_add_and_subtract() {
        let mut hand = ResourceHand::with_amounts(2, 2, 1, 1, 0);
        assert_eq!(hand.total(), 6);
        assert!(hand.try_subtract(&costs::road()));
        assert_eq!(hand, ResourceHand::with_amounts(1, 1, 1, 1, 0));
        assert!(hand.try_subtract(&costs::settlement()));
        assert!(hand.is_empty());
        assert!(!hand.try_subtract(&costs::road()), "empty hand cannot pay");
        assert!(hand.is_empty());
    }

    #[test]
    fn test_index_matches_get() {
        let hand = ResourceHand::with_amounts(0, 3, 0, 0, 5);
        assert_eq!(hand[Resource::Clay], 3);
        assert_eq!(hand[Resource::Ore], hand.get(Resource::Ore));
        assert_eq!(
            hand.iter().collect::<Vec<_>>(),
            vec![(Resource::Clay, 3), (Resource::Ore, 5)]
        );
    }

    #[test]
    fn test_bandit_discard_amounts() {
        let mut rng = StdRng::seed_from_u64(7);
        let cases = [(9, 5), (8, 4), (7, 0), (3, 0), (12, 6)];
        for (total, expected) in cases {
            let mut hand = ResourceHand::with_amounts(total, 0, 0, 0, 0);
            let lost = hand.bandit_discard(&mut rng);
            assert_eq!(lost.len() as u32, expected, "hand of {total}");
            assert_eq!(hand.total(), total - expected);
        }
    }

    #[test]
    fn test_discard_random_only_takes_held_types() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut hand = ResourceHand::with_amounts(0, 0, 4, 0, 1);
        for _ in 0..5 {
            let lost = hand.discard_random(&mut rng).unwrap();
            assert!(matches!(lost, Resource::Wheat | Resource::Ore));
        }
        assert_eq!(hand.discard_random(&mut rng), None);
    }

    #[test]
    fn test_conversion_rate_specialties() {
        let mut rates = ConversionRates::default();
        assert_eq!(rates.rate(Resource::Wood), 4);

        rates.apply_specialty(NodeSpecialty::Resource(Resource::Sheep));
        assert_eq!(rates.rate(Resource::Sheep), 2);
        assert_eq!(rates.rate(Resource::Wood), 4);

        rates.apply_specialty(NodeSpecialty::ReducedTrading);
        assert_eq!(rates.rate(Resource::Wood), 3);
        assert_eq!(rates.rate(Resource::Sheep), 2, "better rate is kept");
    }

    #[test]
    fn test_costs() {
        assert_eq!(costs::road().total(), 2);
        assert_eq!(costs::settlement().total(), 4);
        assert_eq!(costs::town(), ResourceHand::with_amounts(0, 0, 2, 0, 3));
        assert_eq!(costs::development_card().total(), 3);
    }

    #[test]
    fn test_cards_bought_this_turn_wait() {
        let mut player = Player::new(1, "A".into(), 4);
        player.dev_cards_bought_this_turn.push(DevelopmentCardKind::Knight);
        assert!(!player.has_playable_card(DevelopmentCardKind::Knight));

        player.end_turn();
        assert!(player.has_playable_card(DevelopmentCardKind::Knight));
        assert!(player.take_card(DevelopmentCardKind::Knight));
        assert!(!player.take_card(DevelopmentCardKind::Knight));
    }

    #[test]
    fn test_points_cards_are_never_playable() {
        let mut player = Player::new(2, "B".into(), 4);
        player.dev_cards.push(DevelopmentCardKind::Points);
        assert!(!player.has_playable_card(DevelopmentCardKind::Points));
        assert!(!player.take_card(DevelopmentCardKind::Points));
    }

    #[test]
    fn test_colors_start_at_player_one() {
        assert_eq!(PlayerColor::for_player(1), PlayerColor::Red);
        assert_eq!(PlayerColor::for_player(4), PlayerColor::White);
    }
}
