//! Core game state machine.
//!
//! This module contains the main `GameState` struct and all game logic.
//! `GameState` is the session context: it owns the board, the players, the
//! road network, the disaster scheduler, the development deck and the
//! session RNG.

use crate::actions::{GameAction, GameEvent};
use crate::board::{Board, BoardError, NodeId, NodeSpecialty, PlayerId, Resource, RoadId, TileId};
use crate::cards::{CardCatalog, CatalogError, DevelopmentCardKind, DevelopmentDeck};
use crate::config::{ConfigError, GameConfig};
use crate::disaster::DisasterScheduler;
use crate::network::RoadNetwork;
use crate::player::{costs, Player, ResourceHand};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Initial snake-order placement
    Preparation {
        pass: PreparationPass,
        placing: Placing,
    },

    /// A regular turn of the current player
    MainTurn { step: TurnStep },

    /// Between turns while a disaster strikes its tiles
    DisasterRollout,

    /// Game is over
    Finished { winner: PlayerId },

    /// Game ended without a winner
    Abandoned,
}

/// Where the preparation round stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreparationPass {
    /// Players 1..N, one settlement each
    Forward,
    /// The last player places their second settlement right away
    ReverseAtLast,
    /// Players N-1..1
    Reverse,
}

/// What we're placing during preparation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placing {
    Settlement,
    Road,
}

/// Progress within a main turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnStep {
    AwaitingRoll,
    /// The bandit must be moved before the turn can end
    BanditPlacement,
    Building,
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current phase")]
    InvalidPhase,

    #[error("Invalid placement location")]
    InvalidPlacement,

    #[error("Cannot afford this")]
    InsufficientResources,

    #[error("Invalid trade")]
    InvalidTrade,

    #[error("No development cards left in deck")]
    EmptyDeck,

    #[error("Don't have that card")]
    NoSuchCard,

    #[error("Game is over")]
    GameOver,
}

/// Errors that prevent a session from starting
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    /// The game board
    pub board: Board,
    /// Players in seating order; player `id` sits at index `id - 1`
    pub players: Vec<Player>,
    pub current_player: PlayerId,
    pub phase: GamePhase,
    /// Main turns started so far
    pub turn_number: u32,
    /// Last dice roll of the current turn
    pub dice_roll: Option<(u8, u8)>,
    network: RoadNetwork,
    disasters: DisasterScheduler,
    catalog: CardCatalog,
    deck: DevelopmentDeck,
    card_played_this_turn: bool,
    /// Preparation: the settlement the next road must touch
    last_settlement: Option<NodeId>,
    points_to_win: u32,
    seed: u64,
    rng: StdRng,
}

impl GameState {
    /// Start a session on a freshly shuffled standard board
    pub fn new(config: GameConfig) -> Result<Self, SetupError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = StdRng::seed_from_u64(seed);
        let board = Board::standard_with_rng(&mut rng);
        let catalog = CardCatalog::standard()?;
        Ok(Self::assemble(config, board, catalog, seed, rng))
    }

    /// Start a session on a prepared board
    pub fn with_board(config: GameConfig, board: Board) -> Result<Self, SetupError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let rng = StdRng::seed_from_u64(seed);
        let catalog = CardCatalog::standard()?;
        Ok(Self::assemble(config, board, catalog, seed, rng))
    }

    fn assemble(
        config: GameConfig,
        board: Board,
        catalog: CardCatalog,
        seed: u64,
        mut rng: StdRng,
    ) -> Self {
        let players: Vec<Player> = config
            .player_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                Player::new(i as PlayerId + 1, name.clone(), config.base_conversion_rate)
            })
            .collect();
        let deck = DevelopmentDeck::from_catalog(&catalog, &mut rng);
        let network = RoadNetwork::new(players.iter().map(|p| p.id));
        info!(players = players.len(), seed, "session created");

        Self {
            board,
            players,
            current_player: 1,
            phase: GamePhase::Preparation {
                pass: PreparationPass::Forward,
                placing: Placing::Settlement,
            },
            turn_number: 0,
            dice_roll: None,
            network,
            disasters: DisasterScheduler::new(config.disasters),
            catalog,
            deck,
            card_played_this_turn: false,
            last_settlement: None,
            points_to_win: config.points_to_win,
            seed,
            rng,
        }
    }

    /// Get the number of players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Get a player by ID
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(usize::from(id).checked_sub(1)?)
    }

    fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        &mut self.players[usize::from(id) - 1]
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn disasters(&self) -> &DisasterScheduler {
        &self.disasters
    }

    pub fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }

    pub fn deck_len(&self) -> usize {
        self.deck.len()
    }

    pub fn points_to_win(&self) -> u32 {
        self.points_to_win
    }

    /// Seed the session RNG was created from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, GamePhase::Finished { .. } | GamePhase::Abandoned)
    }

    /// Get the winner if the game is finished
    pub fn get_winner(&self) -> Option<PlayerId> {
        if let GamePhase::Finished { winner } = self.phase {
            Some(winner)
        } else {
            None
        }
    }

    /// False while a disaster rollout is pending
    pub fn is_phase_complete(&self) -> bool {
        self.phase != GamePhase::DisasterRollout
    }

    fn next_player(&self) -> PlayerId {
        if usize::from(self.current_player) >= self.players.len() {
            1
        } else {
            self.current_player + 1
        }
    }

    // ==================== Valid Actions ====================

    /// Get all currently valid actions for a player
    pub fn valid_actions(&self, player: PlayerId) -> Vec<GameAction> {
        let mut actions = Vec::new();
        if player != self.current_player {
            return actions;
        }

        match self.phase {
            GamePhase::Finished { .. } | GamePhase::Abandoned | GamePhase::DisasterRollout => {}

            GamePhase::Preparation { placing, .. } => match placing {
                Placing::Settlement => {
                    for node in self.network.settlement_spots(&self.board, player, false) {
                        actions.push(GameAction::PlaceSettlement(node));
                    }
                }
                Placing::Road => {
                    if let Some(node) = self.last_settlement {
                        for &road in &self.board.node(node).roads {
                            if self.network.can_place_road(&self.board, player, road, false) {
                                actions.push(GameAction::PlaceRoad(road));
                            }
                        }
                    }
                }
            },

            GamePhase::MainTurn { step } => match step {
                TurnStep::AwaitingRoll => actions.push(GameAction::RollDice),
                TurnStep::BanditPlacement => {
                    for tile in self.board.tiles() {
                        if self.board.can_host_bandit(tile.id) {
                            actions.push(GameAction::PlaceBandit(tile.id));
                        }
                    }
                    self.push_building_actions(player, &mut actions);
                }
                TurnStep::Building => {
                    actions.push(GameAction::EndTurn);
                    self.push_building_actions(player, &mut actions);
                    self.push_card_actions(player, &mut actions);
                }
            },
        }

        actions
    }

    fn push_building_actions(&self, player: PlayerId, actions: &mut Vec<GameAction>) {
        let Some(p) = self.get_player(player) else {
            return;
        };

        if p.free_roads > 0 || p.can_afford(&costs::road()) {
            for road in self.network.road_spots(&self.board, player) {
                actions.push(GameAction::BuildRoad(road));
            }
        }

        if p.can_afford(&costs::settlement()) {
            for node in self.network.settlement_spots(&self.board, player, true) {
                actions.push(GameAction::BuildSettlement(node));
            }
        }

        if p.can_afford(&costs::town()) {
            for &node in &p.settlements {
                if self.network.can_upgrade(&self.board, player, node) {
                    actions.push(GameAction::BuildTown(node));
                }
            }
        }

        if p.can_afford(&costs::development_card()) && !self.deck.is_empty() {
            actions.push(GameAction::BuyDevelopmentCard);
        }

        for give in Resource::ALL {
            if p.resources.get(give) >= p.conversion_rates.rate(give) {
                for receive in Resource::ALL {
                    if receive != give {
                        actions.push(GameAction::BankTrade { give, receive });
                    }
                }
            }
        }
    }

    fn push_card_actions(&self, player: PlayerId, actions: &mut Vec<GameAction>) {
        if self.card_played_this_turn {
            return;
        }
        let Some(p) = self.get_player(player) else {
            return;
        };

        if p.has_playable_card(DevelopmentCardKind::Knight) {
            actions.push(GameAction::PlayKnight);
        }
        if p.has_playable_card(DevelopmentCardKind::RoadBuilding) {
            actions.push(GameAction::PlayRoadBuilding);
        }
        if p.has_playable_card(DevelopmentCardKind::Development) {
            for first in Resource::ALL {
                for second in Resource::ALL {
                    actions.push(GameAction::PlayDevelopment(first, second));
                }
            }
        }
        if p.has_playable_card(DevelopmentCardKind::Monopoly) {
            for resource in Resource::ALL {
                actions.push(GameAction::PlayMonopoly(resource));
            }
        }
    }

    // ==================== Apply Action ====================

    /// Apply an action to the game state. A failed action changes nothing.
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        match self.phase {
            GamePhase::Finished { .. } | GamePhase::Abandoned => return Err(GameError::GameOver),
            GamePhase::DisasterRollout => return Err(GameError::InvalidPhase),
            _ => {}
        }
        if player != self.current_player {
            return Err(GameError::NotYourTurn);
        }

        let mut events = match action {
            GameAction::PlaceSettlement(node) => self.place_preparation_settlement(player, node)?,
            GameAction::PlaceRoad(road) => self.place_preparation_road(player, road)?,
            GameAction::RollDice => self.roll_dice(player)?,
            GameAction::PlaceBandit(tile) => self.place_bandit(player, tile)?,
            GameAction::BuildSettlement(node) => self.build_settlement(player, node)?,
            GameAction::BuildTown(node) => self.build_town(player, node)?,
            GameAction::BuildRoad(road) => self.build_road(player, road)?,
            GameAction::BuyDevelopmentCard => self.buy_development_card(player)?,
            GameAction::PlayKnight => self.play_knight(player)?,
            GameAction::PlayRoadBuilding => self.play_road_building(player)?,
            GameAction::PlayDevelopment(first, second) => {
                self.play_development(player, first, second)?
            }
            GameAction::PlayMonopoly(resource) => self.play_monopoly(player, resource)?,
            GameAction::BankTrade { give, receive } => self.bank_trade(player, give, receive)?,
            GameAction::EndTurn => self.end_turn(player)?,
        };

        self.check_winner(&mut events);
        Ok(events)
    }

    // ==================== Preparation ====================

    fn place_preparation_settlement(
        &mut self,
        player: PlayerId,
        node: NodeId,
    ) -> Result<Vec<GameEvent>, GameError> {
        let GamePhase::Preparation {
            pass,
            placing: Placing::Settlement,
        } = self.phase
        else {
            return Err(GameError::InvalidPhase);
        };

        let mut events = Vec::new();
        self.settle(player, node, false, &mut events)?;
        self.last_settlement = Some(node);
        self.phase = GamePhase::Preparation {
            pass,
            placing: Placing::Road,
        };
        Ok(events)
    }

    fn place_preparation_road(
        &mut self,
        player: PlayerId,
        road: RoadId,
    ) -> Result<Vec<GameEvent>, GameError> {
        let GamePhase::Preparation {
            pass,
            placing: Placing::Road,
        } = self.phase
        else {
            return Err(GameError::InvalidPhase);
        };
        let touches_settlement = self
            .last_settlement
            .is_some_and(|node| self.board.node(node).roads.contains(&road));
        if !touches_settlement {
            return Err(GameError::InvalidPlacement);
        }

        self.network.place_road(&mut self.board, player, road, false)?;
        self.last_settlement = None;

        let mut events = vec![GameEvent::RoadBuilt { player, road }];
        events.extend(self.advance_preparation(pass));
        Ok(events)
    }

    /// Move to the next placer: 1..N, then N again, then N-1..1
    fn advance_preparation(&mut self, pass: PreparationPass) -> Vec<GameEvent> {
        let last = self.players.len() as PlayerId;
        let current = self.current_player;

        let next = match pass {
            PreparationPass::Forward if current == last => {
                Some((PreparationPass::ReverseAtLast, last))
            }
            PreparationPass::Forward => Some((PreparationPass::Forward, current + 1)),
            PreparationPass::ReverseAtLast if last == 1 => None,
            PreparationPass::ReverseAtLast => Some((PreparationPass::Reverse, last - 1)),
            PreparationPass::Reverse if current <= 1 => None,
            PreparationPass::Reverse => Some((PreparationPass::Reverse, current - 1)),
        };

        match next {
            Some((pass, player)) => {
                self.phase = GamePhase::Preparation {
                    pass,
                    placing: Placing::Settlement,
                };
                self.current_player = player;
                debug!(player, ?pass, "next preparation placement");
                vec![GameEvent::TurnStarted { player }]
            }
            None => self.finish_preparation(),
        }
    }

    fn finish_preparation(&mut self) -> Vec<GameEvent> {
        info!("preparation finished");
        let mut events = vec![GameEvent::PreparationFinished];
        events.extend(self.yield_all_tiles());
        self.current_player = 1;
        self.turn_number = 1;
        self.phase = GamePhase::MainTurn {
            step: TurnStep::AwaitingRoll,
        };
        events.push(GameEvent::TurnStarted { player: 1 });
        events
    }

    /// Every tile yields once
    pub fn yield_all_tiles(&mut self) -> Vec<GameEvent> {
        let tiles: Vec<TileId> = self.board.tiles().iter().map(|t| t.id).collect();
        self.distribute(&tiles)
    }

    // ==================== Dice & Yield ====================

    fn roll_dice(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        if self.phase
            != (GamePhase::MainTurn {
                step: TurnStep::AwaitingRoll,
            })
        {
            return Err(GameError::InvalidPhase);
        }

        let first = self.rng.gen_range(1..=6);
        let second = self.rng.gen_range(1..=6);
        let total = first + second;
        self.dice_roll = Some((first, second));
        debug!(player, total, "dice rolled");

        self.phase = GamePhase::MainTurn {
            step: TurnStep::Building,
        };
        let mut events = vec![GameEvent::DiceRolled {
            player,
            roll: (first, second),
            total,
        }];
        events.extend(self.process_dice_result(total));
        Ok(events)
    }

    /// Resolve a dice total: a 7 triggers the bandit, anything else makes matching tiles yield
    pub fn process_dice_result(&mut self, value: u8) -> Vec<GameEvent> {
        if value == 7 {
            let mut events = Vec::new();
            for index in 0..self.players.len() {
                let discarded = self.players[index].resources.bandit_discard(&mut self.rng);
                if !discarded.is_empty() {
                    events.push(GameEvent::ResourcesDiscarded {
                        player: self.players[index].id,
                        resources: discarded,
                    });
                }
            }
            if matches!(self.phase, GamePhase::MainTurn { .. }) {
                self.phase = GamePhase::MainTurn {
                    step: TurnStep::BanditPlacement,
                };
            }
            return events;
        }

        let tiles = self.board.tiles_for_dice(value).to_vec();
        self.distribute(&tiles)
    }

    fn distribute(&mut self, tiles: &[TileId]) -> Vec<GameEvent> {
        let grants: Vec<(PlayerId, Resource, u32)> = tiles
            .iter()
            .flat_map(|&tile| self.board.yield_resources(tile))
            .collect();
        if grants.is_empty() {
            return Vec::new();
        }
        for &(player, resource, amount) in &grants {
            self.player_mut(player).resources.add(resource, amount);
        }
        vec![GameEvent::ResourcesYielded { grants }]
    }

    // ==================== Bandit ====================

    fn place_bandit(
        &mut self,
        player: PlayerId,
        tile: TileId,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.phase
            != (GamePhase::MainTurn {
                step: TurnStep::BanditPlacement,
            })
        {
            return Err(GameError::InvalidPhase);
        }
        if !self.board.can_host_bandit(tile) {
            return Err(GameError::InvalidPlacement);
        }

        let from = self.board.move_bandit(tile);
        let mut events = vec![GameEvent::BanditMoved { player, from, to: tile }];

        let mut candidates = self.board.players_on_tile(tile);
        if candidates.len() > 1 {
            candidates.retain(|&p| p != player);
        }
        if let Some(&victim) = candidates.choose(&mut self.rng) {
            let stolen = self.players[usize::from(victim) - 1]
                .resources
                .discard_random(&mut self.rng);
            if let Some(resource) = stolen {
                if victim != player {
                    self.player_mut(player).resources.add(resource, 1);
                }
                events.push(GameEvent::ResourceStolen {
                    thief: player,
                    victim,
                    resource,
                });
            }
        }

        self.phase = GamePhase::MainTurn {
            step: TurnStep::Building,
        };
        Ok(events)
    }

    // ==================== Building ====================

    fn ensure_building_window(&self) -> Result<(), GameError> {
        match self.phase {
            GamePhase::MainTurn {
                step: TurnStep::Building | TurnStep::BanditPlacement,
            } => Ok(()),
            _ => Err(GameError::InvalidPhase),
        }
    }

    /// Claim a node and award its point and specialty
    fn settle(
        &mut self,
        player: PlayerId,
        node: NodeId,
        require_road: bool,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let specialty = self
            .network
            .place_settlement(&mut self.board, player, node, require_road)?;
        let p = self.player_mut(player);
        p.settlements.push(node);
        p.conversion_rates.apply_specialty(specialty);

        events.push(GameEvent::SettlementBuilt { player, node });
        if specialty != NodeSpecialty::None {
            events.push(GameEvent::ConversionRatesChanged { player, specialty });
        }
        self.award_point(player, events);
        Ok(())
    }

    fn award_point(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) {
        let p = self.player_mut(player);
        p.score += 1;
        events.push(GameEvent::ScoreChanged {
            player,
            score: p.score,
        });
    }

    fn pay(&mut self, player: PlayerId, cost: &ResourceHand) -> Result<(), GameError> {
        if self.player_mut(player).resources.try_subtract(cost) {
            Ok(())
        } else {
            Err(GameError::InsufficientResources)
        }
    }

    fn build_settlement(
        &mut self,
        player: PlayerId,
        node: NodeId,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_building_window()?;
        if !self.network.can_place_settlement(&self.board, player, node, true) {
            return Err(GameError::InvalidPlacement);
        }
        self.pay(player, &costs::settlement())?;

        let mut events = Vec::new();
        self.settle(player, node, true, &mut events)?;
        Ok(events)
    }

    fn build_town(&mut self, player: PlayerId, node: NodeId) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_building_window()?;
        if !self.network.can_upgrade(&self.board, player, node) {
            return Err(GameError::InvalidPlacement);
        }
        self.pay(player, &costs::town())?;
        self.network.upgrade_to_town(&mut self.board, player, node)?;

        let p = self.player_mut(player);
        p.settlements.retain(|&n| n != node);
        p.towns.push(node);

        let mut events = vec![GameEvent::TownBuilt { player, node }];
        self.award_point(player, &mut events);
        Ok(events)
    }

    fn build_road(&mut self, player: PlayerId, road: RoadId) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_building_window()?;
        if !self.network.can_place_road(&self.board, player, road, true) {
            return Err(GameError::InvalidPlacement);
        }
        if self.player_mut(player).free_roads > 0 {
            self.player_mut(player).free_roads -= 1;
        } else {
            self.pay(player, &costs::road())?;
        }
        self.network.place_road(&mut self.board, player, road, true)?;
        Ok(vec![GameEvent::RoadBuilt { player, road }])
    }

    // ==================== Development Cards ====================

    fn buy_development_card(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_building_window()?;
        if self.deck.is_empty() {
            return Err(GameError::EmptyDeck);
        }
        self.pay(player, &costs::development_card())?;

        let kind = self.deck.draw(&mut self.rng);
        let mut events = vec![GameEvent::DevelopmentCardBought { player, kind }];
        match kind {
            DevelopmentCardKind::Points => self.award_point(player, &mut events),
            DevelopmentCardKind::None => {}
            playable => self.player_mut(player).dev_cards_bought_this_turn.push(playable),
        }
        debug!(player, card = %self.catalog.details_for(kind).name, "development card bought");
        Ok(events)
    }

    /// Shared checks for playing a card: building step, one card per turn, card in hand
    fn take_card(&mut self, player: PlayerId, kind: DevelopmentCardKind) -> Result<(), GameError> {
        if self.phase
            != (GamePhase::MainTurn {
                step: TurnStep::Building,
            })
            || self.card_played_this_turn
        {
            return Err(GameError::InvalidPhase);
        }
        if !self.player_mut(player).take_card(kind) {
            return Err(GameError::NoSuchCard);
        }
        self.card_played_this_turn = true;
        Ok(())
    }

    fn play_knight(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.take_card(player, DevelopmentCardKind::Knight)?;
        self.phase = GamePhase::MainTurn {
            step: TurnStep::BanditPlacement,
        };
        Ok(vec![GameEvent::KnightPlayed { player }])
    }

    fn play_road_building(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.take_card(player, DevelopmentCardKind::RoadBuilding)?;
        self.player_mut(player).free_roads = 2;
        Ok(vec![GameEvent::RoadBuildingPlayed { player }])
    }

    fn play_development(
        &mut self,
        player: PlayerId,
        first: Resource,
        second: Resource,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.take_card(player, DevelopmentCardKind::Development)?;
        let p = self.player_mut(player);
        p.resources.add(first, 1);
        p.resources.add(second, 1);
        Ok(vec![GameEvent::DevelopmentPlayed {
            player,
            resources: (first, second),
        }])
    }

    fn play_monopoly(
        &mut self,
        player: PlayerId,
        resource: Resource,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.take_card(player, DevelopmentCardKind::Monopoly)?;
        let mut total_taken = 0;
        for other in self.players.iter_mut().filter(|p| p.id != player) {
            total_taken += other.resources.get(resource);
            other.resources.set(resource, 0);
        }
        self.player_mut(player).resources.add(resource, total_taken);
        Ok(vec![GameEvent::MonopolyPlayed {
            player,
            resource,
            total_taken,
        }])
    }

    // ==================== Trading ====================

    fn bank_trade(
        &mut self,
        player: PlayerId,
        give: Resource,
        receive: Resource,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_building_window()?;
        if give == receive {
            return Err(GameError::InvalidTrade);
        }
        let rate = self.player_mut(player).conversion_rates.rate(give);
        self.pay(player, &ResourceHand::single(give, rate))?;
        self.player_mut(player).resources.add(receive, 1);
        Ok(vec![GameEvent::BankTradeCompleted {
            player,
            gave: give,
            gave_count: rate,
            received: receive,
        }])
    }

    // ==================== Turn Management ====================

    fn end_turn(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        if self.phase
            != (GamePhase::MainTurn {
                step: TurnStep::Building,
            })
        {
            return Err(GameError::InvalidPhase);
        }

        self.player_mut(player).end_turn();
        self.card_played_this_turn = false;
        self.dice_roll = None;

        let next_player = self.next_player();
        let mut events = vec![GameEvent::TurnEnded { player, next_player }];
        events.extend(self.disasters.process_turn(&mut self.board, &mut self.rng));

        if self.disasters.is_rolling_out() {
            self.phase = GamePhase::DisasterRollout;
        } else {
            events.extend(self.activate_next_player());
        }
        Ok(events)
    }

    fn activate_next_player(&mut self) -> Vec<GameEvent> {
        self.current_player = self.next_player();
        self.turn_number += 1;
        self.phase = GamePhase::MainTurn {
            step: TurnStep::AwaitingRoll,
        };
        vec![GameEvent::TurnStarted {
            player: self.current_player,
        }]
    }

    /// Advance a pending disaster rollout by one step
    pub fn tick(&mut self) -> Vec<GameEvent> {
        if self.phase != GamePhase::DisasterRollout {
            return Vec::new();
        }
        let mut events = self.disasters.tick(&mut self.board);
        if !self.disasters.is_rolling_out() {
            events.extend(self.activate_next_player());
        }
        events
    }

    /// Tick until the rollout is done
    pub fn run_pending_steps(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        while !self.is_phase_complete() {
            events.extend(self.tick());
        }
        events
    }

    /// End the session without a winner, dropping any pending rollout
    pub fn abandon(&mut self) -> Vec<GameEvent> {
        if self.is_finished() {
            return Vec::new();
        }
        let skipped = self.disasters.cancel_rollout();
        info!(skipped = skipped.len(), "game abandoned");
        self.phase = GamePhase::Abandoned;
        vec![GameEvent::GameAbandoned]
    }

    fn check_winner(&mut self, events: &mut Vec<GameEvent>) {
        if self.is_finished() {
            return;
        }
        let Some(winner) = self.players.iter().find(|p| p.score >= self.points_to_win) else {
            return;
        };
        let (winner, score) = (winner.id, winner.score);
        let losers: Vec<PlayerId> =
            self.players.iter().map(|p| p.id).filter(|&id| id != winner).collect();

        info!(winner, score, "game won");
        self.phase = GamePhase::Finished { winner };
        events.push(GameEvent::GameWon { player: winner, score });
        events.push(GameEvent::GameLost { players: losers });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::GridPos;
    use pretty_assertions::assert_eq;

    fn new_game(players: usize, seed: u64) -> GameState {
        let mut config = GameConfig::seeded(seed);
        config.player_names.truncate(players);
        GameState::new(config).unwrap()
    }

    /// Place the first valid settlement and road for everyone, recording who placed
    fn complete_setup(game: &mut GameState) -> Vec<PlayerId> {
        let mut order = Vec::new();
        while matches!(game.phase, GamePhase::Preparation { .. }) {
            let player = game.current_player;
            if matches!(
                game.phase,
                GamePhase::Preparation {
                    placing: Placing::Settlement,
                    ..
                }
            ) {
                order.push(player);
            }
            let action = game.valid_actions(player)[0];
            game.apply_action(player, action).unwrap();
        }
        order
    }

    fn building(game: &mut GameState) {
        game.phase = GamePhase::MainTurn {
            step: TurnStep::Building,
        };
    }

    #[test]
    fn test_new_game_starts_in_preparation() {
        let game = new_game(4, 1);
        assert_eq!(game.player_count(), 4);
        assert_eq!(game.current_player, 1);
        assert_eq!(
            game.phase,
            GamePhase::Preparation {
                pass: PreparationPass::Forward,
                placing: Placing::Settlement
            }
        );
        assert_eq!(game.deck_len(), 24);
        assert!(game.get_player(0).is_none());
        assert_eq!(game.get_player(4).unwrap().id, 4);
    }

    #[test]
    fn test_preparation_order_four_players() {
        let mut game = new_game(4, 2);
        let order = complete_setup(&mut game);
        assert_eq!(order, vec![1, 2, 3, 4, 4, 3, 2, 1]);
        assert_eq!(game.current_player, 1);
        assert_eq!(
            game.phase,
            GamePhase::MainTurn {
                step: TurnStep::AwaitingRoll
            }
        );
        for player in &game.players {
            assert_eq!(player.settlements.len(), 2);
            assert_eq!(player.score, 2);
        }
    }

    #[test]
    fn test_preparation_order_two_players() {
        let mut game = new_game(2, 3);
        assert_eq!(complete_setup(&mut game), vec![1, 2, 2, 1]);
    }

    #[test]
    fn test_preparation_yields_every_tile_once() {
        let mut game = new_game(3, 4);
        let mut last_events = Vec::new();
        while matches!(game.phase, GamePhase::Preparation { .. }) {
            let action = game.valid_actions(game.current_player)[0];
            last_events = game.apply_action(game.current_player, action).unwrap();
        }
        assert!(last_events.contains(&GameEvent::PreparationFinished));

        let expected: u32 = game
            .board
            .tiles()
            .iter()
            .filter(|t| t.is_productive())
            .map(|t| t.yield_per_player.values().sum::<u32>())
            .sum();
        let held: u32 = game.players.iter().map(|p| p.resources.total()).sum();
        assert_eq!(held, expected);
    }

    #[test]
    fn test_preparation_road_must_touch_new_settlement() {
        let mut game = new_game(2, 5);
        let node = match game.valid_actions(1)[0] {
            GameAction::PlaceSettlement(node) => node,
            other => panic!("unexpected {other:?}"),
        };
        game.apply_action(1, GameAction::PlaceSettlement(node)).unwrap();

        let far_road = game
            .board
            .roads()
            .iter()
            .find(|r| !r.ends.contains(&node))
            .map(|r| r.id)
            .unwrap();
        assert_eq!(
            game.apply_action(1, GameAction::PlaceRoad(far_road)),
            Err(GameError::InvalidPlacement)
        );
        assert_eq!(
            game.apply_action(1, GameAction::PlaceSettlement(node)),
            Err(GameError::InvalidPhase)
        );
    }

    #[test]
    fn test_actions_out_of_turn_are_rejected() {
        let mut game = new_game(2, 6);
        assert!(game.valid_actions(2).is_empty());
        assert_eq!(
            game.apply_action(2, GameAction::RollDice),
            Err(GameError::NotYourTurn)
        );
    }

    #[test]
    fn test_roll_moves_to_building_or_bandit() {
        let mut game = new_game(2, 7);
        complete_setup(&mut game);
        let events = game.apply_action(1, GameAction::RollDice).unwrap();
        let GameEvent::DiceRolled { total, .. } = events[0] else {
            panic!("first event should be the roll");
        };
        let expected = if total == 7 {
            TurnStep::BanditPlacement
        } else {
            TurnStep::Building
        };
        assert_eq!(game.phase, GamePhase::MainTurn { step: expected });
        assert_eq!(
            game.apply_action(1, GameAction::RollDice),
            Err(GameError::InvalidPhase)
        );
    }

    #[test]
    fn test_dice_result_pays_owners_per_structure() {
        // ordered layout: (2,0) is Pasture 6, (2,1) is Farm 6
        let board = Board::with_layout(&crate::board::ordered_layout()).unwrap();
        let mut config = GameConfig::seeded(8);
        config.player_names.truncate(2);
        let mut game = GameState::with_board(config, board).unwrap();
        building(&mut game);

        let pasture = game.board.tile_at(GridPos::new(2, 0)).unwrap();
        let farm = game.board.tile_at(GridPos::new(2, 1)).unwrap();
        assert_eq!(game.board.tiles_for_dice(6), &[pasture, farm]);

        // north and south corners of the pasture stay clear of the farm
        let pasture_north = game.board.tile(pasture).dependent_nodes[0];
        let pasture_south = game.board.tile(pasture).dependent_nodes[3];
        let farm_north = game.board.tile(farm).dependent_nodes[0];
        let mut events = Vec::new();
        game.settle(1, pasture_north, false, &mut events).unwrap();
        game.settle(1, farm_north, false, &mut events).unwrap();
        game.settle(2, pasture_south, false, &mut events).unwrap();
        game.network.upgrade_to_town(&mut game.board, 2, pasture_south).unwrap();
        assert_eq!(game.board.tile(pasture).yield_count(1), 1);
        assert_eq!(game.board.tile(pasture).yield_count(2), 2);
        assert_eq!(game.board.tile(farm).yield_count(1), 1);
        assert_eq!(game.board.tile(farm).yield_count(2), 0);

        for p in &mut game.players {
            p.resources = ResourceHand::new();
        }

        // farm under a disaster
        game.board.set_suppressed(farm, true);
        game.process_dice_result(6);
        assert_eq!(game.players[0].resources, ResourceHand::single(Resource::Sheep, 1));
        assert_eq!(game.players[1].resources, ResourceHand::single(Resource::Sheep, 2));

        // farm under the bandit
        game.board.set_suppressed(farm, false);
        game.board.move_bandit(farm);
        game.process_dice_result(6);
        assert_eq!(game.players[0].resources, ResourceHand::single(Resource::Sheep, 2));
        assert_eq!(game.players[1].resources, ResourceHand::single(Resource::Sheep, 4));

        // bandit moves to the pasture, the farm pays again
        game.board.move_bandit(pasture);
        game.process_dice_result(6);
        assert_eq!(game.players[0].resources, ResourceHand::with_amounts(0, 0, 1, 2, 0));
        assert_eq!(game.players[1].resources, ResourceHand::single(Resource::Sheep, 4));
    }

    #[test]
    fn test_seven_discards_and_blocks_end_turn() {
        let mut game = new_game(2, 9);
        complete_setup(&mut game);
        building(&mut game);
        game.players[0].resources = ResourceHand::with_amounts(3, 2, 2, 1, 1);
        game.players[1].resources = ResourceHand::with_amounts(1, 1, 1, 1, 1);

        let events = game.process_dice_result(7);
        assert_eq!(game.players[0].resources.total(), 4);
        assert_eq!(game.players[1].resources.total(), 5);
        assert_eq!(events.len(), 1);
        assert_eq!(
            game.phase,
            GamePhase::MainTurn {
                step: TurnStep::BanditPlacement
            }
        );
        assert_eq!(game.apply_action(1, GameAction::EndTurn), Err(GameError::InvalidPhase));

        let desert = game.board.desert();
        assert_eq!(
            game.apply_action(1, GameAction::PlaceBandit(desert)),
            Err(GameError::InvalidPlacement)
        );
        let target = game
            .board
            .tiles()
            .iter()
            .find(|t| game.board.can_host_bandit(t.id))
            .map(|t| t.id)
            .unwrap();
        game.apply_action(1, GameAction::PlaceBandit(target)).unwrap();
        assert_eq!(game.board.bandit_tile(), target);
        assert!(game.board.tile(target).occupied_by_bandit);
        assert!(!game.board.tile(desert).occupied_by_bandit);
        assert!(game.apply_action(1, GameAction::EndTurn).is_ok());
    }

    #[test]
    fn test_bandit_steals_from_single_opponent() {
        let mut game = new_game(2, 10);
        complete_setup(&mut game);
        game.phase = GamePhase::MainTurn {
            step: TurnStep::BanditPlacement,
        };

        let target = game
            .board
            .tiles()
            .iter()
            .find(|t| {
                game.board.can_host_bandit(t.id) && game.board.players_on_tile(t.id) == vec![2]
            })
            .map(|t| t.id);
        let Some(target) = target else {
            return;
        };
        game.players[0].resources = ResourceHand::new();
        game.players[1].resources = ResourceHand::single(Resource::Ore, 1);

        let events = game.apply_action(1, GameAction::PlaceBandit(target)).unwrap();
        assert!(events.contains(&GameEvent::ResourceStolen {
            thief: 1,
            victim: 2,
            resource: Resource::Ore
        }));
        assert_eq!(game.players[0].resources.get(Resource::Ore), 1);
        assert!(game.players[1].resources.is_empty());
    }

    #[test]
    fn test_failed_build_changes_nothing() {
        let mut game = new_game(2, 11);
        complete_setup(&mut game);
        building(&mut game);
        game.players[0].resources = ResourceHand::with_amounts(1, 1, 0, 0, 0);

        let spot = game.network().road_spots(&game.board, 1)[0];
        let node = game.players[0].settlements[0];
        assert_eq!(
            game.apply_action(1, GameAction::BuildTown(node)),
            Err(GameError::InsufficientResources)
        );
        assert_eq!(game.players[0].resources, ResourceHand::with_amounts(1, 1, 0, 0, 0));

        game.apply_action(1, GameAction::BuildRoad(spot)).unwrap();
        assert!(game.players[0].resources.is_empty());
        assert_eq!(game.board.road(spot).owner, Some(1));
        assert_eq!(
            game.apply_action(1, GameAction::BuildRoad(spot)),
            Err(GameError::InvalidPlacement)
        );
    }

    #[test]
    fn test_town_adds_point_and_yield() {
        let mut game = new_game(2, 12);
        complete_setup(&mut game);
        building(&mut game);
        game.players[0].resources = costs::town();
        let node = game.players[0].settlements[0];

        let events = game.apply_action(1, GameAction::BuildTown(node)).unwrap();
        assert!(events.contains(&GameEvent::ScoreChanged { player: 1, score: 3 }));
        assert_eq!(game.players[0].towns, vec![node]);
        assert_eq!(game.players[0].settlements.len(), 1);
        for &tile in &game.board.node(node).affected_tiles {
            assert!(game.board.tile(tile).yield_count(1) >= 2);
        }
    }

    #[test]
    fn test_bank_trade() {
        let mut game = new_game(2, 13);
        complete_setup(&mut game);
        building(&mut game);
        game.players[0].conversion_rates = Default::default();
        game.players[0].resources = ResourceHand::single(Resource::Wood, 5);

        assert_eq!(
            game.apply_action(
                1,
                GameAction::BankTrade {
                    give: Resource::Wood,
                    receive: Resource::Wood
                }
            ),
            Err(GameError::InvalidTrade)
        );
        game.apply_action(
            1,
            GameAction::BankTrade {
                give: Resource::Wood,
                receive: Resource::Ore,
            },
        )
        .unwrap();
        assert_eq!(game.players[0].resources, ResourceHand::with_amounts(1, 0, 0, 0, 1));
        assert_eq!(
            game.apply_action(
                1,
                GameAction::BankTrade {
                    give: Resource::Wood,
                    receive: Resource::Ore
                }
            ),
            Err(GameError::InsufficientResources)
        );
    }

    #[test]
    fn test_bought_card_waits_a_turn() {
        let mut game = new_game(2, 14);
        complete_setup(&mut game);
        building(&mut game);
        game.players[0].resources = costs::development_card();

        let events = game.apply_action(1, GameAction::BuyDevelopmentCard).unwrap();
        let GameEvent::DevelopmentCardBought { kind, .. } = events[0] else {
            panic!("expected a purchase");
        };
        assert_eq!(game.deck_len(), 23);

        if kind == DevelopmentCardKind::Points {
            assert_eq!(game.players[0].score, 3);
        } else {
            assert_eq!(game.players[0].dev_cards_bought_this_turn, vec![kind]);
            assert!(!game.valid_actions(1).contains(&GameAction::PlayKnight));
            assert_eq!(
                game.apply_action(1, GameAction::PlayKnight),
                Err(GameError::NoSuchCard)
            );
            game.players[0].end_turn();
            assert_eq!(game.players[0].dev_cards, vec![kind]);
        }
    }

    #[test]
    fn test_empty_deck() {
        let mut game = new_game(2, 15);
        complete_setup(&mut game);
        building(&mut game);
        game.deck = DevelopmentDeck::default();
        game.players[0].resources = costs::development_card();
        assert_eq!(
            game.apply_action(1, GameAction::BuyDevelopmentCard),
            Err(GameError::EmptyDeck)
        );
        assert_eq!(game.players[0].resources, costs::development_card());
    }

    #[test]
    fn test_monopoly_and_one_card_per_turn() {
        let mut game = new_game(3, 16);
        complete_setup(&mut game);
        building(&mut game);
        for player in &mut game.players {
            player.resources = ResourceHand::single(Resource::Sheep, 2);
        }
        game.players[0].dev_cards =
            vec![DevelopmentCardKind::Monopoly, DevelopmentCardKind::Development];

        let events = game.apply_action(1, GameAction::PlayMonopoly(Resource::Sheep)).unwrap();
        assert_eq!(
            events,
            vec![GameEvent::MonopolyPlayed {
                player: 1,
                resource: Resource::Sheep,
                total_taken: 4
            }]
        );
        assert_eq!(game.players[0].resources.get(Resource::Sheep), 6);
        assert!(game.players[1].resources.is_empty());

        assert_eq!(
            game.apply_action(1, GameAction::PlayDevelopment(Resource::Ore, Resource::Ore)),
            Err(GameError::InvalidPhase)
        );
    }

    #[test]
    fn test_road_building_makes_two_roads_free() {
        let mut game = new_game(2, 17);
        complete_setup(&mut game);
        building(&mut game);
        game.players[0].resources = ResourceHand::new();
        game.players[0].dev_cards = vec![DevelopmentCardKind::RoadBuilding];

        game.apply_action(1, GameAction::PlayRoadBuilding).unwrap();
        for _ in 0..2 {
            let road = game.network().road_spots(&game.board, 1)[0];
            game.apply_action(1, GameAction::BuildRoad(road)).unwrap();
        }
        let road = game.network().road_spots(&game.board, 1)[0];
        assert_eq!(
            game.apply_action(1, GameAction::BuildRoad(road)),
            Err(GameError::InsufficientResources)
        );
    }

    #[test]
    fn test_knight_requires_bandit_move() {
        let mut game = new_game(2, 18);
        complete_setup(&mut game);
        building(&mut game);
        game.players[0].dev_cards = vec![DevelopmentCardKind::Knight];

        game.apply_action(1, GameAction::PlayKnight).unwrap();
        assert_eq!(
            game.phase,
            GamePhase::MainTurn {
                step: TurnStep::BanditPlacement
            }
        );
        assert!(game
            .valid_actions(1)
            .iter()
            .all(|a| !matches!(a, GameAction::EndTurn)));
    }

    #[test]
    fn test_reaching_points_to_win_ends_game() {
        let mut config = GameConfig::seeded(19);
        config.points_to_win = 3;
        config.player_names.truncate(3);
        let mut game = GameState::new(config).unwrap();
        complete_setup(&mut game);
        building(&mut game);
        game.players[0].resources = costs::town();
        let node = game.players[0].settlements[0];

        let events = game.apply_action(1, GameAction::BuildTown(node)).unwrap();
        assert!(events.contains(&GameEvent::GameWon { player: 1, score: 3 }));
        assert!(events.contains(&GameEvent::GameLost { players: vec![2, 3] }));
        assert_eq!(game.get_winner(), Some(1));
        assert_eq!(game.apply_action(1, GameAction::EndTurn), Err(GameError::GameOver));
        assert!(game.valid_actions(1).is_empty());
    }

    #[test]
    fn test_turns_wrap_around() {
        let mut game = new_game(2, 20);
        game.disasters = DisasterScheduler::new(crate::config::DisasterConfig {
            disaster_chance: 0.0,
            ..Default::default()
        });
        complete_setup(&mut game);

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(game.current_player);
            building(&mut game);
            game.apply_action(game.current_player, GameAction::EndTurn).unwrap();
        }
        assert_eq!(seen, vec![1, 2, 1, 2]);
        assert_eq!(game.turn_number, 5);
    }

    #[test]
    fn test_disaster_rollout_blocks_actions_until_ticked() {
        let mut game = new_game(2, 21);
        complete_setup(&mut game);

        for _ in 0..3 {
            building(&mut game);
            game.apply_action(game.current_player, GameAction::EndTurn).unwrap();
        }
        building(&mut game);
        let ending = game.current_player;
        let events = game.apply_action(ending, GameAction::EndTurn).unwrap();
        assert!(events.iter().any(|e| matches!(e, GameEvent::DisasterStarted { .. })));
        assert_eq!(game.phase, GamePhase::DisasterRollout);
        assert!(!game.is_phase_complete());
        assert_eq!(
            game.apply_action(ending, GameAction::RollDice),
            Err(GameError::InvalidPhase)
        );

        let events = game.run_pending_steps();
        assert!(events.iter().any(|e| matches!(e, GameEvent::DisasterActivated { .. })));
        assert!(game.is_phase_complete());
        assert_ne!(game.current_player, ending);
        assert_eq!(
            game.phase,
            GamePhase::MainTurn {
                step: TurnStep::AwaitingRoll
            }
        );
    }

    #[test]
    fn test_abandon_drops_pending_rollout() {
        let mut game = new_game(2, 22);
        complete_setup(&mut game);
        for _ in 0..4 {
            building(&mut game);
            game.apply_action(game.current_player, GameAction::EndTurn).unwrap();
        }
        assert_eq!(game.phase, GamePhase::DisasterRollout);

        let events = game.abandon();
        assert_eq!(events, vec![GameEvent::GameAbandoned]);
        assert!(game.is_finished());
        assert!(game.tick().is_empty());
        assert_eq!(
            game.apply_action(game.current_player, GameAction::RollDice),
            Err(GameError::GameOver)
        );
    }
}
