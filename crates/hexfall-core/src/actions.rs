//! Game actions that players can take.
//!
//! This module defines all possible actions in the game and the events
//! that result from those actions.

use crate::board::{NodeId, NodeSpecialty, PlayerId, Resource, RoadId, TileId};
use crate::cards::DevelopmentCardKind;
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Preparation ====================
    /// Free settlement during the preparation round
    PlaceSettlement(NodeId),
    /// Free road next to the settlement just placed
    PlaceRoad(RoadId),

    // ==================== Turn Actions ====================
    /// Roll two dice (start of every main turn)
    RollDice,
    /// Move the bandit after a 7 or a knight
    PlaceBandit(TileId),

    // ==================== Building ====================
    BuildSettlement(NodeId),
    /// Upgrade one of your settlements
    BuildTown(NodeId),
    BuildRoad(RoadId),
    BuyDevelopmentCard,

    // ==================== Development Cards ====================
    PlayKnight,
    /// Next two roads are free
    PlayRoadBuilding,
    /// Take two resources from the bank
    PlayDevelopment(Resource, Resource),
    /// Take every unit of one resource from all other players
    PlayMonopoly(Resource),

    // ==================== Trading ====================
    /// Trade with the bank at the player's conversion rate
    BankTrade { give: Resource, receive: Resource },

    // ==================== Turn Management ====================
    EndTurn,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    DiceRolled {
        player: PlayerId,
        roll: (u8, u8),
        total: u8,
    },

    /// Tiles produced after a roll or at the end of preparation
    ResourcesYielded {
        grants: Vec<(PlayerId, Resource, u32)>,
    },

    /// Cards lost to the bandit rule
    ResourcesDiscarded {
        player: PlayerId,
        resources: Vec<Resource>,
    },

    BanditMoved {
        player: PlayerId,
        from: TileId,
        to: TileId,
    },

    /// One resource taken by the bandit; discarded when thief and victim are the same
    ResourceStolen {
        thief: PlayerId,
        victim: PlayerId,
        resource: Resource,
    },

    SettlementBuilt {
        player: PlayerId,
        node: NodeId,
    },

    TownBuilt {
        player: PlayerId,
        node: NodeId,
    },

    RoadBuilt {
        player: PlayerId,
        road: RoadId,
    },

    ScoreChanged {
        player: PlayerId,
        score: u32,
    },

    /// A settlement landed on a specialty node
    ConversionRatesChanged {
        player: PlayerId,
        specialty: NodeSpecialty,
    },

    BankTradeCompleted {
        player: PlayerId,
        gave: Resource,
        gave_count: u32,
        received: Resource,
    },

    DevelopmentCardBought {
        player: PlayerId,
        kind: DevelopmentCardKind,
    },

    KnightPlayed {
        player: PlayerId,
    },

    RoadBuildingPlayed {
        player: PlayerId,
    },

    DevelopmentPlayed {
        player: PlayerId,
        resources: (Resource, Resource),
    },

    MonopolyPlayed {
        player: PlayerId,
        resource: Resource,
        total_taken: u32,
    },

    PreparationFinished,

    TurnStarted {
        player: PlayerId,
    },

    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    // ==================== Disasters ====================
    DisasterStarted {
        disaster: u32,
        name: String,
        tiles: Vec<TileId>,
    },

    DisasterTileStruck {
        disaster: u32,
        tile: TileId,
    },

    /// Rollout finished, the disaster now counts down
    DisasterActivated {
        disaster: u32,
        turns: u32,
    },

    DisasterEnded {
        disaster: u32,
        name: String,
        tiles: Vec<TileId>,
    },

    // ==================== Game End ====================
    GameWon {
        player: PlayerId,
        score: u32,
    },

    GameLost {
        players: Vec<PlayerId>,
    },

    GameAbandoned,
}
