//! Hexfall - a hex settlement game where natural disasters shut down the land
//!
//! This crate provides the simulation core for Hexfall, including:
//! - Hex coordinate system and the 19-tile island board
//! - Dice-driven resource yield, the bandit and its discard rule
//! - Player economy with building costs and bank conversion rates
//! - Road and settlement graph with per-player access tracking
//! - Disasters that suppress tiles for a few turns
//! - Turn/phase state machine with full rule enforcement
//!
//! # Architecture
//!
//! Everything is single-threaded and turn-driven. [`GameState`] is the
//! session context: it owns the board, the players, the road network, the
//! disaster scheduler, the development deck and one seeded RNG, so a session
//! built from the same [`GameConfig`] seed plays out identically.
//!
//! # Modules
//!
//! - [`hex`]: Coordinate system for tiles, vertices, and edges
//! - [`board`]: Tiles, nodes and roads in an arena, neighbor queries, yield
//! - [`player`]: Resource hands, conversion rates, costs
//! - [`network`]: Who may build which road or node
//! - [`disaster`]: Disaster selection, rollout and countdown
//! - [`cards`]: Development card catalog and deck
//! - [`config`]: Session configuration
//! - [`game`]: Game state machine
//! - [`bot`]: Automated players

pub mod actions;
pub mod board;
pub mod bot;
pub mod cards;
pub mod config;
pub mod disaster;
pub mod game;
pub mod hex;
pub mod network;
pub mod player;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent};
pub use board::{
    Board, BoardError, NodeId, NodeSpecialty, PlayerId, Resource, RoadId, Tile, TileId, TileType,
};
pub use bot::{Bot, BotDifficulty};
pub use cards::{CardCatalog, CatalogError, DevelopmentCardKind, DevelopmentDeck};
pub use config::{ConfigError, DisasterConfig, GameConfig};
pub use disaster::{DisasterArea, DisasterDefinition, DisasterPhase, DisasterScheduler};
pub use game::{GameError, GamePhase, GameState, Placing, PreparationPass, SetupError, TurnStep};
pub use hex::{EdgeCoord, EdgeDirection, GridPos, HexCoord, VertexCoord, VertexDirection};
pub use network::RoadNetwork;
pub use player::{ConversionRates, Player, PlayerColor, ResourceHand};
