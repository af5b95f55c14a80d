//! Disaster scheduling.
//!
//! A disaster waits for a countdown, strikes its tiles one at a time (the
//! rollout, advanced by external ticks), suppresses their yield for its
//! duration and then lifts. Which tiles are hit depends on the disaster:
//! every tile of one type, the ring around the desert, a random tornado path
//! or a scatter of coastal tiles.

use crate::actions::GameEvent;
use crate::board::{Board, SpreadDirection, TileId, TileType};
use crate::config::DisasterConfig;
use crate::hex::GridPos;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

/// Where tornadoes enter the island and which way they travel
const TORNADO_STARTS: [(GridPos, SpreadDirection); 4] = [
    (GridPos::new(4, 3), SpreadDirection::Down),
    (GridPos::new(0, 2), SpreadDirection::Up),
    (GridPos::new(2, 0), SpreadDirection::Right),
    (GridPos::new(2, 4), SpreadDirection::Left),
];

/// Chance per missing neighbor that a tornado dies out
const TORNADO_STOP_CHANCE: f64 = 0.33;

/// Tornado neighbor count below which it may die out
const TORNADO_WIDE_FRONT: usize = 3;

/// Redraws allowed when the weighted draw keeps returning the previous disaster
const MAX_REDRAWS: usize = 32;

/// Which tiles a disaster hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisasterArea {
    /// Every tile of one type
    TileType(TileType),
    /// Every tile next to the desert
    DesertRing,
    /// A random path across the island
    Tornado,
    /// A random part of the coast
    Tsunami,
}

/// Static description of a disaster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterDefinition {
    pub id: u32,
    pub name: String,
    /// Turns the disaster stays after its rollout
    pub duration: u32,
    /// Tiles hit by this disaster are spared by the next one
    pub grants_immunity: bool,
    /// Selection weight, all weights sum to at most 1
    pub probability: f64,
    pub area: DisasterArea,
}

impl DisasterDefinition {
    fn new(
        id: u32,
        name: &str,
        duration: u32,
        grants_immunity: bool,
        probability: f64,
        area: DisasterArea,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            duration,
            grants_immunity,
            probability,
            area,
        }
    }
}

/// The eight disasters of the standard game
pub fn standard_disasters() -> Vec<DisasterDefinition> {
    let all = DisasterArea::TileType;
    vec![
        DisasterDefinition::new(0, "Wolf pack", 3, false, 0.16, all(TileType::Pasture)),
        DisasterDefinition::new(1, "Bark beetle", 3, false, 0.16, all(TileType::Forest)),
        DisasterDefinition::new(2, "Mold", 3, false, 0.16, all(TileType::Farm)),
        DisasterDefinition::new(3, "Volcano", 4, true, 0.12, all(TileType::Mountain)),
        DisasterDefinition::new(4, "Mine collapse", 4, true, 0.12, all(TileType::Claypit)),
        DisasterDefinition::new(5, "Sandstorm", 5, true, 0.10, DisasterArea::DesertRing),
        DisasterDefinition::new(6, "Tornado", 6, true, 0.09, DisasterArea::Tornado),
        DisasterDefinition::new(7, "Tsunami", 6, true, 0.09, DisasterArea::Tsunami),
    ]
}

/// Tiles waiting to be struck, one every `stagger` ticks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollout {
    pending: VecDeque<TileId>,
    struck: Vec<TileId>,
    stagger: u32,
    ticks_until_next: u32,
}

impl Rollout {
    fn new(tiles: Vec<TileId>, stagger: u32) -> Self {
        let stagger = stagger.max(1);
        Self {
            pending: tiles.into(),
            struck: Vec::new(),
            stagger,
            ticks_until_next: stagger,
        }
    }

    /// Advance one tick, returning the tile struck on it
    fn tick(&mut self) -> Option<TileId> {
        if self.pending.is_empty() {
            return None;
        }
        self.ticks_until_next = self.ticks_until_next.saturating_sub(1);
        if self.ticks_until_next > 0 {
            return None;
        }
        self.ticks_until_next = self.stagger;
        let tile = self.pending.pop_front()?;
        self.struck.push(tile);
        Some(tile)
    }

    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Scheduler state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DisasterPhase {
    /// Counting down to the next disaster
    Dormant { turns_until_next: u32 },
    /// Striking tiles one tick at a time
    RollingOut { disaster: usize, rollout: Rollout },
    /// Suppressing its tiles
    Active {
        disaster: usize,
        turns_left: i32,
        tiles: Vec<TileId>,
    },
}

/// Decides when disasters happen and which tiles they hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisasterScheduler {
    config: DisasterConfig,
    phase: DisasterPhase,
    previous: Option<usize>,
    /// Tiles spared by the next disaster
    immune: Vec<TileId>,
}

impl DisasterScheduler {
    pub fn new(config: DisasterConfig) -> Self {
        let phase = DisasterPhase::Dormant {
            turns_until_next: config.first_disaster_in,
        };
        Self {
            config,
            phase,
            previous: None,
            immune: Vec::new(),
        }
    }

    pub fn phase(&self) -> &DisasterPhase {
        &self.phase
    }

    pub fn is_rolling_out(&self) -> bool {
        matches!(self.phase, DisasterPhase::RollingOut { .. })
    }

    pub fn immune_tiles(&self) -> &[TileId] {
        &self.immune
    }

    /// Account for one finished turn
    pub fn process_turn<R: Rng>(&mut self, board: &mut Board, rng: &mut R) -> Vec<GameEvent> {
        match &mut self.phase {
            DisasterPhase::Dormant { turns_until_next } => {
                *turns_until_next = turns_until_next.saturating_sub(1);
                if *turns_until_next > 0 {
                    return Vec::new();
                }
                if rng.gen::<f64>() < self.config.disaster_chance {
                    self.initialise(board, rng)
                } else {
                    debug!("disaster skipped");
                    self.phase = DisasterPhase::Dormant {
                        turns_until_next: self.next_countdown(rng),
                    };
                    Vec::new()
                }
            }
            DisasterPhase::RollingOut { .. } => {
                warn!("turn processed while a disaster is still rolling out");
                Vec::new()
            }
            DisasterPhase::Active { turns_left, .. } => {
                *turns_left -= 1;
                if *turns_left < 0 {
                    self.lift(board, rng)
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Advance the rollout by one step
    pub fn tick(&mut self, board: &mut Board) -> Vec<GameEvent> {
        let DisasterPhase::RollingOut { disaster, rollout } = &mut self.phase else {
            return Vec::new();
        };
        let disaster = *disaster;
        let Some(definition) = self.config.definitions.get(disaster) else {
            error!(disaster, "rolling out an unknown disaster");
            self.phase = DisasterPhase::Dormant {
                turns_until_next: self.config.first_disaster_in,
            };
            return Vec::new();
        };

        let mut events = Vec::new();
        if let Some(tile) = rollout.tick() {
            board.set_suppressed(tile, true);
            events.push(GameEvent::DisasterTileStruck {
                disaster: definition.id,
                tile,
            });
        }

        if rollout.is_complete() {
            let tiles = rollout.struck.clone();
            info!(disaster = %definition.name, turns = definition.duration, "disaster active");
            events.push(GameEvent::DisasterActivated {
                disaster: definition.id,
                turns: definition.duration,
            });
            self.phase = DisasterPhase::Active {
                disaster,
                turns_left: definition.duration as i32,
                tiles,
            };
        }
        events
    }

    /// Drop the rest of a rollout when the game ends, returning the tiles never struck
    pub fn cancel_rollout(&mut self) -> Vec<TileId> {
        match &mut self.phase {
            DisasterPhase::RollingOut { rollout, .. } => {
                let skipped: Vec<TileId> = rollout.pending.drain(..).collect();
                debug!(skipped = skipped.len(), "disaster rollout cancelled");
                skipped
            }
            _ => Vec::new(),
        }
    }

    fn initialise<R: Rng>(&mut self, board: &Board, rng: &mut R) -> Vec<GameEvent> {
        let Some(index) = self.select_disaster(rng) else {
            warn!("no disasters configured");
            self.phase = DisasterPhase::Dormant {
                turns_until_next: self.next_countdown(rng),
            };
            return Vec::new();
        };
        self.previous = Some(index);

        let definition = &self.config.definitions[index];
        let mut tiles = affected_tiles(definition.area, board, rng, self.config.tornado_min_steps);
        let immune = std::mem::take(&mut self.immune);
        tiles.retain(|tile| !immune.contains(tile));

        info!(disaster = %definition.name, tiles = tiles.len(), "disaster strikes");
        let event = GameEvent::DisasterStarted {
            disaster: definition.id,
            name: definition.name.clone(),
            tiles: tiles.clone(),
        };
        self.phase = DisasterPhase::RollingOut {
            disaster: index,
            rollout: Rollout::new(tiles, self.config.rollout_stagger_ticks),
        };
        vec![event]
    }

    fn lift<R: Rng>(&mut self, board: &mut Board, rng: &mut R) -> Vec<GameEvent> {
        let next = DisasterPhase::Dormant {
            turns_until_next: self.next_countdown(rng),
        };
        let DisasterPhase::Active { disaster, tiles, .. } = std::mem::replace(&mut self.phase, next)
        else {
            return Vec::new();
        };
        for &tile in &tiles {
            board.set_suppressed(tile, false);
        }

        let Some(definition) = self.config.definitions.get(disaster) else {
            error!(disaster, "lifting an unknown disaster");
            return Vec::new();
        };
        if definition.grants_immunity {
            self.immune = tiles.clone();
        }
        info!(disaster = %definition.name, "disaster lifted");
        vec![GameEvent::DisasterEnded {
            disaster: definition.id,
            name: definition.name.clone(),
            tiles,
        }]
    }

    /// Weighted draw that never repeats the previous disaster when there is a choice
    fn select_disaster<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        let definitions = &self.config.definitions;
        let mut index = draw_weighted(definitions, rng)?;
        if definitions.len() < 2 {
            return Some(index);
        }
        let mut redraws = 0;
        while Some(index) == self.previous {
            if redraws == MAX_REDRAWS {
                // first other disaster that can actually be drawn
                let len = definitions.len();
                let other = (1..len)
                    .map(|step| (index + step) % len)
                    .find(|&i| definitions[i].probability > 0.0);
                return Some(other.unwrap_or(index));
            }
            index = draw_weighted(definitions, rng)?;
            redraws += 1;
        }
        Some(index)
    }

    fn next_countdown<R: Rng>(&self, rng: &mut R) -> u32 {
        let (min, max) = (self.config.min_turns_between, self.config.max_turns_between);
        if min < max {
            rng.gen_range(min..max)
        } else {
            min
        }
    }
}

/// Cumulative-probability draw against a uniform sample in `[0, 1)`.
///
/// Falls back to the last definition when the weights leave a gap.
pub fn draw_weighted<R: Rng>(definitions: &[DisasterDefinition], rng: &mut R) -> Option<usize> {
    if definitions.is_empty() {
        return None;
    }
    let sample: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (index, definition) in definitions.iter().enumerate() {
        cumulative += definition.probability;
        if cumulative >= sample {
            return Some(index);
        }
    }
    Some(definitions.len() - 1)
}

/// Tiles a disaster of the given area would hit on this board
pub fn affected_tiles<R: Rng>(
    area: DisasterArea,
    board: &Board,
    rng: &mut R,
    tornado_min_steps: u32,
) -> Vec<TileId> {
    match area {
        DisasterArea::TileType(tile_type) => board.tiles_of_type(tile_type),
        DisasterArea::DesertRing => board.desert_ring().to_vec(),
        DisasterArea::Tornado => tornado_path(board, rng, tornado_min_steps),
        DisasterArea::Tsunami => tsunami_tiles(board, rng),
    }
}

/// Random walk from one of the four entry points.
///
/// Once fewer than three tiles lie ahead and the minimum step count is used
/// up, each step may end the walk with probability `(3 - ahead) * 0.33`.
pub fn tornado_path<R: Rng>(board: &Board, rng: &mut R, min_steps: u32) -> Vec<TileId> {
    let (start, direction) = TORNADO_STARTS[rng.gen_range(0..TORNADO_STARTS.len())];
    let Some(start_tile) = board.tile_at(start) else {
        error!(?start, "tornado entry point has no tile");
        return Vec::new();
    };

    let mut path = vec![start_tile];
    let mut ahead = board.appendent_tiles(start, direction);
    let mut floor = i64::from(min_steps);

    while !ahead.is_empty() {
        if ahead.len() < TORNADO_WIDE_FRONT && floor <= 0 {
            let stop_chance = (TORNADO_WIDE_FRONT - ahead.len()) as f64 * TORNADO_STOP_CHANCE;
            if rng.gen::<f64>() <= stop_chance {
                break;
            }
        }
        floor -= 1;

        let Some(&step) = ahead.choose(rng) else {
            break;
        };
        if path.contains(&step) {
            break;
        }
        path.push(step);
        ahead = board.appendent_tiles(board.tile(step).pos, direction);
    }
    path
}

/// Shuffle the coast and keep between half (rounded up) and all of it
pub fn tsunami_tiles<R: Rng>(board: &Board, rng: &mut R) -> Vec<TileId> {
    let mut coast = board.coastal_tiles().to_vec();
    if coast.is_empty() {
        return coast;
    }
    coast.shuffle(rng);
    let n = coast.len();
    let amount = rng.gen_range((n + 1) / 2..=n);
    coast.truncate(amount);
    coast
}
