//! Board topology: tiles, nodes and roads.
//!
//! This module contains:
//! - Resource and tile types
//! - The tile/node/road arena addressed by integer handles
//! - Layout generation from spawn positions
//! - Grid neighbor queries driven by per-row offset tables
//! - Per-tile yield bookkeeping (yield counts, bandit, disaster suppression)

use crate::hex::{EdgeCoord, GridPos, HexCoord, VertexCoord};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, error};

/// Player identifier, players are numbered from 1
pub type PlayerId = u8;

/// Resource types produced by tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    Wood,
    Clay,
    Wheat,
    Sheep,
    Ore,
}

impl Resource {
    pub const COUNT: usize = 5;

    /// All resource types, in table order
    pub const ALL: [Resource; Resource::COUNT] = [
        Resource::Wood,
        Resource::Clay,
        Resource::Wheat,
        Resource::Sheep,
        Resource::Ore,
    ];

    /// Position of this resource in per-resource tables
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Type of a land tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileType {
    Forest,
    Pasture,
    Farm,
    Claypit,
    Mountain,
    Desert,
}

impl TileType {
    pub const ALL: [TileType; 6] = [
        TileType::Forest,
        TileType::Pasture,
        TileType::Farm,
        TileType::Claypit,
        TileType::Mountain,
        TileType::Desert,
    ];

    /// Resource produced by this tile type, `None` for the desert
    pub fn resource(self) -> Option<Resource> {
        match self {
            TileType::Forest => Some(Resource::Wood),
            TileType::Pasture => Some(Resource::Sheep),
            TileType::Farm => Some(Resource::Wheat),
            TileType::Claypit => Some(Resource::Clay),
            TileType::Mountain => Some(Resource::Ore),
            TileType::Desert => None,
        }
    }
}

/// Handle of a tile in the board arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub usize);

/// Handle of a node (tile corner) in the board arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Handle of a road (tile side) in the board arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoadId(pub usize);

/// Building standing on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Structure {
    Settlement,
    Town,
}

/// Trading bonus attached to some coastal nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeSpecialty {
    #[default]
    None,
    /// Every conversion rate drops to 3
    ReducedTrading,
    /// The conversion rate of one resource drops to 2
    Resource(Resource),
}

/// Errors raised while building a board
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("board configuration mismatch: {0}")]
    ConfigurationMismatch(String),
}

/// A single land tile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub pos: GridPos,
    pub hex: HexCoord,
    pub tile_type: TileType,
    /// Dice number that triggers production (2-12, None for desert)
    pub dice_number: Option<u8>,
    /// Nodes on the corners of this tile
    pub dependent_nodes: Vec<NodeId>,
    /// Units each player receives when this tile yields
    pub yield_per_player: BTreeMap<PlayerId, u32>,
    pub occupied_by_bandit: bool,
    pub suppressed_by_disaster: bool,
}

impl Tile {
    fn new(id: TileId, pos: GridPos, tile_type: TileType, dice_number: Option<u8>) -> Self {
        let is_desert = tile_type == TileType::Desert;
        Self {
            id,
            pos,
            hex: pos.to_hex(),
            tile_type,
            dice_number: if is_desert { None } else { dice_number },
            dependent_nodes: Vec::new(),
            yield_per_player: BTreeMap::new(),
            occupied_by_bandit: is_desert,
            suppressed_by_disaster: false,
        }
    }

    pub fn resource(&self) -> Option<Resource> {
        self.tile_type.resource()
    }

    /// Whether a matching roll currently produces anything here
    pub fn is_productive(&self) -> bool {
        self.resource().is_some() && !self.occupied_by_bandit && !self.suppressed_by_disaster
    }

    pub fn yield_count(&self, player: PlayerId) -> u32 {
        self.yield_per_player.get(&player).copied().unwrap_or(0)
    }
}

/// A tile corner where settlements and towns stand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub coord: VertexCoord,
    pub buildable: bool,
    pub has_building: bool,
    pub upgradeable: bool,
    pub owner: Option<PlayerId>,
    pub structure: Option<Structure>,
    pub affected_tiles: Vec<TileId>,
    pub neighbors: Vec<NodeId>,
    pub roads: Vec<RoadId>,
    pub specialty: NodeSpecialty,
}

impl Node {
    fn new(id: NodeId, coord: VertexCoord) -> Self {
        Self {
            id,
            coord,
            buildable: true,
            has_building: false,
            upgradeable: false,
            owner: None,
            structure: None,
            affected_tiles: Vec::new(),
            neighbors: Vec::new(),
            roads: Vec::new(),
            specialty: NodeSpecialty::None,
        }
    }
}

/// A tile side connecting two nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Road {
    pub id: RoadId,
    pub coord: EdgeCoord,
    pub ends: [NodeId; 2],
    pub owner: Option<PlayerId>,
    pub buildable: bool,
    /// Unbuilt roads the owner reaches through this road, keyed by the endpoint they hang off
    pub reachable_via: BTreeMap<NodeId, Vec<RoadId>>,
}

impl Road {
    fn new(id: RoadId, coord: EdgeCoord, ends: [NodeId; 2]) -> Self {
        Self {
            id,
            coord,
            ends,
            owner: None,
            buildable: true,
            reachable_via: BTreeMap::new(),
        }
    }

    /// The endpoint opposite `node`, if `node` is an endpoint at all
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        match self.ends {
            [a, b] if a == node => Some(b),
            [a, b] if b == node => Some(a),
            _ => None,
        }
    }
}

/// Direction of travel for directional neighbor queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadDirection {
    /// Towards higher rows (north)
    Up,
    /// Towards lower rows (south)
    Down,
    Left,
    Right,
}

/// Number of rows and columns in the unpadded grid
const ROWS: usize = 5;
const COLS: usize = 5;

/// Padded grid size: one empty cell on every side
const GRID_SIZE: usize = ROWS + 2;

/// Column offset of the second tile in the row above, per row
const UPPER_DIAGONAL: [i16; ROWS] = [1, -1, 1, 1, 1];

/// Column offset of the second tile in the row below, per row
const LOWER_DIAGONAL: [i16; ROWS] = [-1, -1, 1, -1, -1];

pub const TILE_COUNT: usize = 19;

/// Spawn positions of the standard island, south to north
pub const STANDARD_SPAWN_POSITIONS: [GridPos; TILE_COUNT] = [
    GridPos::new(0, 1),
    GridPos::new(0, 2),
    GridPos::new(0, 3),
    GridPos::new(1, 1),
    GridPos::new(1, 2),
    GridPos::new(1, 3),
    GridPos::new(1, 4),
    GridPos::new(2, 0),
    GridPos::new(2, 1),
    GridPos::new(2, 2),
    GridPos::new(2, 3),
    GridPos::new(2, 4),
    GridPos::new(3, 1),
    GridPos::new(3, 2),
    GridPos::new(3, 3),
    GridPos::new(3, 4),
    GridPos::new(4, 2),
    GridPos::new(4, 3),
    GridPos::new(4, 4),
];

/// Tiles on the shoreline
pub const COASTAL_POSITIONS: [GridPos; 12] = [
    GridPos::new(0, 1),
    GridPos::new(0, 2),
    GridPos::new(0, 3),
    GridPos::new(1, 1),
    GridPos::new(1, 4),
    GridPos::new(2, 0),
    GridPos::new(2, 4),
    GridPos::new(3, 1),
    GridPos::new(3, 4),
    GridPos::new(4, 2),
    GridPos::new(4, 3),
    GridPos::new(4, 4),
];

/// Non-desert tile types and how many of each the island has
const TILE_MULTISET: [(TileType, usize); 5] = [
    (TileType::Forest, 4),
    (TileType::Pasture, 4),
    (TileType::Farm, 4),
    (TileType::Claypit, 3),
    (TileType::Mountain, 3),
];

const DICE_NUMBERS: [u8; TILE_COUNT - 1] =
    [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

/// Number of coastal roads that carry a trading specialty
const SPECIALTY_ROADS: usize = 9;

/// One tile of a layout: where it sits, what it is, which number it has
pub type TileSpec = (GridPos, TileType, Option<u8>);

/// The game board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    tiles: Vec<Tile>,
    nodes: Vec<Node>,
    roads: Vec<Road>,
    grid: [[Option<TileId>; GRID_SIZE]; GRID_SIZE],
    tiles_by_dice: BTreeMap<u8, Vec<TileId>>,
    tiles_by_resource: [Vec<TileId>; Resource::COUNT],
    desert: TileId,
    coastal: Vec<TileId>,
    desert_ring: Vec<TileId>,
    bandit: TileId,
}

impl Board {
    /// Standard island with shuffled tiles, numbers and specialties
    pub fn standard() -> Self {
        let mut rng = rand::thread_rng();
        Self::standard_with_rng(&mut rng)
    }

    /// Standard island using the provided RNG
    pub fn standard_with_rng<R: Rng>(rng: &mut R) -> Self {
        let layout = Self::shuffled_layout(&STANDARD_SPAWN_POSITIONS, rng);
        let mut board = Self::build(&layout);
        board.assign_specialties(rng);
        board
    }

    /// Spawn a board on the given positions with shuffled tile types and numbers.
    ///
    /// Exactly 19 distinct positions inside the grid are required.
    pub fn generate_layout<R: Rng>(
        spawn_positions: &[GridPos],
        rng: &mut R,
    ) -> Result<Self, BoardError> {
        validate_positions(spawn_positions.iter().copied())?;
        let layout = Self::shuffled_layout(spawn_positions, rng);
        let mut board = Self::build(&layout);
        board.assign_specialties(rng);
        debug!(desert = ?board.tile(board.desert).pos, "board layout generated");
        Ok(board)
    }

    /// Build a board from an explicit layout (no shuffling, no specialties).
    ///
    /// The layout must use the standard tile and dice-number sets: one
    /// numberless desert, every other tile numbered.
    pub fn with_layout(layout: &[TileSpec]) -> Result<Self, BoardError> {
        validate_positions(layout.iter().map(|(pos, _, _)| *pos))?;
        validate_tiles(layout)?;
        Ok(Self::build(layout))
    }

    fn shuffled_layout<R: Rng>(positions: &[GridPos], rng: &mut R) -> Vec<TileSpec> {
        let mut kinds: Vec<TileType> = TILE_MULTISET
            .iter()
            .flat_map(|&(kind, count)| std::iter::repeat(kind).take(count))
            .collect();
        kinds.shuffle(rng);

        let mut numbers = DICE_NUMBERS.to_vec();
        numbers.shuffle(rng);

        let mut assignments: Vec<(TileType, Option<u8>)> =
            kinds.into_iter().zip(numbers.into_iter().map(Some)).collect();
        let desert_index = rng.gen_range(0..=assignments.len());
        assignments.insert(desert_index, (TileType::Desert, None));

        positions
            .iter()
            .zip(assignments)
            .map(|(pos, (kind, number))| (*pos, kind, number))
            .collect()
    }

    /// Assemble tiles, indexes and the node/road graph. Positions must be valid.
    fn build(layout: &[TileSpec]) -> Self {
        let mut board = Self {
            tiles: Vec::with_capacity(layout.len()),
            nodes: Vec::new(),
            roads: Vec::new(),
            grid: [[None; GRID_SIZE]; GRID_SIZE],
            tiles_by_dice: BTreeMap::new(),
            tiles_by_resource: Default::default(),
            desert: TileId(0),
            coastal: Vec::new(),
            desert_ring: Vec::new(),
            bandit: TileId(0),
        };

        for (index, &(pos, kind, number)) in layout.iter().enumerate() {
            let id = TileId(index);
            let tile = Tile::new(id, pos, kind, number);
            if kind == TileType::Desert {
                board.desert = id;
                board.bandit = id;
            }
            if let Some(n) = tile.dice_number {
                board.tiles_by_dice.entry(n).or_default().push(id);
            }
            if let Some(resource) = kind.resource() {
                board.tiles_by_resource[resource.index()].push(id);
            }
            board.grid[pos.row as usize + 1][pos.col as usize + 1] = Some(id);
            board.tiles.push(tile);
        }

        board.build_graph();
        board.coastal = COASTAL_POSITIONS.iter().filter_map(|&pos| board.tile_at(pos)).collect();
        let desert_pos = board.tile(board.desert).pos;
        board.desert_ring = board.surrounding_tiles(desert_pos);
        board
    }

    /// Derive nodes and roads from the hex geometry of the placed tiles
    fn build_graph(&mut self) {
        let mut node_index: HashMap<VertexCoord, NodeId> = HashMap::new();
        let mut road_index: HashMap<EdgeCoord, RoadId> = HashMap::new();

        for tile_index in 0..self.tiles.len() {
            let tile_id = TileId(tile_index);
            let hex = self.tiles[tile_index].hex;

            for vertex in hex.vertices() {
                let node = intern_node(&mut self.nodes, &mut node_index, vertex);
                self.nodes[node.0].affected_tiles.push(tile_id);
                self.tiles[tile_index].dependent_nodes.push(node);
            }

            for edge in hex.edges() {
                if road_index.contains_key(&edge) {
                    continue;
                }
                let [a, b] = edge.endpoints();
                let a = intern_node(&mut self.nodes, &mut node_index, a);
                let b = intern_node(&mut self.nodes, &mut node_index, b);
                let id = RoadId(self.roads.len());
                self.roads.push(Road::new(id, edge, [a, b]));
                road_index.insert(edge, id);

                self.nodes[a.0].roads.push(id);
                self.nodes[b.0].roads.push(id);
                self.nodes[a.0].neighbors.push(b);
                self.nodes[b.0].neighbors.push(a);
            }
        }
    }

    /// Put trading specialties on both ends of nine coastal roads spread around the shore
    fn assign_specialties<R: Rng>(&mut self, rng: &mut R) {
        let land: HashSet<HexCoord> = self.tiles.iter().map(|t| t.hex).collect();
        let mut coastal: Vec<(f64, RoadId)> = self
            .roads
            .iter()
            .filter(|road| {
                road.coord
                    .touching_hexes()
                    .iter()
                    .filter(|hex| land.contains(hex))
                    .count()
                    == 1
            })
            .map(|road| {
                let (x, y) = road.coord.to_pixel(1.0);
                (y.atan2(x), road.id)
            })
            .collect();
        if coastal.len() < SPECIALTY_ROADS {
            return;
        }
        coastal.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut specialties = vec![NodeSpecialty::ReducedTrading; 4];
        specialties.extend(Resource::ALL.map(NodeSpecialty::Resource));
        specialties.shuffle(rng);

        for (slot, specialty) in specialties.into_iter().enumerate() {
            let (_, road) = coastal[slot * coastal.len() / SPECIALTY_ROADS];
            for node in self.roads[road.0].ends {
                self.nodes[node.0].specialty = specialty;
            }
        }
    }

    // ==================== Arena Access ====================

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    /// Tile by handle. Handles always come from this board.
    pub fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.0]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn road(&self, id: RoadId) -> &Road {
        &self.roads[id.0]
    }

    pub fn get_tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.0)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_road(&self, id: RoadId) -> Option<&Road> {
        self.roads.get(id.0)
    }

    pub(crate) fn tile_mut(&mut self, id: TileId) -> &mut Tile {
        &mut self.tiles[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn road_mut(&mut self, id: RoadId) -> &mut Road {
        &mut self.roads[id.0]
    }

    // ==================== Grid Queries ====================

    /// Tile at a grid position
    pub fn tile_at(&self, pos: GridPos) -> Option<TileId> {
        self.tile_at_offset(pos.row as i16, pos.col as i16)
    }

    fn tile_at_offset(&self, row: i16, col: i16) -> Option<TileId> {
        let (row, col) = (row + 1, col + 1);
        if row < 0 || col < 0 || row as usize >= GRID_SIZE || col as usize >= GRID_SIZE {
            return None;
        }
        self.grid[row as usize][col as usize]
    }

    fn tiles_in_cells(&self, cells: &[(i16, i16)]) -> Vec<TileId> {
        let mut found = Vec::with_capacity(cells.len());
        for &(row, col) in cells {
            if let Some(id) = self.tile_at_offset(row, col) {
                if !found.contains(&id) {
                    found.push(id);
                }
            }
        }
        found
    }

    /// All tiles sharing a side with the tile at `pos`
    pub fn surrounding_tiles(&self, pos: GridPos) -> Vec<TileId> {
        let (row, col) = (pos.row as i16, pos.col as i16);
        let Some((up, down)) = diagonal_offsets(pos) else {
            return Vec::new();
        };
        self.tiles_in_cells(&[
            (row, col - 1),
            (row, col + 1),
            (row + 1, col),
            (row + 1, col + up),
            (row - 1, col),
            (row - 1, col + down),
        ])
    }

    /// Neighbors of the tile at `pos` that lie in one direction
    pub fn appendent_tiles(&self, pos: GridPos, direction: SpreadDirection) -> Vec<TileId> {
        let (row, col) = (pos.row as i16, pos.col as i16);
        let Some((up, down)) = diagonal_offsets(pos) else {
            return Vec::new();
        };
        match direction {
            SpreadDirection::Up => self.tiles_in_cells(&[(row + 1, col), (row + 1, col + up)]),
            SpreadDirection::Down => self.tiles_in_cells(&[(row - 1, col), (row - 1, col + down)]),
            SpreadDirection::Right => self.tiles_in_cells(&[
                (row, col + 1),
                (row + 1, col.max(col + up)),
                (row - 1, col.max(col + down)),
            ]),
            SpreadDirection::Left => self.tiles_in_cells(&[
                (row, col - 1),
                (row + 1, col.min(col + up)),
                (row - 1, col.min(col + down)),
            ]),
        }
    }

    pub fn desert(&self) -> TileId {
        self.desert
    }

    pub fn coastal_tiles(&self) -> &[TileId] {
        &self.coastal
    }

    /// Tiles surrounding the desert
    pub fn desert_ring(&self) -> &[TileId] {
        &self.desert_ring
    }

    pub fn resource_tiles(&self, resource: Resource) -> &[TileId] {
        &self.tiles_by_resource[resource.index()]
    }

    /// Tiles of one type (the desert is tracked on its own)
    pub fn tiles_of_type(&self, tile_type: TileType) -> Vec<TileId> {
        match tile_type.resource() {
            Some(resource) => self.resource_tiles(resource).to_vec(),
            None => vec![self.desert],
        }
    }

    // ==================== Yield ====================

    /// Tiles carrying a dice number. Unknown numbers are logged and yield nothing.
    pub fn tiles_for_dice(&self, value: u8) -> &[TileId] {
        match self.tiles_by_dice.get(&value) {
            Some(tiles) => tiles,
            None => {
                error!(value, "no tiles registered for dice result");
                &[]
            }
        }
    }

    /// What the tile hands out when it yields: `(player, resource, amount)`
    pub fn yield_resources(&self, id: TileId) -> Vec<(PlayerId, Resource, u32)> {
        let tile = self.tile(id);
        if !tile.is_productive() {
            return Vec::new();
        }
        let Some(resource) = tile.resource() else {
            return Vec::new();
        };
        tile.yield_per_player
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(&player, &count)| (player, resource, count))
            .collect()
    }

    /// Raise the amount `player` receives from this tile
    pub fn increase_yield(&mut self, id: TileId, player: PlayerId, amount: u32) {
        *self.tile_mut(id).yield_per_player.entry(player).or_insert(0) += amount;
    }

    /// Players entitled to a share of the tile's yield
    pub fn players_on_tile(&self, id: TileId) -> Vec<PlayerId> {
        self.tile(id)
            .yield_per_player
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(&player, _)| player)
            .collect()
    }

    // ==================== Bandit & Disasters ====================

    pub fn bandit_tile(&self) -> TileId {
        self.bandit
    }

    /// The bandit may move to any non-desert tile it is not already on
    pub fn can_host_bandit(&self, id: TileId) -> bool {
        self.get_tile(id).is_some() && id != self.desert && id != self.bandit
    }

    /// Move the bandit, returning the tile it left
    pub(crate) fn move_bandit(&mut self, id: TileId) -> TileId {
        let previous = self.bandit;
        self.tile_mut(previous).occupied_by_bandit = false;
        self.tile_mut(id).occupied_by_bandit = true;
        self.bandit = id;
        previous
    }

    pub(crate) fn set_suppressed(&mut self, id: TileId, suppressed: bool) {
        self.tile_mut(id).suppressed_by_disaster = suppressed;
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

fn intern_node(
    nodes: &mut Vec<Node>,
    index: &mut HashMap<VertexCoord, NodeId>,
    vertex: VertexCoord,
) -> NodeId {
    *index.entry(vertex).or_insert_with(|| {
        let id = NodeId(nodes.len());
        nodes.push(Node::new(id, vertex));
        id
    })
}

/// Upper and lower diagonal column offsets for the row of `pos`
fn diagonal_offsets(pos: GridPos) -> Option<(i16, i16)> {
    let row = pos.row as usize;
    (row < ROWS).then(|| (UPPER_DIAGONAL[row], LOWER_DIAGONAL[row]))
}

fn validate_positions(positions: impl ExactSizeIterator<Item = GridPos>) -> Result<(), BoardError> {
    if positions.len() != TILE_COUNT {
        error!(expected = TILE_COUNT, got = positions.len(), "wrong number of spawn points");
        return Err(BoardError::ConfigurationMismatch(format!(
            "expected {TILE_COUNT} spawn points, got {}",
            positions.len()
        )));
    }
    let mut seen = HashSet::new();
    for pos in positions {
        if pos.row as usize >= ROWS || pos.col as usize >= COLS {
            error!(?pos, "spawn point outside the grid");
            return Err(BoardError::ConfigurationMismatch(format!(
                "spawn point ({}, {}) is outside the grid",
                pos.row, pos.col
            )));
        }
        if !seen.insert(pos) {
            error!(?pos, "duplicate spawn point");
            return Err(BoardError::ConfigurationMismatch(format!(
                "spawn point ({}, {}) used twice",
                pos.row, pos.col
            )));
        }
    }
    Ok(())
}

fn validate_tiles(layout: &[TileSpec]) -> Result<(), BoardError> {
    let mismatch = |reason: String| -> Result<(), BoardError> {
        error!(%reason, "invalid board layout");
        Err(BoardError::ConfigurationMismatch(reason))
    };

    let deserts = layout.iter().filter(|(_, kind, _)| *kind == TileType::Desert).count();
    if deserts != 1 {
        return mismatch(format!("expected exactly one desert, got {deserts}"));
    }
    for &(kind, expected) in &TILE_MULTISET {
        let count = layout.iter().filter(|(_, k, _)| *k == kind).count();
        if count != expected {
            return mismatch(format!("expected {expected} {kind:?} tiles, got {count}"));
        }
    }

    for &(pos, kind, number) in layout {
        match (kind, number) {
            (TileType::Desert, Some(n)) => {
                return mismatch(format!("desert at ({}, {}) has number {n}", pos.row, pos.col));
            }
            (TileType::Desert, None) | (_, Some(_)) => {}
            (_, None) => {
                return mismatch(format!(
                    "{kind:?} tile at ({}, {}) has no number",
                    pos.row, pos.col
                ));
            }
        }
    }

    let mut numbers: Vec<u8> = layout.iter().filter_map(|(_, _, number)| *number).collect();
    numbers.sort_unstable();
    if numbers != DICE_NUMBERS {
        return mismatch(format!("dice numbers {numbers:?} differ from the standard set"));
    }
    Ok(())
}

#[cfg(test)]
/// Standard positions and sets, desert in the middle
pub(crate) fn ordered_layout() -> Vec<TileSpec> {
    let mut kinds = TILE_MULTISET
        .iter()
        .flat_map(|&(kind, count)| std::iter::repeat(kind).take(count));
    let mut numbers = DICE_NUMBERS.into_iter();
    STANDARD_SPAWN_POSITIONS
        .iter()
        .map(|&pos| {
            if pos == GridPos::new(2, 2) {
                (pos, TileType::Desert, None)
            } else {
                (pos, kinds.next().unwrap(), numbers.next())
            }
        })
        .collect()
}
