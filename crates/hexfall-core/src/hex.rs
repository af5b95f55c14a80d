//! Grid positions and hex geometry.
//!
//! The island is stored as rows of tiles in a small rectangular array
//! (`GridPos`), while the shared corners and sides between tiles are derived
//! from axial hex coordinates:
//! - `GridPos`: row/column of a tile, row 0 is the southern coast
//! - `HexCoord`: axial coordinate used to derive vertices and edges
//! - `VertexCoord`: a corner where settlements and towns are placed
//! - `EdgeCoord`: a side where roads are placed

use serde::{Deserialize, Serialize};

/// Row/column position of a tile in the (unpadded) board grid.
///
/// Rows run south to north, columns west to east. Row lengths differ, so the
/// diagonal neighbors of a tile depend on its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub row: u8,
    pub col: u8,
}

impl GridPos {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Axial coordinate of the tile at this position.
    ///
    /// The two southern rows are shifted one column further east than the
    /// rest of the grid.
    pub fn to_hex(self) -> HexCoord {
        let row = self.row as i32;
        let col = self.col as i32;
        let q = if row < 2 { col - 3 } else { col - 2 };
        HexCoord::new(q, 2 - row)
    }
}

/// Direction of a vertex relative to a hex (North or South pole)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexDirection {
    North,
    South,
}

/// Direction of an edge relative to a hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeDirection {
    NorthEast,
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
}

impl EdgeDirection {
    /// All edge directions in clockwise order starting from NorthEast
    pub const ALL: [EdgeDirection; 6] = [
        EdgeDirection::NorthEast,
        EdgeDirection::East,
        EdgeDirection::SouthEast,
        EdgeDirection::SouthWest,
        EdgeDirection::West,
        EdgeDirection::NorthWest,
    ];

    fn opposite(self) -> EdgeDirection {
        match self {
            EdgeDirection::NorthEast => EdgeDirection::SouthWest,
            EdgeDirection::East => EdgeDirection::West,
            EdgeDirection::SouthEast => EdgeDirection::NorthWest,
            EdgeDirection::SouthWest => EdgeDirection::NorthEast,
            EdgeDirection::West => EdgeDirection::East,
            EdgeDirection::NorthWest => EdgeDirection::SouthEast,
        }
    }
}

/// Axial coordinate for a pointy-top hex grid.
///
/// `q` increases going east, `r` increases going south (screen y grows
/// downward), so the northern row of the island has the smallest `r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The six neighboring hexes
    pub fn neighbors(&self) -> [HexCoord; 6] {
        EdgeDirection::ALL.map(|dir| self.neighbor(dir))
    }

    /// Get the neighbor in a specific direction
    pub fn neighbor(&self, direction: EdgeDirection) -> HexCoord {
        match direction {
            EdgeDirection::East => HexCoord::new(self.q + 1, self.r),
            EdgeDirection::NorthEast => HexCoord::new(self.q + 1, self.r - 1),
            EdgeDirection::NorthWest => HexCoord::new(self.q, self.r - 1),
            EdgeDirection::West => HexCoord::new(self.q - 1, self.r),
            EdgeDirection::SouthWest => HexCoord::new(self.q - 1, self.r + 1),
            EdgeDirection::SouthEast => HexCoord::new(self.q, self.r + 1),
        }
    }

    /// All six corners of this hex, clockwise from the top.
    ///
    /// Only the top and bottom corners belong to this hex itself; the other
    /// four are poles of neighboring hexes.
    pub fn vertices(&self) -> [VertexCoord; 6] {
        [
            VertexCoord::new(*self, VertexDirection::North),
            VertexCoord::new(self.neighbor(EdgeDirection::NorthEast), VertexDirection::South),
            VertexCoord::new(self.neighbor(EdgeDirection::SouthEast), VertexDirection::North),
            VertexCoord::new(*self, VertexDirection::South),
            VertexCoord::new(self.neighbor(EdgeDirection::SouthWest), VertexDirection::North),
            VertexCoord::new(self.neighbor(EdgeDirection::NorthWest), VertexDirection::South),
        ]
    }

    /// All six sides of this hex
    pub fn edges(&self) -> [EdgeCoord; 6] {
        EdgeDirection::ALL.map(|dir| EdgeCoord::new(*self, dir))
    }

    /// Center of the hex in pixel space (pointy-top, given radius)
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let x = hex_size * (3.0_f64.sqrt() * self.q as f64 + 3.0_f64.sqrt() / 2.0 * self.r as f64);
        let y = hex_size * (3.0 / 2.0 * self.r as f64);
        (x, y)
    }
}

/// A corner where three hexes meet.
///
/// In a pointy-top grid every corner is the North or South pole of exactly
/// one hex, so `(hex, direction)` is already a unique key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexCoord {
    pub hex: HexCoord,
    pub direction: VertexDirection,
}

impl VertexCoord {
    pub const fn new(hex: HexCoord, direction: VertexDirection) -> Self {
        Self { hex, direction }
    }

    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let (hx, hy) = self.hex.to_pixel(hex_size);
        match self.direction {
            VertexDirection::North => (hx, hy - hex_size),
            VertexDirection::South => (hx, hy + hex_size),
        }
    }
}

/// A side shared by two hexes, where roads are built.
///
/// Each side can be named from either hex; `new` always picks the hex with
/// the smaller `(q, r)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeCoord {
    pub hex: HexCoord,
    pub direction: EdgeDirection,
}

impl EdgeCoord {
    pub fn new(hex: HexCoord, direction: EdgeDirection) -> Self {
        Self { hex, direction }.canonical()
    }

    /// Canonical form of this edge
    pub fn canonical(self) -> Self {
        let other_hex = self.hex.neighbor(self.direction);
        if (self.hex.q, self.hex.r) <= (other_hex.q, other_hex.r) {
            self
        } else {
            Self {
                hex: other_hex,
                direction: self.direction.opposite(),
            }
        }
    }

    /// The 2 hexes that share this edge
    pub fn touching_hexes(&self) -> [HexCoord; 2] {
        [self.hex, self.hex.neighbor(self.direction)]
    }

    /// The 2 vertices at the ends of this edge
    pub fn endpoints(&self) -> [VertexCoord; 2] {
        let h = self.hex;
        match self.direction {
            EdgeDirection::NorthEast => [
                VertexCoord::new(h, VertexDirection::North),
                VertexCoord::new(h.neighbor(EdgeDirection::NorthEast), VertexDirection::South),
            ],
            EdgeDirection::East => [
                VertexCoord::new(h.neighbor(EdgeDirection::NorthEast), VertexDirection::South),
                VertexCoord::new(h.neighbor(EdgeDirection::SouthEast), VertexDirection::North),
            ],
            EdgeDirection::SouthEast => [
                VertexCoord::new(h.neighbor(EdgeDirection::SouthEast), VertexDirection::North),
                VertexCoord::new(h, VertexDirection::South),
            ],
            EdgeDirection::SouthWest => [
                VertexCoord::new(h, VertexDirection::South),
                VertexCoord::new(h.neighbor(EdgeDirection::SouthWest), VertexDirection::North),
            ],
            EdgeDirection::West => [
                VertexCoord::new(h.neighbor(EdgeDirection::SouthWest), VertexDirection::North),
                VertexCoord::new(h.neighbor(EdgeDirection::NorthWest), VertexDirection::South),
            ],
            EdgeDirection::NorthWest => [
                VertexCoord::new(h.neighbor(EdgeDirection::NorthWest), VertexDirection::South),
                VertexCoord::new(h, VertexDirection::North),
            ],
        }
    }

    /// Midpoint of the edge in pixel space
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let [v1, v2] = self.endpoints();
        let (x1, y1) = v1.to_pixel(hex_size);
        let (x2, y2) = v2.to_pixel(hex_size);
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    }
}
