//! Road and settlement graph.
//!
//! For every player the network remembers which unowned roads they may build
//! and through which nodes that access was granted. Building on a node cuts
//! other players' access that ran through it.

use crate::board::{Board, NodeId, NodeSpecialty, PlayerId, RoadId, Structure};
use crate::game::GameError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Road access per player: road -> nodes granting access to it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoadNetwork {
    access: BTreeMap<PlayerId, BTreeMap<RoadId, BTreeSet<NodeId>>>,
}

impl RoadNetwork {
    pub fn new(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            access: players.into_iter().map(|p| (p, BTreeMap::new())).collect(),
        }
    }

    /// Roads the player may currently build, in id order
    pub fn accessible_roads(&self, player: PlayerId) -> Vec<RoadId> {
        self.access
            .get(&player)
            .map(|roads| roads.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_access(&self, player: PlayerId, road: RoadId) -> bool {
        self.access.get(&player).is_some_and(|roads| roads.contains_key(&road))
    }

    /// Nodes through which the player reaches `road`
    pub fn access_via(&self, player: PlayerId, road: RoadId) -> Option<&BTreeSet<NodeId>> {
        self.access.get(&player)?.get(&road)
    }

    fn grant(&mut self, player: PlayerId, road: RoadId, via: NodeId) {
        self.access
            .entry(player)
            .or_default()
            .entry(road)
            .or_default()
            .insert(via);
    }

    // ==================== Settlements ====================

    /// Whether `player` may settle `node`. After preparation a road of theirs must touch it.
    pub fn can_place_settlement(
        &self,
        board: &Board,
        player: PlayerId,
        node: NodeId,
        require_road: bool,
    ) -> bool {
        let Some(n) = board.get_node(node) else {
            return false;
        };
        n.buildable
            && (!require_road || n.roads.iter().any(|&r| board.road(r).owner == Some(player)))
    }

    pub fn settlement_spots(
        &self,
        board: &Board,
        player: PlayerId,
        require_road: bool,
    ) -> Vec<NodeId> {
        board
            .nodes()
            .iter()
            .map(|n| n.id)
            .filter(|&id| self.can_place_settlement(board, player, id, require_road))
            .collect()
    }

    /// Claim a node, returning its specialty so the caller can adjust the owner's rates
    pub fn place_settlement(
        &mut self,
        board: &mut Board,
        player: PlayerId,
        node: NodeId,
        require_road: bool,
    ) -> Result<NodeSpecialty, GameError> {
        if !self.can_place_settlement(board, player, node, require_road) {
            return Err(GameError::InvalidPlacement);
        }

        let (neighbors, roads, tiles, specialty) = {
            let n = board.node(node);
            (n.neighbors.clone(), n.roads.clone(), n.affected_tiles.clone(), n.specialty)
        };

        {
            let n = board.node_mut(node);
            n.buildable = false;
            n.has_building = true;
            n.upgradeable = true;
            n.owner = Some(player);
            n.structure = Some(Structure::Settlement);
        }
        for neighbor in neighbors {
            board.node_mut(neighbor).buildable = false;
        }

        for &road in &roads {
            if board.road(road).buildable {
                self.grant(player, road, node);
            }
        }
        self.revoke_through(board, player, node, &roads);

        for tile in tiles {
            board.increase_yield(tile, player, 1);
        }
        debug!(player, node = node.0, "settlement placed");
        Ok(specialty)
    }

    /// Cut every other player's access that ran through `node`
    fn revoke_through(
        &mut self,
        board: &mut Board,
        builder: PlayerId,
        node: NodeId,
        incident: &[RoadId],
    ) {
        for (&other, roads) in self.access.iter_mut() {
            if other == builder {
                continue;
            }
            roads.retain(|_, via| {
                via.remove(&node);
                !via.is_empty()
            });
        }
        for &road in incident {
            let r = board.road_mut(road);
            if r.owner.is_some_and(|owner| owner != builder) {
                r.reachable_via.remove(&node);
            }
        }
    }

    // ==================== Towns ====================

    pub fn can_upgrade(&self, board: &Board, player: PlayerId, node: NodeId) -> bool {
        board
            .get_node(node)
            .is_some_and(|n| n.upgradeable && n.owner == Some(player))
    }

    pub fn upgrade_to_town(
        &mut self,
        board: &mut Board,
        player: PlayerId,
        node: NodeId,
    ) -> Result<(), GameError> {
        if !self.can_upgrade(board, player, node) {
            return Err(GameError::InvalidPlacement);
        }
        let tiles = {
            let n = board.node_mut(node);
            n.upgradeable = false;
            n.structure = Some(Structure::Town);
            n.affected_tiles.clone()
        };
        for tile in tiles {
            board.increase_yield(tile, player, 1);
        }
        debug!(player, node = node.0, "town built");
        Ok(())
    }

    // ==================== Roads ====================

    /// Whether `player` may build `road`. After preparation they need access to it.
    pub fn can_place_road(
        &self,
        board: &Board,
        player: PlayerId,
        road: RoadId,
        require_access: bool,
    ) -> bool {
        board.get_road(road).is_some_and(|r| r.buildable)
            && (!require_access || self.has_access(player, road))
    }

    pub fn road_spots(&self, board: &Board, player: PlayerId) -> Vec<RoadId> {
        self.accessible_roads(player)
            .into_iter()
            .filter(|&r| board.road(r).buildable)
            .collect()
    }

    pub fn place_road(
        &mut self,
        board: &mut Board,
        player: PlayerId,
        road: RoadId,
        require_access: bool,
    ) -> Result<(), GameError> {
        if !self.can_place_road(board, player, road, require_access) {
            return Err(GameError::InvalidPlacement);
        }

        {
            let r = board.road_mut(road);
            r.owner = Some(player);
            r.buildable = false;
        }
        for roads in self.access.values_mut() {
            roads.remove(&road);
        }
        for end in board.road(road).ends {
            let neighbours: Vec<RoadId> =
                board.node(end).roads.iter().copied().filter(|&r| r != road).collect();
            for other in neighbours {
                let via = &mut board.road_mut(other).reachable_via;
                if let Some(onward) = via.get_mut(&end) {
                    onward.retain(|&r| r != road);
                    if onward.is_empty() {
                        via.remove(&end);
                    }
                }
            }
        }

        for end in board.road(road).ends {
            let endpoint = board.node(end);
            if endpoint.has_building {
                continue;
            }
            let onward: Vec<RoadId> = endpoint
                .roads
                .iter()
                .copied()
                .filter(|&r| r != road && board.road(r).buildable)
                .collect();
            for &next in &onward {
                self.grant(player, next, end);
            }
            board.road_mut(road).reachable_via.insert(end, onward);
        }
        debug!(player, road = road.0, "road placed");
        Ok(())
    }
}
