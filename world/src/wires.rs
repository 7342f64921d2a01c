//! Wire forest that carries power from cores to attached towers.
//!
//! Nodes live in a slot arena and reference each other by key, so parents,
//! children and the tile index never hold dangling pointers. Every tree walk
//! uses an explicit stack.

use slotmap::{new_key_type, SlotMap};
use wire_defence_core::{Direction, TileCoord, TowerKind, WireError};

use crate::towers::{self, Tower, TowerId};

new_key_type! {
    /// Arena key of a wire node.
    pub(crate) struct WireId;
}

/// A single wire segment occupying one tile.
#[derive(Clone, Debug)]
pub(crate) struct WireNode {
    pub(crate) tile: TileCoord,
    /// Side of the tile facing the parent, or the map edge for seeded roots.
    pub(crate) incoming: Option<Direction>,
    pub(crate) parent: Option<WireId>,
    /// Children indexed by [`Direction::index`].
    pub(crate) outgoing: [Option<WireId>; 4],
    pub(crate) permanent: bool,
    pub(crate) tower: Option<TowerId>,
    /// Core powering the tree this node belongs to.
    pub(crate) core: Option<TowerId>,
}

impl WireNode {
    fn children(&self) -> impl Iterator<Item = WireId> + '_ {
        self.outgoing.iter().flatten().copied()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children().count()
    }
}

/// Everything a cascading deletion removed.
#[derive(Debug, Default)]
pub(crate) struct Cascade {
    /// Tiles of deleted wire nodes, children before parents.
    pub(crate) wires: Vec<TileCoord>,
    /// Towers that stood on deleted nodes or were destroyed outright.
    pub(crate) towers: Vec<Tower>,
}

impl Cascade {
    fn absorb(&mut self, other: Cascade) {
        self.wires.extend(other.wires);
        self.towers.extend(other.towers);
    }
}

/// Arena-backed forest of wire trees and the towers standing on them.
#[derive(Debug)]
pub(crate) struct WireGraph {
    columns: u32,
    rows: u32,
    nodes: SlotMap<WireId, WireNode>,
    towers: SlotMap<TowerId, Tower>,
    by_tile: Vec<Option<WireId>>,
}

impl WireGraph {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        let cells = columns as usize * rows as usize;
        Self {
            columns,
            rows,
            nodes: SlotMap::with_key(),
            towers: SlotMap::with_key(),
            by_tile: vec![None; cells],
        }
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        (tile.column() < self.columns && tile.row() < self.rows)
            .then(|| tile.row() as usize * self.columns as usize + tile.column() as usize)
    }

    fn set_index(&mut self, tile: TileCoord, node: Option<WireId>) {
        if let Some(index) = self.index(tile) {
            self.by_tile[index] = node;
        }
    }

    pub(crate) fn node_at(&self, tile: TileCoord) -> Option<WireId> {
        self.index(tile).and_then(|index| self.by_tile[index])
    }

    pub(crate) fn node(&self, id: WireId) -> Option<&WireNode> {
        self.nodes.get(id)
    }

    pub(crate) fn nodes(&self) -> impl Iterator<Item = &WireNode> {
        self.nodes.values()
    }

    pub(crate) fn tower(&self, id: TowerId) -> Option<&Tower> {
        self.towers.get(id)
    }

    pub(crate) fn tower_mut(&mut self, id: TowerId) -> Option<&mut Tower> {
        self.towers.get_mut(id)
    }

    pub(crate) fn towers(&self) -> impl Iterator<Item = (TowerId, &Tower)> {
        self.towers.iter()
    }

    pub(crate) fn tower_ids(&self) -> Vec<TowerId> {
        self.towers.keys().collect()
    }

    pub(crate) fn tower_at(&self, tile: TileCoord) -> Option<TowerId> {
        self.node_at(tile)
            .and_then(|id| self.nodes.get(id))
            .and_then(|node| node.tower)
    }

    /// Effective power of a tower in `0.0..=1.0`.
    pub(crate) fn power(&self, id: TowerId) -> f32 {
        towers::power(&self.towers, id)
    }

    /// Creates a parentless node on an empty tile.
    pub(crate) fn add_root(&mut self, tile: TileCoord, permanent: bool) -> Result<WireId, WireError> {
        if self.index(tile).is_none() {
            return Err(WireError::OutOfBounds);
        }
        if self.node_at(tile).is_some() {
            return Err(WireError::Occupied);
        }

        let id = self.nodes.insert(WireNode {
            tile,
            incoming: None,
            parent: None,
            outgoing: [None; 4],
            permanent,
            tower: None,
            core: None,
        });
        self.set_index(tile, Some(id));
        Ok(id)
    }

    /// Places a permanent node, either as a root facing `incoming` or as a
    /// child of the permanent node on `parent`.
    pub(crate) fn seed(
        &mut self,
        tile: TileCoord,
        incoming: Option<Direction>,
        parent: Option<TileCoord>,
    ) -> Result<WireId, WireError> {
        let Some(parent) = parent else {
            let id = self.add_root(tile, true)?;
            if let Some(node) = self.nodes.get_mut(id) {
                node.incoming = incoming;
            }
            return Ok(id);
        };

        let parent_id = self.node_at(parent).ok_or(WireError::MissingWire)?;
        if !self.nodes.get(parent_id).is_some_and(|node| node.permanent) {
            return Err(WireError::Permanent);
        }
        let direction = parent.direction_to(tile).ok_or(WireError::NotAdjacent)?;
        self.grow(parent_id, direction, true)
    }

    /// Grows a new non-permanent child out of `parent` in `direction`.
    pub(crate) fn extend(&mut self, parent: WireId, direction: Direction) -> Result<WireId, WireError> {
        self.grow(parent, direction, false)
    }

    fn grow(&mut self, parent: WireId, direction: Direction, permanent: bool) -> Result<WireId, WireError> {
        let parent_node = self.nodes.get(parent).ok_or(WireError::MissingWire)?;
        if parent_node.incoming == Some(direction) {
            return Err(WireError::IncomingSide);
        }
        let core = parent_node.core;
        let tile = parent_node
            .tile
            .step(direction)
            .filter(|tile| self.index(*tile).is_some())
            .ok_or(WireError::OutOfBounds)?;
        if self.node_at(tile).is_some() {
            return Err(WireError::Occupied);
        }

        let id = self.nodes.insert(WireNode {
            tile,
            incoming: Some(direction.opposite()),
            parent: Some(parent),
            outgoing: [None; 4],
            permanent,
            tower: None,
            core,
        });
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.outgoing[direction.index()] = Some(id);
        }
        self.set_index(tile, Some(id));
        Ok(id)
    }

    /// Builds a tower of `kind` on `node` and links it into the node's tree.
    ///
    /// Returns `None` when the node is missing, already holds a tower, or a
    /// core is requested anywhere but on a root.
    pub(crate) fn attach(&mut self, node: WireId, kind: TowerKind) -> Option<TowerId> {
        let wire = self.nodes.get(node)?;
        if wire.tower.is_some() || (kind.is_core() && wire.parent.is_some()) {
            return None;
        }
        let tile = wire.tile;
        let tree_core = wire.core;

        let tower_id = self.towers.insert(Tower::new(tile, kind, 0));
        if let Some(wire) = self.nodes.get_mut(node) {
            wire.tower = Some(tower_id);
        }

        if kind.is_core() {
            self.claim_tree(node, tower_id);
        } else if let Some(core) = tree_core {
            if let Some(core_tower) = self.towers.get_mut(core) {
                core_tower.connected_towers += 1;
            }
            if let Some(tower) = self.towers.get_mut(tower_id) {
                tower.core = Some(core);
            }
        }
        Some(tower_id)
    }

    /// Unlinks the tower standing on `node`, leaving it in the arena.
    pub(crate) fn detach(&mut self, node: WireId) -> Option<TowerId> {
        let tower_id = self.nodes.get_mut(node)?.tower.take()?;
        let tower = self.towers.get_mut(tower_id)?;
        let kind = tower.kind;
        let core = tower.core.take();

        if kind.is_core() {
            self.release_tree(node, tower_id);
        } else if let Some(core_tower) = core.and_then(|core| self.towers.get_mut(core)) {
            core_tower.connected_towers = core_tower.connected_towers.saturating_sub(1);
        }
        Some(tower_id)
    }

    /// Detaches and discards the tower standing on `node`.
    pub(crate) fn remove_tower(&mut self, node: WireId) -> Option<Tower> {
        let tower_id = self.detach(node)?;
        self.towers.remove(tower_id)
    }

    fn claim_tree(&mut self, root: WireId, core: TowerId) {
        let mut connected = 0;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            node.core = Some(core);
            stack.extend(node.children());

            let Some(tower) = node.tower.and_then(|tower| self.towers.get_mut(tower)) else {
                continue;
            };
            if !tower.kind.is_core() {
                tower.core = Some(core);
                connected += 1;
            }
        }

        if let Some(core_tower) = self.towers.get_mut(core) {
            core_tower.connected_towers = connected;
        }
    }

    fn release_tree(&mut self, root: WireId, core: TowerId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            node.core = None;
            stack.extend(node.children());

            let Some(tower) = node.tower.and_then(|tower| self.towers.get_mut(tower)) else {
                continue;
            };
            if tower.core == Some(core) {
                tower.core = None;
            }
        }

        if let Some(core_tower) = self.towers.get_mut(core) {
            core_tower.connected_towers = 0;
        }
    }

    /// Deletes `node` and its whole subtree, children before parents.
    pub(crate) fn cascade_delete(&mut self, node: WireId) -> Result<Cascade, WireError> {
        let root = self.nodes.get(node).ok_or(WireError::MissingWire)?;
        if root.permanent {
            return Err(WireError::Permanent);
        }
        let parent = root.parent;

        let mut order = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(current) = self.nodes.get(id) {
                order.push(id);
                stack.extend(current.children());
            }
        }

        let mut cascade = Cascade::default();
        for id in order.into_iter().rev() {
            if let Some(tower) = self.remove_tower(id) {
                cascade.towers.push(tower);
            }
            if let Some(removed) = self.nodes.remove(id) {
                self.set_index(removed.tile, None);
                cascade.wires.push(removed.tile);
            }
        }

        if let Some(parent) = parent.and_then(|parent| self.nodes.get_mut(parent)) {
            for slot in &mut parent.outgoing {
                if *slot == Some(node) {
                    *slot = None;
                }
            }
        }
        Ok(cascade)
    }

    /// Removes the core standing on `node` and every non-permanent wire of
    /// its tree. Towers on permanent nodes survive without power.
    pub(crate) fn destroy_core(&mut self, node: WireId) -> Cascade {
        let mut cascade = Cascade::default();
        if let Some(core) = self.remove_tower(node) {
            cascade.towers.push(core);
        }

        let mut doomed = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(current) = self.nodes.get(id) else {
                continue;
            };
            if !current.permanent {
                doomed.push(id);
                continue;
            }
            stack.extend(current.children());
        }

        for id in doomed {
            if let Ok(removed) = self.cascade_delete(id) {
                cascade.absorb(removed);
            }
        }
        cascade
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(column: u32, row: u32) -> TileCoord {
        TileCoord::new(column, row)
    }

    fn connection_counts_consistent(graph: &WireGraph) -> bool {
        graph.towers().all(|(id, tower)| {
            if !tower.kind.is_core() {
                return true;
            }
            let attached = graph
                .towers()
                .filter(|(_, other)| other.core == Some(id))
                .count();
            attached == tower.connected_towers as usize
        })
    }

    #[test]
    fn extension_records_incoming_side_and_index() {
        let mut graph = WireGraph::new(5, 5);
        let root = graph.add_root(tile(2, 2), false).expect("empty tile");
        let child = graph.extend(root, Direction::Right).expect("free neighbour");

        let node = graph.node(child).expect("child exists");
        assert_eq!(node.tile, tile(3, 2));
        assert_eq!(node.incoming, Some(Direction::Left));
        assert_eq!(node.parent, Some(root));
        assert_eq!(graph.node_at(tile(3, 2)), Some(child));
        assert_eq!(graph.node(root).map(WireNode::child_count), Some(1));
    }

    #[test]
    fn extension_rejects_invalid_targets() {
        let mut graph = WireGraph::new(3, 3);
        let root = graph.add_root(tile(0, 0), false).expect("empty tile");
        let child = graph.extend(root, Direction::Down).expect("free neighbour");

        assert_eq!(graph.extend(root, Direction::Up), Err(WireError::OutOfBounds));
        assert_eq!(graph.extend(root, Direction::Down), Err(WireError::Occupied));
        assert_eq!(graph.extend(child, Direction::Up), Err(WireError::IncomingSide));
    }

    #[test]
    fn seeded_roots_keep_their_incoming_side() {
        let mut graph = WireGraph::new(5, 10);
        let root = graph
            .seed(tile(3, 8), Some(Direction::Down), None)
            .expect("valid seed");
        let child = graph
            .seed(tile(3, 7), None, Some(tile(3, 8)))
            .expect("valid seed");

        assert_eq!(graph.extend(root, Direction::Down), Err(WireError::IncomingSide));
        let node = graph.node(child).expect("child exists");
        assert!(node.permanent);
        assert_eq!(node.incoming, Some(Direction::Down));
        assert_eq!(graph.seed(tile(0, 0), None, Some(tile(4, 4))), Err(WireError::MissingWire));
    }

    #[test]
    fn seeds_require_a_permanent_parent() {
        let mut graph = WireGraph::new(5, 5);
        let _ = graph.add_root(tile(1, 1), false).expect("empty tile");
        assert_eq!(
            graph.seed(tile(1, 2), None, Some(tile(1, 1))),
            Err(WireError::Permanent)
        );
    }

    #[test]
    fn core_claims_existing_towers_in_its_tree() {
        let mut graph = WireGraph::new(5, 5);
        let root = graph.add_root(tile(0, 2), false).expect("empty tile");
        let a = graph.extend(root, Direction::Right).expect("free");
        let b = graph.extend(a, Direction::Right).expect("free");
        let tower = graph.attach(b, TowerKind::Normal).expect("free node");
        assert_eq!(graph.power(tower), 0.0);

        let core = graph.attach(root, TowerKind::Core).expect("root");

        assert_eq!(graph.tower(tower).and_then(|t| t.core), Some(core));
        assert_eq!(graph.tower(core).map(|t| t.connected_towers), Some(1));
        assert_eq!(graph.power(tower), 1.0);
        assert!(graph.nodes().all(|node| node.core == Some(core)));
        assert!(connection_counts_consistent(&graph));
    }

    #[test]
    fn cores_only_attach_to_roots() {
        let mut graph = WireGraph::new(5, 5);
        let root = graph.add_root(tile(0, 2), false).expect("empty tile");
        let child = graph.extend(root, Direction::Right).expect("free");
        assert_eq!(graph.attach(child, TowerKind::Core), None);
        assert!(graph.attach(child, TowerKind::Slow).is_some());
        assert_eq!(graph.attach(child, TowerKind::Slow), None);
    }

    #[test]
    fn new_branches_inherit_the_tree_core() {
        let mut graph = WireGraph::new(5, 5);
        let root = graph.add_root(tile(0, 2), false).expect("empty tile");
        let core = graph.attach(root, TowerKind::Core).expect("root");
        let branch = graph.extend(root, Direction::Up).expect("free");
        let tower = graph.attach(branch, TowerKind::Zap).expect("free");

        assert_eq!(graph.node(branch).and_then(|n| n.core), Some(core));
        assert_eq!(graph.tower(tower).and_then(|t| t.core), Some(core));
        assert!(connection_counts_consistent(&graph));
    }

    #[test]
    fn cascade_delete_removes_subtree_and_detaches_towers() {
        let mut graph = WireGraph::new(6, 3);
        let root = graph.add_root(tile(0, 1), false).expect("empty tile");
        let core = graph.attach(root, TowerKind::Core).expect("root");
        let a = graph.extend(root, Direction::Right).expect("free");
        let b = graph.extend(a, Direction::Right).expect("free");
        let c = graph.extend(b, Direction::Right).expect("free");
        let _ = graph.attach(b, TowerKind::Normal).expect("free");
        let _ = graph.attach(c, TowerKind::Normal).expect("free");
        assert_eq!(graph.tower(core).map(|t| t.connected_towers), Some(2));

        let cascade = graph.cascade_delete(b).expect("non-permanent");

        assert_eq!(cascade.wires, vec![tile(3, 1), tile(2, 1)]);
        assert_eq!(cascade.towers.len(), 2);
        assert!(cascade.towers.iter().all(|tower| tower.core.is_none()));
        assert_eq!(graph.tower(core).map(|t| t.connected_towers), Some(0));
        assert_eq!(graph.node(a).map(WireNode::child_count), Some(0));
        assert_eq!(graph.node_at(tile(2, 1)), None);
        assert!(connection_counts_consistent(&graph));
    }

    #[test]
    fn permanent_nodes_refuse_deletion() {
        let mut graph = WireGraph::new(4, 4);
        let root = graph.seed(tile(1, 0), Some(Direction::Up), None).expect("seed");
        assert_eq!(graph.cascade_delete(root).err(), Some(WireError::Permanent));
    }

    #[test]
    fn destroying_a_core_spares_permanent_wires() {
        let mut graph = WireGraph::new(6, 6);
        let root = graph
            .seed(tile(2, 5), Some(Direction::Down), None)
            .expect("seed");
        let fixed = graph.seed(tile(2, 4), None, Some(tile(2, 5))).expect("seed");
        let _ = graph.attach(root, TowerKind::Core).expect("root");
        let loose = graph.extend(fixed, Direction::Right).expect("free");
        let _ = graph.attach(fixed, TowerKind::Normal).expect("free");
        let _ = graph.attach(loose, TowerKind::Slow).expect("free");

        let cascade = graph.destroy_core(root);

        assert_eq!(cascade.wires, vec![tile(3, 4)]);
        let kinds: Vec<_> = cascade.towers.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TowerKind::Core, TowerKind::Slow]);
        assert!(graph.node(root).is_some());
        let survivor = graph.tower_at(tile(2, 4)).expect("tower on permanent wire");
        assert_eq!(graph.power(survivor), 0.0);
        assert!(graph.nodes().all(|node| node.core.is_none()));
    }

    #[test]
    fn destroying_a_placed_core_removes_its_anchor() {
        let mut graph = WireGraph::new(5, 5);
        let root = graph.add_root(tile(1, 1), false).expect("empty tile");
        let a = graph.extend(root, Direction::Down).expect("free");
        let _ = graph.extend(a, Direction::Down).expect("free");
        let _ = graph.attach(root, TowerKind::Core).expect("root");

        let cascade = graph.destroy_core(root);

        assert_eq!(cascade.wires, vec![tile(1, 3), tile(1, 2), tile(1, 1)]);
        assert_eq!(graph.nodes().count(), 0);
    }
}
