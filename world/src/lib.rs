#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Wire Defence.
//!
//! The world owns the occupancy grid, both flowfields, the wire forest, the
//! towers standing on it, the enemy pool and the player's purse. All mutation
//! flows through [`apply`]; everything else reads through [`query`].

pub mod config;
pub mod enemies;
pub mod pathing;
mod towers;
mod wires;

use tracing::{debug, info, warn};
use wire_defence_core::{
    Command, EnemyKind, Event, PlacementError, RemovalError, TileCoord, TowerKind, UpgradeError,
    WireError, MAX_TOWER_LEVEL,
};

pub use config::{Config, ConfigError, WireSeed};

use enemies::{Departure, EnemyPool, Runway};
use pathing::{coord_to_tile, Pathing};
use wires::{Cascade, WireGraph};

/// Health lost for every enemy that escapes.
const LEAK_DAMAGE: u32 = 1;

/// Score awarded per point of reward when an enemy is killed.
const KILL_SCORE_FACTOR: u64 = 10;

/// Money, health and score of the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Purse {
    /// Money available for construction.
    pub money: u32,
    /// Remaining health. The game ends when it reaches zero.
    pub health: u32,
    /// Accumulated score.
    pub score: u64,
}

/// Represents the authoritative Wire Defence world state.
#[derive(Debug)]
pub struct World {
    config: Config,
    runway: Runway,
    pathing: Pathing,
    wires: WireGraph,
    enemies: EnemyPool,
    purse: Purse,
    tick_index: u64,
    stranded_steps: u64,
    game_over: bool,
}

impl World {
    /// Creates a world from validated parameters with the permanent wires laid.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let runway = Runway::new(
            config.columns,
            config.rows,
            config.tile_size,
            config.runway_tiles,
        );
        let pathing = Pathing::new(config.columns, config.rows, runway.entry(), runway.exit());
        let mut wires = WireGraph::new(config.columns, config.rows);
        for (index, seed) in config.permanent_wires.iter().enumerate() {
            let _ = wires
                .seed(seed.tile, seed.incoming, seed.parent)
                .map_err(|source| ConfigError::Seed {
                    index,
                    tile: seed.tile,
                    source,
                })?;
        }

        Ok(Self {
            runway,
            pathing,
            wires,
            enemies: EnemyPool::with_capacity(config.max_enemies),
            purse: Purse {
                money: config.starting_money,
                health: config.starting_health,
                score: 0,
            },
            tick_index: 0,
            stranded_steps: 0,
            game_over: false,
            config,
        })
    }

    /// Reports whether a tower on `tile` would leave a route to the exit.
    ///
    /// Intended for per-frame cursor feedback; the answer is memoized while
    /// the occupancy stays unchanged.
    pub fn can_place(&mut self, tile: TileCoord) -> bool {
        self.pathing.can_place(tile)
    }

    /// Converts a world-space position into the grid tile containing it.
    #[must_use]
    pub fn coord_to_tile(&self, x: f32, y: f32) -> Option<TileCoord> {
        coord_to_tile(x, y, self.config.tile_size, self.config.columns, self.config.rows)
    }

    fn place_tower(
        &mut self,
        kind: TowerKind,
        tile: TileCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), PlacementError> {
        if !self.pathing.occupancy().contains(tile) {
            return Err(PlacementError::OutOfBounds);
        }
        if self.pathing.is_landmark(tile) {
            return Err(PlacementError::Landmark);
        }
        if self.pathing.occupancy().is_blocked(tile) || self.wires.tower_at(tile).is_some() {
            return Err(PlacementError::Occupied);
        }

        let node = self.wires.node_at(tile);
        let price = match node {
            None if !kind.is_core() => return Err(PlacementError::MissingWire),
            None => kind.price().saturating_add(self.config.wire_price),
            Some(id) => {
                let is_root = self.wires.node(id).is_some_and(|node| node.parent.is_none());
                if kind.is_core() && !is_root {
                    return Err(PlacementError::CoreNotRoot);
                }
                kind.price()
            }
        };
        if self.purse.money < price {
            return Err(PlacementError::InsufficientFunds);
        }
        if !self.pathing.can_place(tile) {
            return Err(PlacementError::BlocksPath);
        }

        let node = match node {
            Some(id) => id,
            None => self
                .wires
                .add_root(tile, false)
                .map_err(|_| PlacementError::OutOfBounds)?,
        };
        if self.wires.attach(node, kind).is_none() {
            return Err(PlacementError::Occupied);
        }

        self.purse.money -= price;
        let complete = self.pathing.occupy(tile);
        if !complete {
            warn!(?tile, ?kind, "placement sealed the path");
        }
        debug!(?tile, ?kind, money = self.purse.money, "tower.placed");

        out_events.push(Event::TowerPlaced { tile, kind });
        out_events.push(Event::PathChanged { complete });
        Ok(())
    }

    fn remove_tower(
        &mut self,
        tile: TileCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), RemovalError> {
        let node = self.wires.node_at(tile).ok_or(RemovalError::MissingTower)?;
        let tower = self.wires.tower_at(tile).ok_or(RemovalError::MissingTower)?;
        let kind = self
            .wires
            .tower(tower)
            .map(|tower| tower.kind)
            .ok_or(RemovalError::MissingTower)?;

        let cascade = if kind.is_core() {
            self.wires.destroy_core(node)
        } else {
            Cascade {
                wires: Vec::new(),
                towers: self.wires.remove_tower(node).into_iter().collect(),
            }
        };
        self.settle(cascade, out_events);
        Ok(())
    }

    fn upgrade_tower(
        &mut self,
        tile: TileCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), UpgradeError> {
        let id = self.wires.tower_at(tile).ok_or(UpgradeError::MissingTower)?;
        let money = self.purse.money;
        let tower = self.wires.tower_mut(id).ok_or(UpgradeError::MissingTower)?;
        if tower.level >= MAX_TOWER_LEVEL {
            return Err(UpgradeError::MaxLevel);
        }
        let price = tower.kind.price();
        if money < price {
            return Err(UpgradeError::InsufficientFunds);
        }

        tower.level += 1;
        let level = tower.level;
        self.purse.money -= price;
        out_events.push(Event::TowerUpgraded { tile, level });
        Ok(())
    }

    fn extend_wire(
        &mut self,
        from: TileCoord,
        to: TileCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WireError> {
        if !self.pathing.occupancy().contains(to) {
            return Err(WireError::OutOfBounds);
        }
        let parent = self.wires.node_at(from).ok_or(WireError::MissingWire)?;
        let direction = from.direction_to(to).ok_or(WireError::NotAdjacent)?;
        if self.purse.money < self.config.wire_price {
            return Err(WireError::InsufficientFunds);
        }

        let _ = self.wires.extend(parent, direction)?;
        self.purse.money -= self.config.wire_price;
        out_events.push(Event::WireExtended { from, to });
        Ok(())
    }

    fn remove_wire(
        &mut self,
        tile: TileCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WireError> {
        let node = self.wires.node_at(tile).ok_or(WireError::MissingWire)?;
        let cascade = self.wires.cascade_delete(node)?;
        self.settle(cascade, out_events);
        Ok(())
    }

    /// Refunds everything a removal took with it and reopens the freed tiles.
    fn settle(&mut self, cascade: Cascade, out_events: &mut Vec<Event>) {
        let mut freed = Vec::with_capacity(cascade.towers.len());
        for tower in &cascade.towers {
            let refund = tower.kind.price();
            self.purse.money = self.purse.money.saturating_add(refund);
            freed.push(tower.tile);
            out_events.push(Event::TowerRemoved {
                tile: tower.tile,
                kind: tower.kind,
                refund,
            });
        }
        for tile in &cascade.wires {
            self.purse.money = self.purse.money.saturating_add(self.config.wire_price);
            out_events.push(Event::WireRemoved { tile: *tile });
        }

        if freed.is_empty() {
            return;
        }
        let complete = self.pathing.vacate_all(freed);
        out_events.push(Event::PathChanged { complete });
    }

    fn spawn_enemy(&mut self, kind: EnemyKind, health_multiplier: f32, out_events: &mut Vec<Event>) {
        match self.enemies.spawn(kind, health_multiplier, &self.runway) {
            Some(enemy) => out_events.push(Event::EnemySpawned { enemy, kind }),
            None => {
                debug!(?kind, capacity = self.enemies.capacity(), "enemy pool exhausted");
                out_events.push(Event::SpawnRejected { kind });
            }
        }
    }

    fn tick(&mut self, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        out_events.push(Event::TimeAdvanced {
            tick: self.tick_index,
        });

        self.resolve_combat(out_events);
        self.advance_enemies(out_events);
    }

    fn resolve_combat(&mut self, out_events: &mut Vec<Event>) {
        let tile_size = self.config.tile_size;
        for id in self.wires.tower_ids() {
            let power = self.wires.power(id);
            let Some(tower) = self.wires.tower_mut(id) else {
                continue;
            };
            let Some(shot) = towers::engage(tower, power, &mut self.enemies, tile_size) else {
                continue;
            };

            out_events.push(Event::TowerFired {
                tile: tower.tile,
                enemy: shot.enemy,
                damage: shot.damage,
            });
            match shot.kill {
                Some((kind, reward)) => {
                    self.purse.money = self.purse.money.saturating_add(reward);
                    self.purse.score = self
                        .purse
                        .score
                        .saturating_add(u64::from(reward) * KILL_SCORE_FACTOR);
                    out_events.push(Event::EnemyKilled {
                        enemy: shot.enemy,
                        kind,
                        reward,
                    });
                }
                None => self.purse.score = self.purse.score.saturating_add(1),
            }
        }
    }

    fn advance_enemies(&mut self, out_events: &mut Vec<Event>) {
        let mut departures: Vec<Departure> = Vec::new();
        let stranded = self
            .enemies
            .advance(self.pathing.committed(), &self.runway, &mut departures);
        self.stranded_steps = self.stranded_steps.saturating_add(stranded);

        for departure in departures.into_iter().filter(|departure| departure.leaked) {
            self.purse.health = self.purse.health.saturating_sub(LEAK_DAMAGE);
            out_events.push(Event::EnemyLeaked {
                enemy: departure.enemy,
                kind: departure.kind,
            });
        }

        if self.purse.health == 0 {
            self.game_over = true;
            info!(
                tick = self.tick_index,
                score = self.purse.score,
                "game over"
            );
            out_events.push(Event::GameOver);
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Rejected requests leave the world untouched and report why through a
/// rejection event. Once the game is over every command is ignored.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    if world.game_over {
        return;
    }

    match command {
        Command::PlaceTower { kind, tile } => {
            if let Err(reason) = world.place_tower(kind, tile, out_events) {
                out_events.push(Event::TowerPlacementRejected { tile, kind, reason });
            }
        }
        Command::RemoveTower { tile } => {
            if let Err(reason) = world.remove_tower(tile, out_events) {
                out_events.push(Event::TowerRemovalRejected { tile, reason });
            }
        }
        Command::UpgradeTower { tile } => {
            if let Err(reason) = world.upgrade_tower(tile, out_events) {
                out_events.push(Event::TowerUpgradeRejected { tile, reason });
            }
        }
        Command::ExtendWire { from, to } => {
            if let Err(reason) = world.extend_wire(from, to, out_events) {
                out_events.push(Event::WireRejected { from, to, reason });
            }
        }
        Command::RemoveWire { tile } => {
            if let Err(reason) = world.remove_wire(tile, out_events) {
                out_events.push(Event::WireRemovalRejected { tile, reason });
            }
        }
        Command::SpawnEnemy {
            kind,
            health_multiplier,
        } => world.spawn_enemy(kind, health_multiplier, out_events),
        Command::Tick => world.tick(out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use wire_defence_core::{EnemySnapshot, TileCoord, TowerSnapshot, WireSnapshot};

    use super::{Config, Purse, World};
    use crate::{
        enemies::Runway,
        pathing::{FlowField, OccupancyGrid},
        towers::{Tower, TowerId},
        wires::WireNode,
    };

    /// Parameters the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &Config {
        &world.config
    }

    /// Runway geometry together with the entry and exit tiles.
    #[must_use]
    pub fn runway(world: &World) -> &Runway {
        &world.runway
    }

    /// Dense grid of tiles blocked by towers.
    #[must_use]
    pub fn occupancy(world: &World) -> &OccupancyGrid {
        world.pathing.occupancy()
    }

    /// Flowfield currently followed by ground enemies.
    #[must_use]
    pub fn flow_field(world: &World) -> &FlowField {
        world.pathing.committed()
    }

    /// Flowfield produced by the most recent speculative placement.
    #[must_use]
    pub fn preview_field(world: &World) -> &FlowField {
        world.pathing.preview()
    }

    /// Whether the entry currently reaches the exit.
    #[must_use]
    pub fn path_complete(world: &World) -> bool {
        world.pathing.is_complete()
    }

    /// Tile where enemies enter the grid.
    #[must_use]
    pub fn entry(world: &World) -> TileCoord {
        world.pathing.entry()
    }

    /// Tile where enemies leave the grid.
    #[must_use]
    pub fn exit(world: &World) -> TileCoord {
        world.pathing.exit()
    }

    /// Money, health and score of the player.
    #[must_use]
    pub fn purse(world: &World) -> Purse {
        world.purse
    }

    /// Number of ticks simulated so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Whether the player ran out of health.
    #[must_use]
    pub fn is_game_over(world: &World) -> bool {
        world.game_over
    }

    /// Number of enemy steps taken on tiles the flowfield never reached.
    #[must_use]
    pub fn stranded_steps(world: &World) -> u64 {
        world.stranded_steps
    }

    /// Number of enemies currently on the runways or the grid.
    #[must_use]
    pub fn active_enemies(world: &World) -> usize {
        world.enemies.active_count()
    }

    /// Captures every active enemy in pool order.
    #[must_use]
    pub fn enemy_view(world: &World) -> Vec<EnemySnapshot> {
        world
            .enemies
            .active()
            .iter()
            .map(|enemy| EnemySnapshot {
                id: enemy.id(),
                kind: enemy.kind(),
                x: enemy.position().x,
                y: enemy.position().y,
                health: enemy.health(),
                leg: enemy.leg(),
            })
            .collect()
    }

    /// Captures every tower ordered by tile.
    #[must_use]
    pub fn tower_view(world: &World) -> Vec<TowerSnapshot> {
        let mut snapshots: Vec<TowerSnapshot> = world
            .wires
            .towers()
            .map(|(id, tower)| tower_snapshot(world, id, tower))
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.tile);
        snapshots
    }

    /// Captures the tower standing on `tile`, if any.
    #[must_use]
    pub fn tower_at(world: &World, tile: TileCoord) -> Option<TowerSnapshot> {
        let id = world.wires.tower_at(tile)?;
        let tower = world.wires.tower(id)?;
        Some(tower_snapshot(world, id, tower))
    }

    /// Effective power of the tower standing on `tile`, if any.
    #[must_use]
    pub fn tower_power(world: &World, tile: TileCoord) -> Option<f32> {
        world.wires.tower_at(tile).map(|id| world.wires.power(id))
    }

    /// Captures every wire node ordered by tile.
    #[must_use]
    pub fn wire_view(world: &World) -> Vec<WireSnapshot> {
        let mut snapshots: Vec<WireSnapshot> = world
            .wires
            .nodes()
            .map(|node| wire_snapshot(world, node))
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.tile);
        snapshots
    }

    /// Captures the wire node on `tile`, if any.
    #[must_use]
    pub fn wire_at(world: &World, tile: TileCoord) -> Option<WireSnapshot> {
        let id = world.wires.node_at(tile)?;
        let node = world.wires.node(id)?;
        Some(wire_snapshot(world, node))
    }

    fn tower_snapshot(world: &World, id: TowerId, tower: &Tower) -> TowerSnapshot {
        TowerSnapshot {
            tile: tower.tile,
            kind: tower.kind,
            level: tower.level,
            power: world.wires.power(id),
            core: tower
                .core
                .and_then(|core| world.wires.tower(core))
                .map(|core| core.tile),
            connected_towers: tower.connected_towers,
        }
    }

    fn wire_snapshot(world: &World, node: &WireNode) -> WireSnapshot {
        WireSnapshot {
            tile: node.tile,
            incoming: node.incoming,
            parent: node
                .parent
                .and_then(|parent| world.wires.node(parent))
                .map(|parent| parent.tile),
            child_count: node.child_count(),
            permanent: node.permanent,
            tower: node
                .tower
                .and_then(|tower| world.wires.tower(tower))
                .map(|tower| tower.kind),
            core: node
                .core
                .and_then(|core| world.wires.tower(core))
                .map(|core| core.tile),
        }
    }
}
