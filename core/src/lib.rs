#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Wire Defence engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then reports [`Event`] values
//! describing what actually happened. Systems read immutable snapshots such as
//! [`WireSnapshot`] and respond exclusively with new command batches.

use serde::{Deserialize, Serialize};

/// Highest upgrade level a tower can reach.
pub const MAX_TOWER_LEVEL: u8 = 2;

/// Discrete simulation speed selected by the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameSpeed {
    /// No simulation ticks run while paused.
    Paused,
    /// One simulation tick per rendered frame.
    #[default]
    Normal,
    /// Three simulation ticks per rendered frame.
    Fast,
}

impl GameSpeed {
    /// Number of simulation ticks executed for every rendered frame.
    #[must_use]
    pub const fn ticks_per_frame(self) -> u32 {
        match self {
            Self::Paused => 0,
            Self::Normal => 1,
            Self::Fast => 3,
        }
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Requests construction of a tower on the provided tile.
    PlaceTower {
        /// Type of tower to construct.
        kind: TowerKind,
        /// Tile the tower should occupy.
        tile: TileCoord,
    },
    /// Requests removal of the tower standing on the provided tile.
    RemoveTower {
        /// Tile holding the tower.
        tile: TileCoord,
    },
    /// Requests that the tower on the provided tile gains one level.
    UpgradeTower {
        /// Tile holding the tower.
        tile: TileCoord,
    },
    /// Requests a new wire node on `to`, fed by the existing node on `from`.
    ExtendWire {
        /// Tile of the existing parent node.
        from: TileCoord,
        /// Adjacent tile that receives the new node.
        to: TileCoord,
    },
    /// Requests deletion of a wire node together with everything it feeds.
    RemoveWire {
        /// Tile of the node to delete.
        tile: TileCoord,
    },
    /// Requests that a new enemy enters the entry runway.
    SpawnEnemy {
        /// Type of enemy to spawn.
        kind: EnemyKind,
        /// Factor applied to the enemy's base health.
        health_multiplier: f32,
    },
    /// Advances the simulation by exactly one tick.
    Tick,
}

/// Events reported by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that a simulation tick completed.
    TimeAdvanced {
        /// Index of the tick that just completed.
        tick: u64,
    },
    /// Confirms that a tower was placed.
    TowerPlaced {
        /// Tile the tower occupies.
        tile: TileCoord,
        /// Type of tower that was placed.
        kind: TowerKind,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Tile provided in the request.
        tile: TileCoord,
        /// Type of tower requested.
        kind: TowerKind,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a tower was removed, either directly or by a cascade.
    TowerRemoved {
        /// Tile the tower occupied.
        tile: TileCoord,
        /// Type of tower that was removed.
        kind: TowerKind,
        /// Money returned to the player.
        refund: u32,
    },
    /// Reports that a tower removal request was rejected.
    TowerRemovalRejected {
        /// Tile provided in the request.
        tile: TileCoord,
        /// Specific reason the removal failed.
        reason: RemovalError,
    },
    /// Confirms that a tower gained a level.
    TowerUpgraded {
        /// Tile holding the tower.
        tile: TileCoord,
        /// Level reached after the upgrade.
        level: u8,
    },
    /// Reports that an upgrade request was rejected.
    TowerUpgradeRejected {
        /// Tile provided in the request.
        tile: TileCoord,
        /// Specific reason the upgrade failed.
        reason: UpgradeError,
    },
    /// Confirms that a wire node was created.
    WireExtended {
        /// Tile of the parent node.
        from: TileCoord,
        /// Tile of the new node.
        to: TileCoord,
    },
    /// Reports that a wire extension request was rejected.
    WireRejected {
        /// Tile of the requested parent node.
        from: TileCoord,
        /// Tile requested for the new node.
        to: TileCoord,
        /// Specific reason the extension failed.
        reason: WireError,
    },
    /// Confirms that a wire node was deleted, either directly or by a cascade.
    WireRemoved {
        /// Tile the node occupied.
        tile: TileCoord,
    },
    /// Reports that a wire removal request was rejected.
    WireRemovalRejected {
        /// Tile provided in the request.
        tile: TileCoord,
        /// Specific reason the removal failed.
        reason: WireError,
    },
    /// Announces that the committed flowfield was regenerated.
    PathChanged {
        /// Whether the entry can still reach the exit.
        complete: bool,
    },
    /// Confirms that an enemy entered the runway.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Type of enemy spawned.
        kind: EnemyKind,
    },
    /// Reports that the enemy pool was exhausted.
    SpawnRejected {
        /// Type of enemy that could not be spawned.
        kind: EnemyKind,
    },
    /// Confirms that a tower hit an enemy.
    TowerFired {
        /// Tile of the firing tower.
        tile: TileCoord,
        /// Enemy that was hit.
        enemy: EnemyId,
        /// Damage dealt by the hit.
        damage: u32,
    },
    /// Announces that an enemy's health dropped to zero.
    EnemyKilled {
        /// Identifier of the enemy.
        enemy: EnemyId,
        /// Type of the enemy.
        kind: EnemyKind,
        /// Money awarded for the kill.
        reward: u32,
    },
    /// Announces that an enemy left through the exit runway.
    EnemyLeaked {
        /// Identifier of the enemy.
        enemy: EnemyId,
        /// Type of the enemy.
        kind: EnemyKind,
    },
    /// Announces that the player ran out of health.
    GameOver,
}

/// Orthogonal compass directions, densely indexed in clockwise order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Toward decreasing row indices.
    Up,
    /// Toward increasing column indices.
    Right,
    /// Toward increasing row indices.
    Down,
    /// Toward decreasing column indices.
    Left,
}

impl Direction {
    /// Every direction in index order.
    pub const ALL: [Direction; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// Dense index of the direction, matching [`Direction::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Right => 1,
            Self::Down => 2,
            Self::Left => 3,
        }
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Right => Self::Left,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
        }
    }

    /// Column and row delta of a single step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Right => (1, 0),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
        }
    }
}

/// Location of a single grid tile expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    column: u32,
    row: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Neighbouring tile in the provided direction.
    ///
    /// Returns `None` when the step would leave the non-negative quadrant.
    /// Callers remain responsible for checking the far grid edges.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<Self> {
        let (dx, dy) = direction.offset();
        let column = self.column.checked_add_signed(dx)?;
        let row = self.row.checked_add_signed(dy)?;
        Some(Self::new(column, row))
    }

    /// Direction leading from `self` to an orthogonally adjacent `other`.
    #[must_use]
    pub fn direction_to(self, other: TileCoord) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|direction| self.step(*direction) == Some(other))
    }
}

/// Types of towers that can be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TowerKind {
    /// Power source anchoring a wire tree. Never attacks.
    Core,
    /// Cheap single-target tower.
    Normal,
    /// Low damage, slow reload, short range.
    Slow,
    /// Long range heavy hitter.
    Splash,
    /// Expensive close-range burst tower.
    Zap,
}

impl TowerKind {
    /// Every tower kind in index order.
    pub const ALL: [TowerKind; 5] = [
        Self::Core,
        Self::Normal,
        Self::Slow,
        Self::Splash,
        Self::Zap,
    ];

    /// Dense index used by the stat tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Core => 0,
            Self::Normal => 1,
            Self::Slow => 2,
            Self::Splash => 3,
            Self::Zap => 4,
        }
    }

    /// Money required to build the tower.
    #[must_use]
    pub const fn price(self) -> u32 {
        TOWER_PRICES[self.index()]
    }

    /// Combat statistics at the provided level, clamped to [`MAX_TOWER_LEVEL`].
    #[must_use]
    pub const fn stats(self, level: u8) -> TowerStats {
        let level = if level > MAX_TOWER_LEVEL {
            MAX_TOWER_LEVEL
        } else {
            level
        };
        TOWER_STATS[self.index()][level as usize]
    }

    /// Reports whether the kind anchors a wire tree.
    #[must_use]
    pub const fn is_core(self) -> bool {
        matches!(self, Self::Core)
    }
}

/// Per-level statistics shared by every tower of a kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TowerStats {
    /// Ticks between shots at full power.
    pub reload_ticks: u32,
    /// Damage dealt by a single shot.
    pub damage: u32,
    /// Attack radius measured in world units. Zero disables combat.
    pub radius: u32,
}

impl TowerStats {
    const fn new(reload_ticks: u32, damage: u32, radius: u32) -> Self {
        Self {
            reload_ticks,
            damage,
            radius,
        }
    }
}

const TOWER_PRICES: [u32; 5] = [10, 5, 10, 20, 50];

const TOWER_STATS: [[TowerStats; 3]; 5] = [
    [
        TowerStats::new(0, 0, 0),
        TowerStats::new(0, 0, 0),
        TowerStats::new(0, 0, 0),
    ],
    [
        TowerStats::new(8, 4, 80),
        TowerStats::new(6, 6, 88),
        TowerStats::new(4, 8, 96),
    ],
    [
        TowerStats::new(15, 1, 60),
        TowerStats::new(12, 2, 70),
        TowerStats::new(8, 4, 80),
    ],
    [
        TowerStats::new(10, 20, 140),
        TowerStats::new(9, 30, 160),
        TowerStats::new(8, 45, 180),
    ],
    [
        TowerStats::new(15, 40, 60),
        TowerStats::new(12, 50, 70),
        TowerStats::new(8, 65, 80),
    ],
];

/// Types of enemies that can walk (or fly) toward the exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Baseline walker.
    Ground,
    /// Walker with double speed.
    GroundFast,
    /// Slow armoured walker.
    GroundHeavy,
    /// Armoured walker at normal speed.
    GroundHeavyFast,
    /// Very slow boss walker.
    GroundSuperHeavy,
    /// Baseline flyer that ignores the flowfield.
    Flying,
    /// Fast flyer.
    FlyingFast,
    /// Armoured flyer.
    FlyingHeavy,
}

impl EnemyKind {
    /// Every enemy kind in index order.
    pub const ALL: [EnemyKind; 8] = [
        Self::Ground,
        Self::GroundFast,
        Self::GroundHeavy,
        Self::GroundHeavyFast,
        Self::GroundSuperHeavy,
        Self::Flying,
        Self::FlyingFast,
        Self::FlyingHeavy,
    ];

    /// Dense index used by the stat table.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Ground => 0,
            Self::GroundFast => 1,
            Self::GroundHeavy => 2,
            Self::GroundHeavyFast => 3,
            Self::GroundSuperHeavy => 4,
            Self::Flying => 5,
            Self::FlyingFast => 6,
            Self::FlyingHeavy => 7,
        }
    }

    /// Base statistics of the enemy kind.
    #[must_use]
    pub const fn stats(self) -> EnemyStats {
        ENEMY_STATS[self.index()]
    }
}

/// Base statistics of an enemy kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyStats {
    /// Health before the wave multiplier is applied.
    pub health: u32,
    /// Money awarded when the enemy is killed.
    pub reward: u32,
    /// Distance covered per tick, measured in tiles.
    pub speed: f32,
    /// Flying enemies ignore the flowfield.
    pub flying: bool,
}

impl EnemyStats {
    const fn new(health: u32, reward: u32, speed: f32, flying: bool) -> Self {
        Self {
            health,
            reward,
            speed,
            flying,
        }
    }
}

const ENEMY_STATS: [EnemyStats; 8] = [
    EnemyStats::new(10, 1, 0.1, false),
    EnemyStats::new(15, 2, 0.2, false),
    EnemyStats::new(50, 3, 0.05, false),
    EnemyStats::new(100, 5, 0.1, false),
    EnemyStats::new(300, 10, 0.025, false),
    EnemyStats::new(10, 1, 0.1, true),
    EnemyStats::new(15, 2, 0.2, true),
    EnemyStats::new(50, 3, 0.05, true),
];

/// Unique identifier assigned to an enemy when it spawns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Stage of an enemy's journey from the entry runway to the exit runway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnemyLeg {
    /// Walking the off-grid runway toward the entry tile.
    Entering,
    /// Following the flowfield across the grid; holds the current tile.
    Pathing(TileCoord),
    /// Walking the off-grid runway away from the exit tile.
    Exiting,
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Tile the tower occupies.
    pub tile: TileCoord,
    /// Type of the tower.
    pub kind: TowerKind,
    /// Current upgrade level.
    pub level: u8,
    /// Effective power in `0.0..=1.0`.
    pub power: f32,
    /// Tile of the core supplying the tower, if attached.
    pub core: Option<TileCoord>,
    /// Number of towers drawing from this tower. Only non-zero for cores.
    pub connected_towers: u32,
}

/// Immutable representation of a single wire node used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WireSnapshot {
    /// Tile the node occupies.
    pub tile: TileCoord,
    /// Side the parent lies on, if the node was grown from one.
    pub incoming: Option<Direction>,
    /// Tile of the parent node, if any.
    pub parent: Option<TileCoord>,
    /// Number of nodes fed by this node.
    pub child_count: usize,
    /// Pre-placed nodes cannot be removed.
    pub permanent: bool,
    /// Type of the tower standing on the node, if any.
    pub tower: Option<TowerKind>,
    /// Tile of the core powering this node's tree, if any.
    pub core: Option<TileCoord>,
}

/// Immutable representation of a single enemy used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Identifier assigned at spawn.
    pub id: EnemyId,
    /// Type of the enemy.
    pub kind: EnemyKind,
    /// Horizontal position in world units.
    pub x: f32,
    /// Vertical position in world units.
    pub y: f32,
    /// Remaining health.
    pub health: f32,
    /// Stage of the enemy's journey.
    pub leg: EnemyLeg,
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum PlacementError {
    /// The tile lies outside the grid.
    #[error("tile lies outside the grid")]
    OutOfBounds,
    /// Entry and exit tiles must stay clear.
    #[error("entry and exit tiles cannot hold towers")]
    Landmark,
    /// A tower already stands on the tile.
    #[error("tile already holds a tower")]
    Occupied,
    /// Non-core towers must be built on a wire node.
    #[error("tile has no wire to attach the tower to")]
    MissingWire,
    /// Cores may only anchor the root of a wire tree.
    #[error("cores can only be placed on the root of a wire tree")]
    CoreNotRoot,
    /// The tower would seal the last route from entry to exit.
    #[error("tower would block every path to the exit")]
    BlocksPath,
    /// The player cannot afford the tower.
    #[error("insufficient funds")]
    InsufficientFunds,
}

/// Reasons a tower removal request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum RemovalError {
    /// No tower stands on the tile.
    #[error("no tower stands on the tile")]
    MissingTower,
}

/// Reasons a tower upgrade request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum UpgradeError {
    /// No tower stands on the tile.
    #[error("no tower stands on the tile")]
    MissingTower,
    /// The tower already reached the highest level.
    #[error("tower is already at the highest level")]
    MaxLevel,
    /// The player cannot afford the upgrade.
    #[error("insufficient funds")]
    InsufficientFunds,
}

/// Reasons a wire edit may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum WireError {
    /// The tile lies outside the grid.
    #[error("tile lies outside the grid")]
    OutOfBounds,
    /// The tiles are not orthogonal neighbours.
    #[error("tiles are not adjacent")]
    NotAdjacent,
    /// No wire node exists on the referenced tile.
    #[error("no wire exists on the tile")]
    MissingWire,
    /// The target tile already carries a wire.
    #[error("tile already carries a wire")]
    Occupied,
    /// The requested side is where the node receives its own power.
    #[error("cannot extend a wire back through its incoming side")]
    IncomingSide,
    /// Pre-placed wires cannot be removed.
    #[error("permanent wires cannot be removed")]
    Permanent,
    /// The player cannot afford the wire.
    #[error("insufficient funds")]
    InsufficientFunds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_directions_cancel_offsets() {
        for direction in Direction::ALL {
            let (dx, dy) = direction.offset();
            let (ox, oy) = direction.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0), "{direction:?}");
            assert_eq!(direction.opposite().opposite(), direction);
        }
    }

    #[test]
    fn direction_indices_match_table_order() {
        for (index, direction) in Direction::ALL.into_iter().enumerate() {
            assert_eq!(direction.index(), index);
        }
    }

    #[test]
    fn step_refuses_to_underflow() {
        let origin = TileCoord::new(0, 0);
        assert_eq!(origin.step(Direction::Up), None);
        assert_eq!(origin.step(Direction::Left), None);
        assert_eq!(origin.step(Direction::Right), Some(TileCoord::new(1, 0)));
        assert_eq!(origin.step(Direction::Down), Some(TileCoord::new(0, 1)));
    }

    #[test]
    fn direction_to_only_accepts_neighbours() {
        let tile = TileCoord::new(3, 3);
        assert_eq!(
            tile.direction_to(TileCoord::new(3, 2)),
            Some(Direction::Up)
        );
        assert_eq!(
            tile.direction_to(TileCoord::new(2, 3)),
            Some(Direction::Left)
        );
        assert_eq!(tile.direction_to(TileCoord::new(4, 4)), None);
        assert_eq!(tile.direction_to(tile), None);
    }

    #[test]
    fn tower_stats_clamp_to_max_level() {
        assert_eq!(
            TowerKind::Normal.stats(MAX_TOWER_LEVEL + 3),
            TowerKind::Normal.stats(MAX_TOWER_LEVEL)
        );
        assert_eq!(TowerKind::Normal.stats(0).radius, 80);
        assert_eq!(TowerKind::Zap.stats(2).damage, 65);
    }

    #[test]
    fn cores_never_attack() {
        for level in 0..=MAX_TOWER_LEVEL {
            assert_eq!(TowerKind::Core.stats(level).radius, 0);
        }
    }

    #[test]
    fn only_flying_kinds_ignore_the_flowfield() {
        let flyers: Vec<_> = EnemyKind::ALL
            .into_iter()
            .filter(|kind| kind.stats().flying)
            .collect();
        assert_eq!(
            flyers,
            vec![
                EnemyKind::Flying,
                EnemyKind::FlyingFast,
                EnemyKind::FlyingHeavy
            ]
        );
    }

    #[test]
    fn game_speed_tick_multipliers() {
        assert_eq!(GameSpeed::Paused.ticks_per_frame(), 0);
        assert_eq!(GameSpeed::Normal.ticks_per_frame(), 1);
        assert_eq!(GameSpeed::Fast.ticks_per_frame(), 3);
    }
}
