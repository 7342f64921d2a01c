//! Packed enemy pool and per-tick motion along the committed flowfield.

use std::cmp::Ordering;

use glam::Vec2;
use tracing::warn;
use wire_defence_core::{Direction, EnemyId, EnemyKind, EnemyLeg, TileCoord};

use crate::pathing::FlowField;

/// Off-grid approach and departure lanes together with the grid landmarks.
#[derive(Clone, Debug, PartialEq)]
pub struct Runway {
    columns: u32,
    rows: u32,
    tile_size: f32,
    entry: TileCoord,
    exit: TileCoord,
    start: Vec2,
    end: Vec2,
}

impl Runway {
    /// Builds the runway for a grid, extending `runway_tiles` beyond both edges.
    #[must_use]
    pub fn new(columns: u32, rows: u32, tile_size: f32, runway_tiles: u32) -> Self {
        let middle = rows / 2;
        let entry = TileCoord::new(0, middle);
        let exit = TileCoord::new(columns.saturating_sub(1), middle);
        let lane = (middle as f32 + 0.5) * tile_size;
        let overhang = runway_tiles as f32 * tile_size;

        Self {
            columns,
            rows,
            tile_size,
            entry,
            exit,
            start: Vec2::new(-overhang, lane),
            end: Vec2::new(columns as f32 * tile_size + overhang, lane),
        }
    }

    /// Tile where enemies step onto the grid.
    #[must_use]
    pub const fn entry(&self) -> TileCoord {
        self.entry
    }

    /// Tile where enemies leave the grid.
    #[must_use]
    pub const fn exit(&self) -> TileCoord {
        self.exit
    }

    /// Spawn position in world units.
    #[must_use]
    pub const fn start(&self) -> Vec2 {
        self.start
    }

    /// Position past which an exiting enemy counts as leaked.
    #[must_use]
    pub const fn end(&self) -> Vec2 {
        self.end
    }

    /// Side length of a tile in world units.
    #[must_use]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Tile an enemy occupies given its position and velocity.
    ///
    /// The rounded position is biased half a tile against the direction of
    /// travel so an enemy only claims a new tile once its centre reaches it.
    fn biased_tile(&self, position: Vec2, velocity: Vec2) -> TileCoord {
        let half = (self.tile_size / 2.0).floor();
        let mut x = position.x.round();
        let mut y = position.y.round();

        if velocity.x > 0.0 {
            x -= half;
        } else if velocity.x < 0.0 {
            x += half;
        }
        if velocity.y < 0.0 {
            y += half;
        } else if velocity.y > 0.0 {
            y -= half;
        }

        let column = (x / self.tile_size)
            .floor()
            .clamp(0.0, self.columns.saturating_sub(1) as f32);
        let row = (y / self.tile_size)
            .floor()
            .clamp(0.0, self.rows.saturating_sub(1) as f32);
        TileCoord::new(column as u32, row as u32)
    }
}

/// Live state of a single enemy.
#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    id: EnemyId,
    kind: EnemyKind,
    position: Vec2,
    health: f32,
    leg: EnemyLeg,
    heading: Direction,
}

impl Enemy {
    fn new(id: EnemyId, kind: EnemyKind, health: f32, runway: &Runway) -> Self {
        Self {
            id,
            kind,
            position: runway.start(),
            health,
            leg: EnemyLeg::Entering,
            heading: Direction::Right,
        }
    }

    /// Identifier assigned at spawn.
    #[must_use]
    pub const fn id(&self) -> EnemyId {
        self.id
    }

    /// Type of the enemy.
    #[must_use]
    pub const fn kind(&self) -> EnemyKind {
        self.kind
    }

    /// Position in world units.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Remaining health. Zero or below means the enemy is dead.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Stage of the enemy's journey.
    #[must_use]
    pub const fn leg(&self) -> EnemyLeg {
        self.leg
    }

    /// Direction of the most recent movement.
    #[must_use]
    pub const fn heading(&self) -> Direction {
        self.heading
    }

    /// Subtracts `amount` health and returns what remains.
    pub(crate) fn damage(&mut self, amount: f32) -> f32 {
        self.health -= amount;
        self.health
    }
}

/// Result of advancing a single enemy by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The enemy moved and remains on its journey.
    Moved,
    /// The enemy stood on an unreachable tile and headed for the exit row.
    Stranded,
    /// The enemy had no health left and must be removed.
    Killed,
    /// The enemy reached the end of the exit runway.
    Leaked,
}

impl StepOutcome {
    /// Reports whether the enemy must leave the pool.
    #[must_use]
    pub const fn died(self) -> bool {
        matches!(self, Self::Killed | Self::Leaked)
    }
}

/// Advances an enemy by one tick along its current leg.
pub fn step(enemy: &mut Enemy, field: &FlowField, runway: &Runway) -> StepOutcome {
    if enemy.health <= 0.0 {
        return StepOutcome::Killed;
    }

    let stats = enemy.kind.stats();
    let speed = stats.speed * runway.tile_size;

    match enemy.leg {
        EnemyLeg::Entering => {
            enemy.heading = Direction::Right;
            enemy.position.x += speed;
            if enemy.position.x >= runway.entry.column() as f32 * runway.tile_size {
                enemy.leg = EnemyLeg::Pathing(runway.entry);
            }
            StepOutcome::Moved
        }
        EnemyLeg::Exiting => {
            enemy.heading = Direction::Right;
            enemy.position.x += speed;
            if enemy.position.x >= runway.end.x {
                enemy.health = 0.0;
                return StepOutcome::Leaked;
            }
            StepOutcome::Moved
        }
        EnemyLeg::Pathing(tile) => {
            let (direction, outcome) = if stats.flying {
                (Direction::Right, StepOutcome::Moved)
            } else {
                match field.cell(tile).direction() {
                    Some(direction) => (direction, StepOutcome::Moved),
                    None => {
                        warn!(enemy = enemy.id.get(), ?tile, "enemy.stranded");
                        (stranded_heading(tile, runway.exit), StepOutcome::Stranded)
                    }
                }
            };

            let (dx, dy) = direction.offset();
            let velocity = Vec2::new(dx as f32, dy as f32) * speed;
            enemy.position += velocity;
            enemy.heading = direction;

            let next = runway.biased_tile(enemy.position, velocity);
            enemy.leg = if next == runway.exit {
                EnemyLeg::Exiting
            } else {
                EnemyLeg::Pathing(next)
            };
            outcome
        }
    }
}

/// Heading of a ground enemy the flowfield does not reach.
///
/// The enemy closes in on the exit row first and then walks along it, so it
/// always ends on the exit tile even when towers wall it in.
fn stranded_heading(tile: TileCoord, exit: TileCoord) -> Direction {
    match tile.row().cmp(&exit.row()) {
        Ordering::Greater => Direction::Up,
        Ordering::Less => Direction::Down,
        Ordering::Equal => Direction::Right,
    }
}

/// Enemy that left the pool during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Departure {
    /// Identifier of the enemy.
    pub enemy: EnemyId,
    /// Type of the enemy.
    pub kind: EnemyKind,
    /// Whether the enemy escaped rather than died.
    pub leaked: bool,
}

/// Fixed-capacity pool whose active enemies occupy a dense prefix.
#[derive(Clone, Debug)]
pub struct EnemyPool {
    slots: Vec<Enemy>,
    active: usize,
    capacity: usize,
    next_id: u32,
}

impl EnemyPool {
    /// Creates an empty pool that holds at most `capacity` enemies.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            active: 0,
            capacity,
            next_id: 0,
        }
    }

    /// Maximum number of simultaneously active enemies.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of active enemies.
    #[must_use]
    pub const fn active_count(&self) -> usize {
        self.active
    }

    /// Active enemies in pool order.
    #[must_use]
    pub fn active(&self) -> &[Enemy] {
        &self.slots[..self.active]
    }

    /// Places a new enemy on the entry runway.
    ///
    /// Returns `None` when every slot is taken.
    pub fn spawn(
        &mut self,
        kind: EnemyKind,
        health_multiplier: f32,
        runway: &Runway,
    ) -> Option<EnemyId> {
        if self.active >= self.capacity {
            return None;
        }

        let id = EnemyId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let health = kind.stats().health as f32 * health_multiplier;
        let enemy = Enemy::new(id, kind, health, runway);

        if self.active < self.slots.len() {
            self.slots[self.active] = enemy;
        } else {
            self.slots.push(enemy);
        }
        self.active += 1;
        Some(id)
    }

    /// Removes the enemy at `index` by swapping the last active enemy into it.
    pub fn remove(&mut self, index: usize) {
        if index >= self.active {
            return;
        }
        self.active -= 1;
        self.slots.swap(index, self.active);
    }

    /// Looks up an active enemy by identifier.
    pub(crate) fn find_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        self.slots[..self.active]
            .iter_mut()
            .find(|enemy| enemy.id == id)
    }

    /// Steps every active enemy once, collecting those that left the pool.
    ///
    /// Returns the number of steps taken on unreachable tiles.
    pub fn advance(
        &mut self,
        field: &FlowField,
        runway: &Runway,
        departures: &mut Vec<Departure>,
    ) -> u64 {
        let mut stranded = 0;
        let mut index = 0;
        while index < self.active {
            let enemy = &mut self.slots[index];
            let outcome = step(enemy, field, runway);
            if outcome.died() {
                departures.push(Departure {
                    enemy: enemy.id,
                    kind: enemy.kind,
                    leaked: outcome == StepOutcome::Leaked,
                });
                // The swapped-in enemy still needs its step this tick.
                self.remove(index);
                continue;
            }
            if outcome == StepOutcome::Stranded {
                stranded += 1;
            }
            index += 1;
        }
        stranded
    }
}
