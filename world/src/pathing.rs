//! Occupancy grid, flowfield generation and speculative placement validation.

use std::collections::VecDeque;

use tracing::debug;
use wire_defence_core::{Direction, TileCoord};

/// Distance recorded for cells the flood fill never reached.
pub const UNREACHABLE_DISTANCE: u16 = u16::MAX;

/// Dense boolean grid marking the tiles blocked by towers.
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    columns: u32,
    rows: u32,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    /// Creates an empty grid with the provided dimensions.
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows,
            cells: vec![false; cell_count(columns, rows)],
        }
    }

    /// Provides the dimensions of the grid as `(columns, rows)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Reports whether the tile lies inside the grid.
    #[must_use]
    pub fn contains(&self, tile: TileCoord) -> bool {
        tile.column() < self.columns && tile.row() < self.rows
    }

    /// Reports whether a tower blocks the tile. Tiles outside the grid are never blocked.
    #[must_use]
    pub fn is_blocked(&self, tile: TileCoord) -> bool {
        self.index(tile)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or(false)
    }

    /// Marks or clears a tile. Tiles outside the grid are ignored.
    pub fn set_blocked(&mut self, tile: TileCoord, blocked: bool) {
        if let Some(index) = self.index(tile) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = blocked;
            }
        }
    }

    /// Number of tiles currently blocked.
    #[must_use]
    pub fn blocked_count(&self) -> usize {
        self.cells.iter().filter(|blocked| **blocked).count()
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        tile_index(self.columns, self.rows, tile)
    }
}

/// Guidance stored for a single flowfield cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FlowCell {
    /// The flood fill never reached the cell.
    #[default]
    Unreachable,
    /// The exit tile that seeded the flood fill.
    Exit,
    /// Direction to move in order to get one step closer to the exit.
    Toward(Direction),
}

impl FlowCell {
    /// Direction stored in the cell, if it guides toward the exit.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Toward(direction) => Some(direction),
            Self::Unreachable | Self::Exit => None,
        }
    }

    /// Compact integer encoding used by debug overlays.
    ///
    /// Unreachable cells encode as `-1`, guided cells as their direction
    /// index, and the exit as the index of [`Direction::Right`].
    #[must_use]
    pub fn code(self) -> i8 {
        let index = match self {
            Self::Unreachable => return -1,
            Self::Exit => Direction::Right.index(),
            Self::Toward(direction) => direction.index(),
        };
        i8::try_from(index).unwrap_or(-1)
    }
}

/// Direction field guiding ground enemies toward the exit.
///
/// Besides the direction per cell the field keeps the breadth-first distance
/// to the exit, which callers use to check that every step makes progress.
#[derive(Clone, Debug)]
pub struct FlowField {
    columns: u32,
    rows: u32,
    cells: Vec<FlowCell>,
    distances: Vec<u16>,
    reachable: usize,
}

impl FlowField {
    /// Creates a field of the provided dimensions with every cell unreachable.
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        let count = cell_count(columns, rows);
        Self {
            columns,
            rows,
            cells: vec![FlowCell::Unreachable; count],
            distances: vec![UNREACHABLE_DISTANCE; count],
            reachable: 0,
        }
    }

    /// Provides the dimensions of the field as `(columns, rows)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Guidance for the tile. Tiles outside the field are unreachable.
    #[must_use]
    pub fn cell(&self, tile: TileCoord) -> FlowCell {
        tile_index(self.columns, self.rows, tile)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or_default()
    }

    /// Breadth-first distance from the tile to the exit, if reachable.
    #[must_use]
    pub fn distance(&self, tile: TileCoord) -> Option<u16> {
        tile_index(self.columns, self.rows, tile)
            .and_then(|index| self.distances.get(index).copied())
            .filter(|distance| *distance != UNREACHABLE_DISTANCE)
    }

    /// Dense guidance stored in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[FlowCell] {
        &self.cells
    }

    /// Number of cells the last flood fill reached, exit included.
    #[must_use]
    pub const fn reachable_count(&self) -> usize {
        self.reachable
    }

    fn reset(&mut self, columns: u32, rows: u32) {
        let count = cell_count(columns, rows);
        self.columns = columns;
        self.rows = rows;
        self.cells.clear();
        self.cells.resize(count, FlowCell::Unreachable);
        self.distances.clear();
        self.distances.resize(count, UNREACHABLE_DISTANCE);
        self.reachable = 0;
    }
}

/// Rebuilds `field` with a breadth-first flood fill seeded at `exit`.
///
/// Every reachable tile receives the direction leading to the neighbour that
/// discovered it. The fill always runs until the frontier is exhausted.
/// Returns whether `entry` was reached.
pub fn regenerate_flowfield(
    occupancy: &OccupancyGrid,
    entry: TileCoord,
    exit: TileCoord,
    field: &mut FlowField,
) -> bool {
    let (columns, rows) = occupancy.dimensions();
    field.reset(columns, rows);

    let Some(exit_index) = tile_index(columns, rows, exit) else {
        return false;
    };
    if occupancy.is_blocked(exit) {
        return false;
    }

    field.cells[exit_index] = FlowCell::Exit;
    field.distances[exit_index] = 0;
    field.reachable = 1;

    let mut complete = exit == entry;
    let mut queue = VecDeque::new();
    queue.push_back(exit);

    while let Some(tile) = queue.pop_front() {
        let Some(current_index) = tile_index(columns, rows, tile) else {
            continue;
        };
        let next_distance = field.distances[current_index].saturating_add(1);

        for direction in Direction::ALL {
            let Some(neighbor) = tile.step(direction) else {
                continue;
            };
            let Some(neighbor_index) = tile_index(columns, rows, neighbor) else {
                continue;
            };

            if occupancy.is_blocked(neighbor) {
                continue;
            }

            if field.cells[neighbor_index] != FlowCell::Unreachable {
                continue;
            }

            if neighbor == entry {
                complete = true;
            }

            field.cells[neighbor_index] = FlowCell::Toward(direction.opposite());
            field.distances[neighbor_index] = next_distance;
            field.reachable += 1;
            queue.push_back(neighbor);
        }
    }

    complete
}

/// Converts a world-space position into the tile containing it.
///
/// Positions outside the grid, including negative ones, yield `None`.
#[must_use]
pub fn coord_to_tile(x: f32, y: f32, tile_size: f32, columns: u32, rows: u32) -> Option<TileCoord> {
    if !(tile_size > 0.0) || !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
        return None;
    }

    let column = (x / tile_size).floor();
    let row = (y / tile_size).floor();
    if column >= columns as f32 || row >= rows as f32 {
        return None;
    }

    Some(TileCoord::new(column as u32, row as u32))
}

/// Owns the occupancy grid together with the committed and preview flowfields.
///
/// Every occupancy mutation regenerates the committed field before returning,
/// so readers never observe a grid and field that disagree.
#[derive(Clone, Debug)]
pub struct Pathing {
    occupancy: OccupancyGrid,
    committed: FlowField,
    preview: FlowField,
    entry: TileCoord,
    exit: TileCoord,
    complete: bool,
    memo: Option<(TileCoord, bool)>,
}

impl Pathing {
    /// Creates an unobstructed grid and computes its committed flowfield.
    #[must_use]
    pub fn new(columns: u32, rows: u32, entry: TileCoord, exit: TileCoord) -> Self {
        let mut pathing = Self {
            occupancy: OccupancyGrid::new(columns, rows),
            committed: FlowField::new(columns, rows),
            preview: FlowField::new(columns, rows),
            entry,
            exit,
            complete: false,
            memo: None,
        };
        let _ = pathing.regenerate();
        pathing
    }

    /// Occupancy grid backing every pathing query.
    #[must_use]
    pub const fn occupancy(&self) -> &OccupancyGrid {
        &self.occupancy
    }

    /// Flowfield followed by live enemies.
    #[must_use]
    pub const fn committed(&self) -> &FlowField {
        &self.committed
    }

    /// Scratch flowfield from the most recent speculative placement.
    #[must_use]
    pub const fn preview(&self) -> &FlowField {
        &self.preview
    }

    /// Tile where enemies enter the grid.
    #[must_use]
    pub const fn entry(&self) -> TileCoord {
        self.entry
    }

    /// Tile where enemies leave the grid.
    #[must_use]
    pub const fn exit(&self) -> TileCoord {
        self.exit
    }

    /// Whether the committed field connects the entry to the exit.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Reports whether the tile is the entry or the exit.
    #[must_use]
    pub fn is_landmark(&self, tile: TileCoord) -> bool {
        tile == self.entry || tile == self.exit
    }

    /// Reports whether blocking the tile would still leave a route to the exit.
    ///
    /// The answer for the last queried tile is memoized until the occupancy
    /// changes, so a stationary cursor costs a single flood fill.
    pub fn can_place(&mut self, tile: TileCoord) -> bool {
        if !self.occupancy.contains(tile) || self.is_landmark(tile) {
            return false;
        }

        if let Some((cached_tile, cached)) = self.memo {
            if cached_tile == tile {
                return cached;
            }
        }

        let valid = self.preview_flowfield(tile);
        self.memo = Some((tile, valid));
        valid
    }

    /// Regenerates the preview field as if `tile` were blocked.
    ///
    /// The tile is marked, the fill runs, and the mark is reverted before
    /// returning. Already blocked tiles report `true` since nothing changes.
    pub fn preview_flowfield(&mut self, tile: TileCoord) -> bool {
        if self.occupancy.is_blocked(tile) {
            return true;
        }

        self.occupancy.set_blocked(tile, true);
        let valid = regenerate_flowfield(&self.occupancy, self.entry, self.exit, &mut self.preview);
        self.occupancy.set_blocked(tile, false);
        valid
    }

    /// Blocks the tile and regenerates the committed field.
    ///
    /// Returns whether the entry still reaches the exit.
    pub fn occupy(&mut self, tile: TileCoord) -> bool {
        self.occupancy.set_blocked(tile, true);
        self.regenerate()
    }

    /// Clears every provided tile and regenerates the committed field once.
    ///
    /// Returns whether the entry reaches the exit.
    pub fn vacate_all<I>(&mut self, tiles: I) -> bool
    where
        I: IntoIterator<Item = TileCoord>,
    {
        for tile in tiles {
            self.occupancy.set_blocked(tile, false);
        }
        self.regenerate()
    }

    fn regenerate(&mut self) -> bool {
        self.memo = None;
        self.complete =
            regenerate_flowfield(&self.occupancy, self.entry, self.exit, &mut self.committed);
        debug!(
            reachable = self.committed.reachable_count(),
            blocked = self.occupancy.blocked_count(),
            complete = self.complete,
            "flowfield.regenerated"
        );
        self.complete
    }
}

fn cell_count(columns: u32, rows: u32) -> usize {
    let count = u64::from(columns) * u64::from(rows);
    usize::try_from(count).unwrap_or(0)
}

fn tile_index(columns: u32, rows: u32, tile: TileCoord) -> Option<usize> {
    if tile.column() >= columns || tile.row() >= rows {
        return None;
    }
    let column = usize::try_from(tile.column()).ok()?;
    let row = usize::try_from(tile.row()).ok()?;
    let width = usize::try_from(columns).ok()?;
    row.checked_mul(width)?.checked_add(column)
}
