//! Tunable world parameters and their validation.

use serde::Deserialize;
use thiserror::Error;
use wire_defence_core::{Direction, TileCoord, WireError};

/// Parameters used to construct a [`crate::World`].
///
/// Every field falls back to its default when omitted, so a partial TOML
/// table is enough to override a single value.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of grid columns.
    pub columns: u32,
    /// Number of grid rows.
    pub rows: u32,
    /// Side length of a tile in world units.
    pub tile_size: f32,
    /// Length of the off-grid runways, measured in tiles.
    pub runway_tiles: u32,
    /// Maximum number of simultaneously active enemies.
    pub max_enemies: usize,
    /// Money available when the game starts.
    pub starting_money: u32,
    /// Health available when the game starts.
    pub starting_health: u32,
    /// Cost of a single wire node, also refunded when it is removed.
    pub wire_price: u32,
    /// Pre-placed wires that can never be removed, parents first.
    pub permanent_wires: Vec<WireSeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            columns: 28,
            rows: 18,
            tile_size: 16.0,
            runway_tiles: 5,
            max_enemies: 100,
            starting_money: 100,
            starting_health: 100,
            wire_price: 1,
            permanent_wires: vec![
                WireSeed::root(TileCoord::new(1, 0), Direction::Up),
                WireSeed::root(TileCoord::new(3, 8), Direction::Down),
                WireSeed::child(TileCoord::new(3, 7), TileCoord::new(3, 8)),
            ],
        }
    }
}

impl Config {
    /// Checks the parameters for values the world cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns < 2 || self.rows == 0 {
            return Err(ConfigError::GridTooSmall {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if self.columns > u32::from(u16::MAX) || self.rows > u32::from(u16::MAX) {
            return Err(ConfigError::GridTooLarge {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(ConfigError::TileSize(self.tile_size));
        }
        if self.max_enemies == 0 {
            return Err(ConfigError::EmptyPool);
        }
        Ok(())
    }
}

/// A pre-placed wire node.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireSeed {
    /// Tile the node occupies.
    pub tile: TileCoord,
    /// Side facing the map edge. Only meaningful for roots.
    #[serde(default)]
    pub incoming: Option<Direction>,
    /// Tile of an earlier permanent node feeding this one.
    #[serde(default)]
    pub parent: Option<TileCoord>,
}

impl WireSeed {
    /// Seed for a root node entering from `incoming`.
    #[must_use]
    pub const fn root(tile: TileCoord, incoming: Direction) -> Self {
        Self {
            tile,
            incoming: Some(incoming),
            parent: None,
        }
    }

    /// Seed for a node fed by the permanent node on `parent`.
    #[must_use]
    pub const fn child(tile: TileCoord, parent: TileCoord) -> Self {
        Self {
            tile,
            incoming: None,
            parent: Some(parent),
        }
    }
}

/// Errors raised while constructing a world from a [`Config`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The grid cannot hold distinct entry and exit tiles.
    #[error("grid of {columns}x{rows} tiles is too small")]
    GridTooSmall {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
    /// Path distances would overflow.
    #[error("grid of {columns}x{rows} tiles is too large")]
    GridTooLarge {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
    /// Tile size must be a positive finite number.
    #[error("tile size {0} must be positive")]
    TileSize(f32),
    /// The enemy pool needs at least one slot.
    #[error("enemy pool capacity must be at least one")]
    EmptyPool,
    /// A permanent wire could not be placed.
    #[error("permanent wire {index} on {tile:?} is invalid")]
    Seed {
        /// Position of the seed in the list.
        index: usize,
        /// Tile of the seed.
        tile: TileCoord,
        /// Reason the wire graph refused the seed.
        #[source]
        source: WireError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn degenerate_grids_are_rejected() {
        let config = Config {
            columns: 1,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::GridTooSmall { columns: 1, .. })
        ));

        let config = Config {
            tile_size: 0.0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TileSize(0.0)));

        let config = Config {
            max_enemies: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyPool));
    }
}
