//! Authoritative tower state, the core power formula and per-tick combat.

use glam::Vec2;
use slotmap::{new_key_type, SlotMap};
use wire_defence_core::{EnemyId, EnemyKind, TileCoord, TowerKind};

use crate::enemies::EnemyPool;

new_key_type! {
    /// Arena key of a tower owned by the wire graph.
    pub(crate) struct TowerId;
}

/// Exponential falloff applied per tower beyond a core's capacity.
const POWER_FALLOFF: f32 = 0.25;

/// Snapshot of a tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Tower {
    /// Tile the tower occupies.
    pub(crate) tile: TileCoord,
    /// Kind of tower that was constructed.
    pub(crate) kind: TowerKind,
    /// Current upgrade level.
    pub(crate) level: u8,
    /// Core supplying the tower. Always `None` for cores.
    pub(crate) core: Option<TowerId>,
    /// Number of non-core towers drawing from this core.
    pub(crate) connected_towers: u32,
    /// Enemy currently tracked by the tower.
    pub(crate) target: Option<EnemyId>,
    /// Ticks remaining until the next shot, scaled by power.
    pub(crate) cooldown: f32,
}

impl Tower {
    pub(crate) fn new(tile: TileCoord, kind: TowerKind, level: u8) -> Self {
        Self {
            tile,
            kind,
            level,
            core: None,
            connected_towers: 0,
            target: None,
            cooldown: 0.0,
        }
    }
}

/// Result of a tower landing a shot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Shot {
    pub(crate) enemy: EnemyId,
    pub(crate) damage: u32,
    /// Kind and reward of the enemy when the shot was fatal.
    pub(crate) kill: Option<(EnemyKind, u32)>,
}

/// Number of towers a core supplies at full strength.
pub(crate) fn core_capacity(level: u8) -> i64 {
    (i64::from(level) + 1) * 2
}

/// Power delivered by a core of `core_level` that feeds `connected` towers.
pub(crate) fn power_for_load(connected: u32, core_level: u8) -> f32 {
    let load = i64::from(connected) - core_capacity(core_level);
    let exponent = -POWER_FALLOFF * (load - 1) as f32;
    exponent.exp().min(1.0)
}

/// Effective power of a tower in `0.0..=1.0`.
///
/// Unattached non-core towers receive no power at all.
pub(crate) fn power(towers: &SlotMap<TowerId, Tower>, id: TowerId) -> f32 {
    let Some(tower) = towers.get(id) else {
        return 0.0;
    };

    if tower.kind.is_core() {
        return power_for_load(tower.connected_towers, tower.level);
    }

    tower
        .core
        .and_then(|core| towers.get(core))
        .map_or(0.0, |core| {
            power_for_load(core.connected_towers, core.level)
        })
}

/// Runs one combat tick for a tower against the active enemies.
pub(crate) fn engage(
    tower: &mut Tower,
    power: f32,
    enemies: &mut EnemyPool,
    tile_size: f32,
) -> Option<Shot> {
    if power <= 0.0 {
        return None;
    }

    let stats = tower.kind.stats(tower.level);
    if stats.radius == 0 {
        return None;
    }

    let center = tile_center(tower.tile, tile_size);
    let radius = stats.radius as f32;

    tower.cooldown -= power;

    if tower.target.is_none() {
        tower.target = enemies
            .active()
            .iter()
            .find(|enemy| enemy.health() > 0.0 && in_range(enemy.position(), center, radius))
            .map(|enemy| enemy.id());
    }

    let target = tower.target?;
    let Some(enemy) = enemies.find_mut(target) else {
        tower.target = None;
        return None;
    };

    if enemy.health() <= 0.0 || !in_range(enemy.position(), center, radius) {
        tower.target = None;
        return None;
    }

    if tower.cooldown > 0.0 {
        return None;
    }

    let remaining = enemy.damage(stats.damage as f32);
    tower.cooldown = stats.reload_ticks as f32;

    let kill = (remaining <= 0.0).then(|| (enemy.kind(), enemy.kind().stats().reward));
    Some(Shot {
        enemy: target,
        damage: stats.damage,
        kill,
    })
}

/// World-space centre of a tile.
pub(crate) fn tile_center(tile: TileCoord, tile_size: f32) -> Vec2 {
    Vec2::new(
        (tile.column() as f32 + 0.5) * tile_size,
        (tile.row() as f32 + 0.5) * tile_size,
    )
}

fn in_range(point: Vec2, center: Vec2, radius: f32) -> bool {
    point.distance_squared(center) < radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemies::Runway;

    #[test]
    fn first_towers_on_a_core_draw_full_power() {
        for connected in 0..=3 {
            assert_eq!(power_for_load(connected, 0), 1.0, "{connected} towers");
        }
        assert!(power_for_load(4, 0) < 1.0);
    }

    #[test]
    fn capacity_grows_with_core_level() {
        assert_eq!(core_capacity(0), 2);
        assert_eq!(core_capacity(1), 4);
        assert_eq!(core_capacity(2), 6);
        assert_eq!(power_for_load(5, 1), 1.0);
        assert!(power_for_load(5, 0) < 1.0);
    }

    #[test]
    fn power_decays_exponentially_past_capacity() {
        let expected = (-0.25_f32 * 2.0).exp();
        assert!((power_for_load(5, 0) - expected).abs() < 1e-6);

        let mut previous = power_for_load(0, 1);
        for connected in 1..40 {
            let current = power_for_load(connected, 1);
            assert!(current <= previous, "power rose at {connected} towers");
            assert!(current > 0.0);
            previous = current;
        }
    }

    #[test]
    fn unattached_towers_are_unpowered() {
        let mut towers = SlotMap::with_key();
        let id = towers.insert(Tower::new(TileCoord::new(1, 1), TowerKind::Normal, 0));
        assert_eq!(power(&towers, id), 0.0);
    }

    #[test]
    fn attached_towers_share_their_core_power() {
        let mut towers = SlotMap::with_key();
        let core = towers.insert(Tower::new(TileCoord::new(0, 0), TowerKind::Core, 0));
        let attached = towers.insert(Tower::new(TileCoord::new(1, 0), TowerKind::Normal, 0));
        towers[attached].core = Some(core);
        towers[core].connected_towers = 6;

        assert_eq!(power(&towers, attached), power(&towers, core));
        assert!(power(&towers, core) < 1.0);
    }

    #[test]
    fn powered_tower_hits_enemy_in_range() {
        let runway = Runway::new(6, 3, 16.0, 0);
        let mut enemies = EnemyPool::with_capacity(4);
        let enemy = enemies
            .spawn(EnemyKind::GroundHeavy, 1.0, &runway)
            .expect("pool has room");
        let mut tower = Tower::new(TileCoord::new(1, 1), TowerKind::Normal, 0);

        let shot = engage(&mut tower, 1.0, &mut enemies, 16.0).expect("tower fires");

        assert_eq!(shot.enemy, enemy);
        assert_eq!(shot.damage, 4);
        assert_eq!(shot.kill, None);
        assert_eq!(tower.cooldown, 8.0);
        assert_eq!(enemies.active()[0].health(), 46.0);
        assert_eq!(engage(&mut tower, 1.0, &mut enemies, 16.0), None);
    }

    #[test]
    fn unpowered_and_core_towers_hold_fire() {
        let runway = Runway::new(6, 3, 16.0, 0);
        let mut enemies = EnemyPool::with_capacity(4);
        let _ = enemies.spawn(EnemyKind::Ground, 1.0, &runway);

        let mut unpowered = Tower::new(TileCoord::new(1, 1), TowerKind::Normal, 0);
        assert_eq!(engage(&mut unpowered, 0.0, &mut enemies, 16.0), None);
        assert_eq!(unpowered.cooldown, 0.0);

        let mut core = Tower::new(TileCoord::new(1, 1), TowerKind::Core, 0);
        assert_eq!(engage(&mut core, 1.0, &mut enemies, 16.0), None);
    }

    #[test]
    fn fatal_shot_reports_the_reward() {
        let runway = Runway::new(6, 3, 16.0, 0);
        let mut enemies = EnemyPool::with_capacity(4);
        let _ = enemies.spawn(EnemyKind::Ground, 1.0, &runway);
        let mut tower = Tower::new(TileCoord::new(1, 1), TowerKind::Splash, 0);

        let shot = engage(&mut tower, 1.0, &mut enemies, 16.0).expect("tower fires");

        assert_eq!(shot.kill, Some((EnemyKind::Ground, 1)));
        assert_eq!(engage(&mut tower, 1.0, &mut enemies, 16.0), None);
        assert_eq!(tower.target, None, "dead targets are released");
    }
}
