//! Seeded autoplayer that feeds synthetic gestures into the builder.
//!
//! Every few frames the autoplayer picks one move: mount an attack tower on
//! a free wire, draw a short wire, plant a new core or upgrade a tower. The
//! move is expressed as builder input so it goes through the same gesture
//! handling a player would.

use std::collections::VecDeque;

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;
use wire_defence_core::{Direction, TileCoord, TowerKind, WireSnapshot, MAX_TOWER_LEVEL};
use wire_defence_system_builder::{placement_preview, BuilderInput, PlacementPreview};
use wire_defence_world::{query, World};

const THINK_INTERVAL: u32 = 20;
const ATTEMPTS: usize = 16;
const MAX_WIRE_RUN: u32 = 3;
const ATTACK_KINDS: [TowerKind; 4] = [
    TowerKind::Normal,
    TowerKind::Slow,
    TowerKind::Splash,
    TowerKind::Zap,
];

/// Builder input for a single frame together with the hover preview.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Gesture {
    pub(crate) input: BuilderInput,
    pub(crate) preview: Option<PlacementPreview>,
}

/// Deterministic player stand-in.
#[derive(Debug)]
pub(crate) struct Autoplayer {
    rng: ChaCha8Rng,
    pending: VecDeque<Gesture>,
    cooldown: u32,
}

impl Autoplayer {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            pending: VecDeque::new(),
            cooldown: 0,
        }
    }

    /// Produces the gesture for the next frame.
    pub(crate) fn next_gesture(&mut self, world: &mut World) -> Gesture {
        if let Some(gesture) = self.pending.pop_front() {
            return gesture;
        }
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return Gesture::default();
        }
        self.cooldown = THINK_INTERVAL;
        self.plan(world);
        self.pending.pop_front().unwrap_or_default()
    }

    fn plan(&mut self, world: &mut World) {
        let funds = query::purse(world).money;
        let wires = query::wire_view(world);
        let planned = match self.rng.gen_range(0..10) {
            0..=3 => self.plan_tower(world, &wires, funds),
            4..=6 => self.plan_wire(world, &wires, funds),
            7 => self.plan_upgrade(world, funds),
            _ => false,
        };
        if !planned {
            let _ = self.plan_core(world, funds);
        }
    }

    fn plan_tower(&mut self, world: &mut World, wires: &[WireSnapshot], funds: u32) -> bool {
        let free: Vec<_> = wires.iter().filter(|wire| wire.tower.is_none()).collect();
        for _ in 0..ATTEMPTS {
            let (Some(wire), Some(kind)) = (
                free.choose(&mut self.rng),
                ATTACK_KINDS.choose(&mut self.rng).copied(),
            ) else {
                return false;
            };
            let preview = placement_preview(
                kind,
                wire.tile,
                funds,
                world.can_place(wire.tile),
                Some(**wire),
            );
            if preview.placeable {
                trace!(tile = ?wire.tile, ?kind, "autoplay.tower");
                self.drop_tower(preview, funds);
                return true;
            }
        }
        false
    }

    fn plan_core(&mut self, world: &mut World, funds: u32) -> bool {
        let (columns, rows) = query::occupancy(world).dimensions();
        for _ in 0..ATTEMPTS {
            let tile = TileCoord::new(self.rng.gen_range(0..columns), self.rng.gen_range(0..rows));
            if query::occupancy(world).is_blocked(tile) {
                continue;
            }
            let wire = query::wire_at(world, tile);
            let preview =
                placement_preview(TowerKind::Core, tile, funds, world.can_place(tile), wire);
            if preview.placeable {
                trace!(?tile, "autoplay.core");
                self.drop_tower(preview, funds);
                return true;
            }
        }
        false
    }

    fn plan_wire(&mut self, world: &World, wires: &[WireSnapshot], funds: u32) -> bool {
        let occupancy = query::occupancy(world);
        for _ in 0..ATTEMPTS {
            let (Some(start), Some(direction)) = (
                wires.choose(&mut self.rng),
                Direction::ALL.choose(&mut self.rng).copied(),
            ) else {
                return false;
            };
            if start.incoming == Some(direction) {
                continue;
            }

            let run = self.rng.gen_range(1..=MAX_WIRE_RUN);
            let mut path = Vec::new();
            let mut cursor = start.tile;
            for _ in 0..run {
                match cursor.step(direction) {
                    Some(next)
                        if occupancy.contains(next) && query::wire_at(world, next).is_none() =>
                    {
                        path.push(next);
                        cursor = next;
                    }
                    _ => break,
                }
            }
            if path.is_empty() {
                continue;
            }

            trace!(from = ?start.tile, len = path.len(), "autoplay.wire");
            self.pending.push_back(Gesture {
                input: BuilderInput {
                    cursor_tile: Some(start.tile),
                    pressed: true,
                    held: true,
                    funds,
                    ..BuilderInput::default()
                },
                preview: None,
            });
            for tile in &path {
                self.pending.push_back(Gesture {
                    input: BuilderInput {
                        cursor_tile: Some(*tile),
                        held: true,
                        funds,
                        ..BuilderInput::default()
                    },
                    preview: None,
                });
            }
            self.pending.push_back(Gesture {
                input: BuilderInput {
                    cursor_tile: Some(cursor),
                    released: true,
                    funds,
                    ..BuilderInput::default()
                },
                preview: None,
            });
            return true;
        }
        false
    }

    fn plan_upgrade(&mut self, world: &World, funds: u32) -> bool {
        let candidates: Vec<_> = query::tower_view(world)
            .into_iter()
            .filter(|tower| tower.level < MAX_TOWER_LEVEL && tower.kind.price() <= funds)
            .collect();
        let Some(tower) = candidates.choose(&mut self.rng) else {
            return false;
        };
        trace!(tile = ?tower.tile, "autoplay.upgrade");
        self.pending.push_back(Gesture {
            input: BuilderInput {
                cursor_tile: Some(tower.tile),
                upgrade_action: true,
                funds,
                ..BuilderInput::default()
            },
            preview: None,
        });
        true
    }

    fn drop_tower(&mut self, preview: PlacementPreview, funds: u32) {
        self.pending.push_back(Gesture {
            input: BuilderInput {
                cursor_tile: Some(preview.tile),
                released: true,
                dragging_tower: Some(preview.kind),
                funds,
                ..BuilderInput::default()
            },
            preview: Some(preview),
        });
    }
}
