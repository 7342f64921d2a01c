use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wire_defence_core::{Command, Event, PlacementError, TileCoord, TowerKind};
use wire_defence_world::{
    self as world,
    pathing::{regenerate_flowfield, FlowCell, FlowField, OccupancyGrid, Pathing},
    query, Config, World,
};

fn tile(column: u32, row: u32) -> TileCoord {
    TileCoord::new(column, row)
}

fn open_world(columns: u32, rows: u32, money: u32) -> World {
    World::new(Config {
        columns,
        rows,
        starting_money: money,
        permanent_wires: Vec::new(),
        ..Config::default()
    })
    .expect("valid config")
}

#[test]
fn empty_grid_flood_fill_reaches_every_cell() {
    let grid = OccupancyGrid::new(4, 3);
    let mut field = FlowField::new(4, 3);
    let entry = tile(0, 1);
    let exit = tile(3, 1);

    assert!(regenerate_flowfield(&grid, entry, exit, &mut field));
    assert_eq!(field.reachable_count(), 12);
    assert!(field.cells().iter().all(|cell| *cell != FlowCell::Unreachable));
    assert_eq!(field.cell(exit), FlowCell::Exit);
    assert_eq!(field.distance(exit), Some(0));

    let mut current = entry;
    let mut steps = 0;
    while current != exit {
        let direction = field
            .cell(current)
            .direction()
            .expect("every reachable non-exit cell points somewhere");
        let next = current.step(direction).expect("step stays on the grid");
        assert!(
            field.distance(next) < field.distance(current),
            "moving from {current:?} to {next:?} did not approach the exit"
        );
        current = next;
        steps += 1;
        assert!(steps <= 12, "path from the entry loops");
    }
    assert_eq!(steps, 3);
}

#[test]
fn sealed_column_leaves_no_path() {
    let mut grid = OccupancyGrid::new(4, 3);
    for row in 0..3 {
        grid.set_blocked(tile(2, row), true);
    }
    let mut field = FlowField::new(4, 3);

    assert!(!regenerate_flowfield(&grid, tile(0, 1), tile(3, 1), &mut field));
    assert_eq!(field.cell(tile(0, 1)), FlowCell::Unreachable);
}

#[test]
fn validator_refuses_the_sealing_tile() {
    let mut pathing = Pathing::new(4, 3, tile(0, 1), tile(3, 1));
    assert!(pathing.occupy(tile(2, 0)));
    assert!(pathing.occupy(tile(2, 1)));

    assert!(!pathing.can_place(tile(2, 2)), "last gap in the column");
    assert!(pathing.can_place(tile(1, 0)));
    assert!(pathing.can_place(tile(0, 0)));
    assert!(pathing.is_complete(), "queries never touch the committed state");
    assert!(!pathing.occupancy().is_blocked(tile(2, 2)));
}

#[test]
fn preview_agrees_with_a_real_placement_for_every_tile() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed_0001);
    for _ in 0..20 {
        let mut pathing = Pathing::new(7, 5, tile(0, 2), tile(6, 2));
        for _ in 0..8 {
            let candidate = tile(rng.gen_range(0..7), rng.gen_range(0..5));
            if pathing.can_place(candidate) {
                assert!(pathing.occupy(candidate));
            }
        }

        for column in 0..7 {
            for row in 0..5 {
                let candidate = tile(column, row);
                if pathing.is_landmark(candidate) {
                    continue;
                }
                let mut committed = pathing.clone();
                let predicted = pathing.preview_flowfield(candidate);
                let actual = committed.occupy(candidate);
                assert_eq!(predicted, actual, "preview disagreed on {candidate:?}");
            }
        }
    }
}

#[test]
fn world_rejects_placements_that_block_the_path() {
    let mut world = open_world(4, 3, 1_000);
    let mut events = Vec::new();

    for row in 0..2 {
        world::apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Core,
                tile: tile(2, row),
            },
            &mut events,
        );
    }
    assert!(!world.can_place(tile(2, 2)));

    events.clear();
    world::apply(
        &mut world,
        Command::PlaceTower {
            kind: TowerKind::Core,
            tile: tile(2, 2),
        },
        &mut events,
    );

    assert_eq!(
        events,
        vec![Event::TowerPlacementRejected {
            tile: tile(2, 2),
            kind: TowerKind::Core,
            reason: PlacementError::BlocksPath,
        }]
    );
    assert!(query::path_complete(&world));
    assert!(query::wire_at(&world, tile(2, 2)).is_none());
}

#[test]
fn random_build_orders_keep_the_path_open() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed_0002);
    let (columns, rows) = (9, 7);
    let mut world = open_world(columns, rows, 100_000);

    for _ in 0..600 {
        let target = tile(rng.gen_range(0..columns), rng.gen_range(0..rows));
        let command = match rng.gen_range(0..4) {
            0 => Command::PlaceTower {
                kind: TowerKind::Core,
                tile: target,
            },
            1 => Command::PlaceTower {
                kind: TowerKind::ALL[rng.gen_range(1..TowerKind::ALL.len())],
                tile: target,
            },
            2 => {
                let neighbour = tile(
                    (target.column() + 1).min(columns - 1),
                    target.row(),
                );
                Command::ExtendWire {
                    from: target,
                    to: neighbour,
                }
            }
            _ => Command::RemoveTower { tile: target },
        };

        let mut events = Vec::new();
        world::apply(&mut world, command, &mut events);

        assert!(query::path_complete(&world));
        let occupancy = query::occupancy(&world);
        let mut field = FlowField::new(columns, rows);
        assert!(regenerate_flowfield(
            occupancy,
            query::entry(&world),
            query::exit(&world),
            &mut field
        ));

        let towers = query::tower_view(&world);
        assert_eq!(occupancy.blocked_count(), towers.len());
        for tower in &towers {
            assert!(occupancy.is_blocked(tower.tile));
        }
    }
}

#[test]
fn hover_conversion_uses_world_tile_size() {
    let world = open_world(4, 3, 0);
    assert_eq!(world.coord_to_tile(17.0, 33.0), Some(tile(1, 2)));
    assert_eq!(world.coord_to_tile(64.0, 0.0), None);
    assert_eq!(world.coord_to_tile(-1.0, 0.0), None);
}
