use wire_defence_core::{Command, EnemyKind, Event};
use wire_defence_system_waves::{Waves, WAVES, WAVE_COUNT};
use wire_defence_world::{self as world, query, Config, World};

fn tick(waves: &mut Waves, tick: u64, active_enemies: usize) -> Vec<Command> {
    let mut commands = Vec::new();
    waves.handle(&[Event::TimeAdvanced { tick }], active_enemies, &mut commands);
    commands
}

fn spawned_kind(command: &Command) -> Option<EnemyKind> {
    match command {
        Command::SpawnEnemy { kind, .. } => Some(*kind),
        _ => None,
    }
}

#[test]
fn opening_waves_follow_the_counter_schedule() {
    let mut waves = Waves::new();
    let mut spawns = Vec::new();

    for index in 1..=104 {
        for command in tick(&mut waves, index, 0) {
            spawns.push((index, spawned_kind(&command)));
        }
    }

    assert_eq!(
        spawns,
        vec![
            (1, Some(EnemyKind::Ground)),
            (43, Some(EnemyKind::Ground)),
            (63, Some(EnemyKind::Ground)),
            (83, Some(EnemyKind::Ground)),
        ]
    );
    assert_eq!(waves.wave(), 2);
}

#[test]
fn next_wave_waits_for_a_clear_field() {
    let mut waves = Waves::new();
    for index in 1..=21 {
        let _ = tick(&mut waves, index, 1);
    }
    assert!(waves.is_spawning_done());

    for index in 22..=200 {
        assert!(tick(&mut waves, index, 1).is_empty());
    }
    assert_eq!(waves.wave(), 0);

    let _ = tick(&mut waves, 201, 0);
    assert_eq!(waves.wave(), 1);
    assert!(!waves.is_spawning_done());
}

#[test]
fn every_wave_spawns_its_full_roster() {
    let mut waves = Waves::new();
    let mut per_wave = vec![0_u32; WAVE_COUNT];
    let mut index = 0;

    while waves.wave() < WAVE_COUNT as u32 {
        index += 1;
        assert!(index < 1_000_000, "wave schedule stalled");
        let wave = waves.wave() as usize;
        per_wave[wave] += tick(&mut waves, index, 0).len() as u32;
    }

    for (number, wave) in WAVES.iter().enumerate() {
        assert_eq!(per_wave[number], wave.enemy_count(), "wave {number}");
    }
    assert_eq!(waves.current_health_multiplier(), 21.0);
}

#[test]
fn each_wave_spawns_tougher_enemies() {
    let mut waves = Waves::new();
    let mut multipliers = Vec::new();
    let mut index = 0;

    while waves.wave() < 4 {
        index += 1;
        for command in tick(&mut waves, index, 0) {
            if let Command::SpawnEnemy {
                health_multiplier, ..
            } = command
            {
                multipliers.push((waves.wave(), health_multiplier));
            }
        }
    }

    let first_of_each: Vec<_> = (0..4)
        .filter_map(|wave| multipliers.iter().find(|(w, _)| *w == wave))
        .map(|(_, multiplier)| *multiplier)
        .collect();
    assert_eq!(first_of_each.len(), 4);
    assert_eq!(first_of_each[0], 1.0);
    assert!((first_of_each[1] - 1.392_157).abs() < 1e-5);
    assert!(first_of_each.windows(2).all(|pair| pair[1] > pair[0]));
}

#[test]
fn scheduled_spawns_enter_the_world() {
    let mut world = World::new(Config::default()).expect("default config");
    let mut waves = Waves::new();

    let mut events = Vec::new();
    world::apply(&mut world, Command::Tick, &mut events);
    let mut commands = Vec::new();
    waves.handle(&events, query::active_enemies(&world), &mut commands);
    for command in commands {
        world::apply(&mut world, command, &mut events);
    }

    let enemies = query::enemy_view(&world);
    assert_eq!(enemies.len(), 1);
    assert_eq!(enemies[0].kind, EnemyKind::Ground);
    assert_eq!(enemies[0].health, 10.0);
}
