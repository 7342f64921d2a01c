#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Wire Defence headless.
//!
//! The runner steps the world frame by frame at the selected game speed,
//! feeds tick events to the wave system and, when asked to, lets a seeded
//! autoplayer build through the builder system.

mod autoplay;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wire_defence_core::{Command, Event, GameSpeed};
use wire_defence_system_builder::Builder;
use wire_defence_system_waves::Waves;
use wire_defence_world::{self as world, query, World};

use crate::{
    autoplay::{Autoplayer, Gesture},
    settings::{Overrides, Settings, SettingsFile},
};

/// Simulation speed accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SpeedArg {
    Paused,
    Normal,
    Fast,
}

impl From<SpeedArg> for GameSpeed {
    fn from(speed: SpeedArg) -> Self {
        match speed {
            SpeedArg::Paused => Self::Paused,
            SpeedArg::Normal => Self::Normal,
            SpeedArg::Fast => Self::Fast,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "wire-defence", about = "Headless Wire Defence runner")]
struct Args {
    /// TOML settings file with an optional `[world]` table.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Simulation speed.
    #[arg(long, value_enum)]
    speed: Option<SpeedArg>,
    /// Number of frames to run before stopping.
    #[arg(long)]
    frames: Option<u32>,
    /// Seed for the autoplayer.
    #[arg(long)]
    seed: Option<u64>,
    /// Let the seeded autoplayer build towers and wires.
    #[arg(long)]
    autoplay: bool,
}

/// Entry point for the Wire Defence command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let file = match &args.config {
        Some(path) => SettingsFile::load(path)?,
        None => SettingsFile::default(),
    };
    let settings = Settings::resolve(
        file,
        Overrides {
            speed: args.speed.map(GameSpeed::from),
            frames: args.frames,
            seed: args.seed,
            autoplay: args.autoplay,
        },
    );

    let mut session = Session::new(&settings)?;
    info!(
        frames = settings.frames,
        speed = ?settings.speed,
        autoplay = settings.autoplay,
        "run.start"
    );
    let frames = session.run(settings.frames);
    println!("{}", session.summary(frames));
    Ok(())
}

/// World plus the systems that drive it.
struct Session {
    world: World,
    builder: Builder,
    waves: Waves,
    autoplayer: Option<Autoplayer>,
    speed: GameSpeed,
    feedback: Vec<Event>,
}

impl Session {
    fn new(settings: &Settings) -> Result<Self> {
        let world = World::new(settings.world.clone()).context("invalid world configuration")?;
        Ok(Self {
            builder: Builder::new(query::config(&world).wire_price),
            world,
            waves: Waves::new(),
            autoplayer: settings.autoplay.then(|| Autoplayer::new(settings.seed)),
            speed: settings.speed,
            feedback: Vec::new(),
        })
    }

    /// Runs up to `frames` frames and returns how many actually ran.
    fn run(&mut self, frames: u32) -> u32 {
        for frame in 0..frames {
            if query::is_game_over(&self.world) {
                return frame;
            }
            self.frame();
        }
        frames
    }

    fn frame(&mut self) {
        let mut events = Vec::new();

        let gesture = match self.autoplayer.as_mut() {
            Some(player) => player.next_gesture(&mut self.world),
            None => Gesture::default(),
        };
        let mut commands = Vec::new();
        let world = &self.world;
        self.builder.handle(
            &self.feedback,
            gesture.preview,
            gesture.input,
            |tile| query::wire_at(world, tile),
            &mut commands,
        );
        apply_all(&mut self.world, commands, &mut events);

        for _ in 0..self.speed.ticks_per_frame() {
            let mut tick_events = Vec::new();
            world::apply(&mut self.world, Command::Tick, &mut tick_events);

            let mut spawns = Vec::new();
            self.waves
                .handle(&tick_events, query::active_enemies(&self.world), &mut spawns);
            apply_all(&mut self.world, spawns, &mut tick_events);
            events.append(&mut tick_events);
        }

        self.feedback = events;
    }

    fn summary(&self, frames: u32) -> String {
        let purse = query::purse(&self.world);
        let towers = query::tower_view(&self.world);
        let cores = towers.iter().filter(|tower| tower.kind.is_core()).count();
        format!(
            "frames: {frames}\n\
             ticks: {ticks}\n\
             wave: {wave}\n\
             money: {money}\n\
             health: {health}\n\
             score: {score}\n\
             towers: {towers} ({cores} cores)\n\
             wires: {wires}\n\
             enemies: {enemies}\n\
             stranded steps: {stranded}\n\
             game over: {over}",
            ticks = query::tick_index(&self.world),
            wave = self.waves.wave(),
            money = purse.money,
            health = purse.health,
            score = purse.score,
            towers = towers.len(),
            wires = query::wire_view(&self.world).len(),
            enemies = query::active_enemies(&self.world),
            stranded = query::stranded_steps(&self.world),
            over = query::is_game_over(&self.world),
        )
    }
}

fn apply_all(world: &mut World, commands: Vec<Command>, events: &mut Vec<Event>) {
    for command in commands {
        world::apply(world, command, events);
    }
}
