#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave system responsible for emitting enemy spawn commands.
//!
//! Waves are read from a fixed table. Each wave is a list of segments that
//! spawn `count` enemies of one kind, one every `interval` ticks. A wave
//! ends once its last segment is exhausted, and the next wave only starts
//! after the field has been cleared.

use tracing::info;
use wire_defence_core::{Command, EnemyKind, Event};
use EnemyKind::{
    Flying as F, FlyingFast as FF, FlyingHeavy as FH, Ground as G, GroundFast as GF,
    GroundHeavy as GH, GroundHeavyFast as GHF, GroundSuperHeavy as GSH,
};

/// Number of waves in the table before it wraps around.
pub const WAVE_COUNT: usize = 51;

/// One run of identical enemies within a wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Kind of enemy spawned by the segment.
    pub kind: EnemyKind,
    /// Number of enemies spawned by the segment.
    pub count: u32,
    /// Ticks between two consecutive spawns.
    pub interval: u32,
}

const fn seg(kind: EnemyKind, count: u32, interval: u32) -> Segment {
    Segment {
        kind,
        count,
        interval,
    }
}

/// Ordered list of segments, optionally played several times in a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wave {
    pattern: &'static [Segment],
    repeats: u32,
}

impl Wave {
    const fn once(pattern: &'static [Segment]) -> Self {
        Self {
            pattern,
            repeats: 1,
        }
    }

    const fn repeated(pattern: &'static [Segment], repeats: u32) -> Self {
        Self { pattern, repeats }
    }

    /// Number of segments once repeats are unrolled.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pattern.len() * self.repeats as usize
    }

    /// Reports whether the wave spawns nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Segment at `index` once repeats are unrolled.
    #[must_use]
    pub fn segment(&self, index: usize) -> Option<Segment> {
        if index >= self.len() {
            return None;
        }
        self.pattern.get(index % self.pattern.len()).copied()
    }

    /// Iterates over every segment in spawn order.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        (0..self.len()).filter_map(|index| self.segment(index))
    }

    /// Total number of enemies the wave spawns.
    #[must_use]
    pub fn enemy_count(&self) -> u32 {
        self.segments().map(|segment| segment.count).sum()
    }
}

/// The wave table in play order.
pub static WAVES: [Wave; WAVE_COUNT] = [
    Wave::once(&[seg(G, 1, 10)]),
    Wave::once(&[seg(G, 3, 20)]),
    Wave::once(&[seg(G, 5, 15)]),
    Wave::once(&[seg(GH, 1, 10)]),
    Wave::once(&[seg(G, 10, 8)]),
    Wave::once(&[seg(GH, 3, 45)]),
    Wave::repeated(&[seg(GH, 1, 10), seg(G, 1, 20)], 3),
    Wave::once(&[seg(G, 15, 15)]),
    Wave::once(&[seg(GH, 5, 30)]),
    Wave::repeated(&[seg(G, 3, 25), seg(GH, 1, 10)], 3),
    Wave::once(&[seg(GF, 3, 120)]),
    Wave::once(&[seg(GH, 10, 45)]),
    Wave::repeated(&[seg(GH, 1, 10), seg(GF, 1, 60)], 5),
    Wave::once(&[seg(G, 20, 8)]),
    Wave::once(&[seg(GF, 10, 30)]),
    Wave::once(&[seg(FF, 3, 120)]),
    Wave::once(&[seg(GH, 20, 30)]),
    Wave::once(&[seg(G, 20, 8)]),
    Wave::once(&[seg(FF, 8, 60)]),
    Wave::once(&[seg(GH, 30, 60)]),
    Wave::once(&[seg(F, 5, 120)]),
    Wave::once(&[seg(FF, 10, 60)]),
    Wave::repeated(&[seg(F, 2, 30), seg(FF, 1, 10)], 3),
    Wave::once(&[seg(G, 40, 10)]),
    Wave::once(&[seg(GH, 40, 30)]),
    Wave::once(&[seg(GF, 40, 20)]),
    Wave::once(&[seg(GHF, 3, 120)]),
    Wave::once(&[seg(F, 20, 30)]),
    Wave::once(&[seg(GH, 20, 50)]),
    Wave::once(&[seg(FF, 20, 20)]),
    Wave::once(&[seg(FH, 1, 20)]),
    Wave::once(&[seg(GH, 10, 30)]),
    Wave::once(&[seg(GF, 10, 50)]),
    Wave::once(&[seg(G, 50, 10)]),
    Wave::repeated(&[seg(F, 2, 30), seg(FF, 3, 20)], 5),
    Wave::once(&[seg(FH, 3, 200)]),
    Wave::repeated(&[seg(GHF, 10, 40), seg(GF, 5, 20)], 5),
    Wave::once(&[seg(G, 30, 10)]),
    Wave::once(&[seg(FH, 5, 200)]),
    Wave::repeated(&[seg(G, 5, 10), seg(GH, 5, 30)], 3),
    Wave::once(&[seg(GF, 50, 20)]),
    Wave::once(&[seg(FF, 20, 50)]),
    Wave::once(&[seg(GHF, 20, 30)]),
    Wave::once(&[seg(F, 20, 30)]),
    Wave::once(&[seg(GH, 50, 30)]),
    Wave::once(&[seg(GSH, 1, 100)]),
    Wave::once(&[seg(FH, 10, 60)]),
    Wave::once(&[seg(GSH, 3, 120)]),
    Wave::repeated(&[seg(GF, 10, 10), seg(FF, 10, 10)], 3),
    Wave::repeated(&[seg(GHF, 20, 20), seg(FH, 20, 30)], 3),
    Wave::once(&[seg(GSH, 10, 30)]),
];

/// Health multiplier applied to enemies of the given wave number.
///
/// The multiplier rises linearly with every wave and gains twenty over one
/// pass through the table.
#[must_use]
pub fn health_multiplier(wave: u32) -> f32 {
    1.0 + (wave as f32 / WAVE_COUNT as f32) * 20.0
}

/// Pure system that walks the wave table and emits spawn commands.
#[derive(Clone, Debug)]
pub struct Waves {
    wave: u32,
    next_segment: usize,
    kind: EnemyKind,
    remaining: u32,
    interval: u32,
    counter: i64,
    spawning_done: bool,
    health_multiplier: f32,
    frozen: bool,
}

impl Default for Waves {
    fn default() -> Self {
        Self::new()
    }
}

impl Waves {
    /// Creates a wave system positioned before the first spawn of wave zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            wave: 0,
            next_segment: 0,
            kind: EnemyKind::Ground,
            remaining: 0,
            interval: 0,
            counter: 0,
            spawning_done: false,
            health_multiplier: 1.0,
            frozen: false,
        }
    }

    /// Number of the wave currently being played.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.wave
    }

    /// Health multiplier handed to enemies of the current wave.
    #[must_use]
    pub const fn current_health_multiplier(&self) -> f32 {
        self.health_multiplier
    }

    /// Reports whether the current wave has emitted all of its enemies.
    #[must_use]
    pub const fn is_spawning_done(&self) -> bool {
        self.spawning_done
    }

    /// Consumes world events to emit spawn commands.
    ///
    /// The system steps once per `TimeAdvanced` event. `active_enemies`
    /// should mirror the world's `query::active_enemies` after those ticks.
    pub fn handle(&mut self, events: &[Event], active_enemies: usize, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::GameOver => self.frozen = true,
                Event::TimeAdvanced { .. } if !self.frozen => self.step(active_enemies, out),
                _ => {}
            }
        }
    }

    fn step(&mut self, active_enemies: usize, out: &mut Vec<Command>) {
        if self.spawning_done {
            if active_enemies == 0 {
                self.start_next_wave();
            }
            return;
        }

        while self.counter >= i64::from(self.interval) {
            if self.remaining == 0 {
                self.load_next_segment();
                if self.spawning_done {
                    break;
                }
            }
            out.push(Command::SpawnEnemy {
                kind: self.kind,
                health_multiplier: self.health_multiplier,
            });
            self.remaining = self.remaining.saturating_sub(1);
            self.counter -= i64::from(self.interval);
        }
        self.counter += 1;
    }

    fn start_next_wave(&mut self) {
        self.wave += 1;
        self.health_multiplier = health_multiplier(self.wave);
        self.next_segment = 0;
        self.spawning_done = false;
        info!(
            wave = self.wave,
            health_multiplier = self.health_multiplier,
            "wave started"
        );
        self.load_next_segment();
    }

    fn load_next_segment(&mut self) {
        let wave = &WAVES[self.wave as usize % WAVE_COUNT];
        match wave.segment(self.next_segment) {
            Some(segment) => {
                self.next_segment += 1;
                self.kind = segment.kind;
                self.remaining = segment.count;
                self.interval = segment.interval;
                self.counter = 0;
            }
            None => {
                self.spawning_done = true;
                info!(wave = self.wave, "wave finished spawning");
            }
        }
    }
}
