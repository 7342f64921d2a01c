//! Run settings assembled from an optional TOML file and command-line flags.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use wire_defence_core::GameSpeed;
use wire_defence_world::Config;

const DEFAULT_FRAMES: u32 = 3_600;
const DEFAULT_SEED: u64 = 0x5eed;

/// Contents of a settings file. Every key may be omitted.
///
/// ```toml
/// speed = "fast"
/// frames = 1200
///
/// [world]
/// starting_money = 250
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SettingsFile {
    speed: Option<GameSpeed>,
    frames: Option<u32>,
    seed: Option<u64>,
    autoplay: Option<bool>,
    world: Config,
}

impl SettingsFile {
    /// Parses settings from TOML text.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid settings")
    }

    /// Reads and parses the settings file at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("failed to load {}", path.display()))
    }
}

/// Values supplied on the command line, which take precedence over the file.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Overrides {
    pub(crate) speed: Option<GameSpeed>,
    pub(crate) frames: Option<u32>,
    pub(crate) seed: Option<u64>,
    pub(crate) autoplay: bool,
}

/// Fully resolved parameters of a headless run.
#[derive(Clone, Debug)]
pub(crate) struct Settings {
    pub(crate) world: Config,
    pub(crate) speed: GameSpeed,
    pub(crate) frames: u32,
    pub(crate) seed: u64,
    pub(crate) autoplay: bool,
}

impl Settings {
    /// Layers the command-line overrides on top of the file contents.
    pub(crate) fn resolve(file: SettingsFile, overrides: Overrides) -> Self {
        Self {
            world: file.world,
            speed: overrides.speed.or(file.speed).unwrap_or_default(),
            frames: overrides.frames.or(file.frames).unwrap_or(DEFAULT_FRAMES),
            seed: overrides.seed.or(file.seed).unwrap_or(DEFAULT_SEED),
            autoplay: overrides.autoplay || file.autoplay.unwrap_or(false),
        }
    }
}
