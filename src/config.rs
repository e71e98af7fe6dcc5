/***************************************/
/*        3rd party libraries          */
/***************************************/
use anyhow::{ensure, Context};
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub building: BuildingConfig,
    pub timing: TimingConfig,
    pub dispatch: DispatchConfig,
    pub coordinator: CoordinatorConfig,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BuildingConfig {
    pub n_floors: u8,
    pub n_elevators: u8,
}

impl Default for BuildingConfig {
    fn default() -> Self {
        BuildingConfig {
            n_floors: 7,
            n_elevators: 2,
        }
    }
}

/// Door and arrival timing in milliseconds.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub door_animation_time: u64,
    pub door_open_time: u64,
    pub arrival_delay: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            door_animation_time: 700,
            door_open_time: 3000,
            arrival_delay: 200,
        }
    }
}

/**
 * Knobs for the closest-elevator search and the scheduler.
 *
 * # Fields
 * - `exclude_maintenance`:     Skip elevators in maintenance when searching for a candidate.
 * - `exclude_overloaded`:      Skip overloaded elevators when searching for a candidate.
 * - `defer_misaligned_calls`:  Park a call instead of assigning it to a busy elevator heading the other way.
 */
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    pub exclude_maintenance: bool,
    pub exclude_overloaded: bool,
    pub defer_misaligned_calls: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            exclude_maintenance: true,
            exclude_overloaded: true,
            defer_misaligned_calls: false,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub tick_time: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig { tick_time: 50 }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.building.n_floors >= 2,
            "a building needs at least 2 floors, got {}",
            self.building.n_floors
        );
        ensure!(
            (1..=26).contains(&self.building.n_elevators),
            "elevator count must be between 1 and 26, got {}",
            self.building.n_elevators
        );
        ensure!(self.coordinator.tick_time > 0, "tick_time must be positive");
        Ok(())
    }
}

/***************************************/
/*             Public API              */
/***************************************/
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        warn!("No configuration at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
    let config = parse_config(&config_str)
        .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;
    Ok(config)
}

pub fn parse_config(config_str: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(config_str)?;
    config.validate()?;
    Ok(config)
}

/***************************************/
/*             Unit tests              */
/***************************************/
