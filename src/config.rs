//! Configuration loading and validation.

use crate::error::SimError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Disease and movement parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Chebyshev radius of the cells an agent may move to in one tick.
    pub move_radius: usize,
    /// Chebyshev radius within which an infectious agent reaches others.
    pub infection_radius: usize,
    /// Probability that one contact with a healthy agent transmits.
    pub transmission_probability: f64,
    /// Number of ticks an agent incubates before becoming infectious.
    pub incubation_ticks: u32,
    /// Number of ticks an agent stays infectious.
    pub recovery_ticks: u32,
    /// Probability of dying when the infectious period ends.
    pub death_probability: f64,
}

/// Initial population parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Initial number of agents.
    pub n_agents: usize,
    /// Number of agents (taken from the start of the population) that begin immune.
    pub n_immune: usize,
}

/// Grid geometry.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
    /// Toroidal topology instead of a bounded one.
    pub wrap_around: bool,
}

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub init: InitConfig,
    pub grid: GridConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                move_radius: 2,
                infection_radius: 2,
                transmission_probability: 0.5,
                incubation_ticks: 2,
                recovery_ticks: 2,
                death_probability: 0.5,
            },
            init: InitConfig {
                n_agents: 100,
                n_immune: 0,
            },
            grid: GridConfig {
                width: 100,
                height: 100,
                wrap_around: true,
            },
        }
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must contain a TOML-encoded [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Check every parameter against its admissible range.
    ///
    /// The root cause of any error is a [`SimError::InvalidConfiguration`].
    pub fn validate(&self) -> Result<()> {
        let model = &self.model;
        check_num(model.move_radius, 0..1_000).context("invalid move radius")?;
        check_num(model.infection_radius, 0..1_000).context("invalid infection radius")?;
        check_num(model.transmission_probability, 0.0..=1.0)
            .context("invalid transmission probability")?;
        check_num(model.incubation_ticks, 1..100_000).context("invalid incubation ticks")?;
        check_num(model.recovery_ticks, 1..100_000).context("invalid recovery ticks")?;
        check_num(model.death_probability, 0.0..=1.0).context("invalid death probability")?;

        check_num(self.init.n_agents, 1..1_000_000).context("invalid initial number of agents")?;
        check_num(self.init.n_immune, 0..=self.init.n_agents)
            .context("invalid initial number of immune agents")?;

        check_num(self.grid.width, 1..100_000).context("invalid grid width")?;
        check_num(self.grid.height, 1..100_000).context("invalid grid height")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<(), SimError>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    // NaN is never contained in a range, so it is rejected here too.
    if !range.contains(&num) {
        return Err(SimError::InvalidConfiguration(format!(
            "number must be in the range {range:?}, but is {num:?}"
        )));
    }
    Ok(())
}
