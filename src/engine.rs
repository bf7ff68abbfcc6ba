//! Simulation engine driving the whole population tick by tick.

use crate::agent::{Action, Agent, AgentId, Disease, Status};
use crate::config::Config;
use crate::error::SimError;
use crate::grid::Grid;
use crate::scheduler::Scheduler;
use crate::stats::{Metrics, Record};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Uniform;

/// Simulation engine.
///
/// Holds the configuration, grid, scheduler, metrics and random number
/// generator, and advances the whole population one tick at a time.
/// Every stochastic decision draws from the injected generator, so a fixed
/// seed reproduces a run exactly.
pub struct Engine<R = ChaCha12Rng> {
    cfg: Config,
    disease: Disease,
    grid: Grid,
    sched: Scheduler,
    metrics: Metrics,
    deaths: usize,
    tick: u64,
    rng: R,
}

impl Engine<ChaCha12Rng> {
    /// Create an `Engine` whose generator is seeded from `seed`.
    pub fn from_seed(cfg: Config, seed: u64) -> Result<Self> {
        Self::new(cfg, ChaCha12Rng::seed_from_u64(seed))
    }

    /// Create an `Engine` whose generator is seeded by the operating system.
    pub fn from_os_rng(cfg: Config) -> Result<Self> {
        let rng = ChaCha12Rng::try_from_os_rng()?;
        Self::new(cfg, rng)
    }
}

impl<R: Rng> Engine<R> {
    /// Create a new `Engine` with the given configuration and generator.
    ///
    /// Places every agent on a uniformly random cell (the first `n_immune`
    /// of them immune) and forces one random agent to start incubating.
    pub fn new(cfg: Config, mut rng: R) -> Result<Self> {
        // Rejects, among others, an empty population that could not be seeded.
        cfg.validate().context("failed to validate config")?;

        let disease = Disease::new(&cfg.model).context("failed to build disease rules")?;
        let mut grid = Grid::new(cfg.grid.width, cfg.grid.height, cfg.grid.wrap_around)?;

        let x_dist = Uniform::new(0, cfg.grid.width)?;
        let y_dist = Uniform::new(0, cfg.grid.height)?;
        let mut agt_vec = Vec::with_capacity(cfg.init.n_agents);
        for id in 0..cfg.init.n_agents {
            agt_vec.push(Agent::new(id, id < cfg.init.n_immune));
            let cell = (x_dist.sample(&mut rng), y_dist.sample(&mut rng));
            grid.place(id, cell)
                .with_context(|| format!("failed to place agent {id}"))?;
        }
        let mut sched = Scheduler::new(agt_vec);

        let &seed_id = sched
            .live()
            .choose(&mut rng)
            .context("failed to choose the first infected agent")?;
        sched.get_mut(seed_id)?.infect(0, disease.incubation_ticks);
        log::debug!("seeded outbreak at agent {seed_id}");

        log::info!(
            "placed {} agents ({} immune) on a {}x{} grid",
            cfg.init.n_agents,
            cfg.init.n_immune,
            cfg.grid.width,
            cfg.grid.height
        );

        Ok(Self {
            cfg,
            disease,
            grid,
            sched,
            metrics: Metrics::new(),
            deaths: 0,
            tick: 0,
            rng,
        })
    }

    /// Advance the simulation by one tick and record its metrics.
    pub fn step(&mut self) -> Result<()> {
        self.tick += 1;

        // Each agent sees the grid as left by the agents activated before it.
        let order = self.sched.activation_order(&mut self.rng);
        for id in order {
            self.activate(id)
                .with_context(|| format!("failed to activate agent {id}"))?;
        }

        let n_dead = self.sched.remove_dead();
        if self.sched.len() + self.deaths != self.cfg.init.n_agents {
            bail!(
                "population bookkeeping broken: {} live + {} dead != {}",
                self.sched.len(),
                self.deaths,
                self.cfg.init.n_agents
            );
        }
        if n_dead > 0 {
            log::debug!("tick {}: {n_dead} agents died", self.tick);
            if self.sched.is_empty() {
                log::info!("population went extinct at tick {}", self.tick);
            }
        }

        self.metrics
            .collect(
                self.tick,
                self.deaths,
                &self.sched,
                &self.grid,
                &self.disease,
                &mut self.rng,
            )
            .context("failed to collect metrics")?;

        Ok(())
    }

    /// Perform `n_ticks` steps, logging progress.
    pub fn run(&mut self, n_ticks: u64) -> Result<()> {
        let log_every = (n_ticks / 10).max(1);
        for i_tick in 0..n_ticks {
            self.step().context("failed to perform step")?;

            if (i_tick + 1) % log_every == 0 || i_tick + 1 == n_ticks {
                let progress = 100.0 * (i_tick + 1) as f64 / n_ticks as f64;
                log::info!("completed {progress:06.2}%");
            }
        }
        Ok(())
    }

    fn activate(&mut self, id: AgentId) -> Result<()> {
        let agent = self.sched.get_mut(id)?;
        if agent.status() == Status::Dead {
            bail!("dead agent {id} was scheduled");
        }

        match agent.advance(self.tick, &self.disease, &mut self.rng) {
            Action::Move => self.move_agent(id).context("failed to move agent")?,
            Action::Infect => self.infect_neighbors(id).context("failed to infect neighbors")?,
            Action::Die => {
                self.grid.remove(id)?;
                self.deaths += 1;
                log::trace!("agent {id} died at tick {}", self.tick);
            }
        }
        Ok(())
    }

    fn move_agent(&mut self, id: AgentId) -> Result<()> {
        let cell = self.grid.position(id).ok_or(SimError::AgentNotFound(id))?;
        let candidates = self
            .grid
            .neighborhood(cell, self.disease.move_radius, true)?;
        let &target = candidates
            .choose(&mut self.rng)
            .context("no cell to move to")?;
        self.grid.move_to(id, target)?;
        Ok(())
    }

    fn infect_neighbors(&mut self, id: AgentId) -> Result<()> {
        let cell = self.grid.position(id).ok_or(SimError::AgentNotFound(id))?;
        let neighbors = self
            .grid
            .neighbors(cell, self.disease.infection_radius, true)?;

        let mut n_infected = 0;
        for other_id in neighbors {
            let other = self.sched.get_mut(other_id)?;
            if other.status() != Status::Healthy {
                continue;
            }
            if self.disease.transmission.sample(&mut self.rng) {
                other.infect(self.tick, self.disease.incubation_ticks);
                n_infected += 1;
            }
        }

        self.sched.get_mut(id)?.add_infections(n_infected);
        Ok(())
    }
}

impl<R> Engine<R> {
    /// Grid as a `width x height` array of status codes, indexed `[x][y]`.
    ///
    /// Each cell holds the code of the last live agent found on it, 0 if empty.
    pub fn snapshot(&self) -> Vec<Vec<u8>> {
        let mut arr = vec![vec![0; self.grid.height()]; self.grid.width()];
        for agt in self.sched.agents() {
            if let Some((x, y)) = self.grid.position(agt.id()) {
                arr[x][y] = agt.status().code();
            }
        }
        arr
    }

    /// Per-tick metrics recorded so far.
    pub fn metrics(&self) -> &[Record] {
        self.metrics.records()
    }

    /// History of one named metric.
    pub fn series(&self, name: &str) -> Option<Vec<f64>> {
        self.metrics.series(name)
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Number of ticks performed.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of live agents.
    pub fn population(&self) -> usize {
        self.sched.len()
    }

    /// Cumulative number of deaths.
    pub fn deaths(&self) -> usize {
        self.deaths
    }

    /// Live agents.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.sched.agents()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }
}
